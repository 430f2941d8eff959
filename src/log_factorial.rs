//! Log-factorial lookup table: `lgac[k] = ln(k!)` for `k = 0..=max`.
//!
//! Every likelihood evaluation subtracts `Σ ln(x_i!)`, so a scan over a
//! country performs billions of lookups. The table is built once and shared
//! by reference across all worker threads.

/// Immutable table of `ln(k!)`.
#[derive(Clone, Debug)]
pub struct LogFactorialCache {
    values: Vec<f64>,
}

impl LogFactorialCache {
    /// Build the table for `k = 0..=max`.
    ///
    /// Accumulates `ln(max(k, 1))` so that `ln(0!) = ln(1!) = 0` exactly.
    pub fn new(max: usize) -> Self {
        let mut values = Vec::with_capacity(max + 1);
        let mut acc = 0.0f64;
        values.push(acc);
        for k in 1..=max {
            acc += (k as f64).ln();
            values.push(acc);
        }
        Self { values }
    }

    /// Largest `k` covered by the table.
    #[inline(always)]
    pub fn max(&self) -> usize {
        self.values.len() - 1
    }

    /// `ln(k!)`. Panics if `k > max()`; callers validate totals up front.
    #[inline(always)]
    pub fn get(&self, k: u32) -> f64 {
        self.values[k as usize]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }
}
