//! Multinomial sampling by the conditional-binomial method.
//!
//! A draw from Multinomial(J, r) is built category by category: category i
//! receives `Binomial(remaining, r_i / (1 − r_0 − … − r_{i−1}))` ballots and
//! the last category takes whatever is left. The conditional probabilities
//! depend only on r, so they are computed once per ballot box.

use rand::Rng;
use rand_distr::{Binomial, Distribution};

use crate::error::{PValueError, Result};

/// Sampler for Multinomial(total, probs) with precomputed conditional probabilities.
pub struct MultinomialSampler {
    total: u64,
    /// `conditional[i] = r_i / remaining_p` clamped to [0, 1], for all but the last category.
    conditional: Vec<f64>,
}

impl MultinomialSampler {
    /// `probs` must be non-empty; callers validate it beforehand.
    pub fn new(total: u64, probs: &[f64]) -> Self {
        let mut conditional = Vec::with_capacity(probs.len().saturating_sub(1));
        let mut remaining_p = 1.0f64;
        for &p in probs.iter().take(probs.len().saturating_sub(1)) {
            let c = if remaining_p > 0.0 {
                (p / remaining_p).clamp(0.0, 1.0)
            } else {
                0.0
            };
            conditional.push(c);
            remaining_p -= p;
        }
        Self { total, conditional }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Number of categories.
    pub fn categories(&self) -> usize {
        self.conditional.len() + 1
    }

    /// Draw one count vector into `out` (length must equal `categories()`).
    #[inline]
    pub fn sample_into<R: Rng + ?Sized>(&self, rng: &mut R, out: &mut [u32]) -> Result<()> {
        debug_assert_eq!(out.len(), self.categories());
        let mut remaining = self.total;
        for (slot, &p) in out.iter_mut().zip(&self.conditional) {
            let k = if remaining == 0 || p <= 0.0 {
                0
            } else if p >= 1.0 {
                remaining
            } else {
                Binomial::new(remaining, p)
                    .map_err(|e| PValueError::Sampling(e.to_string()))?
                    .sample(rng)
            };
            *slot = k as u32;
            remaining -= k;
        }
        out[self.conditional.len()] = remaining as u32;
        Ok(())
    }
}
