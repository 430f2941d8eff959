//! Stopping thresholds for the sampling ladder.
//!
//! At stage `s` the tester draws `n = 10^s` multinomial samples and counts
//! the hits (samples at least as unlikely as the observation). The threshold
//! z(s) is the smallest hit count that certifies, at confidence 1 − α, that
//! the true hit proportion exceeds μ:
//!
//! ```text
//! z(s) = min { z ∈ [0, n] : P(Binomial(n, μ) ≤ z − 1) ≥ 1 − α }
//! ```
//!
//! Observations with `hits ≥ z(s)` have a p-value clearly above μ, so the
//! ladder stops there. The table is a pure function of (S_min, S_max, μ, α),
//! built once per run and shared read-only across every ballot box.

use std::ops::RangeInclusive;

use statrs::distribution::{Binomial, Discrete};

use crate::constants::{samples_for_exponent, MAX_EXPONENT};
use crate::error::{PValueError, Result};

/// Smallest z with `P(Binomial(n, mu) ≤ z − 1) ≥ 1 − alpha`.
///
/// The cumulative probability is accumulated one pmf term at a time, starting
/// from `P(X ≤ −1) = 0` at `z = 0`. If rounding keeps the sum below `1 − alpha`
/// all the way to `z = n`, returns `n` (the most conservative threshold).
pub fn threshold_for_n(n: u64, mu: f64, alpha: f64) -> Result<u64> {
    validate_level("mu", mu)?;
    validate_level("alpha", alpha)?;
    let binom =
        Binomial::new(mu, n).map_err(|e| PValueError::InvalidConfig(format!("binomial: {e}")))?;

    let target = 1.0 - alpha;
    let mut cum_prob = 0.0f64;
    for z in 0..=n {
        if z > 0 {
            cum_prob += binom.pmf(z - 1);
        }
        if cum_prob >= target {
            return Ok(z);
        }
    }
    Ok(n)
}

fn validate_level(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(PValueError::InvalidConfig(format!(
            "{name} must lie in (0, 1), got {value}"
        )))
    }
}

/// z(s) for every exponent of the sampling ladder.
#[derive(Clone, Debug, PartialEq)]
pub struct ThresholdTable {
    s_min: u32,
    mu: f64,
    alpha: f64,
    /// `thresholds[s - s_min] = z(s)`.
    thresholds: Vec<u64>,
}

impl ThresholdTable {
    /// Build the table for `s = s_min..=s_max`.
    pub fn build(s_min: u32, s_max: u32, mu: f64, alpha: f64) -> Result<Self> {
        if s_min > s_max {
            return Err(PValueError::InvalidConfig(format!(
                "s_min ({s_min}) must not exceed s_max ({s_max})"
            )));
        }
        if s_max > MAX_EXPONENT {
            return Err(PValueError::InvalidConfig(format!(
                "s_max ({s_max}) exceeds the largest supported exponent {MAX_EXPONENT}"
            )));
        }

        let thresholds = (s_min..=s_max)
            .map(|s| threshold_for_n(samples_for_exponent(s), mu, alpha))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            s_min,
            mu,
            alpha,
            thresholds,
        })
    }

    /// Build with μ = 10^-mu_power and α = 10^-alpha_power.
    pub fn from_powers(s_min: u32, s_max: u32, mu_power: i32, alpha_power: i32) -> Result<Self> {
        Self::build(
            s_min,
            s_max,
            10f64.powi(-mu_power),
            10f64.powi(-alpha_power),
        )
    }

    pub fn s_min(&self) -> u32 {
        self.s_min
    }

    pub fn s_max(&self) -> u32 {
        self.s_min + self.thresholds.len() as u32 - 1
    }

    pub fn exponents(&self) -> RangeInclusive<u32> {
        self.s_min..=self.s_max()
    }

    pub fn mu(&self) -> f64 {
        self.mu
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// z(s), or `None` if `s` is outside the table.
    pub fn get(&self, s: u32) -> Option<u64> {
        s.checked_sub(self.s_min)
            .and_then(|i| self.thresholds.get(i as usize))
            .copied()
    }

    /// Whether every exponent in `range` has a threshold.
    pub fn covers(&self, range: &RangeInclusive<u32>) -> bool {
        range.start() <= range.end() && *range.start() >= self.s_min && *range.end() <= self.s_max()
    }

    /// `(s, z(s))` pairs in increasing order of `s`.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u64)> + '_ {
        self.thresholds
            .iter()
            .enumerate()
            .map(move |(i, &z)| (self.s_min + i as u32, z))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Cumulative P(X ≤ z − 1), summed the same way as `threshold_for_n`.
    fn cum_below(n: u64, mu: f64, z: u64) -> f64 {
        let binom = Binomial::new(mu, n).unwrap();
        (0..z).map(|k| binom.pmf(k)).sum()
    }

    #[test]
    fn test_threshold_is_minimal() {
        for &(n, mu, alpha) in &[
            (1_000u64, 1e-5, 1e-7),
            (10_000, 1e-3, 1e-4),
            (500, 0.05, 0.01),
            (100_000, 1e-5, 1e-7),
        ] {
            let z = threshold_for_n(n, mu, alpha).unwrap();
            assert!(z <= n);
            assert!(
                cum_below(n, mu, z) >= 1.0 - alpha,
                "n={n} mu={mu} alpha={alpha} z={z}"
            );
            if z > 0 {
                assert!(
                    cum_below(n, mu, z - 1) < 1.0 - alpha,
                    "z={z} is not minimal for n={n} mu={mu} alpha={alpha}"
                );
            }
        }
    }

    #[test]
    fn test_default_ladder_values_are_small() {
        // With μ = 1e-5 the expected hit count at n = 10^3 is 0.01, so a
        // couple of hits already certify p > μ.
        let table = ThresholdTable::from_powers(3, 5, 5, 7).unwrap();
        assert_eq!(table.exponents(), 3..=5);
        let z3 = table.get(3).unwrap();
        let z5 = table.get(5).unwrap();
        assert_eq!(z3, 4, "z(3) = {z3}");
        assert!(z5 >= z3);
        // λ = nμ = 1 at n = 10^5: P(X ≥ 11) ≈ 1e-8 < α ≤ P(X ≥ 10).
        assert_eq!(z5, 11, "z(5) = {z5}");
    }

    #[test]
    fn test_non_decreasing_in_n() {
        let table = ThresholdTable::from_powers(1, 6, 5, 7).unwrap();
        let zs: Vec<u64> = table.iter().map(|(_, z)| z).collect();
        for w in zs.windows(2) {
            assert!(w[0] <= w[1], "{zs:?}");
        }
    }

    #[test]
    fn test_get_outside_range() {
        let table = ThresholdTable::from_powers(3, 4, 5, 7).unwrap();
        assert!(table.get(2).is_none());
        assert!(table.get(5).is_none());
        assert!(table.covers(&(3..=4)));
        assert!(!table.covers(&(3..=5)));
        assert!(!table.covers(&(2..=4)));
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(ThresholdTable::build(5, 3, 1e-5, 1e-7).is_err());
        assert!(ThresholdTable::build(3, MAX_EXPONENT + 1, 1e-5, 1e-7).is_err());
        assert!(ThresholdTable::build(3, 4, 0.0, 1e-7).is_err());
        assert!(ThresholdTable::build(3, 4, 1e-5, 1.0).is_err());
        assert!(threshold_for_n(10, f64::NAN, 0.1).is_err());
    }

    #[test]
    fn test_tiny_n_with_large_mu() {
        // n = 1, μ = 0.5: P(X ≤ 0) = 0.5 < 0.99, P(X ≤ 1) = 1 ≥ 0.99 → z = 2 > n,
        // so the loop runs out and falls back to n.
        assert_eq!(threshold_for_n(1, 0.5, 0.01).unwrap(), 1);
    }
}
