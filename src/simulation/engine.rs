//! Sequential p-value test for one ballot box.
//!
//! Given observed counts x (J ballots over C candidates) and the assumed
//! vote probabilities r, the p-value is the probability under
//! Multinomial(J, r) of an outcome at least as unlikely as x. The outcome space
//! is far too large to enumerate, so it is estimated by Monte Carlo on a
//! geometric ladder n = 10^S_min .. 10^S_max:
//!
//! 1. `beta_obs = Σ x_i·ln r_i − Σ ln(x_i!)` (unnormalized log-likelihood).
//! 2. At each stage draw n samples, count `hits` with log-likelihood ≤ beta_obs.
//! 3. Stop as soon as `hits ≥ z(s)`; otherwise fall through to the last stage.
//!
//! Boxes whose p-value is not tiny stop after 10^S_min draws; only anomalous
//! boxes pay for the full ladder.
//!
//! ## Zero probabilities
//!
//! `ln(0)` is replaced by [`ZERO_PROBABILITY_LOG`] (0.0). This changes the
//! likelihood ranking for candidates with no assumed support, and is kept
//! as-is so that results stay comparable with earlier runs.

use std::ops::RangeInclusive;

use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use tracing::{debug, trace};

use crate::constants::{samples_for_exponent, PROBABILITY_SUM_TOLERANCE, ZERO_PROBABILITY_LOG};
use crate::error::{PValueError, Result};
use crate::log_factorial::LogFactorialCache;
use crate::thresholds::ThresholdTable;
use crate::types::{StopReason, TestResult};

use super::multinomial::MultinomialSampler;

/// `ln r_i`, with `ln 0` replaced by [`ZERO_PROBABILITY_LOG`].
pub fn log_probabilities(r: &[f64]) -> Vec<f64> {
    r.iter()
        .map(|&p| if p > 0.0 { p.ln() } else { ZERO_PROBABILITY_LOG })
        .collect()
}

/// Unnormalized multinomial log-likelihood `Σ x_i·log_p_i − Σ ln(x_i!)`.
///
/// The two sums are accumulated separately and in index order so that the
/// observation and every sample are scored by exactly the same arithmetic.
#[inline(always)]
pub fn log_likelihood(counts: &[u32], log_p: &[f64], lgac: &LogFactorialCache) -> f64 {
    let mut weighted = 0.0f64;
    let mut log_fact = 0.0f64;
    for (&c, &lp) in counts.iter().zip(log_p) {
        weighted += c as f64 * lp;
        log_fact += lgac.get(c);
    }
    weighted - log_fact
}

/// Check the ballot-box preconditions and return the total J.
pub fn validate_ballot_box(x: &[u32], r: &[f64], lgac: &LogFactorialCache) -> Result<u64> {
    if x.len() != r.len() {
        return Err(PValueError::LengthMismatch {
            counts: x.len(),
            probs: r.len(),
        });
    }
    if x.is_empty() {
        return Err(PValueError::NoCandidates);
    }
    for (index, &value) in r.iter().enumerate() {
        if !value.is_finite() || value < 0.0 {
            return Err(PValueError::InvalidProbability { index, value });
        }
    }
    let sum: f64 = r.iter().sum();
    if (sum - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
        return Err(PValueError::ProbabilitySum { sum });
    }

    let total: u64 = x.iter().map(|&c| c as u64).sum();
    if total == 0 {
        return Err(PValueError::ZeroTotal);
    }
    // Any sample may put all J ballots on one candidate.
    if total > lgac.max() as u64 {
        return Err(PValueError::CountExceedsCache {
            total,
            max: lgac.max(),
        });
    }
    Ok(total)
}

/// Sequential tester bound to one run's shared tables and sampling ladder.
///
/// Holds only shared references, so one tester can be used from every rayon
/// worker at once.
#[derive(Clone)]
pub struct SequentialTester<'a> {
    thresholds: &'a ThresholdTable,
    lgac: &'a LogFactorialCache,
    ladder: RangeInclusive<u32>,
}

impl<'a> SequentialTester<'a> {
    /// Tester over `s_min..=s_max`, which must be covered by `thresholds`.
    pub fn new(
        thresholds: &'a ThresholdTable,
        lgac: &'a LogFactorialCache,
        s_min: u32,
        s_max: u32,
    ) -> Result<Self> {
        let ladder = s_min..=s_max;
        if !thresholds.covers(&ladder) {
            let exponent = if s_min < thresholds.s_min() || s_min > s_max {
                s_min
            } else {
                s_max
            };
            return Err(PValueError::ExponentOutOfTable {
                exponent,
                min: thresholds.s_min(),
                max: thresholds.s_max(),
            });
        }
        Ok(Self {
            thresholds,
            lgac,
            ladder,
        })
    }

    /// Tester over the whole threshold table.
    pub fn full_ladder(thresholds: &'a ThresholdTable, lgac: &'a LogFactorialCache) -> Self {
        Self {
            thresholds,
            lgac,
            ladder: thresholds.exponents(),
        }
    }

    pub fn ladder(&self) -> RangeInclusive<u32> {
        self.ladder.clone()
    }

    /// Test observed counts `x` against probabilities `r`.
    pub fn test(&self, x: &[u32], r: &[f64], seed: u64) -> Result<TestResult> {
        let log_p = log_probabilities(r);
        self.test_with_log_probs(x, r, &log_p, seed)
    }

    /// Like [`test`](Self::test) with a caller-supplied log-probability vector.
    ///
    /// `log_p` must have the same length as `r`; entries for zero
    /// probabilities should hold a finite substitute.
    pub fn test_with_log_probs(
        &self,
        x: &[u32],
        r: &[f64],
        log_p: &[f64],
        seed: u64,
    ) -> Result<TestResult> {
        let total = validate_ballot_box(x, r, self.lgac)?;
        if log_p.len() != r.len() {
            return Err(PValueError::LengthMismatch {
                counts: x.len(),
                probs: log_p.len(),
            });
        }

        let beta_obs = log_likelihood(x, log_p, self.lgac);
        let sampler = MultinomialSampler::new(total, r);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let mut draw = vec![0u32; x.len()];

        let mut last = None;
        for s in self.ladder.clone() {
            let n = samples_for_exponent(s);
            let threshold = self.thresholds.get(s).ok_or(PValueError::ExponentOutOfTable {
                exponent: s,
                min: self.thresholds.s_min(),
                max: self.thresholds.s_max(),
            })?;

            let mut hits = 0u64;
            for _ in 0..n {
                sampler.sample_into(&mut rng, &mut draw)?;
                if log_likelihood(&draw, log_p, self.lgac) <= beta_obs {
                    hits += 1;
                }
            }
            trace!(s, n, hits, threshold, "sampling stage");

            if hits >= threshold {
                let result = TestResult {
                    p_value: hits as f64 / n as f64,
                    exponent: s,
                    hits,
                    samples: n,
                    stop: StopReason::ThresholdReached,
                };
                debug!(p_value = result.p_value, exponent = s, "threshold reached");
                return Ok(result);
            }
            last = Some((s, n, hits));
        }

        // The ladder is never empty, so `last` is set.
        let (s, n, hits) = last.ok_or(PValueError::ExponentOutOfTable {
            exponent: *self.ladder.start(),
            min: self.thresholds.s_min(),
            max: self.thresholds.s_max(),
        })?;
        let result = TestResult {
            p_value: hits as f64 / n as f64,
            exponent: s,
            hits,
            samples: n,
            stop: StopReason::LadderExhausted,
        };
        debug!(
            p_value = result.p_value,
            exponent = s,
            "ladder exhausted, low-confidence estimate"
        );
        Ok(result)
    }
}

/// One-shot form of [`SequentialTester::test`].
pub fn test_ballot_box(
    x: &[u32],
    r: &[f64],
    thresholds: &ThresholdTable,
    lgac: &LogFactorialCache,
    s_min: u32,
    s_max: u32,
    seed: u64,
) -> Result<TestResult> {
    SequentialTester::new(thresholds, lgac, s_min, s_max)?.test(x, r, seed)
}
