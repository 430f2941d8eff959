//! Run-wide defaults and fixed limits.
//!
//! The defaults reproduce the reference batch run over all districts:
//! a sampling ladder of n = 10^3 .. 10^8 draws, μ = 10^-5, α = 10^-7,
//! base seed 42 and a log-factorial cache covering boxes of up to 1000 voters.

/// Smallest sampling exponent: the first stage draws 10^3 samples.
pub const DEFAULT_S_MIN: u32 = 3;

/// Largest sampling exponent: the last stage draws 10^8 samples.
pub const DEFAULT_S_MAX: u32 = 8;

/// μ = 10^-MU_POWER is the p-value level the ladder tries to resolve.
pub const DEFAULT_MU_POWER: i32 = 5;

/// α = 10^-ALPHA_POWER bounds the probability of stopping too early.
pub const DEFAULT_ALPHA_POWER: i32 = 7;

/// Base seed; ballot box b is tested with `DEFAULT_SEED + b + 1`.
pub const DEFAULT_SEED: u64 = 42;

/// Upper bound of the log-factorial cache (largest ballot-box size).
pub const DEFAULT_LGAC_MAX: usize = 1000;

/// Default directory holding one `<district>.json` per district.
pub const DEFAULT_RESULTS_DIR: &str = "output/results_districts";

/// Hard cap on the sampling exponent. 10^9 draws per stage is already
/// far beyond what a single ballot box can afford.
pub const MAX_EXPONENT: u32 = 9;

/// Tolerance when checking that a probability vector sums to 1.
pub const PROBABILITY_SUM_TOLERANCE: f64 = 1e-6;

/// Finite stand-in for ln(0) when a candidate has zero assumed support.
pub const ZERO_PROBABILITY_LOG: f64 = 0.0;

/// The summary table reports p ≤ 10^0, 10^-1, ..., 10^-SUMMARY_MAX_POWER.
pub const SUMMARY_MAX_POWER: i32 = 7;

/// Districts with any box at p ≤ 10^-FLAG_POWER are flagged in the summary.
pub const DEFAULT_FLAG_POWER: i32 = 8;

/// Lower bounds of the eight base age ranges used by `group_agg`.
pub const AGE_RANGES_FROM: [&str; 8] = ["18", "20", "30", "40", "50", "60", "70", "80"];

/// Upper-bound suffixes of the eight base age ranges.
pub const AGE_RANGES_TO: [&str; 8] = ["-19", "-29", "-39", "-49", "-59", "-69", "-79", "+"];

/// n = 10^s for a sampling exponent.
#[inline(always)]
pub fn samples_for_exponent(s: u32) -> u64 {
    10u64.pow(s)
}
