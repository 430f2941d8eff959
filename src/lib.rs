//! # Ballot p-values: adaptive Monte Carlo anomaly scores for ballot boxes
//!
//! For every ballot box of every district, estimates the probability that a
//! multinomial vote model produces a count vector at least as unlikely as the
//! observed one. Boxes with tiny p-values are flagged as anomalous.
//!
//! ## Pipeline
//!
//! | Step | Rust module | Description |
//! |------|-------------|-------------|
//! | 0 | [`precompute`] | Build the shared tables: `ln(k!)` cache and stopping thresholds z(s) |
//! | 1 | [`district`] | Mix group preferences by demographic weights into per-box probabilities r |
//! | 2 | [`simulation::engine`] | Sequential test: draw 10^s multinomial samples per stage, stop once hits ≥ z(s) |
//! | 3 | [`scan`] | Fan boxes out over rayon, write `p_values` and `p_values_trials` back per district |
//! | 4 | [`summary`] | Country-wide p-value ranges and flagged districts |
//!
//! ## Sequential stopping
//!
//! The ladder runs n = 10^s samples for s = S_min..=S_max. A stage stops the
//! test when its hit count reaches z(s), the smallest z with
//! `P(Binomial(n, μ) ≤ z−1) ≥ 1−α`. Reaching it means the p-value is above μ
//! with confidence 1−α, so larger stages would add cost without changing the
//! verdict. Boxes that never reach a threshold get the estimate from 10^S_max
//! samples and are marked [`types::StopReason::LadderExhausted`].
//!
//! ## Determinism
//!
//! Box `b` is tested with one xoshiro256++ generator seeded with
//! [`scan::box_seed`]`(seed, b)`. Results depend only on the box data, the
//! configuration and that seed, never on scheduling.

#![allow(clippy::needless_range_loop)]

pub mod config;
pub mod constants;
pub mod district;
pub mod env_config;
pub mod error;
pub mod log_factorial;
pub mod precompute;
pub mod scan;
pub mod simulation;
pub mod storage;
pub mod summary;
pub mod thresholds;
pub mod types;

pub use config::ScanConfig;
pub use error::{PValueError, Result};
pub use precompute::build_scan_context;
pub use scan::{scan_all, scan_district, ScanReport};
pub use simulation::{test_ballot_box, SequentialTester};
pub use thresholds::{threshold_for_n, ThresholdTable};
pub use types::{ScanContext, StopReason, TestResult};
