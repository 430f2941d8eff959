//! Core data structures: run context and per-box test results.
//!
//! The central type is [`ScanContext`], which holds the two precomputed
//! tables (stopping thresholds and log-factorials) together with the run
//! configuration. It is built once by [`crate::precompute::build_scan_context`]
//! and then shared immutably across the rayon workers that test ballot boxes.

use serde::{Deserialize, Serialize};

use crate::config::ScanConfig;
use crate::log_factorial::LogFactorialCache;
use crate::thresholds::ThresholdTable;

/// Why the sampling ladder stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// `hits ≥ z(s)` at some stage: the p-value is confidently above μ.
    ThresholdReached,
    /// No stage reached its threshold; the estimate comes from the largest n
    /// and is a low-confidence result.
    LadderExhausted,
}

/// Outcome of one sequential test on one ballot box.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    /// `hits / samples` at the stage where the ladder stopped.
    pub p_value: f64,
    /// Sampling exponent s of the final stage (samples = 10^s).
    pub exponent: u32,
    /// Samples at least as unlikely as the observation.
    pub hits: u64,
    /// Samples drawn in the final stage.
    pub samples: u64,
    pub stop: StopReason,
}

impl TestResult {
    /// True when the ladder ran out before the stopping threshold was met.
    pub fn is_low_confidence(&self) -> bool {
        self.stop == StopReason::LadderExhausted
    }
}

/// Everything a ballot-box test needs that is shared across a run.
pub struct ScanContext {
    pub config: ScanConfig,
    pub thresholds: ThresholdTable,
    pub lgac: LogFactorialCache,
}
