//! Error types for the p-value engine.
//!
//! Errors are split by the granularity at which the scan recovers from them:
//!
//! ```text
//! PValueError
//! ├── contract violations   (one ballot box becomes undefined)
//! ├── district data errors  (one district is skipped)
//! ├── configuration errors  (the run does not start)
//! └── I/O and JSON errors   (reported with the district they belong to)
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, PValueError>;

#[derive(Debug, Error)]
pub enum PValueError {
    // ── Ballot-box contract violations ──────────────────────────────
    #[error("observed counts have {counts} entries but the probability vector has {probs}")]
    LengthMismatch { counts: usize, probs: usize },

    #[error("ballot box has no candidates")]
    NoCandidates,

    #[error("ballot box has zero total votes")]
    ZeroTotal,

    #[error("total of {total} votes exceeds the log-factorial cache bound {max}")]
    CountExceedsCache { total: u64, max: usize },

    #[error("probability entry {index} is {value}, expected a finite non-negative number")]
    InvalidProbability { index: usize, value: f64 },

    #[error("probability vector sums to {sum}, expected 1")]
    ProbabilitySum { sum: f64 },

    #[error("ballot box has zero total demographic weight")]
    ZeroWeight,

    #[error("multinomial sampling failed: {0}")]
    Sampling(String),

    // ── District data errors ────────────────────────────────────────
    #[error("district {name} not found at {path:?}")]
    DistrictNotFound { name: String, path: PathBuf },

    #[error("district {name} is malformed: {reason}")]
    MalformedDistrict { name: String, reason: String },

    // ── Configuration ───────────────────────────────────────────────
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("sampling exponent {exponent} is not covered by the threshold table ({min}..={max})")]
    ExponentOutOfTable { exponent: u32, min: u32, max: u32 },

    // ── I/O ─────────────────────────────────────────────────────────
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PValueError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PValueError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error only invalidates a single ballot box.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            PValueError::LengthMismatch { .. }
                | PValueError::NoCandidates
                | PValueError::ZeroTotal
                | PValueError::CountExceedsCache { .. }
                | PValueError::InvalidProbability { .. }
                | PValueError::ProbabilitySum { .. }
                | PValueError::ZeroWeight
                | PValueError::Sampling(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_violation_classification() {
        assert!(PValueError::ZeroTotal.is_contract_violation());
        assert!(PValueError::CountExceedsCache { total: 2000, max: 1000 }.is_contract_violation());
        assert!(!PValueError::InvalidConfig("x".into()).is_contract_violation());
        // A ladder outside the table fails every box alike.
        assert!(!PValueError::ExponentOutOfTable { exponent: 9, min: 3, max: 8 }
            .is_contract_violation());
        assert!(!PValueError::MalformedDistrict {
            name: "a".into(),
            reason: "b".into()
        }
        .is_contract_violation());
    }

    #[test]
    fn test_display_mentions_values() {
        let msg = PValueError::ProbabilitySum { sum: 0.5 }.to_string();
        assert!(msg.contains("0.5"), "{msg}");
    }
}
