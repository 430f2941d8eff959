//! Build the shared, read-only tables for a run.
//!
//! [`build_scan_context`] runs the precomputation steps in order:
//!
//! 1. **Log-factorials**: `ln(k!)` for `k = 0..=lgac_max`
//! 2. **Stopping thresholds**: z(s) for every exponent of the sampling ladder
//!
//! Both are built once and then shared by reference across every ballot box
//! of every district.

use std::time::Instant;

use tracing::info;

use crate::config::ScanConfig;
use crate::error::Result;
use crate::log_factorial::LogFactorialCache;
use crate::thresholds::ThresholdTable;
use crate::types::ScanContext;

/// Validate `config` and build the run's tables.
pub fn build_scan_context(config: ScanConfig) -> Result<ScanContext> {
    config.validate()?;
    let start = Instant::now();

    macro_rules! timed {
        ($label:expr, $body:expr) => {{
            let t0 = Instant::now();
            let value = $body;
            let dt = t0.elapsed().as_secs_f64() * 1000.0;
            info!("  {:<36} {:>8.3} ms", $label, dt);
            value
        }};
    }

    let lgac = timed!("Log-factorial cache", LogFactorialCache::new(config.lgac_max));
    let thresholds = timed!(
        "Stopping thresholds",
        ThresholdTable::from_powers(config.s_min, config.s_max, config.mu_power, config.alpha_power)?
    );

    for (s, z) in thresholds.iter() {
        info!("  z({s}) = {z:<6} n = 10^{s}");
    }
    info!(
        "Tables ready in {:.3} ms (μ = {:e}, α = {:e})",
        start.elapsed().as_secs_f64() * 1000.0,
        thresholds.mu(),
        thresholds.alpha()
    );

    Ok(ScanContext {
        config,
        thresholds,
        lgac,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_matches_config() {
        let config = ScanConfig {
            s_min: 2,
            s_max: 4,
            lgac_max: 50,
            ..ScanConfig::default()
        };
        let ctx = build_scan_context(config).unwrap();
        assert_eq!(ctx.lgac.max(), 50);
        assert_eq!(ctx.thresholds.exponents(), 2..=4);
        assert_eq!(ctx.config.s_min, 2);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ScanConfig {
            s_min: 5,
            s_max: 3,
            ..ScanConfig::default()
        };
        assert!(build_scan_context(config).is_err());
    }
}
