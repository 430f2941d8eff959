//! Run configuration.
//!
//! [`ScanConfig`] carries the tuning parameters of a scan: the sampling
//! ladder bounds, the confidence exponents, the base seed, the log-factorial
//! cache bound and the directory of district records. Defaults come from
//! [`crate::constants`]; they can be overridden from a JSON file, from
//! `PVALUE_*` environment variables, or by the binaries' command-line flags.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::{PValueError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// First sampling stage draws 10^s_min samples.
    pub s_min: u32,
    /// Last sampling stage draws 10^s_max samples.
    pub s_max: u32,
    /// μ = 10^-mu_power.
    pub mu_power: i32,
    /// α = 10^-alpha_power.
    pub alpha_power: i32,
    /// Base seed; box b uses `seed + b + 1`.
    pub seed: u64,
    /// Log-factorial cache covers boxes with up to this many ballots.
    pub lgac_max: usize,
    /// Directory with one `<district>.json` per district.
    pub results_dir: PathBuf,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            s_min: DEFAULT_S_MIN,
            s_max: DEFAULT_S_MAX,
            mu_power: DEFAULT_MU_POWER,
            alpha_power: DEFAULT_ALPHA_POWER,
            seed: DEFAULT_SEED,
            lgac_max: DEFAULT_LGAC_MAX,
            results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
        }
    }
}

impl ScanConfig {
    /// μ as a probability.
    pub fn mu(&self) -> f64 {
        10f64.powi(-self.mu_power)
    }

    /// α as a probability.
    pub fn alpha(&self) -> f64 {
        10f64.powi(-self.alpha_power)
    }

    pub fn validate(&self) -> Result<()> {
        if self.s_min > self.s_max {
            return Err(invalid("s_min", "must not exceed s_max"));
        }
        if self.s_max > MAX_EXPONENT {
            return Err(invalid(
                "s_max",
                format!("must be at most {MAX_EXPONENT}"),
            ));
        }
        if self.mu_power <= 0 {
            return Err(invalid("mu_power", "must be > 0 so that μ < 1"));
        }
        if self.alpha_power <= 0 {
            return Err(invalid("alpha_power", "must be > 0 so that α < 1"));
        }
        // 1 − α must stay distinguishable from 1, or every z(s) falls back to n.
        if 1.0 - self.alpha() == 1.0 {
            return Err(invalid(
                "alpha_power",
                format!("1 - 1e-{} rounds to 1 in f64", self.alpha_power),
            ));
        }
        if self.lgac_max == 0 {
            return Err(invalid("lgac_max", "must be > 0"));
        }
        Ok(())
    }

    /// Load from a JSON file; missing fields keep their defaults.
    pub fn from_json(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| PValueError::io(path, e))?;
        let cfg: ScanConfig = serde_json::from_str(&contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Defaults overridden by any `PVALUE_*` variables that are set.
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();
        cfg.apply_env(|key| std::env::var(key).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply overrides from a key lookup (the environment in production).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("PVALUE_S_MIN") {
            self.s_min = parse_var("PVALUE_S_MIN", &v)?;
        }
        if let Some(v) = lookup("PVALUE_S_MAX") {
            self.s_max = parse_var("PVALUE_S_MAX", &v)?;
        }
        if let Some(v) = lookup("PVALUE_MU_POWER") {
            self.mu_power = parse_var("PVALUE_MU_POWER", &v)?;
        }
        if let Some(v) = lookup("PVALUE_ALPHA_POWER") {
            self.alpha_power = parse_var("PVALUE_ALPHA_POWER", &v)?;
        }
        if let Some(v) = lookup("PVALUE_SEED") {
            self.seed = parse_var("PVALUE_SEED", &v)?;
        }
        if let Some(v) = lookup("PVALUE_LGAC_MAX") {
            self.lgac_max = parse_var("PVALUE_LGAC_MAX", &v)?;
        }
        if let Some(v) = lookup("PVALUE_RESULTS_DIR") {
            self.results_dir = PathBuf::from(v);
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: impl std::fmt::Display) -> PValueError {
    PValueError::InvalidConfig(format!("{field}: {reason}"))
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(key, format!("cannot parse {value:?}")))
}
