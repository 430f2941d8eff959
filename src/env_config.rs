//! Shared environment setup for the binaries.
//!
//! Consolidates `PVALUE_BASE_PATH`, `RAYON_NUM_THREADS` and `RUST_LOG`
//! handling shared by `pvalue-scan` and `pvalue-summary`.

use std::path::PathBuf;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::{PValueError, Result};

/// Install the fmt subscriber; `RUST_LOG` wins over `default_level`.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // A second call (e.g. from tests) leaves the first subscriber in place.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Read `PVALUE_BASE_PATH` (default `"."`) and chdir into it.
pub fn init_base_path() -> Result<PathBuf> {
    let base_path = std::env::var("PVALUE_BASE_PATH").unwrap_or_else(|_| ".".to_string());
    let path = PathBuf::from(&base_path);
    std::env::set_current_dir(&path).map_err(|e| PValueError::io(&path, e))?;
    if let Ok(cwd) = std::env::current_dir() {
        info!("Working directory: {}", cwd.display());
    }
    Ok(path)
}

/// Thread count from `RAYON_NUM_THREADS` (fallback `OMP_NUM_THREADS`), if set.
fn requested_threads() -> Option<usize> {
    std::env::var("RAYON_NUM_THREADS")
        .or_else(|_| std::env::var("OMP_NUM_THREADS"))
        .ok()
        .and_then(|s| s.parse().ok())
}

/// Build the rayon global pool, tolerating an already-initialized pool.
/// `override_threads` (from the command line) wins over the environment.
/// Returns the thread count in use.
pub fn init_rayon_threads(override_threads: Option<usize>) -> usize {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = override_threads.or_else(requested_threads) {
        builder = builder.num_threads(n);
    }
    builder.build_global().ok(); // May fail if already initialized
    let num_threads = rayon::current_num_threads();
    info!("Rayon threads: {}", num_threads);
    num_threads
}
