//! `pvalue-scan`: test every ballot box of every district and write the
//! p-values back into the district records.
//!
//! # Usage
//!
//! ```bash
//! pvalue-scan --results-dir output/results_districts
//! pvalue-scan --config scan.json --district north --district south
//! pvalue-scan --s-min 3 --s-max 6 --seed 7 --threads 8
//! ```

use std::path::PathBuf;
use std::time::Instant;

use ballot_pvalue::config::ScanConfig;
use ballot_pvalue::env_config::{init_base_path, init_rayon_threads, init_tracing};
use ballot_pvalue::precompute::build_scan_context;
use ballot_pvalue::scan::scan_all;
use clap::Parser;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "pvalue-scan",
    version,
    about = "Adaptive Monte Carlo p-values for every ballot box",
    long_about = None
)]
struct Args {
    /// JSON configuration file. Without it, defaults and `PVALUE_*` variables apply.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory holding one `<district>.json` per district.
    #[arg(long, value_name = "DIR")]
    results_dir: Option<PathBuf>,

    /// Scan only these districts (repeatable). Default: every district.
    #[arg(short, long = "district", value_name = "NAME")]
    districts: Vec<String>,

    /// First sampling stage uses 10^S_MIN samples.
    #[arg(long)]
    s_min: Option<u32>,

    /// Last sampling stage uses 10^S_MAX samples.
    #[arg(long)]
    s_max: Option<u32>,

    /// μ = 10^-MU_POWER.
    #[arg(long)]
    mu_power: Option<i32>,

    /// α = 10^-ALPHA_POWER.
    #[arg(long)]
    alpha_power: Option<i32>,

    /// Base seed; box b uses seed + b + 1.
    #[arg(long)]
    seed: Option<u64>,

    /// Largest ballot total the log-factorial cache covers.
    #[arg(long)]
    lgac_max: Option<usize>,

    /// Worker threads (default: RAYON_NUM_THREADS or all cores).
    #[arg(short = 't', long)]
    threads: Option<usize>,

    /// Change into PVALUE_BASE_PATH before resolving relative paths.
    #[arg(long, default_value_t = false)]
    use_base_path: bool,

    /// Print the run report as JSON on stdout.
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Log level (trace, debug, info, warn, error). RUST_LOG wins when set.
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() {
    let args = Args::parse();
    init_tracing(&args.log_level);

    if args.use_base_path {
        if let Err(e) = init_base_path() {
            error!("Failed to enter base path: {e}");
            std::process::exit(1);
        }
    }

    let loaded = match args.config.as_deref() {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            ScanConfig::from_json(path)
        }
        None => ScanConfig::from_env(),
    };
    let mut config = match loaded {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Some(dir) = args.results_dir {
        config.results_dir = dir;
    }
    if let Some(v) = args.s_min {
        config.s_min = v;
    }
    if let Some(v) = args.s_max {
        config.s_max = v;
    }
    if let Some(v) = args.mu_power {
        config.mu_power = v;
    }
    if let Some(v) = args.alpha_power {
        config.alpha_power = v;
    }
    if let Some(v) = args.seed {
        config.seed = v;
    }
    if let Some(v) = args.lgac_max {
        config.lgac_max = v;
    }

    init_rayon_threads(args.threads);

    info!(
        "Ladder 10^{}..10^{}, μ = 1e-{}, α = 1e-{}, seed = {}",
        config.s_min, config.s_max, config.mu_power, config.alpha_power, config.seed
    );

    let ctx = match build_scan_context(config) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Configuration validation failed: {e}");
            std::process::exit(1);
        }
    };

    let start = Instant::now();
    let dir = ctx.config.results_dir.clone();
    let report = match scan_all(&ctx, &dir, &args.districts) {
        Ok(report) => report,
        Err(e) => {
            error!("Scan failed: {e}");
            std::process::exit(1);
        }
    };
    info!("Total time: {:.2} s", start.elapsed().as_secs_f64());

    for skipped in &report.skipped {
        warn!("Skipped {}: {}", skipped.district, skipped.reason);
    }

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                error!("Failed to serialize report: {e}");
                std::process::exit(1);
            }
        }
    }
}
