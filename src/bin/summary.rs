//! `pvalue-summary`: p-value ranges across all scanned districts, plus the
//! districts holding boxes below the flagging cut.
//!
//! ```bash
//! pvalue-summary --results-dir output/results_districts
//! pvalue-summary --flag-power 6 --json
//! ```

use std::path::PathBuf;

use ballot_pvalue::constants::{DEFAULT_FLAG_POWER, DEFAULT_RESULTS_DIR};
use ballot_pvalue::env_config::init_tracing;
use ballot_pvalue::summary::{format_summary, load_summary};
use clap::Parser;
use tracing::error;

#[derive(Parser, Debug)]
#[command(
    name = "pvalue-summary",
    version,
    about = "Summarize scanned ballot-box p-values",
    long_about = None
)]
struct Args {
    /// Directory holding one `<district>.json` per district.
    #[arg(long, value_name = "DIR", default_value = DEFAULT_RESULTS_DIR)]
    results_dir: PathBuf,

    /// Flag districts with a box at p ≤ 10^-FLAG_POWER.
    #[arg(long, default_value_t = DEFAULT_FLAG_POWER)]
    flag_power: i32,

    /// Print JSON instead of the text table.
    #[arg(long, default_value_t = false)]
    json: bool,

    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let summary = match load_summary(&args.results_dir, args.flag_power) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to read {}: {e}", args.results_dir.display());
            std::process::exit(1);
        }
    };

    if args.json {
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                error!("Failed to serialize summary: {e}");
                std::process::exit(1);
            }
        }
    } else {
        print!("{}", format_summary(&summary));
    }
}
