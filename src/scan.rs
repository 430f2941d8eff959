//! Ballot-box scan: test every box of every district and persist the p-values.
//!
//! Each district is handled independently:
//!
//! 1. derive the per-box probability vectors from `W_agg` and `prob`;
//! 2. fan the boxes out over the rayon pool, box `b` seeded with
//!    [`box_seed`]`(base_seed, b)`, results collected in box order;
//! 3. write the augmented record back atomically.
//!
//! A box that violates a precondition gets an undefined (`null`) p-value and a
//! warning; it never aborts the rest of the district. A district that cannot
//! be read is skipped and reported; it never aborts the run.

use std::path::Path;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::district::DistrictRecord;
use crate::error::{PValueError, Result};
use crate::simulation::SequentialTester;
use crate::storage::{discover_districts, load_district, save_district};
use crate::types::{ScanContext, StopReason, TestResult};

/// Seed for ballot box `b`: `base_seed + b + 1` (wrapping).
///
/// Depends only on the box index and the base seed, so results are the same
/// whatever order the boxes are processed in.
#[inline(always)]
pub fn box_seed(base_seed: u64, b: usize) -> u64 {
    base_seed.wrapping_add(b as u64).wrapping_add(1)
}

/// Per-box outcomes of one district, in box order. `None` marks a box whose
/// test could not run.
pub struct DistrictScan {
    pub results: Vec<Option<TestResult>>,
    pub elapsed: Duration,
}

impl DistrictScan {
    /// `p_values` column: p-value per box, `None` for undefined boxes.
    pub fn p_values(&self) -> Vec<Option<f64>> {
        self.results.iter().map(|r| r.map(|t| t.p_value)).collect()
    }

    /// `p_values_trials` column: sampling exponent per box.
    pub fn trials(&self) -> Vec<Option<u32>> {
        self.results.iter().map(|r| r.map(|t| t.exponent)).collect()
    }

    pub fn summary(&self, name: &str) -> DistrictScanSummary {
        let mut s = DistrictScanSummary {
            district: name.to_string(),
            ballot_boxes: self.results.len(),
            early_stops: 0,
            ladder_exhausted: 0,
            undefined: 0,
            elapsed_ms: self.elapsed.as_secs_f64() * 1000.0,
        };
        for r in &self.results {
            match r.map(|t| t.stop) {
                Some(StopReason::ThresholdReached) => s.early_stops += 1,
                Some(StopReason::LadderExhausted) => s.ladder_exhausted += 1,
                None => s.undefined += 1,
            }
        }
        s
    }
}

/// Test every ballot box of `district`.
///
/// `district` must already have passed [`DistrictRecord::validate`].
pub fn scan_district(ctx: &ScanContext, name: &str, district: &DistrictRecord) -> Result<DistrictScan> {
    let start = Instant::now();
    let tester = SequentialTester::new(&ctx.thresholds, &ctx.lgac, ctx.config.s_min, ctx.config.s_max)?;
    let base_seed = ctx.config.seed;

    let results: Vec<Option<TestResult>> = (0..district.num_ballot_boxes())
        .into_par_iter()
        .map(|b| {
            let outcome = district
                .box_probabilities(b)
                .and_then(|r| tester.test(&district.x[b], &r, box_seed(base_seed, b)));
            match outcome {
                Ok(result) => Some(result),
                Err(e) => {
                    warn!(district = name, ballot_box = b, "undefined p-value: {e}");
                    None
                }
            }
        })
        .collect();

    Ok(DistrictScan {
        results,
        elapsed: start.elapsed(),
    })
}

/// Copy of `district` with the scan's `p_values` and `p_values_trials` set.
pub fn augment_district(district: &DistrictRecord, scan: &DistrictScan) -> DistrictRecord {
    let mut out = district.clone();
    out.p_values = Some(scan.p_values());
    out.p_values_trials = Some(scan.trials());
    out
}

/// Load, scan and write back one district.
pub fn process_district(ctx: &ScanContext, dir: &Path, name: &str) -> Result<DistrictScanSummary> {
    let district = load_district(dir, name)?;
    let scan = scan_district(ctx, name, &district)?;
    save_district(dir, name, &augment_district(&district, &scan))?;

    let summary = scan.summary(name);
    info!(
        "{:<30} boxes={:<5} early={:<5} exhausted={:<4} undefined={:<4} {:>9.1} ms",
        name,
        summary.ballot_boxes,
        summary.early_stops,
        summary.ladder_exhausted,
        summary.undefined,
        summary.elapsed_ms
    );
    if summary.ladder_exhausted > 0 {
        warn!(
            district = name,
            boxes = summary.ladder_exhausted,
            "sampling ladder exhausted, low-confidence p-values"
        );
    }
    Ok(summary)
}

#[derive(Debug, Clone, Serialize)]
pub struct DistrictScanSummary {
    pub district: String,
    pub ballot_boxes: usize,
    pub early_stops: usize,
    pub ladder_exhausted: usize,
    pub undefined: usize,
    pub elapsed_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedDistrict {
    pub district: String,
    pub reason: String,
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    pub scanned: Vec<DistrictScanSummary>,
    pub skipped: Vec<SkippedDistrict>,
}

impl ScanReport {
    pub fn total_boxes(&self) -> usize {
        self.scanned.iter().map(|s| s.ballot_boxes).sum()
    }

    pub fn total_undefined(&self) -> usize {
        self.scanned.iter().map(|s| s.undefined).sum()
    }

    pub fn total_exhausted(&self) -> usize {
        self.scanned.iter().map(|s| s.ladder_exhausted).sum()
    }
}

/// Scan the districts in `names`, or every district in `dir` when empty.
///
/// Districts run one after another; boxes within a district run in parallel.
pub fn scan_all(ctx: &ScanContext, dir: &Path, names: &[String]) -> Result<ScanReport> {
    let names = if names.is_empty() {
        discover_districts(dir)?
    } else {
        names.to_vec()
    };
    info!("Scanning {} districts in {}", names.len(), dir.display());

    let mut report = ScanReport::default();
    for name in &names {
        match process_district(ctx, dir, name) {
            Ok(summary) => report.scanned.push(summary),
            // These would fail every district the same way.
            Err(e @ (PValueError::ExponentOutOfTable { .. } | PValueError::InvalidConfig(_))) => {
                return Err(e)
            }
            Err(e) => {
                error!(district = name.as_str(), "skipping district: {e}");
                report.skipped.push(SkippedDistrict {
                    district: name.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        "Scanned {} districts ({} ballot boxes, {} exhausted, {} undefined), skipped {}",
        report.scanned.len(),
        report.total_boxes(),
        report.total_exhausted(),
        report.total_undefined(),
        report.skipped.len()
    );
    Ok(report)
}
