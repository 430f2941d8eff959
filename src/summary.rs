//! Country-wide summary of scanned p-values.
//!
//! Two views over every district that carries `p_values`:
//!
//! - **Ranges**: how many ballot boxes have p ≤ 10^-k, for k = 0..=7.
//! - **Flagged districts**: districts with at least one box at
//!   p ≤ 10^-flag_power, with their smallest p-value and age macro-groups.

use std::fmt::Write as _;
use std::path::Path;

use serde::Serialize;
use tracing::{error, warn};

use crate::constants::SUMMARY_MAX_POWER;
use crate::district::DistrictRecord;
use crate::error::Result;
use crate::storage::{discover_districts, load_district};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PValueRange {
    /// Row for p ≤ 10^-power.
    pub power: i32,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlaggedDistrict {
    pub district: String,
    pub flagged_boxes: usize,
    pub min_p_value: f64,
    pub group_labels: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PValueSummary {
    pub districts: usize,
    /// Boxes with a defined p-value.
    pub ballot_boxes: usize,
    /// Boxes whose test could not run.
    pub undefined: usize,
    pub ranges: Vec<PValueRange>,
    pub flag_power: i32,
    pub flagged: Vec<FlaggedDistrict>,
}

/// Aggregate `(name, record)` pairs; records without `p_values` are ignored.
pub fn summarize<'a, I>(districts: I, flag_power: i32) -> PValueSummary
where
    I: IntoIterator<Item = (&'a str, &'a DistrictRecord)>,
{
    let cuts: Vec<f64> = (0..=SUMMARY_MAX_POWER).map(|k| 10f64.powi(-k)).collect();
    let flag_cut = 10f64.powi(-flag_power);

    let mut counts = vec![0usize; cuts.len()];
    let mut num_districts = 0usize;
    let mut defined = 0usize;
    let mut undefined = 0usize;
    let mut flagged = Vec::new();

    for (name, record) in districts {
        let Some(p_values) = record.p_values.as_ref() else {
            continue;
        };
        num_districts += 1;

        let mut flagged_boxes = 0usize;
        let mut min_p = f64::INFINITY;
        for p in p_values {
            let Some(p) = *p else {
                undefined += 1;
                continue;
            };
            defined += 1;
            for (count, &cut) in counts.iter_mut().zip(&cuts) {
                if p <= cut {
                    *count += 1;
                }
            }
            if p <= flag_cut {
                flagged_boxes += 1;
            }
            min_p = min_p.min(p);
        }

        if flagged_boxes > 0 {
            flagged.push(FlaggedDistrict {
                district: name.to_string(),
                flagged_boxes,
                min_p_value: min_p,
                group_labels: record.group_labels(),
            });
        }
    }

    let ranges = counts
        .into_iter()
        .enumerate()
        .map(|(k, count)| PValueRange {
            power: k as i32,
            count,
            percentage: if defined > 0 {
                100.0 * count as f64 / defined as f64
            } else {
                0.0
            },
        })
        .collect();

    flagged.sort_by(|a, b| {
        a.min_p_value
            .total_cmp(&b.min_p_value)
            .then_with(|| a.district.cmp(&b.district))
    });

    PValueSummary {
        districts: num_districts,
        ballot_boxes: defined,
        undefined,
        ranges,
        flag_power,
        flagged,
    }
}

/// Read every district in `dir` and summarize the scanned ones.
pub fn load_summary(dir: &Path, flag_power: i32) -> Result<PValueSummary> {
    let mut records = Vec::new();
    for name in discover_districts(dir)? {
        match load_district(dir, &name) {
            Ok(record) if record.p_values.is_none() => {
                warn!(district = name.as_str(), "no p-values yet, not scanned");
            }
            Ok(record) => records.push((name, record)),
            Err(e) => error!(district = name.as_str(), "skipping district: {e}"),
        }
    }
    Ok(summarize(
        records.iter().map(|(n, r)| (n.as_str(), r)),
        flag_power,
    ))
}

/// Plain-text rendering of the summary.
pub fn format_summary(summary: &PValueSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} districts, {} ballot boxes ({} undefined)",
        summary.districts, summary.ballot_boxes, summary.undefined
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "{:<14} {:>10} {:>11}", "p-value range", "boxes", "percentage");
    for r in &summary.ranges {
        let _ = writeln!(
            out,
            "{:<14} {:>10} {:>10.2}%",
            format!("<= 1e-{}", r.power),
            r.count,
            r.percentage
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{} districts with boxes at p <= 1e-{}",
        summary.flagged.len(),
        summary.flag_power
    );
    for f in &summary.flagged {
        let groups = f
            .group_labels
            .as_ref()
            .map(|g| g.join(", "))
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "  {:<30} boxes={:<4} min_p={:<10.3e} groups=[{}]",
            f.district, f.flagged_boxes, f.min_p_value, groups
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(p_values: serde_json::Value) -> DistrictRecord {
        serde_json::from_value(json!({
            "X": [],
            "W_agg": [],
            "prob": [[1.0]],
            "group_agg": [3, 8],
            "p_values": p_values
        }))
        .unwrap()
    }

    #[test]
    fn test_range_counts() {
        let a = record(json!([1.0, 0.05, 0.0, null]));
        let b = record(json!([0.5, 1e-9]));
        let s = summarize([("a", &a), ("b", &b)], 8);

        assert_eq!(s.districts, 2);
        assert_eq!(s.ballot_boxes, 5);
        assert_eq!(s.undefined, 1);
        assert_eq!(s.ranges.len(), 8);
        assert_eq!(s.ranges[0].count, 5);
        assert!((s.ranges[0].percentage - 100.0).abs() < 1e-12);
        // 0.05, 0.0, 1e-9 are ≤ 0.1
        assert_eq!(s.ranges[1].count, 3);
        // 0.0 and 1e-9 all the way down
        assert_eq!(s.ranges[7].count, 2);
        assert!((s.ranges[7].percentage - 40.0).abs() < 1e-12);
    }

    #[test]
    fn test_flagged_sorted_by_min_p() {
        let a = record(json!([0.3, 1e-9]));
        let b = record(json!([0.0, 0.0, 0.9]));
        let c = record(json!([0.2]));
        let s = summarize([("a", &a), ("b", &b), ("c", &c)], 8);
        assert_eq!(s.flagged.len(), 2);
        assert_eq!(s.flagged[0].district, "b");
        assert_eq!(s.flagged[0].flagged_boxes, 2);
        assert_eq!(s.flagged[0].min_p_value, 0.0);
        assert_eq!(s.flagged[1].district, "a");
        assert_eq!(
            s.flagged[1].group_labels,
            Some(vec!["18-39".to_string(), "40+".to_string()])
        );
    }

    #[test]
    fn test_unscanned_districts_ignored() {
        let mut a = record(json!([0.5]));
        a.p_values = None;
        let s = summarize([("a", &a)], 8);
        assert_eq!(s.districts, 0);
        assert_eq!(s.ballot_boxes, 0);
        assert!(s.ranges.iter().all(|r| r.percentage == 0.0));
    }

    #[test]
    fn test_format_mentions_flagged() {
        let a = record(json!([1e-10]));
        let text = format_summary(&summarize([("north", &a)], 8));
        assert!(text.contains("<= 1e-7"), "{text}");
        assert!(text.contains("north"), "{text}");
        assert!(text.contains("18-39, 40+"), "{text}");
    }
}
