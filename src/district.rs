//! Per-district records and the per-box probability vectors derived from them.
//!
//! A district record is a JSON document produced upstream:
//!
//! | Key               | Shape | Meaning                                          |
//! |-------------------|-------|--------------------------------------------------|
//! | `X`               | B×C   | observed votes per ballot box and candidate      |
//! | `W_agg`           | B×G   | voters per ballot box and demographic group      |
//! | `prob`            | G×C   | estimated vote probabilities per group           |
//! | `group_agg`       | G     | upper bounds of the age macro-groups             |
//! | `p_values`        | B     | written by the scan (`null` for undefined boxes) |
//! | `p_values_trials` | B     | sampling exponent used per box                   |
//!
//! Any other key is carried through unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::{AGE_RANGES_FROM, AGE_RANGES_TO};
use crate::error::{PValueError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictRecord {
    #[serde(rename = "X")]
    pub x: Vec<Vec<u32>>,
    #[serde(rename = "W_agg")]
    pub w_agg: Vec<Vec<f64>>,
    pub prob: Vec<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub group_agg: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p_values: Option<Vec<Option<f64>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p_values_trials: Option<Vec<Option<u32>>>,
}

impl DistrictRecord {
    /// Number of ballot boxes (B).
    pub fn num_ballot_boxes(&self) -> usize {
        self.x.len()
    }

    /// Number of demographic groups (G).
    pub fn num_groups(&self) -> usize {
        self.prob.len()
    }

    /// Number of candidates (C).
    pub fn num_candidates(&self) -> usize {
        self.prob.first().map_or(0, Vec::len)
    }

    /// Check that B, G and C agree across `X`, `W_agg` and `prob`.
    pub fn validate(&self, name: &str) -> Result<()> {
        let malformed = |reason: String| PValueError::MalformedDistrict {
            name: name.to_string(),
            reason,
        };

        let b = self.num_ballot_boxes();
        let g = self.num_groups();
        let c = self.num_candidates();
        if g == 0 || c == 0 {
            return Err(malformed(format!("prob is {g}×{c}, expected non-empty")));
        }
        if self.w_agg.len() != b {
            return Err(malformed(format!(
                "X has {b} ballot boxes but W_agg has {}",
                self.w_agg.len()
            )));
        }
        if let Some((i, row)) = self.prob.iter().enumerate().find(|(_, row)| row.len() != c) {
            return Err(malformed(format!(
                "prob row {i} has {} candidates, expected {c}",
                row.len()
            )));
        }
        if let Some((i, row)) = self.x.iter().enumerate().find(|(_, row)| row.len() != c) {
            return Err(malformed(format!(
                "X row {i} has {} candidates, expected {c}",
                row.len()
            )));
        }
        if let Some((i, row)) = self.w_agg.iter().enumerate().find(|(_, row)| row.len() != g) {
            return Err(malformed(format!(
                "W_agg row {i} has {} groups, expected {g}",
                row.len()
            )));
        }
        let bad_value = |v: &f64| !v.is_finite() || *v < 0.0;
        if self.prob.iter().flatten().any(bad_value) {
            return Err(malformed("prob holds a negative or non-finite entry".into()));
        }
        if self.w_agg.iter().flatten().any(bad_value) {
            return Err(malformed("W_agg holds a negative or non-finite entry".into()));
        }
        Ok(())
    }

    /// Vote probabilities of ballot box `b`: the group preference vectors
    /// mixed by the box's demographic weights,
    /// `r[c] = Σ_g W_agg[b][g]·prob[g][c] / Σ_g W_agg[b][g]`.
    pub fn box_probabilities(&self, b: usize) -> Result<Vec<f64>> {
        let weights = &self.w_agg[b];
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Err(PValueError::ZeroWeight);
        }
        let mut r = vec![0.0f64; self.num_candidates()];
        for (&w, row) in weights.iter().zip(&self.prob) {
            for (rc, &p) in r.iter_mut().zip(row) {
                *rc += w * p;
            }
        }
        for rc in &mut r {
            *rc /= total;
        }
        Ok(r)
    }

    /// [`box_probabilities`](Self::box_probabilities) for every box, in order.
    pub fn voting_probabilities(&self) -> Vec<Result<Vec<f64>>> {
        (0..self.num_ballot_boxes())
            .map(|b| self.box_probabilities(b))
            .collect()
    }

    /// `group_agg` as integer bounds, if it is an array of whole numbers.
    pub fn group_bounds(&self) -> Option<Vec<usize>> {
        self.group_agg
            .as_array()?
            .iter()
            .map(|v| {
                v.as_u64().map(|u| u as usize).or_else(|| {
                    v.as_f64()
                        .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                        .map(|f| f as usize)
                })
            })
            .collect()
    }

    /// Age labels of the district's macro-groups, e.g. `["18-39", "40-79", "80+"]`.
    pub fn group_labels(&self) -> Option<Vec<String>> {
        macro_group_labels(&self.group_bounds()?)
    }
}

/// Convert cumulative group bounds over the eight base age ranges into labels.
///
/// Each bound is the 1-based index of the last base range in the group:
/// `[3, 7, 8]` → `["18-39", "40-79", "80+"]`. Returns `None` for bounds that
/// are out of range or not increasing.
pub fn macro_group_labels(bounds: &[usize]) -> Option<Vec<String>> {
    let mut labels = Vec::with_capacity(bounds.len());
    let mut from = 0usize;
    for &bound in bounds {
        let to = bound.checked_sub(1)?;
        if to < from || to >= AGE_RANGES_TO.len() {
            return None;
        }
        labels.push(format!("{}{}", AGE_RANGES_FROM[from], AGE_RANGES_TO[to]));
        from = to + 1;
    }
    Some(labels)
}
