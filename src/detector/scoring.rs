//! Anomaly scoring and threshold selection
//!
//! The anomaly score of a vector is its Euclidean distance to the nearest
//! reference (core) point. Scores are computed densely against every reference
//! point; any nearest-neighbor index returning the same minimum can replace it.

use super::{DetectorError, Result};
use crate::dataset::N_FEATURES;
use serde::{Deserialize, Serialize};

/// Feature vector in [`crate::dataset::FEATURE_COLUMNS`] order
pub type FeatureVector = [f64; N_FEATURES];

fn squared_distance(a: &FeatureVector, b: &FeatureVector) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Minimum Euclidean distance from `x` to any reference point.
///
/// An empty reference set yields `f64::INFINITY`.
pub fn anomaly_score(x: &FeatureVector, reference: &[FeatureVector]) -> f64 {
    reference
        .iter()
        .map(|r| squared_distance(x, r))
        .fold(f64::INFINITY, f64::min)
        .sqrt()
}

/// Anomaly scores for every query row
pub fn anomaly_scores(queries: &[FeatureVector], reference: &[FeatureVector]) -> Vec<f64> {
    queries.iter().map(|x| anomaly_score(x, reference)).collect()
}

/// Percentile with linear interpolation between closest ranks.
///
/// `index = p / 100 * (n - 1)`; returns `None` for empty input.
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let index = (p / 100.0) * (sorted.len() - 1) as f64;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;

    if lower == upper {
        Some(sorted[lower])
    } else {
        let weight = index - lower as f64;
        Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
    }
}

/// Which rule produced the threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ThresholdPolicy {
    /// Percentile of the jam-labeled training scores
    JamPercentile { percentile: f64, jam_rows: usize },
    /// Percentile of all training scores; used when training has no jams
    FallbackPercentile { percentile: f64, rows: usize },
}

impl ThresholdPolicy {
    pub fn describe(&self) -> String {
        match self {
            ThresholdPolicy::JamPercentile {
                percentile,
                jam_rows,
            } => format!(
                "{}th percentile of {} jam training scores",
                percentile, jam_rows
            ),
            ThresholdPolicy::FallbackPercentile { percentile, rows } => format!(
                "{}th percentile of all {} training scores (no jam rows in training)",
                percentile, rows
            ),
        }
    }
}

/// Selected distance threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threshold {
    pub value: f64,
    pub policy: ThresholdPolicy,
}

/// Choose the distance threshold from training scores.
///
/// With at least one jam row the threshold is `jam_percentile` of the jam rows'
/// scores; otherwise `fallback_percentile` of every training score. The policy
/// is a heuristic and both percentiles are applied as given.
pub fn select_threshold(
    train_scores: &[f64],
    train_labels: &[bool],
    jam_percentile: f64,
    fallback_percentile: f64,
) -> Result<Threshold> {
    let jam_scores: Vec<f64> = train_scores
        .iter()
        .zip(train_labels)
        .filter(|&(_, &is_jam)| is_jam)
        .map(|(&s, _)| s)
        .collect();

    if let Some(value) = percentile(&jam_scores, jam_percentile) {
        return Ok(Threshold {
            value,
            policy: ThresholdPolicy::JamPercentile {
                percentile: jam_percentile,
                jam_rows: jam_scores.len(),
            },
        });
    }

    tracing::warn!(
        percentile = fallback_percentile,
        "No jam rows in training partition; using fallback threshold"
    );

    let value = percentile(train_scores, fallback_percentile).ok_or(
        DetectorError::InsufficientData {
            required: 1,
            actual: 0,
        },
    )?;

    Ok(Threshold {
        value,
        policy: ThresholdPolicy::FallbackPercentile {
            percentile: fallback_percentile,
            rows: train_scores.len(),
        },
    })
}
