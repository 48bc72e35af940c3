//! DBSCAN phantom-jam detector
//!
//! Training flow:
//!
//! 1. Stratified 80/20 split on the jam label
//! 2. StandardScaler fitted on the training partition only
//! 3. DBSCAN on the scaled *normal* training rows; its core points become the
//!    reference set describing normal traffic
//! 4. Anomaly score = distance to the nearest reference point
//! 5. Threshold from the training scores (jam percentile, or fallback
//!    percentile when training holds no jams)
//! 6. Held-out rows classified as jam when their score exceeds the threshold

mod metrics;
mod model;
mod pipeline;
mod report;
mod scoring;

pub use metrics::ConfusionMatrix;
pub use model::{FittedDetector, Prediction, ScalerParams};
pub use pipeline::{
    cluster_labels, core_point_indices, fit_reference_set, fit_scaler, ClusterSummary, NOISE,
};
pub use report::{PartitionSizes, TrainingReport};
pub use scoring::{
    anomaly_score, anomaly_scores, percentile, select_threshold, FeatureVector, Threshold,
    ThresholdPolicy,
};

use crate::config::DetectorConfig;
use crate::dataset::TrafficSample;
use crate::split::{stratified_split, SplitError};
use thiserror::Error;

/// Errors for training the detector
#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("Split failed: {0}")]
    Split(#[from] SplitError),

    #[error("Insufficient data: need at least {required} samples, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Preprocessing failed: {0}")]
    Preprocessing(String),

    #[error("Empty reference set: {0}")]
    EmptyReferenceSet(String),
}

pub type Result<T> = std::result::Result<T, DetectorError>;

/// Fitted detector plus its evaluation
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub detector: FittedDetector,
    pub report: TrainingReport,
}

/// Train and evaluate the detector on a labeled dataset
pub fn train(samples: &[TrafficSample], config: &DetectorConfig) -> Result<TrainingOutcome> {
    let labels: Vec<bool> = samples.iter().map(TrafficSample::is_jam).collect();
    let split = stratified_split(&labels, config.test_fraction, config.seed)?;

    let gather = |indices: &[usize]| -> (Vec<FeatureVector>, Vec<bool>) {
        indices
            .iter()
            .map(|&i| (samples[i].features(), labels[i]))
            .unzip()
    };
    let (train_x, train_y) = gather(&split.train);
    let (test_x, test_y) = gather(&split.test);

    let scaler = fit_scaler(&train_x)?;
    let train_scaled = scaler.transform(&train_x);
    let test_scaled = scaler.transform(&test_x);

    let normal_train: Vec<FeatureVector> = train_scaled
        .iter()
        .zip(&train_y)
        .filter(|&(_, &is_jam)| !is_jam)
        .map(|(&x, _)| x)
        .collect();
    let (reference_points, clusters) =
        fit_reference_set(&normal_train, config.eps, config.min_samples)?;

    let train_scores = anomaly_scores(&train_scaled, &reference_points);
    let threshold = select_threshold(
        &train_scores,
        &train_y,
        config.jam_percentile,
        config.fallback_percentile,
    )?;
    tracing::info!(
        threshold = threshold.value,
        policy = %threshold.policy.describe(),
        "Selected distance threshold"
    );

    let detector = FittedDetector {
        scaler,
        reference_points,
        threshold: threshold.value,
    };

    let predicted: Vec<bool> = anomaly_scores(&test_scaled, &detector.reference_points)
        .into_iter()
        .map(|score| detector.classify_score(score))
        .collect();
    let confusion = ConfusionMatrix::from_predictions(&test_y, &predicted);

    let count_jams = |ys: &[bool]| ys.iter().filter(|&&y| y).count();
    let report = TrainingReport {
        threshold,
        confusion,
        clusters,
        partitions: PartitionSizes {
            train_rows: train_y.len(),
            train_jams: count_jams(&train_y),
            test_rows: test_y.len(),
            test_jams: count_jams(&test_y),
        },
    };

    Ok(TrainingOutcome { detector, report })
}

#[cfg(test)]
mod tests;
