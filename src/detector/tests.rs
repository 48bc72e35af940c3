// End-to-end tests for detector training on synthetic traffic

use super::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Normal traffic in three tight regimes plus widely spread, well-separated jams
fn synthetic_traffic(n: usize, jams: usize, seed: u64) -> Vec<TrafficSample> {
    const REGIMES: [(f64, f64, f64); 3] = [(12.0, 90.0, 1.0), (20.0, 70.0, 2.0), (28.0, 55.0, 3.0)];

    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|i| {
            if i < jams {
                TrafficSample {
                    local_car_density: rng.gen_range(40.0..60.0),
                    average_speed_kmph: rng.gen_range(5.0..25.0),
                    brake_events: rng.gen_range(8.0..15.0),
                    phantom_jam_flag: true,
                }
            } else {
                let (density, speed, brakes) = REGIMES[i % REGIMES.len()];
                TrafficSample {
                    local_car_density: density + rng.gen_range(-1.0..1.0),
                    average_speed_kmph: speed + rng.gen_range(-3.0..3.0),
                    brake_events: brakes + rng.gen_range(-0.2..0.2),
                    phantom_jam_flag: false,
                }
            }
        })
        .collect()
}

#[test]
fn test_train_hundred_rows_end_to_end() {
    let samples = synthetic_traffic(100, 10, 1);
    let outcome = train(&samples, &DetectorConfig::default()).unwrap();
    let report = &outcome.report;

    assert_eq!(
        report.partitions,
        PartitionSizes {
            train_rows: 80,
            train_jams: 8,
            test_rows: 20,
            test_jams: 2,
        }
    );
    assert_eq!(report.confusion.total(), 20);
    assert_eq!(
        report.confusion.true_negative + report.confusion.false_positive,
        18
    );
    assert!(matches!(
        report.threshold.policy,
        ThresholdPolicy::JamPercentile { jam_rows: 8, .. }
    ));
    assert_eq!(outcome.detector.threshold, report.threshold.value);
}

#[test]
fn test_train_separated_data_has_no_false_alarms() {
    let samples = synthetic_traffic(100, 10, 2);
    let outcome = train(&samples, &DetectorConfig::default()).unwrap();

    assert_eq!(outcome.report.confusion.false_positive, 0);
    assert!(outcome.report.accuracy() >= 0.9);
}

#[test]
fn test_reference_points_are_normal_training_rows() {
    let samples = synthetic_traffic(100, 10, 3);
    let outcome = train(&samples, &DetectorConfig::default()).unwrap();
    let detector = &outcome.detector;

    assert!(!detector.reference_points.is_empty());
    assert_eq!(
        detector.reference_points.len(),
        outcome.report.clusters.n_core
    );
    // Every core point scores zero against the reference set
    for point in &detector.reference_points {
        assert_eq!(detector.score_scaled(point), 0.0);
    }
    // Jam rows are never part of the reference set, so none maps onto a core point
    for sample in samples.iter().filter(|s| s.is_jam()) {
        assert!(detector.predict(&sample.features()).anomaly_score > 0.0);
    }
}

#[test]
fn test_train_without_jams_uses_fallback() {
    let samples = synthetic_traffic(60, 0, 4);
    let outcome = train(&samples, &DetectorConfig::default()).unwrap();

    assert!(matches!(
        outcome.report.threshold.policy,
        ThresholdPolicy::FallbackPercentile { percentile, rows: 48 } if percentile == 95.0
    ));
    assert_eq!(outcome.report.confusion.true_positive, 0);
    assert_eq!(outcome.report.confusion.false_negative, 0);
    assert_eq!(outcome.report.confusion.total(), 12);
}

#[test]
fn test_training_is_reproducible() {
    let samples = synthetic_traffic(100, 10, 5);
    let config = DetectorConfig::default();

    let a = train(&samples, &config).unwrap();
    let b = train(&samples, &config).unwrap();
    assert_eq!(a.detector, b.detector);
    assert_eq!(a.report.confusion, b.report.confusion);
}

#[test]
fn test_train_all_jams_has_empty_reference_set() {
    let samples = synthetic_traffic(20, 20, 6);
    assert!(matches!(
        train(&samples, &DetectorConfig::default()),
        Err(DetectorError::EmptyReferenceSet(_))
    ));
}

#[test]
fn test_train_single_row_rejected() {
    let samples = synthetic_traffic(1, 0, 7);
    assert!(matches!(
        train(&samples, &DetectorConfig::default()),
        Err(DetectorError::Split(_))
    ));
}

#[test]
fn test_scaler_fitted_on_training_partition_only() {
    let samples = synthetic_traffic(100, 10, 8);
    let config = DetectorConfig::default();
    let outcome = train(&samples, &config).unwrap();

    let labels: Vec<bool> = samples.iter().map(TrafficSample::is_jam).collect();
    let split = stratified_split(&labels, config.test_fraction, config.seed).unwrap();
    let train_rows: Vec<FeatureVector> = split.train.iter().map(|&i| samples[i].features()).collect();
    let all_rows: Vec<FeatureVector> = samples.iter().map(TrafficSample::features).collect();

    assert_eq!(outcome.detector.scaler, fit_scaler(&train_rows).unwrap());
    assert_ne!(outcome.detector.scaler, fit_scaler(&all_rows).unwrap());
}
