//! Fitted detector: scaler parameters, reference points, threshold

use super::scoring::{anomaly_score, FeatureVector};
use serde::{Deserialize, Serialize};

/// Standardization fitted on the training partition
///
/// Applying it is a pure affine map: `(x - mean) / scale`, per feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    pub mean: FeatureVector,
    pub scale: FeatureVector,
}

impl ScalerParams {
    pub fn transform_one(&self, x: &FeatureVector) -> FeatureVector {
        std::array::from_fn(|j| (x[j] - self.mean[j]) / self.scale[j])
    }

    pub fn transform(&self, rows: &[FeatureVector]) -> Vec<FeatureVector> {
        rows.iter().map(|x| self.transform_one(x)).collect()
    }
}

/// Score and verdict for one row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub anomaly_score: f64,
    pub is_jam: bool,
}

/// Distance-threshold phantom-jam classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedDetector {
    pub scaler: ScalerParams,
    /// DBSCAN core points of normal traffic, in scaled space
    pub reference_points: Vec<FeatureVector>,
    pub threshold: f64,
}

impl FittedDetector {
    /// Jam iff the score strictly exceeds the threshold
    pub fn classify_score(&self, score: f64) -> bool {
        score > self.threshold
    }

    /// Anomaly score of an already-scaled vector
    pub fn score_scaled(&self, x: &FeatureVector) -> f64 {
        anomaly_score(x, &self.reference_points)
    }

    /// Scale a raw feature vector and classify it
    pub fn predict(&self, raw: &FeatureVector) -> Prediction {
        let score = self.score_scaled(&self.scaler.transform_one(raw));
        Prediction {
            anomaly_score: score,
            is_jam: self.classify_score(score),
        }
    }

    pub fn predict_batch(&self, raws: &[FeatureVector]) -> Vec<Prediction> {
        raws.iter().map(|x| self.predict(x)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::N_FEATURES;

    fn identity_scaler() -> ScalerParams {
        ScalerParams {
            mean: [0.0; N_FEATURES],
            scale: [1.0; N_FEATURES],
        }
    }

    #[test]
    fn test_scaler_is_affine() {
        let scaler = ScalerParams {
            mean: [10.0, 50.0, 2.0],
            scale: [2.0, 10.0, 0.5],
        };
        let out = scaler.transform_one(&[12.0, 30.0, 3.0]);
        assert_eq!(out, [1.0, -2.0, 2.0]);
    }

    #[test]
    fn test_score_equal_to_threshold_is_normal() {
        let detector = FittedDetector {
            scaler: identity_scaler(),
            reference_points: vec![[0.0, 0.0, 0.0]],
            threshold: 5.0,
        };

        // 3-4-0 triangle: distance exactly 5
        let at = detector.predict(&[3.0, 4.0, 0.0]);
        assert_eq!(at.anomaly_score, 5.0);
        assert!(!at.is_jam);

        let beyond = detector.predict(&[3.0, 4.0, 0.1]);
        assert!(beyond.is_jam);
    }

    #[test]
    fn test_predict_uses_scaler() {
        let detector = FittedDetector {
            scaler: ScalerParams {
                mean: [100.0, 100.0, 100.0],
                scale: [1.0, 1.0, 1.0],
            },
            reference_points: vec![[0.0, 0.0, 0.0]],
            threshold: 0.5,
        };
        let p = detector.predict(&[100.0, 100.0, 100.0]);
        assert_eq!(p.anomaly_score, 0.0);
        assert!(!p.is_jam);
    }
}
