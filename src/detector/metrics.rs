//! Binary classification metrics (jam = positive class)

use serde::Serialize;

/// 2x2 confusion matrix; rows are actual labels, columns predicted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ConfusionMatrix {
    pub true_negative: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub true_positive: usize,
}

impl ConfusionMatrix {
    /// Tally paired actual/predicted labels
    pub fn from_predictions(actual: &[bool], predicted: &[bool]) -> Self {
        let mut cm = Self::default();
        for (&a, &p) in actual.iter().zip(predicted) {
            match (a, p) {
                (false, false) => cm.true_negative += 1,
                (false, true) => cm.false_positive += 1,
                (true, false) => cm.false_negative += 1,
                (true, true) => cm.true_positive += 1,
            }
        }
        cm
    }

    pub fn total(&self) -> usize {
        self.true_negative + self.false_positive + self.false_negative + self.true_positive
    }

    /// Share of correct predictions; 0.0 when empty
    pub fn accuracy(&self) -> f64 {
        ratio(self.true_negative + self.true_positive, self.total())
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_positive)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_negative)
    }

    /// F1 of the jam class; 0.0 when there are no positives at all
    pub fn f1(&self) -> f64 {
        ratio(
            2 * self.true_positive,
            2 * self.true_positive + self.false_positive + self.false_negative,
        )
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_predictions() {
        let actual = [false, false, true, true, true];
        let predicted = [false, true, false, true, true];
        let cm = ConfusionMatrix::from_predictions(&actual, &predicted);

        assert_eq!(
            cm,
            ConfusionMatrix {
                true_negative: 1,
                false_positive: 1,
                false_negative: 1,
                true_positive: 2,
            }
        );
        assert_eq!(cm.total(), 5);
        assert!((cm.accuracy() - 0.6).abs() < 1e-12);
        assert!((cm.precision() - 2.0 / 3.0).abs() < 1e-12);
        assert!((cm.recall() - 2.0 / 3.0).abs() < 1e-12);
        assert!((cm.f1() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_metrics_without_positives() {
        let cm = ConfusionMatrix::from_predictions(&[false, false], &[false, false]);
        assert_eq!(cm.accuracy(), 1.0);
        assert_eq!(cm.f1(), 0.0);
        assert_eq!(cm.precision(), 0.0);
    }

    #[test]
    fn test_empty_matrix() {
        let cm = ConfusionMatrix::default();
        assert_eq!(cm.total(), 0);
        assert_eq!(cm.accuracy(), 0.0);
    }
}
