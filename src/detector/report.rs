//! Console report for a training run

use super::metrics::ConfusionMatrix;
use super::pipeline::ClusterSummary;
use super::scoring::Threshold;

/// Split sizes with jam counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionSizes {
    pub train_rows: usize,
    pub train_jams: usize,
    pub test_rows: usize,
    pub test_jams: usize,
}

/// Outcome of a training run, evaluated on the held-out partition
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub threshold: Threshold,
    pub confusion: ConfusionMatrix,
    pub clusters: ClusterSummary,
    pub partitions: PartitionSizes,
}

impl TrainingReport {
    pub fn accuracy(&self) -> f64 {
        self.confusion.accuracy()
    }

    pub fn f1(&self) -> f64 {
        self.confusion.f1()
    }

    /// Format the report for display
    pub fn format(&self) -> String {
        let cm = &self.confusion;
        let mut output = String::new();

        output.push_str(&format!(
            "\nUsing distance threshold = {:.4} ({})\n\n",
            self.threshold.value,
            self.threshold.policy.describe()
        ));

        output.push_str("========== DBSCAN PHANTOM JAM DETECTION ==========\n");
        output.push_str(&format!(
            "Split: {} train ({} jam) / {} test ({} jam)\n",
            self.partitions.train_rows,
            self.partitions.train_jams,
            self.partitions.test_rows,
            self.partitions.test_jams
        ));
        output.push_str(&format!(
            "Reference set: {} core points from {} normal rows ({} clusters, {} noise)\n",
            self.clusters.n_core,
            self.clusters.fitted_rows,
            self.clusters.n_clusters,
            self.clusters.n_noise
        ));
        output.push_str(&format!("Accuracy: {:.2}%\n", self.accuracy() * 100.0));
        output.push_str(&format!("F1 Score: {:.4}\n", self.f1()));
        output.push_str(&format!("Precision: {:.4}\n", cm.precision()));
        output.push_str(&format!("Recall: {:.4}\n", cm.recall()));

        output.push_str("\nConfusion Matrix (rows = actual, cols = predicted):\n");
        output.push_str("                Predicted Normal | Predicted Jam\n");
        output.push_str(&format!(
            "Actual Normal : {:>16} | {:>13}\n",
            cm.true_negative, cm.false_positive
        ));
        output.push_str(&format!(
            "Actual Jam    : {:>16} | {:>13}\n",
            cm.false_negative, cm.true_positive
        ));

        output.push_str("\n---------- Summary ----------\n");
        output.push_str(&format!(
            "Phantom jams detected (True Positive): {}\n",
            cm.true_positive
        ));
        output.push_str(&format!(
            "Phantom jams missed (False Negative): {}\n",
            cm.false_negative
        ));
        output.push_str(&format!(
            "False alarms (False Positive): {}\n",
            cm.false_positive
        ));
        output.push_str(&format!(
            "Correct non-jams (True Negative): {}\n",
            cm.true_negative
        ));

        output
    }
}
