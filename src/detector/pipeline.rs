//! Fitting stages: standardization (aprender StandardScaler) and DBSCAN
//!
//! Core membership follows the DBSCAN definition with the same `eps` and
//! `min_samples`: a point is core when at least `min_samples` points (itself
//! included) lie within distance `eps`. Clusters are the connected components
//! of core points; a non-core point within `eps` of a core point joins that
//! cluster, every other point is noise. Both passes are O(n^2) time and O(n)
//! memory.

use super::model::ScalerParams;
use super::scoring::FeatureVector;
use super::{DetectorError, Result};
use crate::dataset::N_FEATURES;
use aprender::preprocessing::StandardScaler;
use aprender::primitives::Matrix;
use aprender::traits::Transformer;

/// Standard deviations below this are treated as constant features
const MIN_SCALE: f64 = 1e-12;

/// Label of points that belong to no cluster
pub const NOISE: i32 = -1;

/// DBSCAN outcome on the normal training rows
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSummary {
    /// Rows the clustering was fitted on
    pub fitted_rows: usize,
    /// Clusters found (noise excluded)
    pub n_clusters: usize,
    /// Points labeled noise
    pub n_noise: usize,
    /// Core points kept as the reference set
    pub n_core: usize,
}

fn to_matrix(rows: &[FeatureVector]) -> Result<Matrix<f32>> {
    let data: Vec<f32> = rows
        .iter()
        .flat_map(|row| row.iter().map(|&v| v as f32))
        .collect();

    Matrix::from_vec(rows.len(), N_FEATURES, data)
        .map_err(|e| DetectorError::Preprocessing(e.to_string()))
}

fn column_means(rows: &[FeatureVector]) -> FeatureVector {
    let n = rows.len() as f64;
    std::array::from_fn(|j| rows.iter().map(|r| r[j]).sum::<f64>() / n)
}

/// Fit standardization on the training feature matrix
///
/// Columns are centred in f64 before the f32 fit, so large offsets with a
/// small spread keep their precision; the shift is added back to the mean.
pub fn fit_scaler(rows: &[FeatureVector]) -> Result<ScalerParams> {
    if rows.is_empty() {
        return Err(DetectorError::InsufficientData {
            required: 1,
            actual: 0,
        });
    }

    let shift = column_means(rows);
    let centred: Vec<FeatureVector> = rows
        .iter()
        .map(|r| std::array::from_fn(|j| r[j] - shift[j]))
        .collect();

    let features = to_matrix(&centred)?;
    let mut scaler = StandardScaler::new().with_mean(true).with_std(true);
    scaler
        .fit(&features)
        .map_err(|e| DetectorError::Preprocessing(e.to_string()))?;

    let mut mean = shift;
    let mut scale = [1.0; N_FEATURES];
    let means: Vec<f32> = scaler.mean().to_vec();
    let stds: Vec<f32> = scaler.std().to_vec();
    for (j, (&m, &s)) in means.iter().zip(stds.iter()).enumerate() {
        mean[j] += m as f64;
        let s = s as f64;
        if !s.is_finite() {
            return Err(DetectorError::Preprocessing(format!(
                "non-finite standard deviation for feature {j}"
            )));
        }
        if s > MIN_SCALE {
            scale[j] = s;
        } else {
            tracing::warn!(feature = j, "Constant feature in training data; scale left at 1.0");
        }
    }

    tracing::debug!(?mean, ?scale, "Fitted feature scaler");
    Ok(ScalerParams { mean, scale })
}

fn within(a: &FeatureVector, b: &FeatureVector, eps_sq: f64) -> bool {
    let d: f64 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
    d <= eps_sq
}

fn core_mask(rows: &[FeatureVector], eps: f64, min_samples: usize) -> Vec<bool> {
    let eps_sq = eps * eps;
    rows.iter()
        .map(|x| rows.iter().filter(|other| within(x, other, eps_sq)).count() >= min_samples)
        .collect()
}

/// Indices of points with at least `min_samples` neighbors within `eps`
pub fn core_point_indices(rows: &[FeatureVector], eps: f64, min_samples: usize) -> Vec<usize> {
    core_mask(rows, eps, min_samples)
        .into_iter()
        .enumerate()
        .filter_map(|(i, is_core)| is_core.then_some(i))
        .collect()
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

/// DBSCAN cluster labels: `0..k` for clusters in order of first core point,
/// [`NOISE`] for points with no core point within `eps`
pub fn cluster_labels(rows: &[FeatureVector], eps: f64, min_samples: usize) -> Vec<i32> {
    let eps_sq = eps * eps;
    let core = core_mask(rows, eps, min_samples);
    let mut parent: Vec<usize> = (0..rows.len()).collect();
    // Core point each border point attaches to
    let mut anchor: Vec<Option<usize>> = vec![None; rows.len()];

    for i in 0..rows.len() {
        for j in (i + 1)..rows.len() {
            if !(core[i] || core[j]) || !within(&rows[i], &rows[j], eps_sq) {
                continue;
            }
            match (core[i], core[j]) {
                (true, true) => {
                    let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                    if ri != rj {
                        parent[rj.max(ri)] = ri.min(rj);
                    }
                }
                (true, false) if anchor[j].is_none() => anchor[j] = Some(i),
                (false, true) if anchor[i].is_none() => anchor[i] = Some(j),
                _ => {}
            }
        }
    }

    let mut root_label: Vec<Option<i32>> = vec![None; rows.len()];
    let mut next = 0;
    let mut labels = vec![NOISE; rows.len()];
    for i in 0..rows.len() {
        let owner = if core[i] { Some(i) } else { anchor[i] };
        if let Some(owner) = owner {
            let root = find(&mut parent, owner);
            let label = *root_label[root].get_or_insert_with(|| {
                next += 1;
                next - 1
            });
            labels[i] = label;
        }
    }
    labels
}

/// Fit DBSCAN on scaled normal rows and return their core points
pub fn fit_reference_set(
    normal_rows: &[FeatureVector],
    eps: f64,
    min_samples: usize,
) -> Result<(Vec<FeatureVector>, ClusterSummary)> {
    if normal_rows.is_empty() {
        return Err(DetectorError::EmptyReferenceSet(
            "training partition has no normal-labeled rows".to_string(),
        ));
    }

    let labels = cluster_labels(normal_rows, eps, min_samples);
    let n_noise = labels.iter().filter(|&&l| l == NOISE).count();
    let n_clusters = labels.iter().copied().max().map_or(0, |m| (m + 1) as usize);

    let core: Vec<FeatureVector> = core_point_indices(normal_rows, eps, min_samples)
        .into_iter()
        .map(|i| normal_rows[i])
        .collect();

    if core.is_empty() {
        return Err(DetectorError::EmptyReferenceSet(format!(
            "no core points among {} normal rows (eps={}, min_samples={})",
            normal_rows.len(),
            eps,
            min_samples
        )));
    }

    let summary = ClusterSummary {
        fitted_rows: normal_rows.len(),
        n_clusters,
        n_noise,
        n_core: core.len(),
    };
    tracing::info!(
        clusters = summary.n_clusters,
        noise = summary.n_noise,
        core = summary.n_core,
        "Fitted DBSCAN on normal traffic"
    );

    Ok((core, summary))
}
