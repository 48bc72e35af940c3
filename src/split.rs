//! Stratified train/test split
//!
//! The test partition takes `ceil(test_fraction * n)` rows. Each label class
//! contributes its proportional share, floored, and the rows left over go to the
//! classes with the largest fractional share. Rows are shuffled with a seeded
//! `StdRng`, so a fixed seed always yields the same partition.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use thiserror::Error;

/// Errors for splitting a labeled dataset
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SplitError {
    #[error("Insufficient data: need at least {required} samples, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Test fraction must be strictly between 0 and 1, got {0}")]
    InvalidFraction(f64),
}

pub type Result<T> = std::result::Result<T, SplitError>;

/// Row indices of the two partitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Split row indices into train and test partitions, stratified on `labels`
pub fn stratified_split(labels: &[bool], test_fraction: f64, seed: u64) -> Result<TrainTestSplit> {
    let n = labels.len();
    if n < 2 {
        return Err(SplitError::InsufficientData {
            required: 2,
            actual: n,
        });
    }
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(SplitError::InvalidFraction(test_fraction));
    }

    let n_test = ((test_fraction * n as f64).ceil() as usize).clamp(1, n - 1);

    // Class 0 = normal, class 1 = jam
    let mut classes: [Vec<usize>; 2] = [Vec::new(), Vec::new()];
    for (idx, &is_jam) in labels.iter().enumerate() {
        classes[is_jam as usize].push(idx);
    }

    let counts = [classes[0].len(), classes[1].len()];
    let test_counts = approximate_mode(&counts, n_test);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(n - n_test);
    let mut test = Vec::with_capacity(n_test);

    for (class, take) in classes.iter_mut().zip(test_counts.iter().copied()) {
        class.shuffle(&mut rng);
        let (class_test, class_train) = class.split_at(take);
        test.extend_from_slice(class_test);
        train.extend_from_slice(class_train);
    }

    train.shuffle(&mut rng);
    test.shuffle(&mut rng);

    tracing::debug!(
        train = train.len(),
        test = test.len(),
        test_jams = test_counts[1],
        seed,
        "Stratified split"
    );

    Ok(TrainTestSplit { train, test })
}

/// Distribute `n_draws` across classes proportionally to `counts`.
///
/// Each class gets the floor of its share; the remainder goes to the classes
/// with the largest fractional parts, ties broken by larger class then lower
/// class index.
fn approximate_mode(counts: &[usize], n_draws: usize) -> Vec<usize> {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return vec![0; counts.len()];
    }

    let mut draws: Vec<usize> = counts.iter().map(|&c| c * n_draws / total).collect();
    let mut leftover = n_draws - draws.iter().sum::<usize>();

    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by(|&a, &b| {
        let rem_a = counts[a] * n_draws % total;
        let rem_b = counts[b] * n_draws % total;
        rem_b
            .cmp(&rem_a)
            .then(counts[b].cmp(&counts[a]))
            .then(a.cmp(&b))
    });

    for idx in order {
        if leftover == 0 {
            break;
        }
        if draws[idx] < counts[idx] {
            draws[idx] += 1;
            leftover -= 1;
        }
    }

    draws
}
