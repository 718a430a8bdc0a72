use std::collections::BTreeMap;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::error::{shape_mismatch, Result, TransferError};

/// Train/holdout partition of one labeled domain.
#[derive(Debug, Clone)]
pub struct DomainSplit {
    pub train_features: Array2<f64>,
    pub train_labels: Array1<usize>,
    pub test_features: Array2<f64>,
    pub test_labels: Array1<usize>,
}

/// Splits every class separately so both parts keep the class proportions.
///
/// Sample order within each part follows the input order. The same `seed`
/// always yields the same split, and each class keeps at least one training
/// sample.
pub fn stratified_split(
    features: ArrayView2<f64>,
    labels: ArrayView1<usize>,
    test_fraction: f64,
    seed: u64,
) -> Result<DomainSplit> {
    if features.nrows() != labels.len() {
        return Err(shape_mismatch("split labels", features.nrows(), labels.len()));
    }
    if !(0.0..1.0).contains(&test_fraction) {
        return Err(TransferError::InvalidParameter {
            name: "test_fraction",
            reason: format!("must lie in [0, 1), got {}", test_fraction),
        });
    }

    let mut by_class: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (i, &label) in labels.iter().enumerate() {
        by_class.entry(label).or_default().push(i);
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();
    for members in by_class.values_mut() {
        members.shuffle(&mut rng);
        let n_test = ((members.len() as f64 * test_fraction).round() as usize).min(members.len() - 1);
        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }
    train.sort_unstable();
    test.sort_unstable();

    Ok(DomainSplit {
        train_features: features.select(Axis(0), &train),
        train_labels: labels.select(Axis(0), &train),
        test_features: features.select(Axis(0), &test),
        test_labels: labels.select(Axis(0), &test),
    })
}
