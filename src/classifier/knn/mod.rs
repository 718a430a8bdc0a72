use anyhow::{anyhow, bail};
use ndarray::{Array1, ArrayView1, ArrayView2};
use smartcore::algorithm::neighbour::KNNAlgorithmName;
use smartcore::linalg::basic::arrays::{Array2 as _, MutArray};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::metrics::distance::euclidian::Euclidian;
use smartcore::neighbors::knn_classifier::{KNNClassifier, KNNClassifierParameters};

use super::Classifier;
use crate::error::{Result, TransferError};

type Model = KNNClassifier<f64, u32, DenseMatrix<f64>, Vec<u32>, Euclidian<f64>>;

/// One-nearest-neighbour classifier on smartcore's `KNNClassifier` with a
/// linear search.
#[derive(Default)]
pub struct KnnClassifier {
    model: Option<Model>,
    n_features: usize,
}

impl KnnClassifier {
    pub fn new() -> Self {
        Self::default()
    }
}

fn to_dense(features: ArrayView2<f64>) -> DenseMatrix<f64> {
    let mut dense = DenseMatrix::zeros(features.nrows(), features.ncols());
    for ((i, j), &value) in features.indexed_iter() {
        dense.set((i, j), value);
    }
    dense
}

fn to_class_ids(labels: ArrayView1<usize>) -> anyhow::Result<Vec<u32>> {
    labels
        .iter()
        .map(|&label| u32::try_from(label).map_err(|_| anyhow!("Label {} does not fit a class id", label)))
        .collect()
}

impl Classifier for KnnClassifier {
    fn train(&mut self, features: ArrayView2<f64>, labels: ArrayView1<usize>) -> anyhow::Result<()> {
        if features.nrows() != labels.len() {
            bail!(
                "Number of samples ({}) does not match number of labels ({})",
                features.nrows(),
                labels.len()
            );
        }
        if features.nrows() == 0 {
            bail!("Cannot train a nearest-neighbour classifier without samples");
        }

        let parameters = KNNClassifierParameters::default()
            .with_k(1)
            .with_algorithm(KNNAlgorithmName::LinearSearch);
        let model = KNNClassifier::fit(&to_dense(features), &to_class_ids(labels)?, parameters)
            .map_err(|e| anyhow!("smartcore KNN fit failed: {}", e))?;

        self.model = Some(model);
        self.n_features = features.ncols();
        Ok(())
    }

    fn predict(&self, features: ArrayView2<f64>) -> anyhow::Result<Array1<usize>> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| anyhow!("Classifier has not been trained yet"))?;
        if features.ncols() != self.n_features {
            bail!(
                "Query dimension ({}) does not match training dimension ({})",
                features.ncols(),
                self.n_features
            );
        }

        let predicted = model
            .predict(&to_dense(features))
            .map_err(|e| anyhow!("smartcore KNN predict failed: {}", e))?;
        Ok(predicted.into_iter().map(|class| class as usize).collect())
    }
}

/// Share of matching labels, computed by `smartcore::metrics::accuracy`.
/// Lengths are checked by the caller.
pub(super) fn accuracy(truth: ArrayView1<usize>, predicted: ArrayView1<usize>) -> Result<f64> {
    let truth = to_class_ids(truth).map_err(TransferError::Classifier)?;
    let predicted = to_class_ids(predicted).map_err(TransferError::Classifier)?;
    Ok(smartcore::metrics::accuracy(&truth, &predicted))
}
