//! # Evaluation
//!
//! Classifier seam used to score a learned subspace and, for JDA, to produce
//! the pseudo-labels of the next round. [`DefaultClassifier`] is the 1-NN
//! classifier the adaptation drivers use when none is given: the built-in
//! [`NearestNeighbor`], or smartcore's KNN with the `smartcore` feature.
//! Anything implementing [`Classifier`] can be passed instead.

use anyhow::{anyhow, bail};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;

use crate::error::{shape_mismatch, Result, TransferError};

#[cfg(feature = "smartcore")]
mod knn;
#[cfg(feature = "smartcore")]
pub use knn::KnnClassifier;

#[cfg(feature = "smartcore")]
pub type DefaultClassifier = KnnClassifier;
#[cfg(not(feature = "smartcore"))]
pub type DefaultClassifier = NearestNeighbor;

pub trait Classifier {
    /// Fits the classifier on `features` (one sample per row).
    fn train(&mut self, features: ArrayView2<f64>, labels: ArrayView1<usize>) -> anyhow::Result<()>;

    fn predict(&self, features: ArrayView2<f64>) -> anyhow::Result<Array1<usize>>;
}

/// Accuracy and predicted labels for one evaluated batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub accuracy: f64,
    pub labels: Array1<usize>,
}

/// One-nearest-neighbour classifier under Euclidean distance. Ties go to the
/// training sample seen first.
#[derive(Debug, Clone, Default)]
pub struct NearestNeighbor {
    samples: Option<Array2<f64>>,
    labels: Option<Array1<usize>>,
}

impl NearestNeighbor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Classifier for NearestNeighbor {
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
        self.samples = Some(features.to_owned());
        self.labels = Some(labels.to_owned());
        Ok(())
    }

    fn predict(&self, features: ArrayView2<f64>) -> anyhow::Result<Array1<usize>> {
        let (samples, labels) = match (&self.samples, &self.labels) {
            (Some(samples), Some(labels)) => (samples, labels),
            _ => return Err(anyhow!("Classifier has not been trained yet")),
        };
        if features.ncols() != samples.ncols() {
            bail!(
                "Query dimension ({}) does not match training dimension ({})",
                features.ncols(),
                samples.ncols()
            );
        }

        let predicted: Vec<usize> = features
            .axis_iter(Axis(0))
            .into_par_iter()
            .map(|query| {
                let mut best = 0;
                let mut best_dist = f64::INFINITY;
                for (i, sample) in samples.axis_iter(Axis(0)).enumerate() {
                    let dist: f64 = sample
                        .iter()
                        .zip(query.iter())
                        .map(|(a, b)| (a - b) * (a - b))
                        .sum();
                    if dist < best_dist {
                        best_dist = dist;
                        best = i;
                    }
                }
                labels[best]
            })
            .collect();

        Ok(Array1::from(predicted))
    }
}

/// Fraction of positions where `predicted` equals `truth`.
pub fn accuracy_score(truth: ArrayView1<usize>, predicted: ArrayView1<usize>) -> Result<f64> {
    if truth.len() != predicted.len() {
        return Err(shape_mismatch("predicted labels", truth.len(), predicted.len()));
    }
    if truth.is_empty() {
        return Err(TransferError::EmptyDomain("evaluation"));
    }

    #[cfg(feature = "smartcore")]
    let accuracy = knn::accuracy(truth, predicted)?;
    #[cfg(not(feature = "smartcore"))]
    let accuracy = {
        let hits = truth.iter().zip(predicted.iter()).filter(|(t, p)| t == p).count();
        hits as f64 / truth.len() as f64
    };
    Ok(accuracy)
}

/// Trains `classifier` on the source block, predicts the target block and
/// scores the prediction.
pub fn evaluate<C: Classifier + ?Sized>(
    classifier: &mut C,
    source: ArrayView2<f64>,
    source_labels: ArrayView1<usize>,
    target: ArrayView2<f64>,
    target_labels: ArrayView1<usize>,
) -> Result<Prediction> {
    classifier.train(source, source_labels)?;
    let labels = classifier.predict(target)?;
    let accuracy = accuracy_score(target_labels, labels.view())?;
    Ok(Prediction { accuracy, labels })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_nearest_neighbor_predicts_closest_label() {
        let x = array![[0.0, 0.0], [10.0, 10.0], [0.0, 10.0]];
        let y = array![1, 2, 3];
        let mut knn = NearestNeighbor::new();
        knn.train(x.view(), y.view()).unwrap();

        let queries = array![[1.0, 1.0], [9.0, 8.0], [-1.0, 12.0]];
        assert_eq!(knn.predict(queries.view()).unwrap(), array![1, 2, 3]);
    }

    #[test]
    fn test_ties_go_to_first_sample() {
        let x = array![[1.0], [-1.0]];
        let y = array![4, 5];
        let mut knn = NearestNeighbor::new();
        knn.train(x.view(), y.view()).unwrap();
        assert_eq!(knn.predict(array![[0.0]].view()).unwrap(), array![4]);
    }

    #[test]
    fn test_predict_without_training_fails() {
        let knn = NearestNeighbor::new();
        assert!(knn.predict(array![[0.0]].view()).is_err());
    }

    #[test]
    fn test_train_rejects_mismatched_labels() {
        let mut knn = NearestNeighbor::new();
        assert!(knn.train(array![[0.0], [1.0]].view(), array![1].view()).is_err());
    }

    #[test]
    fn test_accuracy_score() {
        let truth = array![1, 2, 2, 1];
        let predicted = array![1, 2, 1, 1];
        assert_relative_eq!(accuracy_score(truth.view(), predicted.view()).unwrap(), 0.75);

        assert!(accuracy_score(truth.view(), array![1].view()).is_err());
    }

    #[test]
    fn test_evaluate_wraps_classifier_errors() {
        let mut knn = NearestNeighbor::new();
        let result = evaluate(
            &mut knn,
            array![[0.0, 1.0]].view(),
            array![1, 2].view(),
            array![[0.0, 1.0]].view(),
            array![1].view(),
        );
        assert!(matches!(result, Err(TransferError::Classifier(_))));
    }
}
