//! # Joint Distribution Adaptation
//!
//! Extends TCA with class-conditional alignment. Every round rebuilds the
//! discrepancy matrix from the previous round's target pseudo-labels, relearns
//! the subspace and reclassifies the target. Rounds are strictly sequential
//! and always run to the configured count.

use log::info;
use ndarray::{Array1, ArrayView1, ArrayView2};

use crate::classifier::{evaluate, Classifier, DefaultClassifier};
use crate::discrepancy::joint_mmd;
use crate::eigen::{CholeskySolver, EigenOrder, EigenSolver};
use crate::error::{Result, TransferError};
use crate::kernel::Kernel;
use crate::subspace::{embed, Domains, SubspaceConfig};
use crate::tca::check_labels;

/// Outcome of a full JDA run.
#[derive(Debug, Clone, PartialEq)]
pub struct JdaReport {
    /// Accuracy of the final round.
    pub accuracy: f64,
    /// Target labels predicted in the final round.
    pub labels: Array1<usize>,
    /// Accuracy of every round, in order.
    pub history: Vec<f64>,
}

pub struct JdaBuilder<S: EigenSolver = CholeskySolver> {
    config: SubspaceConfig,
    iterations: usize,
    solver: S,
}

impl JdaBuilder<CholeskySolver> {
    pub fn new() -> Self {
        Self::with_solver(CholeskySolver::default())
    }
}

impl Default for JdaBuilder<CholeskySolver> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: EigenSolver> JdaBuilder<S> {
    pub fn with_solver(solver: S) -> Self {
        JdaBuilder {
            config: SubspaceConfig::default(),
            iterations: 10,
            solver,
        }
    }

    pub fn kernel(mut self, kernel: Kernel) -> Self {
        self.config.kernel = kernel;
        self
    }

    /// Bandwidth of an RBF kernel; ignored for the other kernels. Call after
    /// [`kernel`](Self::kernel).
    pub fn gamma(mut self, gamma: f64) -> Self {
        self.config.kernel = self.config.kernel.with_gamma(gamma);
        self
    }

    pub fn dim(mut self, dim: usize) -> Self {
        self.config.dim = dim;
        self
    }

    pub fn lamb(mut self, lamb: f64) -> Self {
        self.config.lamb = lamb;
        self
    }

    pub fn order(mut self, order: EigenOrder) -> Self {
        self.config.order = order;
        self
    }

    /// Number of pseudo-labeling rounds `T`.
    pub fn iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn build(self) -> Result<Jda<S>> {
        self.config.validate()?;
        if self.iterations == 0 {
            return Err(TransferError::InvalidParameter {
                name: "iterations",
                reason: "at least one round is required".to_string(),
            });
        }
        Ok(Jda {
            config: self.config,
            iterations: self.iterations,
            solver: self.solver,
        })
    }
}

pub struct Jda<S: EigenSolver = CholeskySolver> {
    config: SubspaceConfig,
    iterations: usize,
    solver: S,
}

impl<S: EigenSolver> Jda<S> {
    pub fn config(&self) -> &SubspaceConfig {
        &self.config
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Runs all rounds with a 1-NN classifier.
    ///
    /// `yt` is only used to score each round; pseudo-labels come from the
    /// classifier alone.
    pub fn fit_predict(
        &self,
        xs: ArrayView2<f64>,
        ys: ArrayView1<usize>,
        xt: ArrayView2<f64>,
        yt: ArrayView1<usize>,
    ) -> Result<JdaReport> {
        self.fit_predict_with(&mut DefaultClassifier::default(), xs, ys, xt, yt)
    }

    pub fn fit_predict_with<C: Classifier + ?Sized>(
        &self,
        classifier: &mut C,
        xs: ArrayView2<f64>,
        ys: ArrayView1<usize>,
        xt: ArrayView2<f64>,
        yt: ArrayView1<usize>,
    ) -> Result<JdaReport> {
        check_labels(xs, ys, "source labels")?;
        check_labels(xt, yt, "target labels")?;
        let domains = Domains::new(xs, xt)?;

        let mut pseudo: Option<Array1<usize>> = None;
        let mut history = Vec::with_capacity(self.iterations);
        for t in 0..self.iterations {
            let mmd = joint_mmd(
                domains.ns(),
                domains.nt(),
                ys,
                pseudo.as_ref().map(|labels| labels.view()),
            )?;
            let embedding = embed(&self.config, &self.solver, &domains, mmd.view())?;
            let prediction = evaluate(
                classifier,
                embedding.source.view(),
                ys,
                embedding.target.view(),
                yt,
            )?;

            info!(
                "JDA iteration [{}/{}]: Acc: {:.4}",
                t + 1,
                self.iterations,
                prediction.accuracy
            );
            history.push(prediction.accuracy);
            pseudo = Some(prediction.labels);
        }

        match (history.last().copied(), pseudo) {
            (Some(accuracy), Some(labels)) => Ok(JdaReport {
                accuracy,
                labels,
                history,
            }),
            _ => Err(TransferError::InvalidParameter {
                name: "iterations",
                reason: "at least one round is required".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    fn domains() -> (Array2<f64>, Array1<usize>, Array2<f64>, Array1<usize>) {
        let xs = array![
            [1.0, 0.2, 0.1],
            [0.9, 0.3, 0.0],
            [0.8, 0.1, 0.2],
            [0.1, 1.0, 0.4],
            [0.2, 0.8, 0.5],
            [0.0, 0.9, 0.3]
        ];
        let ys = array![1, 1, 1, 2, 2, 2];
        let xt = array![
            [1.1, 0.4, 0.3],
            [1.0, 0.5, 0.4],
            [0.1, 1.2, 0.7],
            [0.3, 0.9, 0.8],
            [0.2, 1.1, 0.6]
        ];
        let yt = array![1, 1, 2, 2, 2];
        (xs, ys, xt, yt)
    }

    #[test]
    fn test_builder_defaults() {
        let jda = JdaBuilder::new().build().unwrap();
        assert_eq!(jda.iterations(), 10);
        assert_eq!(jda.config().dim, 30);
        assert!(JdaBuilder::new().iterations(0).build().is_err());
    }

    #[test]
    fn test_history_has_one_entry_per_round() {
        let (xs, ys, xt, yt) = domains();
        for rounds in [1, 3, 5] {
            let jda = JdaBuilder::new().dim(2).iterations(rounds).build().unwrap();
            let report = jda.fit_predict(xs.view(), ys.view(), xt.view(), yt.view()).unwrap();
            assert_eq!(report.history.len(), rounds);
            assert_eq!(report.labels.len(), 5);
            assert_eq!(Some(&report.accuracy), report.history.last());
        }
    }

    #[test]
    fn test_rbf_rounds() {
        let (xs, ys, xt, yt) = domains();
        let jda = JdaBuilder::new()
            .kernel(Kernel::rbf())
            .gamma(0.8)
            .dim(3)
            .iterations(4)
            .build()
            .unwrap();
        assert_eq!(jda.config().kernel, Kernel::Rbf { gamma: 0.8 });
        let report = jda.fit_predict(xs.view(), ys.view(), xt.view(), yt.view()).unwrap();
        assert_eq!(report.history.len(), 4);
        assert!(report.history.iter().all(|acc| (0.0..=1.0).contains(acc)));
    }

    #[test]
    fn test_label_mismatch_fails_before_any_round() {
        let (xs, _, xt, yt) = domains();
        let ys = array![1, 2];
        let jda = JdaBuilder::new().dim(2).build().unwrap();
        assert!(matches!(
            jda.fit_predict(xs.view(), ys.view(), xt.view(), yt.view()),
            Err(TransferError::ShapeMismatch { .. })
        ));
    }
}
