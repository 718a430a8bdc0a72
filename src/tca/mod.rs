//! # Transfer Component Analysis
//!
//! Learns a latent subspace in which the means of a labeled source domain and
//! an unlabeled target domain coincide under the chosen kernel, then projects
//! both domains (and optionally a further target batch) into it.
//!
//! The discrepancy, centering and kernel matrices are dense `n × n` in the
//! total sample count, so memory grows quadratically with `ns + nt`.

use log::debug;
use ndarray::{Array2, ArrayView1, ArrayView2};

use crate::classifier::{evaluate, Classifier, DefaultClassifier, Prediction};
use crate::discrepancy::marginal_mmd;
use crate::eigen::{CholeskySolver, EigenOrder, EigenSolver};
use crate::error::{shape_mismatch, Result};
use crate::kernel::Kernel;
use crate::projection::project_out_of_sample;
use crate::subspace::{embed, Domains, Embedding, SubspaceConfig};

pub struct TcaBuilder<S: EigenSolver = CholeskySolver> {
    config: SubspaceConfig,
    solver: S,
}

impl TcaBuilder<CholeskySolver> {
    pub fn new() -> Self {
        Self::with_solver(CholeskySolver::default())
    }
}

impl Default for TcaBuilder<CholeskySolver> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: EigenSolver> TcaBuilder<S> {
    pub fn with_solver(solver: S) -> Self {
        TcaBuilder {
            config: SubspaceConfig::default(),
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

    pub fn build(self) -> Result<Tca<S>> {
        self.config.validate()?;
        Ok(Tca {
            config: self.config,
            solver: self.solver,
        })
    }
}

/// Transfer Component Analysis with a fixed marginal discrepancy matrix.
pub struct Tca<S: EigenSolver = CholeskySolver> {
    config: SubspaceConfig,
    solver: S,
}

impl<S: EigenSolver> Tca<S> {
    pub fn config(&self) -> &SubspaceConfig {
        &self.config
    }

    fn learn(&self, xs: ArrayView2<f64>, xt: ArrayView2<f64>) -> Result<(Domains, Embedding)> {
        let domains = Domains::new(xs, xt)?;
        let mmd = marginal_mmd(domains.ns(), domains.nt())?;
        let embedding = embed(&self.config, &self.solver, &domains, mmd.view())?;
        Ok((domains, embedding))
    }

    /// Projects both domains into the transfer subspace. Returns
    /// `(ns × dim, nt × dim)` with unit-norm rows.
    pub fn fit(&self, xs: ArrayView2<f64>, xt: ArrayView2<f64>) -> Result<(Array2<f64>, Array2<f64>)> {
        let (_, embedding) = self.learn(xs, xt)?;
        Ok((embedding.source, embedding.target))
    }

    /// Learns the subspace from `(xs, xt)` and maps the unseen batch `xt2`
    /// through it, returning `n2 × dim`.
    ///
    /// `xt2` is used as given and the result is not row-normalized.
    pub fn fit_new(
        &self,
        xs: ArrayView2<f64>,
        xt: ArrayView2<f64>,
        xt2: ArrayView2<f64>,
    ) -> Result<Array2<f64>> {
        let (domains, embedding) = self.learn(xs, xt)?;
        self.project_new(&domains, &embedding, xt2)
    }

    fn project_new(&self, domains: &Domains, embedding: &Embedding, xt2: ArrayView2<f64>) -> Result<Array2<f64>> {
        debug!("out-of-sample projection of {} samples", xt2.nrows());
        project_out_of_sample(&self.config.kernel, xt2, domains.x(), embedding.basis.view())
    }

    /// [`fit`](Self::fit) followed by 1-NN classification of the target.
    pub fn fit_predict(
        &self,
        xs: ArrayView2<f64>,
        ys: ArrayView1<usize>,
        xt: ArrayView2<f64>,
        yt: ArrayView1<usize>,
    ) -> Result<Prediction> {
        self.fit_predict_with(&mut DefaultClassifier::default(), xs, ys, xt, yt)
    }

    pub fn fit_predict_with<C: Classifier + ?Sized>(
        &self,
        classifier: &mut C,
        xs: ArrayView2<f64>,
        ys: ArrayView1<usize>,
        xt: ArrayView2<f64>,
        yt: ArrayView1<usize>,
    ) -> Result<Prediction> {
        check_labels(xs, ys, "source labels")?;
        check_labels(xt, yt, "target labels")?;
        let (source, target) = self.fit(xs, xt)?;
        evaluate(classifier, source.view(), ys, target.view(), yt)
    }

    /// Learns the subspace from `(xs, xt)`, trains 1-NN on the embedded source
    /// and scores it on the unseen batch `xt2`.
    pub fn fit_predict_new(
        &self,
        xs: ArrayView2<f64>,
        ys: ArrayView1<usize>,
        xt: ArrayView2<f64>,
        xt2: ArrayView2<f64>,
        yt2: ArrayView1<usize>,
    ) -> Result<Prediction> {
        self.fit_predict_new_with(&mut DefaultClassifier::default(), xs, ys, xt, xt2, yt2)
    }

    pub fn fit_predict_new_with<C: Classifier + ?Sized>(
        &self,
        classifier: &mut C,
        xs: ArrayView2<f64>,
        ys: ArrayView1<usize>,
        xt: ArrayView2<f64>,
        xt2: ArrayView2<f64>,
        yt2: ArrayView1<usize>,
    ) -> Result<Prediction> {
        check_labels(xs, ys, "source labels")?;
        check_labels(xt2, yt2, "new batch labels")?;
        let (domains, embedding) = self.learn(xs, xt)?;
        let projected = self.project_new(&domains, &embedding, xt2)?;
        evaluate(classifier, embedding.source.view(), ys, projected.view(), yt2)
    }
}

pub(crate) fn check_labels(x: ArrayView2<f64>, y: ArrayView1<usize>, context: &'static str) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(shape_mismatch(context, x.nrows(), y.len()));
    }
    Ok(())
}
