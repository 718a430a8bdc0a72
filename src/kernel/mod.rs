//! # Kernel Evaluation
//!
//! Similarity matrices over samples stored as **columns** of a feature matrix
//! (features × samples). The kernel family is a closed set resolved once when a
//! model is built, so an unknown name fails at construction rather than deep
//! inside a fit.

use ndarray::{Array2, ArrayView2, Zip};

use crate::error::{shape_mismatch, Result, TransferError};

/// Bandwidth of [`Kernel::rbf`] and of the builders' RBF kernel unless set.
pub const DEFAULT_GAMMA: f64 = 1.0;

/// Kernel family used to lift samples before the subspace is learned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Kernel {
    /// No kernel trick: the feature matrix itself is used.
    Primal,
    /// Dot products between samples.
    Linear,
    /// Gaussian kernel `exp(-gamma * ||x - y||²)`.
    Rbf { gamma: f64 },
}

impl Default for Kernel {
    fn default() -> Self {
        Self::Primal
    }
}

impl Kernel {
    /// Gaussian kernel with [`DEFAULT_GAMMA`].
    pub fn rbf() -> Self {
        Self::Rbf {
            gamma: DEFAULT_GAMMA,
        }
    }

    /// Replaces the RBF bandwidth. The other families carry no bandwidth and
    /// are returned unchanged.
    pub fn with_gamma(self, gamma: f64) -> Self {
        match self {
            Self::Rbf { .. } => Self::Rbf { gamma },
            other => other,
        }
    }

    /// Resolves a kernel by name. An empty name means primal; `gamma` is only
    /// read for `"rbf"`.
    pub fn from_name(name: &str, gamma: f64) -> Result<Self> {
        let kernel = match name {
            "" | "primal" => Self::Primal,
            "linear" => Self::Linear,
            "rbf" => Self::Rbf { gamma },
            other => return Err(TransferError::InvalidKernelType(other.to_string())),
        };
        kernel.validate()?;
        Ok(kernel)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Primal => "primal",
            Self::Linear => "linear",
            Self::Rbf { .. } => "rbf",
        }
    }

    pub fn is_primal(&self) -> bool {
        matches!(self, Self::Primal)
    }

    pub fn validate(&self) -> Result<()> {
        if let Self::Rbf { gamma } = self {
            if !(gamma.is_finite() && *gamma > 0.0) {
                return Err(TransferError::InvalidParameter {
                    name: "gamma",
                    reason: format!("must be positive and finite, got {}", gamma),
                });
            }
        }
        Ok(())
    }

    /// Size of the square objective matrices for `m` features and `n` samples.
    pub fn objective_size(&self, m: usize, n: usize) -> usize {
        if self.is_primal() {
            m
        } else {
            n
        }
    }

    /// `kernel(X1, X2?)`: the Gram matrix of `x1` when `x2` is absent,
    /// otherwise the cross kernel between the columns of `x1` and `x2`.
    pub fn evaluate(&self, x1: ArrayView2<f64>, x2: Option<ArrayView2<f64>>) -> Result<Array2<f64>> {
        match x2 {
            Some(x2) => self.cross(x1, x2),
            None => Ok(self.gram(x1)),
        }
    }

    /// Kernel of `x` against itself. Primal returns `x` unchanged (m × n);
    /// the other families return a symmetric n × n matrix.
    pub fn gram(&self, x: ArrayView2<f64>) -> Array2<f64> {
        match *self {
            Self::Primal => x.to_owned(),
            Self::Linear => x.t().dot(&x),
            Self::Rbf { gamma } => rbf(x, x, gamma),
        }
    }

    /// Cross kernel of shape `n1 × n2`. Primal ignores `x2` and returns `x1`.
    pub fn cross(&self, x1: ArrayView2<f64>, x2: ArrayView2<f64>) -> Result<Array2<f64>> {
        if x1.nrows() != x2.nrows() {
            return Err(shape_mismatch("kernel feature dimension", x1.nrows(), x2.nrows()));
        }
        Ok(match *self {
            Self::Primal => x1.to_owned(),
            Self::Linear => x1.t().dot(&x2),
            Self::Rbf { gamma } => rbf(x1, x2, gamma),
        })
    }
}

fn rbf(x1: ArrayView2<f64>, x2: ArrayView2<f64>, gamma: f64) -> Array2<f64> {
    let mut k = Array2::zeros((x1.ncols(), x2.ncols()));
    Zip::indexed(&mut k).par_for_each(|(i, j), value| {
        let squared_dist: f64 = x1
            .column(i)
            .iter()
            .zip(x2.column(j).iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum();
        *value = (-gamma * squared_dist).exp();
    });
    k
}
