//! # Subspace Learning
//!
//! The pipeline shared by TCA and JDA: stack and normalize both domains, build
//! the kernel and centering matrices for a given discrepancy matrix, solve the
//! generalized eigenproblem and project every sample into the latent space.
//!
//! Every call works on fresh matrices; nothing is cached between fits.

use log::debug;
use ndarray::{concatenate, Array2, ArrayView2, Axis};

use crate::discrepancy::centering_matrix;
use crate::eigen::{transfer_basis, EigenOrder, EigenSolver};
use crate::error::{shape_mismatch, Result, TransferError};
use crate::kernel::Kernel;
use crate::projection::{project, split_domains};
use crate::utils::{Direction, UnitNorm, ZeroNorm};

/// Parameters common to every subspace learner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubspaceConfig {
    pub kernel: Kernel,
    /// Latent dimensionality.
    pub dim: usize,
    /// Regularization added to the diagonal of `K·M·Kᵗ`.
    pub lamb: f64,
    pub order: EigenOrder,
}

impl Default for SubspaceConfig {
    fn default() -> Self {
        Self {
            kernel: Kernel::Primal,
            dim: 30,
            lamb: 1.0,
            order: EigenOrder::Ascending,
        }
    }
}

impl SubspaceConfig {
    pub fn validate(&self) -> Result<()> {
        self.kernel.validate()?;
        if self.dim == 0 {
            return Err(TransferError::InvalidDimension {
                dim: 0,
                available: 0,
            });
        }
        if !(self.lamb.is_finite() && self.lamb > 0.0) {
            return Err(TransferError::InvalidParameter {
                name: "lamb",
                reason: format!("must be positive and finite, got {}", self.lamb),
            });
        }
        Ok(())
    }
}

/// Source and target samples stacked column-wise (features × samples), each
/// sample scaled to unit norm.
#[derive(Debug, Clone)]
pub struct Domains {
    x: Array2<f64>,
    ns: usize,
    nt: usize,
}

impl Domains {
    /// `xs` and `xt` hold one sample per row.
    pub fn new(xs: ArrayView2<f64>, xt: ArrayView2<f64>) -> Result<Self> {
        let (ns, nt) = (xs.nrows(), xt.nrows());
        if ns == 0 {
            return Err(TransferError::EmptyDomain("source"));
        }
        if nt == 0 {
            return Err(TransferError::EmptyDomain("target"));
        }
        if xs.ncols() != xt.ncols() {
            return Err(shape_mismatch("target feature dimension", xs.ncols(), xt.ncols()));
        }

        let mut x = concatenate(Axis(1), &[xs.t(), xt.t()])
            .map_err(|e| TransferError::InvalidParameter {
                name: "features",
                reason: e.to_string(),
            })?;
        x.unit_normalize(Direction::Column, ZeroNorm::Reject)?;
        Ok(Self { x, ns, nt })
    }

    pub fn x(&self) -> ArrayView2<'_, f64> {
        self.x.view()
    }

    pub fn ns(&self) -> usize {
        self.ns
    }

    pub fn nt(&self) -> usize {
        self.nt
    }

    pub fn n_samples(&self) -> usize {
        self.ns + self.nt
    }

    pub fn n_features(&self) -> usize {
        self.x.nrows()
    }
}

/// Result of one subspace fit.
#[derive(Debug, Clone)]
pub struct Embedding {
    /// `ns × dim`.
    pub source: Array2<f64>,
    /// `nt × dim`.
    pub target: Array2<f64>,
    /// `n_eye × dim` transfer basis `A`.
    pub basis: Array2<f64>,
}

/// Learns the basis for the discrepancy matrix `mmd` and embeds both domains.
pub fn embed<S: EigenSolver + ?Sized>(
    config: &SubspaceConfig,
    solver: &S,
    domains: &Domains,
    mmd: ArrayView2<f64>,
) -> Result<Embedding> {
    let n = domains.n_samples();
    let n_eye = config.kernel.objective_size(domains.n_features(), n);
    if config.dim > n_eye {
        return Err(TransferError::InvalidDimension {
            dim: config.dim,
            available: n_eye,
        });
    }
    debug!(
        "{} kernel: {} features, {} + {} samples, basis {} × {}",
        config.kernel.name(),
        domains.n_features(),
        domains.ns(),
        domains.nt(),
        n_eye,
        config.dim
    );

    let k = config.kernel.gram(domains.x());
    let h = centering_matrix(n);
    let basis = transfer_basis(
        solver,
        k.view(),
        mmd,
        h.view(),
        config.lamb,
        config.dim,
        config.order,
    )?;

    let z = project(k.view(), basis.view())?;
    let (source, target) = split_domains(z.view(), domains.ns())?;
    Ok(Embedding {
        source,
        target,
        basis,
    })
}
