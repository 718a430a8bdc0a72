//! # Generalized Eigenproblem
//!
//! Forms the TCA/JDA objective pencil
//!
//! ```text
//! a = K·M·Kᵗ + lamb·I        b = K·H·Kᵗ
//! ```
//!
//! solves `a·v = w·b·v` and keeps `dim` eigenvectors as the transfer basis.
//!
//! The solver is pluggable through [`EigenSolver`]. [`CholeskySolver`] is pure
//! Rust and exploits that `a` is symmetric positive definite for `lamb > 0`;
//! with the `lapack` feature, `LapackSolver` runs a general QZ decomposition
//! and checks the imaginary residue of what it returns.
//!
//! ## Ordering
//! Eigenpairs are ranked by `w` and the first `dim` are kept. [`EigenOrder::Ascending`]
//! (the default) keeps the smallest `w`. Ties, including infinite eigenvalues
//! from a singular `b`, keep their solver order.

#[cfg(feature = "lapack")]
mod lapack;
#[cfg(feature = "lapack")]
pub use lapack::LapackSolver;

use log::{debug, warn};
use nalgebra::{Cholesky, SymmetricEigen};
use ndarray::{Array1, Array2, ArrayView2, Axis};

use crate::dense::{to_nalgebra, to_ndarray};
use crate::error::{shape_mismatch, Result, TransferError};
use crate::utils::{Direction, UnitNorm, ZeroNorm};

/// Relative tolerance below which a whitened eigenvalue of `b` counts as zero.
pub const SINGULAR_TOLERANCE: f64 = 1e-10;

/// Relative tolerance on the imaginary part of a selected eigenpair.
pub const IMAGINARY_TOLERANCE: f64 = 1e-8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EigenOrder {
    #[default]
    Ascending,
    Descending,
}

/// Real eigenpairs of a pencil `(a, b)`.
#[derive(Debug, Clone)]
pub struct GeneralizedEigen {
    /// `w`, with `+inf` where `b` is singular along the eigenvector.
    pub values: Array1<f64>,
    /// Unit-norm eigenvectors, one per column.
    pub vectors: Array2<f64>,
    /// Relative imaginary residue of each pair; zero for real solvers.
    pub imaginary: Array1<f64>,
}

pub trait EigenSolver: Send + Sync {
    fn solve(&self, a: ArrayView2<f64>, b: ArrayView2<f64>) -> Result<GeneralizedEigen>;
}

/// Solves `a·v = w·b·v` for symmetric positive definite `a` and symmetric
/// positive semi-definite `b`.
///
/// With `a = L·Lᵗ` the pencil reduces to the symmetric problem
/// `L⁻¹·b·L⁻ᵗ·u = μ·u`, where `v = L⁻ᵗ·u` and `w = 1/μ`.
#[derive(Debug, Clone, Copy)]
pub struct CholeskySolver {
    tolerance: f64,
}

impl CholeskySolver {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }
}

impl Default for CholeskySolver {
    fn default() -> Self {
        Self::new(SINGULAR_TOLERANCE)
    }
}

impl EigenSolver for CholeskySolver {
    fn solve(&self, a: ArrayView2<f64>, b: ArrayView2<f64>) -> Result<GeneralizedEigen> {
        check_pencil(a, b)?;
        let n = a.nrows();

        let cholesky = Cholesky::new(to_nalgebra(a)).ok_or_else(|| {
            TransferError::NumericalInstability("left-hand matrix is not positive definite".into())
        })?;
        let l = cholesky.l();
        let not_invertible =
            || TransferError::NumericalInstability("Cholesky factor is not invertible".into());

        // L⁻¹·b·L⁻ᵗ, using the symmetry of b
        let l_inv_b = l.solve_lower_triangular(&to_nalgebra(b)).ok_or_else(not_invertible)?;
        let whitened = l
            .solve_lower_triangular(&l_inv_b.transpose())
            .ok_or_else(not_invertible)?;
        let whitened = (&whitened + whitened.transpose()) * 0.5;

        let eig = SymmetricEigen::new(whitened);
        let scale = eig.eigenvalues.amax();
        let threshold = self.tolerance * scale;

        let mut values = Array1::zeros(n);
        for (i, &mu) in eig.eigenvalues.iter().enumerate() {
            if mu < -threshold {
                return Err(TransferError::NumericalInstability(format!(
                    "right-hand matrix is not positive semi-definite (eigenvalue {:e})",
                    mu
                )));
            }
            values[i] = if mu <= threshold { f64::INFINITY } else { mu.recip() };
        }

        let vectors = l
            .transpose()
            .solve_upper_triangular(&eig.eigenvectors)
            .ok_or_else(not_invertible)?;
        let mut vectors = to_ndarray(vectors);
        vectors.unit_normalize(Direction::Column, ZeroNorm::Reject)?;

        debug!(
            "pencil of size {}: {} finite eigenvalues",
            n,
            values.iter().filter(|w| w.is_finite()).count()
        );

        Ok(GeneralizedEigen {
            values,
            vectors,
            imaginary: Array1::zeros(n),
        })
    }
}

fn check_pencil(a: ArrayView2<f64>, b: ArrayView2<f64>) -> Result<()> {
    let n = a.nrows();
    if a.ncols() != n {
        return Err(shape_mismatch("left-hand matrix columns", n, a.ncols()));
    }
    if b.dim() != (n, n) {
        return Err(shape_mismatch("right-hand matrix size", n, b.nrows()));
    }
    if a.iter().chain(b.iter()).any(|v| !v.is_finite()) {
        return Err(TransferError::NumericalInstability(
            "objective matrices contain non-finite entries".into(),
        ));
    }
    Ok(())
}

/// `(K·M·Kᵗ + lamb·I, K·H·Kᵗ)`.
pub fn objective_matrices(
    k: ArrayView2<f64>,
    m: ArrayView2<f64>,
    h: ArrayView2<f64>,
    lamb: f64,
) -> Result<(Array2<f64>, Array2<f64>)> {
    let n = k.ncols();
    if m.dim() != (n, n) {
        return Err(shape_mismatch("discrepancy matrix size", n, m.nrows()));
    }
    if h.dim() != (n, n) {
        return Err(shape_mismatch("centering matrix size", n, h.nrows()));
    }

    let mut a = k.dot(&m).dot(&k.t());
    a.diag_mut().mapv_inplace(|v| v + lamb);
    let b = k.dot(&h).dot(&k.t());
    Ok((a, b))
}

/// Picks the `dim` leading eigenvectors under `order` as columns of the basis.
pub fn select(eig: &GeneralizedEigen, dim: usize, order: EigenOrder) -> Result<Array2<f64>> {
    let available = eig.values.len();
    if dim == 0 || dim > available {
        return Err(TransferError::InvalidDimension { dim, available });
    }

    let mut ranked: Vec<usize> = (0..available).collect();
    match order {
        EigenOrder::Ascending => ranked.sort_by(|&i, &j| eig.values[i].total_cmp(&eig.values[j])),
        EigenOrder::Descending => ranked.sort_by(|&i, &j| eig.values[j].total_cmp(&eig.values[i])),
    }
    ranked.truncate(dim);

    for &i in &ranked {
        if eig.imaginary[i] > IMAGINARY_TOLERANCE {
            return Err(TransferError::NumericalInstability(format!(
                "eigenpair {} has relative imaginary residue {:e}",
                i, eig.imaginary[i]
            )));
        }
    }
    let infinite = ranked.iter().filter(|&&i| eig.values[i].is_infinite()).count();
    if infinite > 0 {
        warn!(
            "{} of {} selected eigenvalues are infinite, basis includes the null space of b",
            infinite, dim
        );
    }

    Ok(eig.vectors.select(Axis(1), &ranked))
}

/// Builds the objective pencil, solves it and returns the `n_eye × dim` basis `A`.
pub fn transfer_basis<S: EigenSolver + ?Sized>(
    solver: &S,
    k: ArrayView2<f64>,
    m: ArrayView2<f64>,
    h: ArrayView2<f64>,
    lamb: f64,
    dim: usize,
    order: EigenOrder,
) -> Result<Array2<f64>> {
    let n_eye = k.nrows();
    if dim == 0 || dim > n_eye {
        return Err(TransferError::InvalidDimension {
            dim,
            available: n_eye,
        });
    }

    let (a, b) = objective_matrices(k, m, h, lamb)?;
    let eig = solver.solve(a.view(), b.view())?;
    select(&eig, dim, order)
}
