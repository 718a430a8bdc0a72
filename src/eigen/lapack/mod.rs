use nalgebra_lapack::GeneralizedEigen as QzEigen;
use ndarray::{Array1, Array2, ArrayView2};

use crate::dense::to_nalgebra;
use crate::error::{Result, TransferError};
use crate::utils::{Direction, UnitNorm, ZeroNorm};

use super::{check_pencil, EigenSolver, GeneralizedEigen, SINGULAR_TOLERANCE};

/// General QZ solver for `a·v = w·b·v`.
///
/// Makes no symmetry assumption, so eigenpairs may come back complex. The real
/// part is kept and the relative size of the imaginary part is recorded, which
/// lets [`super::select`] reject contaminated pairs.
#[derive(Debug, Clone, Copy)]
pub struct LapackSolver {
    tolerance: f64,
}

impl LapackSolver {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }
}

impl Default for LapackSolver {
    fn default() -> Self {
        Self::new(SINGULAR_TOLERANCE)
    }
}

impl EigenSolver for LapackSolver {
    fn solve(&self, a: ArrayView2<f64>, b: ArrayView2<f64>) -> Result<GeneralizedEigen> {
        check_pencil(a, b)?;
        let n = a.nrows();

        let qz = QzEigen::try_new(to_nalgebra(a), to_nalgebra(b)).ok_or_else(|| {
            TransferError::NumericalInstability("QZ decomposition did not converge".into())
        })?;
        let raw = qz.raw_eigenvalues();
        let (_, right) = qz.eigenvectors();

        let mut values = Array1::zeros(n);
        let mut vectors = Array2::zeros((n, n));
        let mut imaginary = Array1::zeros(n);

        for i in 0..n {
            let (alpha, beta) = raw[i];
            let magnitude = alpha.norm();
            values[i] = if beta.abs() <= self.tolerance * magnitude || beta == 0.0 {
                f64::INFINITY
            } else {
                alpha.re / beta
            };

            let column = right.column(i);
            let real_norm = column.iter().map(|z| z.re * z.re).sum::<f64>().sqrt();
            let imag_norm = column.iter().map(|z| z.im * z.im).sum::<f64>().sqrt();
            let value_residue = if magnitude > 0.0 { alpha.im.abs() / magnitude } else { 0.0 };
            let vector_residue = if real_norm > 0.0 { imag_norm / real_norm } else { f64::INFINITY };
            imaginary[i] = value_residue.max(vector_residue);

            for (r, z) in column.iter().enumerate() {
                vectors[[r, i]] = z.re;
            }
        }
        vectors.unit_normalize(Direction::Column, ZeroNorm::Skip)?;

        Ok(GeneralizedEigen {
            values,
            vectors,
            imaginary,
        })
    }
}
