use log::debug;
use ndarray::{s, Array2, ArrayView2};

use crate::error::{shape_mismatch, Result, TransferError};
use crate::kernel::Kernel;
use crate::utils::{Direction, UnitNorm, ZeroNorm};

/// `Z = Aᵗ·K` with every column (sample) scaled to unit norm.
///
/// Columns with zero norm are left as they are and logged.
pub fn project(k: ArrayView2<f64>, basis: ArrayView2<f64>) -> Result<Array2<f64>> {
    if basis.nrows() != k.nrows() {
        return Err(shape_mismatch("projection basis rows", k.nrows(), basis.nrows()));
    }
    let mut z = basis.t().dot(&k);
    z.unit_normalize(Direction::Column, ZeroNorm::Skip)?;
    debug!("projected {} samples onto {} components", z.ncols(), z.nrows());
    Ok(z)
}

/// Splits a `dim × (ns + nt)` latent matrix into sample-major source and
/// target blocks.
pub fn split_domains(z: ArrayView2<f64>, ns: usize) -> Result<(Array2<f64>, Array2<f64>)> {
    let n = z.ncols();
    if ns == 0 || ns >= n {
        return Err(TransferError::InvalidParameter {
            name: "ns",
            reason: format!("split point {} must lie strictly inside 0..{}", ns, n),
        });
    }
    let source = z.slice(s![.., ..ns]).t().to_owned();
    let target = z.slice(s![.., ns..]).t().to_owned();
    Ok((source, target))
}

/// Maps unseen samples (`x_new`, one sample per row) through a basis learned on
/// the training columns `x_train`.
///
/// Kernels use the cross kernel `K(x_new, x_train)·A`; primal uses `x_new·A`.
/// The result is not column-normalized.
pub fn project_out_of_sample(
    kernel: &Kernel,
    x_new: ArrayView2<f64>,
    x_train: ArrayView2<f64>,
    basis: ArrayView2<f64>,
) -> Result<Array2<f64>> {
    if x_new.ncols() != x_train.nrows() {
        return Err(shape_mismatch("new batch feature dimension", x_train.nrows(), x_new.ncols()));
    }

    let k = match kernel {
        Kernel::Primal => x_new.to_owned(),
        _ => kernel.cross(x_new.t(), x_train)?,
    };
    if k.ncols() != basis.nrows() {
        return Err(shape_mismatch("projection basis rows", k.ncols(), basis.nrows()));
    }
    Ok(k.dot(&basis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_project_normalizes_columns() {
        let k = array![[1.0, 0.0, 2.0], [0.0, 3.0, 2.0]];
        let basis = array![[1.0, 1.0], [0.0, 1.0]];
        let z = project(k.view(), basis.view()).unwrap();

        assert_eq!(z.dim(), (2, 3));
        for col in z.columns() {
            assert_abs_diff_eq!(col.dot(&col), 1.0, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(z[[0, 0]], std::f64::consts::FRAC_1_SQRT_2, epsilon = 1e-12);
    }

    #[test]
    fn test_project_keeps_zero_columns() {
        let k = array![[1.0, 0.0], [0.0, 0.0]];
        let basis = array![[1.0], [0.0]];
        let z = project(k.view(), basis.view()).unwrap();
        assert_eq!(z, array![[1.0, 0.0]]);
    }

    #[test]
    fn test_project_shape_mismatch() {
        let k = array![[1.0, 0.0], [0.0, 1.0]];
        let basis = array![[1.0], [0.0], [0.0]];
        assert!(project(k.view(), basis.view()).is_err());
    }

    #[test]
    fn test_split_domains() {
        let z = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let (source, target) = split_domains(z.view(), 1).unwrap();
        assert_eq!(source, array![[1.0, 4.0]]);
        assert_eq!(target, array![[2.0, 5.0], [3.0, 6.0]]);

        assert!(split_domains(z.view(), 3).is_err());
        assert!(split_domains(z.view(), 0).is_err());
    }

    #[test]
    fn test_out_of_sample_primal() {
        let x_train = array![[1.0, 0.0, 1.0], [0.0, 1.0, 1.0]];
        let basis = array![[1.0], [2.0]];
        let x_new = array![[3.0, 4.0]];

        let projected =
            project_out_of_sample(&Kernel::Primal, x_new.view(), x_train.view(), basis.view()).unwrap();
        assert_eq!(projected, array![[11.0]]);
    }

    #[test]
    fn test_out_of_sample_linear() {
        let x_train = array![[1.0, 0.0, 1.0], [0.0, 1.0, 1.0]];
        let basis = array![[1.0], [0.0], [1.0]];
        let x_new = array![[3.0, 4.0], [1.0, 0.0]];

        let projected =
            project_out_of_sample(&Kernel::Linear, x_new.view(), x_train.view(), basis.view()).unwrap();
        // K = [[3, 4, 7], [1, 0, 1]]
        assert_eq!(projected, array![[10.0], [2.0]]);
    }

    #[test]
    fn test_out_of_sample_feature_mismatch() {
        let x_train = array![[1.0, 0.0], [0.0, 1.0]];
        let basis = array![[1.0], [0.0]];
        let x_new = array![[3.0, 4.0, 5.0]];
        assert!(matches!(
            project_out_of_sample(&Kernel::Rbf { gamma: 1.0 }, x_new.view(), x_train.view(), basis.view()),
            Err(TransferError::ShapeMismatch { .. })
        ));
    }
}
