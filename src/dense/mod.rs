use log::warn;
use nalgebra::DMatrix;
use ndarray::{Array2, ArrayBase, ArrayView2, Data, Ix2};
use nshare::{IntoNalgebra, IntoNdarray2};

use crate::error::{Result, TransferError};
use crate::utils::{Direction, FrobeniusNorm, UnitNorm, ZeroNorm};

impl UnitNorm for Array2<f64> {
    fn unit_normalize(&mut self, direction: Direction, on_zero: ZeroNorm) -> Result<Vec<f64>> {
        let lanes = match direction {
            Direction::Row => self.rows_mut(),
            Direction::Column => self.columns_mut(),
        };

        let mut norms = Vec::new();
        for (index, mut lane) in lanes.into_iter().enumerate() {
            let norm = lane.dot(&lane).sqrt();
            if norm > 0.0 && norm.is_finite() {
                lane.mapv_inplace(|v| v / norm);
            } else {
                match on_zero {
                    ZeroNorm::Reject => return Err(TransferError::DegenerateColumn { index }),
                    ZeroNorm::Skip => {
                        warn!("{:?} {} has norm {}, leaving it unnormalized", direction, index, norm)
                    }
                }
            }
            norms.push(norm);
        }
        Ok(norms)
    }
}

impl<S: Data<Elem = f64>> FrobeniusNorm for ArrayBase<S, Ix2> {
    fn frobenius_norm(&self) -> f64 {
        self.iter().map(|v| v * v).sum::<f64>().sqrt()
    }
}

pub(crate) fn to_nalgebra(x: ArrayView2<f64>) -> DMatrix<f64> {
    x.into_nalgebra().clone_owned()
}

pub(crate) fn to_ndarray(x: DMatrix<f64>) -> Array2<f64> {
    x.into_ndarray2().to_owned()
}
