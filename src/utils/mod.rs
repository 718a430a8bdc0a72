use crate::error::Result;

/// Axis along which a per-lane operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Row,
    Column,
}

/// What to do with a lane whose Euclidean norm is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZeroNorm {
    /// Fail with `TransferError::DegenerateColumn`.
    Reject,
    /// Leave the lane untouched and log a warning.
    Skip,
}

pub trait UnitNorm {
    /// Scales every lane along `direction` to unit Euclidean norm and returns
    /// the norms measured before scaling.
    fn unit_normalize(&mut self, direction: Direction, on_zero: ZeroNorm) -> Result<Vec<f64>>;
}

pub trait FrobeniusNorm {
    fn frobenius_norm(&self) -> f64;
}
