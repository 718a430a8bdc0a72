use thiserror::Error;

use crate::discrepancy::Domain;

/// Errors raised while learning or applying a transfer subspace.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("invalid kernel type `{0}`: expected one of primal, linear, rbf")]
    InvalidKernelType(String),

    #[error("invalid dimension {dim}: must lie in 1..={available}")]
    InvalidDimension { dim: usize, available: usize },

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("shape mismatch in {context}: expected {expected}, found {found}")]
    ShapeMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("{0} domain contains no samples")]
    EmptyDomain(&'static str),

    #[error("column {index} has zero Euclidean norm")]
    DegenerateColumn { index: usize },

    #[error("numerical instability: {0}")]
    NumericalInstability(String),

    #[error("class {class} has no members in the {domain} batch")]
    EmptyClass { class: usize, domain: Domain },

    #[error("classifier failure: {0}")]
    Classifier(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, TransferError>;

pub(crate) fn shape_mismatch(context: &'static str, expected: usize, found: usize) -> TransferError {
    TransferError::ShapeMismatch {
        context,
        expected,
        found,
    }
}
