//! Crate-wide error type.
//!
//! Every fallible entry point returns `Result<_, CollocationError>`
//! synchronously; nothing here is recovered internally. The mu-cache's
//! out-of-range accessor is deliberately not represented here: it is a
//! programmer error and panics instead (see `collocation::MuCache`).

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollocationError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("singular matrix at row {row}")]
    SingularMatrix { row: usize },

    #[error("tridiagonal eigensolver did not converge after {sweeps} sweeps")]
    ConvergenceFailed { sweeps: usize },

    #[error("scalars from mismatched precision contexts were combined")]
    PrecisionMismatch,
}

pub type Result<T> = std::result::Result<T, CollocationError>;
