//! Error types for projection operations.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProjectionError {
    #[error("invalid projection parameters: {0}")]
    InvalidParameters(String),

    #[error("unknown builtin projection: {0}")]
    UnknownBuiltin(String),

    #[error("coordinate arrays differ in length: {0} vs {1}")]
    LengthMismatch(usize, usize),
}

pub type Result<T> = std::result::Result<T, ProjectionError>;
