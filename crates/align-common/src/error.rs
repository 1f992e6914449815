//! Error types shared by every alignment crate.

use std::fmt;

use thiserror::Error;

/// The property axis (or attribute block) a schema check was performed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyAxis {
    Space,
    Time,
    Uncertainty,
    /// The serialized property block itself (missing or unparsable).
    Attributes,
}

impl fmt::Display for PropertyAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PropertyAxis::Space => "space",
            PropertyAxis::Time => "time",
            PropertyAxis::Uncertainty => "uncertainty",
            PropertyAxis::Attributes => "properties",
        };
        f.write_str(name)
    }
}

/// Errors raised by dataset validation and alignment.
#[derive(Error, Debug)]
pub enum AlignError {
    /// Dataset does not conform to the shape contract of its property tags.
    #[error("{axis}: {message}")]
    Schema { axis: PropertyAxis, message: String },

    /// Deliberately unimplemented alignment or interpolation path.
    #[error("not implemented: {0}")]
    Unsupported(String),

    /// Unknown registry name, invalid option value or missing required setting.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Input violates a precondition of the operation (chunking, stacking, ...).
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// A label requested by a selection is absent from the dimension index.
    #[error("label {label} not found along dimension '{dim}'")]
    MissingLabel { dim: String, label: String },

    /// Inconsistent dimension names, sizes or array shapes.
    #[error("dimension error: {0}")]
    Dimension(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AlignError {
    /// Create a Schema error.
    pub fn schema(axis: PropertyAxis, message: impl Into<String>) -> Self {
        Self::Schema {
            axis,
            message: message.into(),
        }
    }

    /// Create an Unsupported error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Create a Configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a Precondition error.
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    /// Create a Dimension error.
    pub fn dimension(msg: impl Into<String>) -> Self {
        Self::Dimension(msg.into())
    }

    /// Create a MissingLabel error.
    pub fn missing_label(dim: impl Into<String>, label: impl fmt::Display) -> Self {
        Self::MissingLabel {
            dim: dim.into(),
            label: label.to_string(),
        }
    }
}

impl From<ndarray::ShapeError> for AlignError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::Dimension(err.to_string())
    }
}

/// Result type for alignment operations.
pub type Result<T> = std::result::Result<T, AlignError>;
