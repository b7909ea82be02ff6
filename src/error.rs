//! Error types for the point index.

use thiserror::Error;

/// Point index errors.
#[derive(Error, Debug)]
pub enum SpatioError {
    /// Malformed input: bad coordinates, polygons, radii, dimensions or field names.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// IO error raised by a leaf block source.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A leaf block could not be decoded.
    #[error("Corrupt index: {0}")]
    CorruptIndex(String),

    /// Configuration could not be parsed or failed validation.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SpatioError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        SpatioError::InvalidArgument(message.into())
    }
}

impl From<serde_json::Error> for SpatioError {
    fn from(err: serde_json::Error) -> Self {
        SpatioError::Config(err.to_string())
    }
}

/// Result type for point index operations.
pub type Result<T> = std::result::Result<T, SpatioError>;
