//! Error types shared by the export pipeline

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, CommonError>;

/// Errors raised while decoding source files or encoding row sets
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Decompression failed: {0}")]
    Decompression(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("Unexpected data shape: {0}")]
    UnexpectedShape(String),

    #[error("Invalid UTF-8 content: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

impl CommonError {
    /// True when the error comes from an unrecognized file suffix
    pub fn is_unsupported_format(&self) -> bool {
        matches!(self, CommonError::UnsupportedFormat(_))
    }
}
