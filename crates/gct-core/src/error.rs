//! Unified error types for the gct ecosystem
//!
//! This module provides a common error type [`GctError`] that can represent
//! errors from any part of the translation pipeline. The variants follow the
//! pipeline's error taxonomy: configuration problems are fatal and abort
//! before any component is built, per-object data problems are recoverable
//! (logged and skipped by the builders), and format-coverage gaps surface as
//! [`GctError::Unsupported`] so they are never silently worked around.

use thiserror::Error;

/// Unified error type for all gct operations.
#[derive(Error, Debug)]
pub enum GctError {
    /// I/O errors (file access, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Data validation errors (per-object; recoverable by skipping)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors (missing mandatory file/key, unknown model name)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Model selection/identification errors (ambiguous or missing model)
    #[error("Model error: {0}")]
    Model(String),

    /// A record or table shape outside the recognized format set.
    ///
    /// Signals a real gap in source-format coverage; callers must not
    /// swallow this.
    #[error("Unsupported format: {0}")]
    Unsupported(String),

    /// Cross-entity consistency errors (e.g. mismatched time series lengths)
    #[error("Consistency error: {0}")]
    Consistency(String),

    /// Unit/quantity errors (incompatible kinds, non-finite magnitudes)
    #[error("Unit error: {0}")]
    Unit(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using GctError.
pub type GctResult<T> = Result<T, GctError>;

impl From<anyhow::Error> for GctError {
    fn from(err: anyhow::Error) -> Self {
        GctError::Other(err.to_string())
    }
}

impl From<String> for GctError {
    fn from(s: String) -> Self {
        GctError::Other(s)
    }
}

impl From<&str> for GctError {
    fn from(s: &str) -> Self {
        GctError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for GctError {
    fn from(err: serde_json::Error) -> Self {
        GctError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GctError::Config("missing key 'xml_file'".into());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("xml_file"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: GctError = io_err.into();
        assert!(matches!(err, GctError::Io(_)));
    }

    #[test]
    fn test_question_mark_operator() {
        fn inner() -> GctResult<()> {
            Err(GctError::Unsupported("columns [a, b]".into()))
        }

        fn outer() -> GctResult<()> {
            inner()?;
            Ok(())
        }

        assert!(outer().is_err());
    }
}
