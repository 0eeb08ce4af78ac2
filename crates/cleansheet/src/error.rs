//! Error types for loading and cleaning tables.
//!
//! Two boundaries can fail: [`LoadError`] when turning uploaded bytes into a
//! table, and [`CleaningError`] when the dataframe engine itself reports a
//! failure mid-pipeline. Malformed data never produces an error; it only
//! shapes the cleaning log.
//!
//! Both enums serialize as `{ code, message }` so a front end can display
//! them without matching on Rust types.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// Failure to turn an uploaded file into a table.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The file name does not map to a supported file kind.
    #[error("Unsupported file extension: '{0}'")]
    UnsupportedExtension(String),

    /// The decoded contents are not a well-formed table.
    #[error("Failed to parse table: {0}")]
    Parse(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LoadError {
    /// Get error code for frontend handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnsupportedExtension(_) => "UNSUPPORTED_EXTENSION",
            Self::Parse(_) => "PARSE_FAILED",
            Self::Io(_) => "IO_ERROR",
        }
    }
}

impl From<polars::error::PolarsError> for LoadError {
    fn from(err: polars::error::PolarsError) -> Self {
        LoadError::Parse(err.to_string())
    }
}

impl Serialize for LoadError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("LoadError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Failure raised by the cleaning pipeline.
///
/// Only the dataframe engine can make the pipeline fail. Empty input is
/// answered with an empty table and a one-entry log instead.
#[derive(Error, Debug)]
pub enum CleaningError {
    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// IO error wrapper (export).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<CleaningError>,
    },
}

impl CleaningError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        CleaningError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get error code for frontend handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Polars(_) => "POLARS_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }
}

impl Serialize for CleaningError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("CleaningError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for cleaning operations.
pub type Result<T> = std::result::Result<T, CleaningError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| CleaningError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::error::PolarsError;

    #[test]
    fn test_load_error_code() {
        assert_eq!(
            LoadError::UnsupportedExtension("pdf".to_string()).error_code(),
            "UNSUPPORTED_EXTENSION"
        );
        assert_eq!(LoadError::Parse("bad".to_string()).error_code(), "PARSE_FAILED");
    }

    #[test]
    fn test_load_error_serialization() {
        let error = LoadError::UnsupportedExtension("docx".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("UNSUPPORTED_EXTENSION"));
        assert!(json.contains("docx"));
    }

    #[test]
    fn test_polars_error_becomes_parse_error() {
        let err: LoadError = PolarsError::NoData("empty".into()).into();
        assert_eq!(err.error_code(), "PARSE_FAILED");
    }

    #[test]
    fn test_with_context_preserves_code() {
        let error = CleaningError::Polars(PolarsError::NoData("x".into()))
            .with_context("During imputation");
        assert!(error.to_string().contains("During imputation"));
        assert_eq!(error.error_code(), "POLARS_ERROR");
    }

    #[test]
    fn test_result_ext_on_polars_result() {
        let res: std::result::Result<(), PolarsError> =
            Err(PolarsError::ColumnNotFound("age".into()));
        let err = res.context("Reading column").unwrap_err();
        assert!(matches!(err, CleaningError::WithContext { .. }));
    }
}
