//! Error types for the gridded environment engine.

use thiserror::Error;

/// Errors that can occur while ingesting or querying gridded data.
#[derive(Error, Debug)]
pub enum GridError {
    /// Malformed or unsupported source data (wrong unit, bad time stamp,
    /// mismatched grid). Raised during ingestion only.
    #[error("grid data error: {0}")]
    Data(String),

    /// A query position lies outside the mesh coverage and no sentinel
    /// value is configured.
    #[error("{axis}(s) out of range: {values:?}")]
    Range {
        axis: &'static str,
        values: Vec<f64>,
    },

    /// A query time lies outside the temporal coverage of a series.
    #[error("time span error: {0}")]
    Span(String),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to (de)serialize a configuration or raster document.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl GridError {
    /// Create a Data error.
    pub fn data(msg: impl Into<String>) -> Self {
        Self::Data(msg.into())
    }

    /// Create a Range error for the given axis.
    pub fn range(axis: &'static str, values: Vec<f64>) -> Self {
        Self::Range { axis, values }
    }

    /// Create a Span error.
    pub fn span(msg: impl Into<String>) -> Self {
        Self::Span(msg.into())
    }

    /// Create a Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn is_data_error(&self) -> bool {
        matches!(self, Self::Data(_))
    }

    pub fn is_range_error(&self) -> bool {
        matches!(self, Self::Range { .. })
    }

    pub fn is_span_error(&self) -> bool {
        matches!(self, Self::Span(_))
    }
}

impl From<serde_json::Error> for GridError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for GridError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, GridError>;
