//! Error types for partview-io.

use thiserror::Error;

use crate::format::ModelFormat;

/// Result type for reader operations.
pub type Result<T> = std::result::Result<T, IoError>;

/// Errors raised by an individual format reader.
#[derive(Debug, Error)]
pub enum IoError {
    /// Parse error when reading a file.
    #[error("parse error: {message}")]
    ParseError {
        /// Error message.
        message: String,
        /// Byte offset where the error occurred.
        offset: Option<usize>,
    },

    /// Structurally invalid data.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Unsupported feature or version.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// The bytes do not look like the format the extension claims.
    #[error("content is not a valid {0} file")]
    ContentMismatch(ModelFormat),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "gltf")]
    #[error("base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[cfg(feature = "threemf")]
    #[error("archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[cfg(feature = "threemf")]
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),
}

impl IoError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::ParseError {
            message: message.into(),
            offset: None,
        }
    }

    pub fn parse_at(message: impl Into<String>, offset: usize) -> Self {
        Self::ParseError {
            message: message.into(),
            offset: Some(offset),
        }
    }
}

/// Errors surfaced by the loading entry points.
///
/// `UnsupportedFormat` is raised by extension dispatch before any bytes are
/// looked at; `Parse` wraps a reader failure together with the format that
/// was attempted.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unsupported model format: '{extension}'")]
    UnsupportedFormat { extension: String },

    #[error("failed to load {format} model: {source}")]
    Parse {
        format: ModelFormat,
        #[source]
        source: IoError,
    },
}

impl LoadError {
    pub fn parse(format: ModelFormat, source: IoError) -> Self {
        Self::Parse { format, source }
    }

    /// Format that was attempted, if dispatch got that far.
    pub fn format(&self) -> Option<ModelFormat> {
        match self {
            LoadError::UnsupportedFormat { .. } => None,
            LoadError::Parse { format, .. } => Some(*format),
        }
    }
}
