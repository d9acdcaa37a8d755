//! Error types for project sync.

use partview_io::LoadError;
use partview_viewer::ViewerError;
use thiserror::Error;

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors that can occur while talking to the project store or loading a
/// project into the viewer.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("unsupported model format: '{extension}'")]
    UnsupportedFormat { extension: String },

    #[error(transparent)]
    Load(LoadError),

    /// Rejected locally or by the store with a 400.
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("not authorized: {0}")]
    Authorization(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Unexpected status, a body that is not JSON, or `ok: false`.
    #[error("unexpected store response ({status}): {body}")]
    Protocol { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),

    #[error(transparent)]
    Viewer(#[from] ViewerError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SyncError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::NotFound(_))
    }
}

impl From<LoadError> for SyncError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::UnsupportedFormat { extension } => SyncError::UnsupportedFormat { extension },
            other => SyncError::Load(other),
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        SyncError::Network(err.to_string())
    }
}
