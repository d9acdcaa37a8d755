//! Error types for the viewer.

use partview_core::PartId;
use thiserror::Error;

/// Result type for viewer operations.
pub type Result<T> = std::result::Result<T, ViewerError>;

/// Errors raised by viewer operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewerError {
    /// The operation needs a loaded model and none is active.
    #[error("no model is loaded")]
    NoActiveModel,

    /// The part id does not exist in the active model.
    #[error("unknown part {0}")]
    UnknownPart(PartId),
}
