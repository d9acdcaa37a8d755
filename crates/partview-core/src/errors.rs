//! Error types for value parsing.

use thiserror::Error;

/// Errors raised when a wire value cannot be turned into a core type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("Invalid color format: {value}")]
    InvalidColor { value: String },

    #[error("Unknown material preset: {value}")]
    UnknownPreset { value: String },

    #[error("Invalid part key '{key}': expected a non-negative integer")]
    InvalidPartKey { key: String },
}
