//! Core value types for the partview model pipeline.
//!
//! This crate provides the foundational types shared by the loader, viewer and
//! sync crates:
//! - Part identity and per-part metadata
//! - Material presets and the default part palette
//! - Whole-model transforms (position and rotation in degrees)
//! - Hex colors
//! - Error types for value parsing

pub mod errors;
pub mod part;
pub mod types;

pub use errors::*;
pub use part::*;
pub use types::*;
