//! Metadata types for SceneRoot.

use serde::{Deserialize, Serialize};

use crate::format::ModelFormat;

/// Scene-level metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneMetadata {
    /// Format the scene was read from.
    pub source_format: Option<ModelFormat>,
    /// Software that created the file, when the format records it.
    pub generator: Option<String>,
    /// Copyright notice.
    pub copyright: Option<String>,
    /// Unit declared by the file (3MF `unit` attribute).
    pub unit: Option<String>,
}
