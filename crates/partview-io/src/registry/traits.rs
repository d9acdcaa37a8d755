//! Format reader trait.

use crate::error::Result;
use crate::format::ModelFormat;
use crate::scene::SceneRoot;

/// Trait for format readers.
///
/// Implement this trait to add support for reading a new file format.
/// Readers are pure: they see only the supplied bytes and never touch the
/// scene placement.
pub trait FormatReader: Send + Sync {
    /// Registry name (e.g. "stl", "gltf").
    fn name(&self) -> &'static str;

    /// The format tag this reader produces scenes for.
    fn format(&self) -> ModelFormat;

    /// Supported file extensions (e.g. ["gltf", "glb"]).
    fn extensions(&self) -> &[&'static str];

    /// Cheap structural check (magic bytes, header) without a full parse.
    fn can_read(&self, data: &[u8]) -> bool;

    /// Parse the data into a SceneRoot.
    fn read(&self, data: &[u8]) -> Result<SceneRoot>;
}
