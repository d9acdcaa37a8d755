//! partview-io: model file readers for the partview viewer.
//!
//! Every supported format is read into the same [`SceneRoot`] arena, so the
//! viewer never needs to know where a model came from.
//!
//! # Supported Formats
//!
//! | Format | Extensions | Reader | Result |
//! |--------|------------|--------|--------|
//! | STL (ASCII, binary) | `.stl` | `stl_io` | one mesh node |
//! | Wavefront OBJ | `.obj` | `tobj` | one mesh node per object/group |
//! | glTF 2.0 | `.gltf`, `.glb` | built-in | node hierarchy of the default scene |
//! | PLY (ASCII, binary) | `.ply` | `ply-rs` | one mesh node, faces optional |
//! | 3MF | `.3mf` | `zip` + `quick-xml` | one mesh node per built object |
//!
//! # Quick Start
//!
//! ```ignore
//! use partview_io::load;
//!
//! let loaded = load(&bytes, "bracket.stl")?;
//! println!("{} meshes", loaded.scene.mesh_count());
//! ```
//!
//! Dispatch is by extension only. An unknown extension fails with
//! [`LoadError::UnsupportedFormat`] before any bytes are parsed; a file whose
//! content does not match its extension fails with [`LoadError::Parse`].

pub mod error;
pub mod format;
pub mod formats;
pub mod registry;
pub mod scene;

pub use error::{IoError, LoadError, Result};
pub use format::{file_extension, ModelFormat};
pub use registry::{FormatReader, FormatRegistry, LoadedScene};
pub use scene::{
    AlphaMode, BoundingBox, Material, NodeId, PhongMaterial, Placement, SceneMetadata,
    SceneNode, SceneRoot, Surface, TriangleMesh,
};

/// Load `data`, choosing the reader from the extension of `file_name`.
///
/// `file_name` may be a bare name, a path or a URL path with a query string.
pub fn load(data: &[u8], file_name: &str) -> std::result::Result<LoadedScene, LoadError> {
    FormatRegistry::with_defaults().load(data, file_name)
}

/// Load `data` as an explicit format.
pub fn read_as(data: &[u8], format: ModelFormat) -> std::result::Result<SceneRoot, LoadError> {
    FormatRegistry::with_defaults().read_as(data, format)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE_OBJ: &[u8] = b"o Bracket\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";

    #[test]
    fn test_load_by_file_name() {
        let loaded = load(TRIANGLE_OBJ, "/uploads/p1/bracket.OBJ?v=2").unwrap();
        assert_eq!(loaded.format, ModelFormat::WavefrontText);
        assert_eq!(loaded.scene.mesh_count(), 1);
    }

    #[test]
    fn test_unsupported_extension() {
        let err = load(TRIANGLE_OBJ, "bracket.fbx").unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedFormat { .. }));
        assert_eq!(err.format(), None);
    }

    #[test]
    fn test_renamed_file_is_load_error() {
        // OBJ text with an STL extension
        let err = load(TRIANGLE_OBJ, "bracket.stl").unwrap_err();
        assert_eq!(err.format(), Some(ModelFormat::TriangleBinary));
    }

    #[test]
    fn test_read_as_explicit_format() {
        let scene = read_as(TRIANGLE_OBJ, ModelFormat::WavefrontText).unwrap();
        assert_eq!(scene.metadata.source_format, Some(ModelFormat::WavefrontText));
    }
}
