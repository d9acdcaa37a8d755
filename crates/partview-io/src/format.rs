//! Format tags and extension dispatch.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LoadError;

/// The five model encodings the loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelFormat {
    /// STL, ASCII or binary.
    TriangleBinary,
    /// Wavefront OBJ.
    WavefrontText,
    /// glTF 2.0, JSON or GLB container.
    Gltf,
    /// PLY, ASCII or binary; faces optional.
    PointCloudBinary,
    /// 3MF (zipped XML).
    CompressedTriangleArchive,
}

impl ModelFormat {
    pub const ALL: [ModelFormat; 5] = [
        ModelFormat::TriangleBinary,
        ModelFormat::WavefrontText,
        ModelFormat::Gltf,
        ModelFormat::PointCloudBinary,
        ModelFormat::CompressedTriangleArchive,
    ];

    /// Look up a format by file extension. Case-insensitive, leading dot
    /// tolerated.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "stl" => Some(ModelFormat::TriangleBinary),
            "obj" => Some(ModelFormat::WavefrontText),
            "gltf" | "glb" => Some(ModelFormat::Gltf),
            "ply" => Some(ModelFormat::PointCloudBinary),
            "3mf" => Some(ModelFormat::CompressedTriangleArchive),
            _ => None,
        }
    }

    /// Dispatch on the extension of a file name or URL path.
    ///
    /// Query strings and fragments are ignored, so
    /// `/uploads/p1/model.STL?v=3` resolves to [`ModelFormat::TriangleBinary`].
    pub fn from_file_name(file_name: &str) -> Result<Self, LoadError> {
        let extension = file_extension(file_name);
        Self::from_extension(&extension).ok_or(LoadError::UnsupportedFormat { extension })
    }

    /// Registry name of the reader that handles this format.
    pub fn reader_name(&self) -> &'static str {
        match self {
            ModelFormat::TriangleBinary => "stl",
            ModelFormat::WavefrontText => "obj",
            ModelFormat::Gltf => "gltf",
            ModelFormat::PointCloudBinary => "ply",
            ModelFormat::CompressedTriangleArchive => "3mf",
        }
    }

    /// Whether the reader yields a bare mesh that needs vertex normals and a
    /// cached bounding box computed before display.
    pub fn needs_normals(&self) -> bool {
        matches!(
            self,
            ModelFormat::TriangleBinary | ModelFormat::PointCloudBinary
        )
    }

    /// Whether models of this format are snapped onto the ground plane.
    pub fn snaps_to_ground(&self) -> bool {
        matches!(self, ModelFormat::TriangleBinary)
    }
}

impl fmt::Display for ModelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ModelFormat::TriangleBinary => "STL",
            ModelFormat::WavefrontText => "OBJ",
            ModelFormat::Gltf => "glTF",
            ModelFormat::PointCloudBinary => "PLY",
            ModelFormat::CompressedTriangleArchive => "3MF",
        };
        f.write_str(label)
    }
}

/// Lowercased extension of the last path segment, without the dot. Empty if
/// there is none.
pub fn file_extension(file_name: &str) -> String {
    let path = file_name
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    let last = path.rsplit(['/', '\\']).next().unwrap_or_default();
    last.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_dispatch() {
        assert_eq!(
            ModelFormat::from_extension(".STL"),
            Some(ModelFormat::TriangleBinary)
        );
        assert_eq!(ModelFormat::from_extension("glb"), Some(ModelFormat::Gltf));
        assert_eq!(
            ModelFormat::from_extension("3mf"),
            Some(ModelFormat::CompressedTriangleArchive)
        );
        assert_eq!(ModelFormat::from_extension("fbx"), None);
    }

    #[test]
    fn test_file_name_dispatch() {
        assert_eq!(
            ModelFormat::from_file_name("/uploads/p1/bracket.Ply?v=2").unwrap(),
            ModelFormat::PointCloudBinary
        );
        assert_eq!(
            ModelFormat::from_file_name("C:\\models\\lid.obj").unwrap(),
            ModelFormat::WavefrontText
        );
    }

    #[test]
    fn test_unknown_extension_fails_fast() {
        match ModelFormat::from_file_name("drawing.dwg") {
            Err(LoadError::UnsupportedFormat { extension }) => assert_eq!(extension, "dwg"),
            other => panic!("expected UnsupportedFormat, got {:?}", other),
        }
        assert!(matches!(
            ModelFormat::from_file_name("README"),
            Err(LoadError::UnsupportedFormat { extension }) if extension.is_empty()
        ));
    }

    #[test]
    fn test_only_bare_mesh_formats_need_normals() {
        let needing: Vec<_> = ModelFormat::ALL
            .iter()
            .filter(|f| f.needs_normals())
            .collect();
        assert_eq!(
            needing,
            vec![&ModelFormat::TriangleBinary, &ModelFormat::PointCloudBinary]
        );
        assert!(ModelFormat::TriangleBinary.snaps_to_ground());
        assert!(!ModelFormat::Gltf.snaps_to_ground());
    }
}
