//! Format registry for managing readers.

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::error::{IoError, LoadError};
use crate::format::{file_extension, ModelFormat};
use crate::scene::SceneRoot;

use super::traits::FormatReader;

/// A scene together with the format it was read as.
#[derive(Debug, Clone)]
pub struct LoadedScene {
    pub format: ModelFormat,
    pub scene: SceneRoot,
}

/// Registry of format readers.
///
/// Dispatch is by file extension only. The reader's `can_read` check is used
/// to reject content that does not match the claimed format; it never
/// redirects to a different reader.
pub struct FormatRegistry {
    readers: IndexMap<String, Box<dyn FormatReader>>,
    extension_to_reader: IndexMap<String, String>,
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            readers: IndexMap::new(),
            extension_to_reader: IndexMap::new(),
        }
    }

    /// Create a registry with the built-in readers.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        #[cfg(feature = "stl")]
        registry.register_reader(crate::formats::stl::StlReader::new());

        #[cfg(feature = "obj")]
        registry.register_reader(crate::formats::obj::ObjReader::new());

        #[cfg(feature = "gltf")]
        registry.register_reader(crate::formats::gltf::GltfReader::new());

        #[cfg(feature = "ply")]
        registry.register_reader(crate::formats::ply::PlyReader::new());

        #[cfg(feature = "threemf")]
        registry.register_reader(crate::formats::threemf::ThreeMfReader::new());

        registry
    }

    /// Register a format reader.
    pub fn register_reader<R: FormatReader + 'static>(&mut self, reader: R) {
        let name = reader.name().to_lowercase();

        for ext in reader.extensions() {
            self.extension_to_reader
                .insert(ext.to_lowercase(), name.clone());
        }

        self.readers.insert(name, Box::new(reader));
    }

    /// Get a reader by registry name.
    pub fn get_reader(&self, name: &str) -> Option<&dyn FormatReader> {
        self.readers.get(&name.to_lowercase()).map(|r| r.as_ref())
    }

    /// Get the reader for a format tag.
    pub fn reader_for_format(&self, format: ModelFormat) -> Option<&dyn FormatReader> {
        self.readers
            .values()
            .find(|r| r.format() == format)
            .map(|r| r.as_ref())
    }

    /// Get a reader by file extension.
    pub fn reader_for_extension(&self, ext: &str) -> Option<&dyn FormatReader> {
        let ext_lower = ext.trim_start_matches('.').to_lowercase();
        let name = self.extension_to_reader.get(&ext_lower)?;
        self.get_reader(name)
    }

    /// List all registered reader names.
    pub fn reader_names(&self) -> impl Iterator<Item = &str> {
        self.readers.keys().map(String::as_str)
    }

    /// All extensions with a registered reader.
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.extension_to_reader.keys().map(String::as_str)
    }

    /// Resolve a file name to a format without reading anything.
    pub fn dispatch(&self, file_name: &str) -> Result<ModelFormat, LoadError> {
        let extension = file_extension(file_name);
        self.reader_for_extension(&extension)
            .map(|r| r.format())
            .ok_or(LoadError::UnsupportedFormat { extension })
    }

    /// Read `data` as `format`.
    pub fn read_as(&self, data: &[u8], format: ModelFormat) -> Result<SceneRoot, LoadError> {
        let reader = self
            .reader_for_format(format)
            .ok_or_else(|| LoadError::UnsupportedFormat {
                extension: format.reader_name().to_string(),
            })?;

        if !reader.can_read(data) {
            return Err(LoadError::parse(format, IoError::ContentMismatch(format)));
        }

        let mut scene = reader
            .read(data)
            .map_err(|source| LoadError::parse(format, source))?;
        scene.metadata.source_format = Some(format);

        debug!(
            format = %format,
            bytes = data.len(),
            nodes = scene.node_count(),
            meshes = scene.mesh_count(),
            "parsed model"
        );
        Ok(scene)
    }

    /// Dispatch on the file name, then read.
    pub fn load(&self, data: &[u8], file_name: &str) -> Result<LoadedScene, LoadError> {
        let format = self.dispatch(file_name)?;
        let scene = self.read_as(data, format)?;
        info!(file = file_name, format = %format, meshes = scene.mesh_count(), "loaded model");
        Ok(LoadedScene { format, scene })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::scene::{SceneNode, TriangleMesh};

    struct MockReader;

    impl FormatReader for MockReader {
        fn name(&self) -> &'static str {
            "mock"
        }

        fn format(&self) -> ModelFormat {
            ModelFormat::WavefrontText
        }

        fn extensions(&self) -> &[&'static str] {
            &["mock", "mck"]
        }

        fn can_read(&self, data: &[u8]) -> bool {
            data.starts_with(b"MOCK")
        }

        fn read(&self, _data: &[u8]) -> Result<SceneRoot> {
            let mut scene = SceneRoot::new();
            let g = scene.add_geometry(TriangleMesh::new());
            scene.add_root(SceneNode::with_geometry("only", g));
            Ok(scene)
        }
    }

    #[test]
    fn test_register_reader() {
        let mut registry = FormatRegistry::new();
        registry.register_reader(MockReader);

        assert!(registry.get_reader("mock").is_some());
        assert!(registry.get_reader("Mock").is_some());
        assert!(registry.reader_for_extension("mock").is_some());
        assert!(registry.reader_for_extension(".MCK").is_some());
    }

    #[test]
    fn test_load_dispatches_by_extension() {
        let mut registry = FormatRegistry::new();
        registry.register_reader(MockReader);

        let loaded = registry.load(b"MOCK data", "part.mck").unwrap();
        assert_eq!(loaded.format, ModelFormat::WavefrontText);
        assert_eq!(loaded.scene.mesh_count(), 1);
        assert_eq!(
            loaded.scene.metadata.source_format,
            Some(ModelFormat::WavefrontText)
        );
    }

    #[test]
    fn test_unknown_extension_rejected_before_read() {
        let mut registry = FormatRegistry::new();
        registry.register_reader(MockReader);

        let err = registry.load(b"MOCK data", "part.fbx").unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedFormat { ref extension } if extension == "fbx"));
    }

    #[test]
    fn test_mismatched_content_is_load_error() {
        let mut registry = FormatRegistry::new();
        registry.register_reader(MockReader);

        let err = registry.load(b"not it", "part.mock").unwrap_err();
        assert!(matches!(
            err,
            LoadError::Parse {
                source: IoError::ContentMismatch(ModelFormat::WavefrontText),
                ..
            }
        ));
    }

    #[test]
    fn test_default_registry_follows_features() {
        let registry = FormatRegistry::with_defaults();
        let enabled = [
            (ModelFormat::TriangleBinary, cfg!(feature = "stl")),
            (ModelFormat::WavefrontText, cfg!(feature = "obj")),
            (ModelFormat::Gltf, cfg!(feature = "gltf")),
            (ModelFormat::PointCloudBinary, cfg!(feature = "ply")),
            (ModelFormat::CompressedTriangleArchive, cfg!(feature = "threemf")),
        ];
        for (format, on) in enabled {
            assert_eq!(
                registry.reader_for_format(format).is_some(),
                on,
                "reader for {format}"
            );
        }
        if cfg!(feature = "gltf") {
            assert_eq!(registry.dispatch("a.glb").unwrap(), ModelFormat::Gltf);
        } else {
            assert!(registry.dispatch("a.glb").is_err());
        }
    }
}
