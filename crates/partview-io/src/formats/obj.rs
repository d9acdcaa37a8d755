//! Wavefront OBJ reader.

use std::io::Cursor;

use glam::Vec3;
use tracing::debug;

use crate::error::{IoError, Result};
use crate::format::ModelFormat;
use crate::registry::FormatReader;
use crate::scene::{SceneNode, SceneRoot, TriangleMesh};

/// Reader for OBJ files.
///
/// Every object or group becomes one mesh node, in file order, under a single
/// unnamed group root. Material libraries are never fetched.
pub struct ObjReader;

impl ObjReader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ObjReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Name tobj assigns to geometry that precedes any `o`/`g` statement.
const TOBJ_UNNAMED: &str = "unnamed_object";

fn to_vec3s(flat: &[f32]) -> Vec<Vec3> {
    flat.chunks_exact(3)
        .map(|c| Vec3::new(c[0], c[1], c[2]))
        .collect()
}

impl FormatReader for ObjReader {
    fn name(&self) -> &'static str {
        "obj"
    }

    fn format(&self) -> ModelFormat {
        ModelFormat::WavefrontText
    }

    fn extensions(&self) -> &[&'static str] {
        &["obj"]
    }

    fn can_read(&self, data: &[u8]) -> bool {
        std::str::from_utf8(data).is_ok() && !data.contains(&0)
    }

    fn read(&self, data: &[u8]) -> Result<SceneRoot> {
        let load_opts = tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        };
        let mut cursor = Cursor::new(data);
        let (models, _materials) = tobj::load_obj_buf(&mut cursor, &load_opts, |_| {
            Ok((Vec::new(), Default::default()))
        })
        .map_err(|e| IoError::parse(format!("OBJ: {}", e)))?;

        let mut scene = SceneRoot::new();
        let root = scene.add_root(SceneNode::new(""));

        for model in models {
            let obj_mesh = model.mesh;
            if obj_mesh.positions.is_empty() {
                debug!(object = %model.name, "skipping OBJ object without vertices");
                continue;
            }

            let mut mesh =
                TriangleMesh::from_positions(to_vec3s(&obj_mesh.positions), obj_mesh.indices);
            if obj_mesh.normals.len() == obj_mesh.positions.len() {
                mesh.normals = Some(to_vec3s(&obj_mesh.normals));
            }
            if obj_mesh.vertex_color.len() == obj_mesh.positions.len() {
                mesh.colors = Some(to_vec3s(&obj_mesh.vertex_color));
            }
            mesh.validate()?;

            debug!(
                object = %model.name,
                vertices = mesh.vertex_count(),
                triangles = mesh.triangle_count(),
                "OBJ object"
            );

            let name = if model.name == TOBJ_UNNAMED {
                String::new()
            } else {
                model.name
            };
            let geometry = scene.add_geometry(mesh);
            scene.add_child(root, SceneNode::with_geometry(name, geometry));
        }

        Ok(scene)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_OBJECTS: &str = "\
o Base
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
f 1 2 3 4
o Lid
v 0 0 1
v 1 0 1
v 0 1 1
f 5 6 7
";

    #[test]
    fn test_objects_become_children_in_order() {
        let scene = ObjReader::new().read(TWO_OBJECTS.as_bytes()).unwrap();
        assert_eq!(scene.roots.len(), 1);
        let root = &scene.nodes[scene.roots[0]];
        assert_eq!(root.children.len(), 2);
        assert_eq!(scene.nodes[root.children[0]].name, "Base");
        assert_eq!(scene.nodes[root.children[1]].name, "Lid");
    }

    #[test]
    fn test_quads_are_triangulated() {
        let scene = ObjReader::new().read(TWO_OBJECTS.as_bytes()).unwrap();
        let base = scene.nodes[scene.roots[0]].children[0];
        let mesh = scene.geometry_of(base).unwrap();
        assert_eq!(mesh.triangle_count(), 2);
        assert!(mesh.normals.is_none());
    }

    #[test]
    fn test_anonymous_geometry_has_empty_name() {
        let scene = ObjReader::new()
            .read(b"v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n")
            .unwrap();
        let child = scene.nodes[scene.roots[0]].children[0];
        assert_eq!(scene.nodes[child].name, "");
    }

    #[test]
    fn test_rejects_binary_content() {
        let reader = ObjReader::new();
        assert!(!reader.can_read(&[0x00, 0xFF, 0x10]));
        assert!(reader.can_read(TWO_OBJECTS.as_bytes()));
    }
}
