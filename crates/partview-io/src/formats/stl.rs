//! STL reader (ASCII and binary).

use std::io::Cursor;

use glam::Vec3;
use tracing::debug;

use crate::error::Result;
use crate::format::ModelFormat;
use crate::registry::FormatReader;
use crate::scene::{SceneNode, SceneRoot, TriangleMesh};

/// Binary STL: 80-byte header + u32 triangle count.
const BINARY_HEADER_LEN: usize = 84;
/// Binary STL: normal + 3 vertices (12 f32) + u16 attribute count.
const BINARY_TRIANGLE_LEN: usize = 50;

/// Reader for STL files.
///
/// Produces a single unnamed mesh node as the only root. Normals stored in
/// the file are ignored; the viewer recomputes vertex normals.
pub struct StlReader;

impl StlReader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StlReader {
    fn default() -> Self {
        Self::new()
    }
}

fn is_binary_stl(data: &[u8]) -> bool {
    if data.len() < BINARY_HEADER_LEN {
        return false;
    }
    let count = u32::from_le_bytes([data[80], data[81], data[82], data[83]]) as usize;
    count
        .checked_mul(BINARY_TRIANGLE_LEN)
        .and_then(|body| body.checked_add(BINARY_HEADER_LEN))
        == Some(data.len())
}

fn is_ascii_stl(data: &[u8]) -> bool {
    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    data[start..].starts_with(b"solid")
}

impl FormatReader for StlReader {
    fn name(&self) -> &'static str {
        "stl"
    }

    fn format(&self) -> ModelFormat {
        ModelFormat::TriangleBinary
    }

    fn extensions(&self) -> &[&'static str] {
        &["stl"]
    }

    fn can_read(&self, data: &[u8]) -> bool {
        is_binary_stl(data) || is_ascii_stl(data)
    }

    fn read(&self, data: &[u8]) -> Result<SceneRoot> {
        let mut cursor = Cursor::new(data);
        let stl = stl_io::read_stl(&mut cursor)?;

        debug!(
            vertices = stl.vertices.len(),
            triangles = stl.faces.len(),
            "STL parsed"
        );

        let positions = stl
            .vertices
            .iter()
            .map(|v| Vec3::new(v.0[0], v.0[1], v.0[2]))
            .collect();
        let indices = stl
            .faces
            .iter()
            .flat_map(|face| face.vertices.map(|i| i as u32))
            .collect();

        let mesh = TriangleMesh::from_positions(positions, indices);
        mesh.validate()?;

        let mut scene = SceneRoot::new();
        let geometry = scene.add_geometry(mesh);
        scene.add_root(SceneNode::with_geometry("", geometry));
        Ok(scene)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ASCII_TRIANGLE: &str = "solid tri
facet normal 0 0 1
  outer loop
    vertex 0 0 0
    vertex 1 0 0
    vertex 0 1 0
  endloop
endfacet
endsolid tri
";

    fn binary_stl(triangles: &[[[f32; 3]; 3]]) -> Vec<u8> {
        let tris: Vec<stl_io::Triangle> = triangles
            .iter()
            .map(|t| stl_io::Triangle {
                normal: stl_io::Normal::new([0.0, 0.0, 0.0]),
                vertices: [
                    stl_io::Vertex::new(t[0]),
                    stl_io::Vertex::new(t[1]),
                    stl_io::Vertex::new(t[2]),
                ],
            })
            .collect();
        let mut out = Vec::new();
        stl_io::write_stl(&mut out, tris.iter()).unwrap();
        out
    }

    #[test]
    fn test_can_read() {
        let reader = StlReader::new();
        assert!(reader.can_read(ASCII_TRIANGLE.as_bytes()));
        assert!(reader.can_read(&binary_stl(&[[[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]])));
        assert!(!reader.can_read(b"ply\nformat ascii 1.0\n"));
        assert!(!reader.can_read(&[0u8; 90]));
    }

    #[test]
    fn test_read_ascii() {
        let scene = StlReader::new().read(ASCII_TRIANGLE.as_bytes()).unwrap();
        assert_eq!(scene.roots.len(), 1);
        assert_eq!(scene.mesh_count(), 1);
        let mesh = scene.geometry_of(scene.roots[0]).unwrap();
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.vertex_count(), 3);
        assert!(mesh.normals.is_none());
    }

    #[test]
    fn test_read_binary_shares_vertices() {
        let data = binary_stl(&[
            [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            [[1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
        ]);
        let scene = StlReader::new().read(&data).unwrap();
        let mesh = scene.geometry_of(scene.roots[0]).unwrap();
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(scene.nodes[0].name, "");
    }

    #[test]
    fn test_truncated_binary_fails() {
        let mut data = binary_stl(&[[[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]]);
        data.truncate(100);
        assert!(StlReader::new().read(&data).is_err());
    }
}
