//! PLY reader (ASCII and binary).

use std::io::Cursor;

use glam::Vec3;
use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, Property};
use tracing::debug;

use crate::error::{IoError, Result};
use crate::format::ModelFormat;
use crate::registry::FormatReader;
use crate::scene::{SceneNode, SceneRoot, TriangleMesh};

/// Reader for PLY files.
///
/// Produces a single unnamed mesh node. A file without `face` elements is
/// kept as a point cloud.
pub struct PlyReader;

impl PlyReader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PlyReader {
    fn default() -> Self {
        Self::new()
    }
}

fn scalar(prop: Option<&Property>) -> Option<f64> {
    match prop? {
        Property::Float(v) => Some(*v as f64),
        Property::Double(v) => Some(*v),
        Property::Int(v) => Some(*v as f64),
        Property::UInt(v) => Some(*v as f64),
        Property::Short(v) => Some(*v as f64),
        Property::UShort(v) => Some(*v as f64),
        Property::Char(v) => Some(*v as f64),
        Property::UChar(v) => Some(*v as f64),
        _ => None,
    }
}

/// Color channel in `0..=1`. Integer channels are 8-bit.
fn channel(prop: Option<&Property>) -> Option<f32> {
    match prop? {
        Property::Float(v) => Some(v.clamp(0.0, 1.0)),
        Property::Double(v) => Some(v.clamp(0.0, 1.0) as f32),
        other => scalar(Some(other)).map(|v| (v.clamp(0.0, 255.0) / 255.0) as f32),
    }
}

fn vec3(element: &DefaultElement, keys: [&str; 3]) -> Option<Vec3> {
    Some(Vec3::new(
        scalar(element.get(keys[0]))? as f32,
        scalar(element.get(keys[1]))? as f32,
        scalar(element.get(keys[2]))? as f32,
    ))
}

fn face_indices(prop: &Property) -> Option<Vec<i64>> {
    let list = match prop {
        Property::ListInt(v) => v.iter().map(|&i| i as i64).collect(),
        Property::ListUInt(v) => v.iter().map(|&i| i as i64).collect(),
        Property::ListShort(v) => v.iter().map(|&i| i as i64).collect(),
        Property::ListUShort(v) => v.iter().map(|&i| i as i64).collect(),
        Property::ListChar(v) => v.iter().map(|&i| i as i64).collect(),
        Property::ListUChar(v) => v.iter().map(|&i| i as i64).collect(),
        _ => return None,
    };
    Some(list)
}

impl FormatReader for PlyReader {
    fn name(&self) -> &'static str {
        "ply"
    }

    fn format(&self) -> ModelFormat {
        ModelFormat::PointCloudBinary
    }

    fn extensions(&self) -> &[&'static str] {
        &["ply"]
    }

    fn can_read(&self, data: &[u8]) -> bool {
        data.starts_with(b"ply")
    }

    fn read(&self, data: &[u8]) -> Result<SceneRoot> {
        let mut cursor = Cursor::new(data);
        let ply = Parser::<DefaultElement>::new().read_ply(&mut cursor)?;

        let vertices = ply
            .payload
            .get("vertex")
            .ok_or_else(|| IoError::InvalidData("PLY has no vertex element".into()))?;

        let mut positions = Vec::with_capacity(vertices.len());
        let mut normals = Vec::with_capacity(vertices.len());
        let mut colors = Vec::with_capacity(vertices.len());
        for (i, vertex) in vertices.iter().enumerate() {
            let position = vec3(vertex, ["x", "y", "z"])
                .ok_or_else(|| IoError::InvalidData(format!("vertex {} missing x/y/z", i)))?;
            positions.push(position);
            if let Some(n) = vec3(vertex, ["nx", "ny", "nz"]) {
                normals.push(n);
            }
            if let (Some(r), Some(g), Some(b)) = (
                channel(vertex.get("red")),
                channel(vertex.get("green")),
                channel(vertex.get("blue")),
            ) {
                colors.push(Vec3::new(r, g, b));
            }
        }

        let mut indices = Vec::new();
        for (i, face) in ply.payload.get("face").into_iter().flatten().enumerate() {
            let Some(list) = face
                .get("vertex_indices")
                .or_else(|| face.get("vertex_index"))
                .and_then(face_indices)
            else {
                continue;
            };
            if list.iter().any(|&idx| idx < 0) {
                return Err(IoError::InvalidData(format!("face {} has negative index", i)));
            }
            // Fan triangulation for polygons
            for k in 1..list.len().saturating_sub(1) {
                indices.extend([list[0] as u32, list[k] as u32, list[k + 1] as u32]);
            }
        }

        let mut mesh = TriangleMesh::from_positions(positions, indices);
        if normals.len() == mesh.positions.len() {
            mesh.normals = Some(normals);
        }
        if colors.len() == mesh.positions.len() {
            mesh.colors = Some(colors);
        }
        mesh.validate()?;

        debug!(
            vertices = mesh.vertex_count(),
            triangles = mesh.triangle_count(),
            point_cloud = mesh.is_point_cloud(),
            "PLY parsed"
        );

        let mut scene = SceneRoot::new();
        let geometry = scene.add_geometry(mesh);
        scene.add_root(SceneNode::with_geometry("", geometry));
        Ok(scene)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = "ply
format ascii 1.0
element vertex 4
property float x
property float y
property float z
property uchar red
property uchar green
property uchar blue
element face 1
property list uchar int vertex_indices
end_header
0 0 0 255 0 0
1 0 0 255 0 0
1 1 0 255 0 0
0 1 0 255 0 0
4 0 1 2 3
";

    const POINTS: &str = "ply
format ascii 1.0
element vertex 2
property float x
property float y
property float z
end_header
0 0 0
1 2 3
";

    #[test]
    fn test_can_read() {
        let reader = PlyReader::new();
        assert!(reader.can_read(QUAD.as_bytes()));
        assert!(!reader.can_read(b"solid cube"));
    }

    #[test]
    fn test_quad_is_fan_triangulated() {
        let scene = PlyReader::new().read(QUAD.as_bytes()).unwrap();
        let mesh = scene.geometry_of(scene.roots[0]).unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(mesh.colors.as_ref().unwrap()[0], Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(scene.nodes[0].name, "");
    }

    #[test]
    fn test_vertices_only_is_point_cloud() {
        let scene = PlyReader::new().read(POINTS.as_bytes()).unwrap();
        let mesh = scene.geometry_of(scene.roots[0]).unwrap();
        assert!(mesh.is_point_cloud());
        assert_eq!(mesh.positions[1], Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_bad_header_fails() {
        assert!(PlyReader::new().read(b"ply\nformat nonsense\n").is_err());
    }
}
