//! Geometry types for SceneRoot.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{IoError, Result};

/// A triangle mesh, or a point cloud when `indices` is empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriangleMesh {
    /// Vertex positions.
    pub positions: Vec<Vec3>,
    /// Vertex normals, one per position when present.
    pub normals: Option<Vec<Vec3>>,
    /// Per-vertex RGB colors in `0.0..=1.0`.
    pub colors: Option<Vec<Vec3>>,
    /// Triangle indices (3 per triangle).
    pub indices: Vec<u32>,
}

impl TriangleMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_positions(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self {
            positions,
            indices,
            ..Default::default()
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_point_cloud(&self) -> bool {
        self.indices.is_empty() && !self.positions.is_empty()
    }

    /// Check that every index addresses a vertex and the index count is a
    /// multiple of three.
    pub fn validate(&self) -> Result<()> {
        if self.indices.len() % 3 != 0 {
            return Err(IoError::InvalidData(format!(
                "index count {} is not a multiple of 3",
                self.indices.len()
            )));
        }
        let count = self.positions.len();
        if let Some(bad) = self.indices.iter().find(|&&i| i as usize >= count) {
            return Err(IoError::InvalidData(format!(
                "triangle index {} out of range for {} vertices",
                bad, count
            )));
        }
        if let Some(normals) = &self.normals {
            if normals.len() != count {
                return Err(IoError::InvalidData(format!(
                    "{} normals for {} vertices",
                    normals.len(),
                    count
                )));
            }
        }
        Ok(())
    }

    /// Compute area-weighted vertex normals if not present.
    ///
    /// Point clouds have no faces to derive normals from and are left as is.
    pub fn compute_normals(&mut self) {
        if self.normals.is_some() || self.indices.is_empty() {
            return;
        }

        let mut normals = vec![Vec3::ZERO; self.positions.len()];

        for tri in self.indices.chunks_exact(3) {
            let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
            let (Some(&v0), Some(&v1), Some(&v2)) = (
                self.positions.get(i0),
                self.positions.get(i1),
                self.positions.get(i2),
            ) else {
                continue;
            };

            let normal = (v1 - v0).cross(v2 - v0);
            normals[i0] += normal;
            normals[i1] += normal;
            normals[i2] += normal;
        }

        for normal in &mut normals {
            *normal = normal.normalize_or_zero();
        }

        self.normals = Some(normals);
    }

    /// Iterate over triangles as vertex triples. Out-of-range triangles are
    /// skipped.
    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.indices.chunks_exact(3).filter_map(|tri| {
            Some([
                *self.positions.get(tri[0] as usize)?,
                *self.positions.get(tri[1] as usize)?,
                *self.positions.get(tri[2] as usize)?,
            ])
        })
    }
}

/// Axis-aligned bounding box.
///
/// The empty box has inverted infinite extents so that expanding it by any
/// point yields that point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl BoundingBox {
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        let mut bounds = Self::EMPTY;
        for p in points {
            bounds.expand_point(p);
        }
        bounds
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) / 2.0
    }

    pub fn size(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.max - self.min
        }
    }

    /// Grow to cover `other`. Empty boxes leave `self` unchanged.
    pub fn expand(&mut self, other: &BoundingBox) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    pub fn expand_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle() -> TriangleMesh {
        TriangleMesh::from_positions(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            vec![0, 1, 2],
        )
    }

    #[test]
    fn test_bounding_box() {
        let points = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::new(-1.0, -1.0, -1.0),
        ];
        let bounds = BoundingBox::from_points(points);
        assert_eq!(bounds.min, Vec3::new(-1.0, -1.0, -1.0));
        assert_eq!(bounds.max, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(bounds.center(), Vec3::new(0.0, 0.5, 1.0));
    }

    #[test]
    fn test_empty_box() {
        let bounds = BoundingBox::from_points(Vec::<Vec3>::new());
        assert!(bounds.is_empty());
        assert_eq!(bounds.size(), Vec3::ZERO);
        let mut grown = bounds;
        grown.expand_point(Vec3::ONE);
        assert_eq!(grown.min, Vec3::ONE);
        assert_eq!(grown.max, Vec3::ONE);
    }

    #[test]
    fn test_expand_by_box() {
        let mut bounds = BoundingBox::new(Vec3::ZERO, Vec3::ONE);
        bounds.expand(&BoundingBox::new(Vec3::splat(-1.0), Vec3::splat(0.5)));
        assert_eq!(bounds.min, Vec3::splat(-1.0));
        assert_eq!(bounds.max, Vec3::ONE);

        bounds.expand(&BoundingBox::EMPTY);
        assert_eq!(bounds, BoundingBox::new(Vec3::splat(-1.0), Vec3::ONE));
    }

    #[test]
    fn test_compute_normals() {
        let mut mesh = unit_triangle();
        mesh.compute_normals();
        let normals = mesh.normals.as_ref().unwrap();
        assert_eq!(normals.len(), 3);
        for n in normals {
            assert!((*n - Vec3::Z).length() < 1e-6);
        }
    }

    #[test]
    fn test_point_cloud_keeps_no_normals() {
        let mut cloud = TriangleMesh::from_positions(vec![Vec3::ZERO, Vec3::ONE], vec![]);
        assert!(cloud.is_point_cloud());
        cloud.compute_normals();
        assert!(cloud.normals.is_none());
    }

    #[test]
    fn test_validate_rejects_bad_indices() {
        let mut mesh = unit_triangle();
        assert!(mesh.validate().is_ok());
        mesh.indices = vec![0, 1, 7];
        assert!(mesh.validate().is_err());
        mesh.indices = vec![0, 1];
        assert!(mesh.validate().is_err());
    }
}
