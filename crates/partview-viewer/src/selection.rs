//! Ray picking and the timed selection display.

use std::time::{Duration, Instant};

use glam::Vec3;
use partview_core::PartId;
use partview_io::{NodeId, SceneRoot};

use crate::indexer::PartIndex;

/// How long selected-part info stays up after a pick.
pub const SELECTION_TIMEOUT: Duration = Duration::from_secs(4);

/// A world-space ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit direction.
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }
}

/// Nearest intersection resolved to a part.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub part: PartId,
    /// Node whose triangle was hit.
    pub node: NodeId,
    pub distance: f32,
    pub point: Vec3,
}

/// Möller–Trumbore ray-triangle intersection. Returns the ray distance.
pub fn intersect_triangle(ray: &Ray, [v0, v1, v2]: [Vec3; 3]) -> Option<f32> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let h = ray.direction.cross(edge2);
    let a = edge1.dot(h);
    if a.abs() < 1e-8 {
        return None; // parallel
    }

    let f = 1.0 / a;
    let s = ray.origin - v0;
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * ray.direction.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);
    (t > 1e-6).then_some(t)
}

/// Cast `ray` against every visible mesh node and resolve the nearest hit to
/// the closest ancestor (or the node itself) that carries a part.
///
/// Hidden nodes, nodes under hidden groups and point clouds are skipped.
pub fn pick(scene: &SceneRoot, index: &PartIndex, ray: &Ray) -> Option<Hit> {
    let mut nearest: Option<(NodeId, f32)> = None;

    for (node_id, node, world) in scene.traverse() {
        let Some(mesh) = node.geometry.and_then(|g| scene.geometries.get(g)) else {
            continue;
        };
        if mesh.is_point_cloud() || !is_shown(scene, node_id) {
            continue;
        }
        for triangle in mesh.triangles() {
            let world_triangle = triangle.map(|p| world.transform_point3(p));
            if let Some(t) = intersect_triangle(ray, world_triangle) {
                if nearest.map_or(true, |(_, best)| t < best) {
                    nearest = Some((node_id, t));
                }
            }
        }
    }

    let (node, distance) = nearest?;
    let part = scene.ancestors(node).find_map(|n| index.part_for(n))?;
    Some(Hit {
        part,
        node,
        distance,
        point: ray.at(distance),
    })
}

fn is_shown(scene: &SceneRoot, node: NodeId) -> bool {
    scene
        .ancestors(node)
        .all(|n| scene.node(n).is_some_and(|n| n.visible))
}

/// The part whose info is on display, with an expiry.
#[derive(Debug, Clone)]
pub struct Selection {
    current: Option<(PartId, Instant)>,
    timeout: Duration,
}

impl Default for Selection {
    fn default() -> Self {
        Self::new(SELECTION_TIMEOUT)
    }
}

impl Selection {
    pub fn new(timeout: Duration) -> Self {
        Self {
            current: None,
            timeout,
        }
    }

    /// Show `part`, restarting the timeout.
    pub fn select(&mut self, part: PartId, now: Instant) {
        self.current = Some((part, now));
    }

    /// The selected part, unless its display time has run out.
    pub fn current(&self, now: Instant) -> Option<PartId> {
        self.current
            .filter(|(_, at)| now.saturating_duration_since(*at) < self.timeout)
            .map(|(part, _)| part)
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::PartIndexer;
    use glam::Mat4;
    use partview_io::{SceneNode, TriangleMesh};

    /// A unit square in the XY plane at z = 0, facing +Z.
    fn square() -> TriangleMesh {
        TriangleMesh::from_positions(
            vec![
                Vec3::new(-1.0, -1.0, 0.0),
                Vec3::new(1.0, -1.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(-1.0, 1.0, 0.0),
            ],
            vec![0, 1, 2, 0, 2, 3],
        )
    }

    /// Two squares, the second one 2 units closer to a camera on +Z.
    fn stacked() -> (SceneRoot, PartIndex) {
        let mut scene = SceneRoot::new();
        let g = scene.add_geometry(square());
        let root = scene.add_root(SceneNode::new(""));
        scene.add_child(root, SceneNode::with_geometry("back", g));
        scene.add_child(
            root,
            SceneNode::with_geometry("front", g)
                .transformed(Mat4::from_translation(Vec3::new(0.0, 0.0, 2.0))),
        );
        let index = PartIndexer::index(&mut scene);
        (scene, index)
    }

    fn down_z() -> Ray {
        Ray::new(Vec3::new(0.2, 0.3, 10.0), Vec3::NEG_Z)
    }

    #[test]
    fn test_triangle_hit_and_miss() {
        let tri = [Vec3::ZERO, Vec3::X, Vec3::Y];
        let hit = intersect_triangle(&Ray::new(Vec3::new(0.2, 0.2, 1.0), Vec3::NEG_Z), tri);
        assert!((hit.unwrap() - 1.0).abs() < 1e-6);
        assert!(intersect_triangle(&Ray::new(Vec3::new(2.0, 2.0, 1.0), Vec3::NEG_Z), tri).is_none());
        // Behind the origin
        assert!(intersect_triangle(&Ray::new(Vec3::new(0.2, 0.2, -1.0), Vec3::NEG_Z), tri).is_none());
    }

    #[test]
    fn test_pick_nearest() {
        let (scene, index) = stacked();
        let hit = pick(&scene, &index, &down_z()).unwrap();
        assert_eq!(hit.part, PartId(1));
        assert!((hit.distance - 8.0).abs() < 1e-5);
        assert!((hit.point.z - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_hidden_parts_are_skipped() {
        let (mut scene, index) = stacked();
        let front = index.node_for(PartId(1)).unwrap();
        scene.node_mut(front).unwrap().visible = false;
        assert_eq!(pick(&scene, &index, &down_z()).unwrap().part, PartId(0));
    }

    #[test]
    fn test_miss_is_none() {
        let (scene, index) = stacked();
        let ray = Ray::new(Vec3::new(5.0, 5.0, 10.0), Vec3::NEG_Z);
        assert!(pick(&scene, &index, &ray).is_none());
    }

    #[test]
    fn test_pick_follows_placement() {
        let (mut scene, index) = stacked();
        scene.placement.translation = Vec3::new(10.0, 0.0, 0.0);
        assert!(pick(&scene, &index, &down_z()).is_none());
        let moved = Ray::new(Vec3::new(10.2, 0.3, 10.0), Vec3::NEG_Z);
        assert_eq!(pick(&scene, &index, &moved).unwrap().part, PartId(1));
    }

    #[test]
    fn test_selection_timeout_restarts() {
        let start = Instant::now();
        let mut selection = Selection::default();
        selection.select(PartId(3), start);
        assert_eq!(selection.current(start + Duration::from_secs(3)), Some(PartId(3)));

        selection.select(PartId(4), start + Duration::from_secs(3));
        assert_eq!(selection.current(start + Duration::from_secs(6)), Some(PartId(4)));
        assert_eq!(selection.current(start + Duration::from_secs(7)), None);
    }
}
