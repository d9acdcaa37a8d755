//! SceneRoot: the uniform in-memory result of reading one model file.

pub mod geometry;
pub mod material;
pub mod metadata;

pub use geometry::*;
pub use material::*;
pub use metadata::*;

use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Index of a node in [`SceneRoot::nodes`].
pub type NodeId = usize;

/// A parsed model: an arena of nodes plus the geometry and material tables
/// they reference.
///
/// Readers build the tree; afterwards only [`SceneRoot::placement`], node
/// visibility and node surfaces change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneRoot {
    /// Scene nodes (hierarchy).
    pub nodes: Vec<SceneNode>,
    /// Root node indices, in file order.
    pub roots: Vec<NodeId>,
    /// Geometry data.
    pub geometries: Vec<TriangleMesh>,
    /// Materials imported from the file.
    pub materials: Vec<Material>,
    pub metadata: SceneMetadata,
    /// Whole-model placement applied above every root.
    pub placement: Placement,
}

impl SceneRoot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }

    /// Number of nodes that carry geometry.
    pub fn mesh_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.geometry.is_some()).count()
    }

    pub fn add_root(&mut self, node: SceneNode) -> NodeId {
        let index = self.nodes.len();
        self.nodes.push(node);
        self.roots.push(index);
        index
    }

    /// Add a child node to a parent and return its index.
    pub fn add_child(&mut self, parent: NodeId, mut node: SceneNode) -> NodeId {
        let index = self.nodes.len();
        node.parent = Some(parent);
        self.nodes.push(node);
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(index);
        }
        index
    }

    /// Add under `parent`, or as a root when `None`.
    pub fn add_node(&mut self, parent: Option<NodeId>, node: SceneNode) -> NodeId {
        match parent {
            Some(p) => self.add_child(p, node),
            None => self.add_root(node),
        }
    }

    pub fn add_geometry(&mut self, geometry: TriangleMesh) -> usize {
        let index = self.geometries.len();
        self.geometries.push(geometry);
        index
    }

    pub fn add_material(&mut self, material: Material) -> usize {
        let index = self.materials.len();
        self.materials.push(material);
        index
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id)
    }

    /// Geometry attached to a node, if any.
    pub fn geometry_of(&self, id: NodeId) -> Option<&TriangleMesh> {
        self.nodes
            .get(id)
            .and_then(|n| n.geometry)
            .and_then(|g| self.geometries.get(g))
    }

    /// Depth-first pre-order walk, roots in order, children in order.
    ///
    /// Each item carries the node's world transform including the placement.
    pub fn traverse(&self) -> impl Iterator<Item = (NodeId, &SceneNode, Mat4)> {
        SceneTraverser::new(self, self.placement.matrix())
    }

    /// Same order as [`SceneRoot::traverse`], ignoring the placement.
    pub fn traverse_local(&self) -> impl Iterator<Item = (NodeId, &SceneNode, Mat4)> {
        SceneTraverser::new(self, Mat4::IDENTITY)
    }

    /// Ancestors of `id`, nearest first, starting with `id` itself.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.nodes.get(id).map(|_| id), move |&current| {
            self.nodes.get(current).and_then(|n| n.parent)
        })
    }

    /// Exact world-space bounds over every vertex of every mesh node.
    pub fn world_bounds(&self) -> BoundingBox {
        self.bounds_with(self.placement.matrix())
    }

    /// Bounds with an explicit transform applied above the roots.
    pub fn bounds_with(&self, root_transform: Mat4) -> BoundingBox {
        let mut bounds = BoundingBox::EMPTY;
        for (_, node, world) in SceneTraverser::new(self, root_transform) {
            let Some(mesh) = node.geometry.and_then(|g| self.geometries.get(g)) else {
                continue;
            };
            let mesh_bounds =
                BoundingBox::from_points(mesh.positions.iter().map(|p| world.transform_point3(*p)));
            bounds.expand(&mesh_bounds);
        }
        bounds
    }

    /// Compute missing normals on every geometry.
    pub fn prepare_for_display(&mut self) {
        for mesh in &mut self.geometries {
            mesh.compute_normals();
        }
    }
}

/// A node in the scene graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneNode {
    /// Name embedded in the file; empty when the file has none.
    pub name: String,
    /// Local transform.
    pub transform: Mat4,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Geometry index (if this node has geometry).
    pub geometry: Option<usize>,
    pub surface: Surface,
    pub visible: bool,
}

impl SceneNode {
    /// Create a new group node.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Mat4::IDENTITY,
            visible: true,
            ..Default::default()
        }
    }

    /// Create a node with geometry.
    pub fn with_geometry(name: impl Into<String>, geometry: usize) -> Self {
        Self {
            geometry: Some(geometry),
            ..Self::new(name)
        }
    }

    pub fn transformed(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_surface(mut self, surface: Surface) -> Self {
        self.surface = surface;
        self
    }

    pub fn is_mesh(&self) -> bool {
        self.geometry.is_some()
    }
}

/// Whole-model translation and rotation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Placement {
    pub translation: Vec3,
    /// Euler angles in radians, XYZ order.
    pub rotation: Vec3,
}

impl Placement {
    pub fn new(translation: Vec3, rotation: Vec3) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    pub fn quat(&self) -> Quat {
        Quat::from_euler(EulerRot::XYZ, self.rotation.x, self.rotation.y, self.rotation.z)
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.quat(), self.translation)
    }
}

/// Iterator for traversing the scene graph.
struct SceneTraverser<'a> {
    scene: &'a SceneRoot,
    stack: Vec<(NodeId, Mat4)>,
}

impl<'a> SceneTraverser<'a> {
    fn new(scene: &'a SceneRoot, root_transform: Mat4) -> Self {
        let stack = scene
            .roots
            .iter()
            .rev()
            .map(|&idx| (idx, root_transform))
            .collect();
        Self { scene, stack }
    }
}

impl<'a> Iterator for SceneTraverser<'a> {
    type Item = (NodeId, &'a SceneNode, Mat4);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (idx, parent_transform) = self.stack.pop()?;
            let Some(node) = self.scene.nodes.get(idx) else {
                continue;
            };
            let world_transform = parent_transform * node.transform;

            // Reverse push so children pop left-to-right
            for &child_idx in node.children.iter().rev() {
                self.stack.push((child_idx, world_transform));
            }

            return Some((idx, node, world_transform));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube_mesh() -> TriangleMesh {
        let positions = vec![
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(1.0, 1.0, -1.0),
            Vec3::new(-1.0, 1.0, 1.0),
        ];
        TriangleMesh::from_positions(positions, vec![0, 1, 2, 0, 2, 3])
    }

    #[test]
    fn test_empty_scene() {
        let scene = SceneRoot::new();
        assert_eq!(scene.node_count(), 0);
        assert_eq!(scene.mesh_count(), 0);
        assert!(scene.world_bounds().is_empty());
    }

    #[test]
    fn test_scene_traversal() {
        let mut scene = SceneRoot::new();
        let root = scene.add_root(SceneNode::new("root"));
        let child1 = scene.add_child(root, SceneNode::new("child1"));
        let _child2 = scene.add_child(root, SceneNode::new("child2"));
        let _grandchild = scene.add_child(child1, SceneNode::new("grandchild"));
        let _second_root = scene.add_root(SceneNode::new("second"));

        let names: Vec<&str> = scene.traverse().map(|(_, n, _)| n.name.as_str()).collect();
        assert_eq!(names, vec!["root", "child1", "grandchild", "child2", "second"]);
    }

    #[test]
    fn test_ancestors() {
        let mut scene = SceneRoot::new();
        let root = scene.add_root(SceneNode::new("root"));
        let child = scene.add_child(root, SceneNode::new("child"));
        let leaf = scene.add_child(child, SceneNode::new("leaf"));

        let chain: Vec<NodeId> = scene.ancestors(leaf).collect();
        assert_eq!(chain, vec![leaf, child, root]);
        assert_eq!(scene.ancestors(99).count(), 0);
    }

    #[test]
    fn test_world_bounds_follow_placement() {
        let mut scene = SceneRoot::new();
        let g = scene.add_geometry(cube_mesh());
        let group = scene.add_root(
            SceneNode::new("group").transformed(Mat4::from_translation(Vec3::new(0.0, 5.0, 0.0))),
        );
        scene.add_child(group, SceneNode::with_geometry("cube", g));

        let bounds = scene.world_bounds();
        assert_eq!(bounds.min.y, 4.0);
        assert_eq!(bounds.max.y, 6.0);

        scene.placement.translation = Vec3::new(10.0, 0.0, 0.0);
        let moved = scene.world_bounds();
        assert_eq!(moved.min.x, 9.0);
        assert_eq!(moved.min.y, 4.0);
    }

    #[test]
    fn test_placement_rotation_order() {
        let placement = Placement::new(
            Vec3::ZERO,
            Vec3::new(std::f32::consts::FRAC_PI_2, 0.0, 0.0),
        );
        let rotated = placement.matrix().transform_point3(Vec3::Y);
        assert!((rotated - Vec3::Z).length() < 1e-6);
    }
}
