//! Part indexing: one `PartId` per mesh node, in depth-first order.

use std::collections::HashMap;

use partview_core::{MaterialPreset, Part, PartId};
use partview_io::{NodeId, PhongMaterial, SceneRoot, Surface};
use tracing::debug;

/// Identity map between parts and the scene nodes that carry their geometry.
///
/// Built once per loaded scene by [`PartIndexer::index`]. Ids are dense, so
/// `PartId(i)` is always the `i`-th entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartIndex {
    nodes: Vec<NodeId>,
    parts_by_node: HashMap<NodeId, PartId>,
    parts: Vec<Part>,
}

impl PartIndex {
    /// Node carrying the geometry of `part`.
    pub fn node_for(&self, part: PartId) -> Option<NodeId> {
        self.nodes.get(part.index()).copied()
    }

    /// Part assigned to `node`, if the node carries geometry.
    pub fn part_for(&self, node: NodeId) -> Option<PartId> {
        self.parts_by_node.get(&node).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Parts with default presentation, in id order.
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// `(part, node)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (PartId, NodeId)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, &node)| (PartId(i as u32), node))
    }
}

/// Assigns part ids to the mesh nodes of a scene.
pub struct PartIndexer;

impl PartIndexer {
    /// Walk `scene` depth-first (roots in order, children in order) and give
    /// every node with geometry the next id.
    ///
    /// Each indexed node's surface is reset to the Phong model with the
    /// default preset and the palette color for its id.
    pub fn index(scene: &mut SceneRoot) -> PartIndex {
        let meshes: Vec<(NodeId, String)> = scene
            .traverse_local()
            .filter(|(_, node, _)| node.is_mesh())
            .map(|(id, node, _)| (id, node.name.clone()))
            .collect();

        let mut index = PartIndex::default();
        for (i, (node_id, name)) in meshes.into_iter().enumerate() {
            let part = Part::with_defaults(PartId(i as u32), &name);
            if let Some(node) = scene.node_mut(node_id) {
                node.surface =
                    Surface::Phong(PhongMaterial::from_preset(part.color, MaterialPreset::default()));
            }
            index.nodes.push(node_id);
            index.parts_by_node.insert(node_id, part.id);
            index.parts.push(part);
        }

        debug!(parts = index.len(), nodes = scene.node_count(), "indexed parts");
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use partview_core::PALETTE;
    use partview_io::{SceneNode, TriangleMesh};

    /// root
    ///   group "Body"
    ///     mesh "Shell"
    ///     mesh ""
    ///   mesh "Lid"
    fn assembly() -> SceneRoot {
        let mut scene = SceneRoot::new();
        let g = scene.add_geometry(TriangleMesh::new());
        let root = scene.add_root(SceneNode::new(""));
        let body = scene.add_child(root, SceneNode::new("Body"));
        scene.add_child(body, SceneNode::with_geometry("Shell", g));
        scene.add_child(body, SceneNode::with_geometry("", g));
        scene.add_child(root, SceneNode::with_geometry("Lid", g));
        scene
    }

    #[test]
    fn test_depth_first_ids() {
        let mut scene = assembly();
        let index = PartIndexer::index(&mut scene);

        let names: Vec<&str> = index.parts().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Shell", "Parte 2", "Lid"]);
        assert_eq!(index.node_for(PartId(0)), Some(2));
        assert_eq!(index.node_for(PartId(2)), Some(4));
        assert_eq!(index.part_for(3), Some(PartId(1)));
        assert_eq!(index.part_for(1), None);
        assert_eq!(index.node_for(PartId(3)), None);
    }

    #[test]
    fn test_surfaces_normalized() {
        let mut scene = assembly();
        PartIndexer::index(&mut scene);

        let lid = scene.node(4).unwrap().surface.as_phong().unwrap();
        assert_eq!(lid.color, PALETTE[2]);
        assert_eq!(lid.shininess, MaterialPreset::Plastic.params().shininess);
        assert_eq!(scene.node(1).unwrap().surface, Surface::Default);
    }

    #[test]
    fn test_reindex_is_identical() {
        let mut scene = assembly();
        let first = PartIndexer::index(&mut scene);
        let second = PartIndexer::index(&mut scene);
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_scene() {
        let mut scene = SceneRoot::new();
        let index = PartIndexer::index(&mut scene);
        assert!(index.is_empty());
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        /// Build a random tree: each entry is (parent choice, has geometry).
        fn random_scene(shape: &[(usize, bool)]) -> SceneRoot {
            let mut scene = SceneRoot::new();
            let g = scene.add_geometry(TriangleMesh::new());
            for (i, &(parent, mesh)) in shape.iter().enumerate() {
                let node = if mesh {
                    SceneNode::with_geometry(format!("n{i}"), g)
                } else {
                    SceneNode::new(format!("n{i}"))
                };
                let parent = if i == 0 { None } else { Some(parent % i) };
                scene.add_node(parent, node);
            }
            scene
        }

        proptest! {
            #[test]
            fn ids_are_dense_and_cover_every_mesh(
                shape in prop::collection::vec((0usize..64, any::<bool>()), 1..40)
            ) {
                let mut scene = random_scene(&shape);
                let index = PartIndexer::index(&mut scene);

                prop_assert_eq!(index.len(), scene.mesh_count());
                for (i, (part, node)) in index.iter().enumerate() {
                    prop_assert_eq!(part, PartId(i as u32));
                    prop_assert_eq!(index.part_for(node), Some(part));
                    prop_assert!(scene.node(node).unwrap().is_mesh());
                }
            }

            #[test]
            fn indexing_is_deterministic(
                shape in prop::collection::vec((0usize..64, any::<bool>()), 1..40)
            ) {
                let mut a = random_scene(&shape);
                let mut b = random_scene(&shape);
                prop_assert_eq!(PartIndexer::index(&mut a), PartIndexer::index(&mut b));
            }
        }
    }
}
