//! View state and the apply step that pushes it into the scene.
//!
//! [`ViewState`] is the only source of truth. After every change the session
//! calls [`TransformController::apply`]; nothing is ever read back from the
//! scene into the state.

use glam::Vec3;
use partview_core::{Color, MaterialPreset, Part, PartId, Transform};
use partview_io::{ModelFormat, PhongMaterial, Placement, SceneNode, SceneRoot, Surface};

use crate::backend::ModelHandle;
use crate::indexer::PartIndex;

/// User-facing state of the viewer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    /// Whole-model transform as entered (degrees for rotation).
    pub transform: Transform,
    /// One entry per part of the active model, in id order.
    pub parts: Vec<Part>,
}

impl ViewState {
    pub fn part(&self, id: PartId) -> Option<&Part> {
        self.parts.get(id.index())
    }

    pub fn part_mut(&mut self, id: PartId) -> Option<&mut Part> {
        self.parts.get_mut(id.index())
    }
}

/// The loaded scene together with its part index.
#[derive(Debug)]
pub struct ActiveModel {
    pub scene: SceneRoot,
    pub format: ModelFormat,
    pub index: PartIndex,
    pub(crate) handle: ModelHandle,
    ground_offset: f32,
}

impl ActiveModel {
    pub(crate) fn new(
        scene: SceneRoot,
        format: ModelFormat,
        index: PartIndex,
        handle: ModelHandle,
    ) -> Self {
        Self {
            scene,
            format,
            index,
            handle,
            ground_offset: 0.0,
        }
    }

    /// Y shift added by the last ground snap. Zero for formats that do not
    /// snap.
    pub fn ground_offset(&self) -> f32 {
        self.ground_offset
    }

    pub fn handle(&self) -> ModelHandle {
        self.handle
    }
}

/// Pushes a [`ViewState`] into an [`ActiveModel`].
pub struct TransformController;

impl TransformController {
    /// Write placement, visibility and surfaces from `state` into `model`.
    pub fn apply(state: &ViewState, model: &mut ActiveModel) {
        Self::apply_placement(&state.transform, model);
        for part in &state.parts {
            Self::apply_part(part, model);
        }
    }

    /// Set the whole-model placement. Ground-snapping formats are then
    /// shifted along Y so the lowest world vertex sits at `y = 0`.
    pub fn apply_placement(transform: &Transform, model: &mut ActiveModel) {
        let [rx, ry, rz] = transform.rotation_radians();
        let mut placement = Placement::new(
            Vec3::from(transform.position.to_array()),
            Vec3::new(rx, ry, rz),
        );

        model.ground_offset = 0.0;
        if model.format.snaps_to_ground() {
            let bounds = model.scene.bounds_with(placement.matrix());
            if !bounds.is_empty() {
                model.ground_offset = -bounds.min.y;
                placement.translation.y += model.ground_offset;
            }
        }
        model.scene.placement = placement;
    }

    /// Push one part's visibility, color and preset onto its node.
    pub fn apply_part(part: &Part, model: &mut ActiveModel) {
        let Some(node) = model
            .index
            .node_for(part.id)
            .and_then(|n| model.scene.node_mut(n))
        else {
            return;
        };
        node.visible = part.visible;
        Self::apply_surface(node, part.color, part.material_preset);
    }

    /// Replace a non-Phong surface, or mutate a Phong one in place.
    ///
    /// Both paths end with the same [`PhongMaterial`] parameters. An in-place
    /// change sets `needs_update`; an unchanged surface is left alone.
    pub fn apply_surface(node: &mut SceneNode, color: Color, preset: MaterialPreset) {
        let target = PhongMaterial::from_preset(color, preset);
        match node.surface.as_phong_mut() {
            Some(current) if current.same_appearance(&target) => {}
            Some(current) => current.apply_preset(color, preset),
            None => node.surface = Surface::Phong(target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::PartIndexer;
    use partview_core::Vec3Value;
    use partview_io::TriangleMesh;

    /// Unit cube spanning `-1..1` on every axis.
    fn cube() -> TriangleMesh {
        let positions = vec![
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(1.0, 1.0, -1.0),
            Vec3::new(-1.0, 1.0, -1.0),
            Vec3::new(-1.0, -1.0, 1.0),
            Vec3::new(1.0, -1.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(-1.0, 1.0, 1.0),
        ];
        let indices = vec![
            0, 1, 2, 0, 2, 3, 4, 6, 5, 4, 7, 6, 0, 4, 5, 0, 5, 1, 3, 2, 6, 3, 6, 7, 0, 3, 7, 0,
            7, 4, 1, 5, 6, 1, 6, 2,
        ];
        TriangleMesh::from_positions(positions, indices)
    }

    fn model(format: ModelFormat) -> (ViewState, ActiveModel) {
        let mut scene = SceneRoot::new();
        let g = scene.add_geometry(cube());
        let root = scene.add_root(SceneNode::new(""));
        scene.add_child(root, SceneNode::with_geometry("", g));
        scene.add_child(
            root,
            SceneNode::with_geometry("", g).transformed(glam::Mat4::from_translation(Vec3::new(
                3.0, 0.0, 0.0,
            ))),
        );
        let index = PartIndexer::index(&mut scene);
        let state = ViewState {
            transform: Transform::default(),
            parts: index.parts().to_vec(),
        };
        (state, ActiveModel::new(scene, format, index, ModelHandle(0)))
    }

    #[test]
    fn test_stl_snaps_to_ground() {
        let (mut state, mut model) = model(ModelFormat::TriangleBinary);
        state.transform.position = Vec3Value::new(0.0, 5.0, 0.0);
        TransformController::apply(&state, &mut model);

        assert!(model.scene.world_bounds().min.y.abs() < 1e-4);
        assert!((model.ground_offset() + 4.0).abs() < 1e-4);
        // The entered Y stays in state
        assert_eq!(state.transform.position.y, 5.0);
    }

    #[test]
    fn test_other_formats_keep_position() {
        let (mut state, mut model) = model(ModelFormat::WavefrontText);
        state.transform.position = Vec3Value::new(0.0, 5.0, 0.0);
        TransformController::apply(&state, &mut model);

        assert_eq!(model.scene.world_bounds().min.y, 4.0);
        assert_eq!(model.ground_offset(), 0.0);
    }

    #[test]
    fn test_rotation_is_resnapped() {
        let (mut state, mut model) = model(ModelFormat::TriangleBinary);
        state.transform.rotation = Vec3Value::new(0.0, 0.0, -90.0);
        TransformController::apply(&state, &mut model);

        // Standing the row upright puts its far end at y = -4 before the snap
        assert!(model.scene.world_bounds().min.y.abs() < 1e-4);
        assert!((model.ground_offset() - 4.0).abs() < 1e-4);
    }

    #[test]
    fn test_replace_and_mutate_converge() {
        let (mut state, mut model) = model(ModelFormat::WavefrontText);
        let red = Color::rgb(255, 0, 0);

        // Part 0 keeps its Phong surface and is mutated in place
        state.parts[0].color = red;
        state.parts[0].material_preset = MaterialPreset::Glass;
        // Part 1 gets a non-Phong surface first and is replaced
        let node1 = model.index.node_for(PartId(1)).unwrap();
        model.scene.node_mut(node1).unwrap().surface = Surface::Imported(0);
        state.parts[1].color = red;
        state.parts[1].material_preset = MaterialPreset::Glass;

        TransformController::apply(&state, &mut model);

        let node0 = model.index.node_for(PartId(0)).unwrap();
        let mutated = model.scene.node(node0).unwrap().surface.as_phong().unwrap();
        let replaced = model.scene.node(node1).unwrap().surface.as_phong().unwrap();
        assert!(mutated.same_appearance(replaced));
        assert!(mutated.needs_update);
        assert!(!replaced.needs_update);
        assert!(mutated.transparent);
    }

    #[test]
    fn test_unchanged_surface_not_flagged() {
        let (state, mut model) = model(ModelFormat::WavefrontText);
        TransformController::apply(&state, &mut model);
        let node0 = model.index.node_for(PartId(0)).unwrap();
        assert!(!model.scene.node(node0).unwrap().surface.as_phong().unwrap().needs_update);
    }

    #[test]
    fn test_visibility_pushed() {
        let (mut state, mut model) = model(ModelFormat::WavefrontText);
        state.parts[1].visible = false;
        TransformController::apply(&state, &mut model);
        let node1 = model.index.node_for(PartId(1)).unwrap();
        assert!(!model.scene.node(node1).unwrap().visible);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn angle() -> impl Strategy<Value = f32> {
            -360.0f32..360.0
        }

        fn coord() -> impl Strategy<Value = f32> {
            -100.0f32..100.0
        }

        proptest! {
            #[test]
            fn stl_always_rests_on_ground(
                steps in prop::collection::vec(
                    ((coord(), coord(), coord()), (angle(), angle(), angle())),
                    1..8,
                )
            ) {
                let (mut state, mut model) = model(ModelFormat::TriangleBinary);
                for ((px, py, pz), (rx, ry, rz)) in steps {
                    state.transform.position = Vec3Value::new(px, py, pz);
                    state.transform.rotation = Vec3Value::new(rx, ry, rz);
                    TransformController::apply(&state, &mut model);

                    let bounds = model.scene.world_bounds();
                    let scale = 1.0 + bounds.size().length();
                    prop_assert!(bounds.min.y.abs() <= 1e-3 * scale);
                }
            }
        }
    }
}
