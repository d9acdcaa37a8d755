//! `ViewerSession`: owner of the single active model.

use std::collections::BTreeSet;
use std::time::Instant;

use glam::Vec2;
use partview_core::{Color, MaterialPreset, Part, PartId, PartMeta, PartsMeta, Transform, Vec3Value};
use partview_io::{LoadedScene, ModelFormat};
use tracing::{debug, info, warn};

use crate::backend::{HeadlessBackend, RenderBackend};
use crate::camera::Camera;
use crate::error::{Result, ViewerError};
use crate::indexer::PartIndexer;
use crate::reconcile::MetaReconciler;
use crate::selection::{pick, Hit, Ray, Selection};
use crate::transform::{ActiveModel, TransformController, ViewState};

/// Proof that a load was started. Only the ticket of the latest
/// [`ViewerSession::begin_load`] can complete.
#[derive(Debug, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
}

impl LoadTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Result of [`ViewerSession::complete_load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The scene became the active model.
    Applied,
    /// A newer load or a clear happened first; the scene was dropped.
    Superseded,
}

/// Viewer context: view state, at most one active model, camera and
/// selection.
///
/// Every mutation updates [`ViewState`] first and then runs one apply pass
/// over the active model.
pub struct ViewerSession<B: RenderBackend = HeadlessBackend> {
    backend: B,
    state: ViewState,
    active: Option<ActiveModel>,
    camera: Camera,
    selection: Selection,
    generation: u64,
    /// Parts whose metadata was changed since the last load.
    edited: BTreeSet<PartId>,
}

impl Default for ViewerSession<HeadlessBackend> {
    fn default() -> Self {
        Self::new(HeadlessBackend::new())
    }
}

impl<B: RenderBackend> ViewerSession<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: ViewState::default(),
            active: None,
            camera: Camera::default(),
            selection: Selection::default(),
            generation: 0,
            edited: BTreeSet::new(),
        }
    }

    // -- Loading --

    /// Start a load: invalidate older tickets and release the current model.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        self.release_active();
        self.state.parts.clear();
        self.edited.clear();
        self.selection.clear();
        debug!(generation = self.generation, "load started");
        LoadTicket {
            generation: self.generation,
        }
    }

    pub fn is_current(&self, ticket: &LoadTicket) -> bool {
        ticket.generation == self.generation
    }

    /// Install a parsed scene if `ticket` is still current.
    ///
    /// Indexes the parts, uploads the scene and applies the current view
    /// state. The part list is reset to defaults; apply stored metadata with
    /// [`ViewerSession::apply_parts_meta`].
    pub fn complete_load(&mut self, ticket: LoadTicket, loaded: LoadedScene) -> LoadOutcome {
        if !self.is_current(&ticket) {
            warn!(
                ticket = ticket.generation,
                current = self.generation,
                "dropping superseded load"
            );
            return LoadOutcome::Superseded;
        }

        let LoadedScene { format, mut scene } = loaded;
        if format.needs_normals() {
            scene.prepare_for_display();
        }

        let index = PartIndexer::index(&mut scene);
        let handle = self.backend.upload(&scene);
        self.state.parts = index.parts().to_vec();
        self.active = Some(ActiveModel::new(scene, format, index, handle));
        self.apply();

        info!(format = %format, parts = self.state.parts.len(), "model active");
        LoadOutcome::Applied
    }

    /// Release the active model and invalidate any load in flight.
    pub fn clear_current_model(&mut self) {
        self.generation += 1;
        self.release_active();
        self.state.parts.clear();
        self.edited.clear();
        self.selection.clear();
    }

    fn release_active(&mut self) {
        if let Some(model) = self.active.take() {
            self.backend.release(model.handle());
        }
    }

    fn apply(&mut self) {
        if let Some(model) = self.active.as_mut() {
            TransformController::apply(&self.state, model);
            self.backend.refresh(model.handle(), &mut model.scene);
        }
    }

    // -- Accessors --

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn transform(&self) -> Transform {
        self.state.transform
    }

    pub fn parts(&self) -> &[Part] {
        &self.state.parts
    }

    pub fn part(&self, id: PartId) -> Option<&Part> {
        self.state.part(id)
    }

    pub fn active_model(&self) -> Option<&ActiveModel> {
        self.active.as_ref()
    }

    pub fn has_model(&self) -> bool {
        self.active.is_some()
    }

    pub fn format(&self) -> Option<ModelFormat> {
        self.active.as_ref().map(|m| m.format)
    }

    /// Y shift of the last ground snap, zero without a model.
    pub fn ground_offset(&self) -> f32 {
        self.active.as_ref().map_or(0.0, ActiveModel::ground_offset)
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Metadata entries for the parts edited since the last load. Parts
    /// still at their defaults are left out.
    pub fn edited_parts_meta(&self) -> PartsMeta {
        self.edited
            .iter()
            .filter_map(|id| self.state.part(*id))
            .map(|p| (p.id, PartMeta::from_part(p)))
            .collect()
    }

    // -- Whole-model transform --

    pub fn set_transform(&mut self, transform: Transform) {
        self.state.transform = transform;
        self.apply();
    }

    pub fn set_position(&mut self, position: Vec3Value) {
        self.state.transform.position = position;
        self.apply();
    }

    /// Rotation in degrees.
    pub fn set_rotation(&mut self, rotation: Vec3Value) {
        self.state.transform.rotation = rotation;
        self.apply();
    }

    pub fn reset_transform(&mut self) {
        self.set_transform(Transform::default());
    }

    // -- Parts --

    fn update_part(&mut self, id: PartId, update: impl FnOnce(&mut Part)) -> Result<()> {
        if self.active.is_none() {
            return Err(ViewerError::NoActiveModel);
        }
        let part = self.state.part_mut(id).ok_or(ViewerError::UnknownPart(id))?;
        update(part);
        self.apply();
        Ok(())
    }

    pub fn set_part_visible(&mut self, id: PartId, visible: bool) -> Result<()> {
        self.update_part(id, |p| p.visible = visible)
    }

    fn edit_part(&mut self, id: PartId, update: impl FnOnce(&mut Part)) -> Result<()> {
        self.update_part(id, update)?;
        self.edited.insert(id);
        Ok(())
    }

    pub fn set_part_color(&mut self, id: PartId, color: Color) -> Result<()> {
        self.edit_part(id, |p| p.color = color)
    }

    pub fn set_part_preset(&mut self, id: PartId, preset: MaterialPreset) -> Result<()> {
        self.edit_part(id, |p| p.material_preset = preset)
    }

    pub fn set_part_name(&mut self, id: PartId, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        self.edit_part(id, |p| p.name = name)
    }

    pub fn set_part_notes(&mut self, id: PartId, notes: impl Into<String>) -> Result<()> {
        let notes = notes.into();
        self.edit_part(id, |p| p.notes = notes)
    }

    /// Show or hide every part in one state change and one apply.
    pub fn set_all_visible(&mut self, visible: bool) -> Result<()> {
        if self.active.is_none() {
            return Err(ViewerError::NoActiveModel);
        }
        for part in &mut self.state.parts {
            part.visible = visible;
        }
        self.apply();
        Ok(())
    }

    /// Merge stored metadata into the part list.
    pub fn apply_parts_meta(&mut self, meta: &PartsMeta) -> Result<()> {
        if self.active.is_none() {
            return Err(ViewerError::NoActiveModel);
        }
        self.state.parts = MetaReconciler::reconcile(&self.state.parts, meta);
        for id in meta.keys() {
            if self.state.part(*id).is_some() {
                self.edited.insert(*id);
            }
        }
        self.apply();
        Ok(())
    }

    // -- Camera and selection --

    /// Point the camera at the placed model.
    pub fn fit_camera(&mut self) -> Result<()> {
        let model = self.active.as_ref().ok_or(ViewerError::NoActiveModel)?;
        self.camera.fit_to_bounds(&model.scene.world_bounds());
        Ok(())
    }

    /// Pick with a world-space ray. A hit selects its part and restarts the
    /// display timeout; a miss changes nothing.
    pub fn pick(&mut self, ray: &Ray, now: Instant) -> Option<Hit> {
        let model = self.active.as_ref()?;
        let hit = pick(&model.scene, &model.index, ray)?;
        self.selection.select(hit.part, now);
        Some(hit)
    }

    /// Pick through a point in normalized device coordinates.
    pub fn pick_at(&mut self, ndc: Vec2, aspect: f32, now: Instant) -> Option<Hit> {
        let ray = self.camera.ray_from_ndc(ndc, aspect);
        self.pick(&ray, now)
    }

    /// The part whose info is on display.
    pub fn selected_part(&self, now: Instant) -> Option<&Part> {
        self.selection.current(now).and_then(|id| self.state.part(id))
    }
}

impl<B: RenderBackend> Drop for ViewerSession<B> {
    fn drop(&mut self) {
        self.release_active();
    }
}
