//! Render backend seam.

use std::collections::HashSet;

use partview_io::SceneRoot;
use tracing::debug;

/// Handle to a scene uploaded to a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelHandle(pub u64);

/// Owner of render-side resources for the active scene.
///
/// The session uploads each scene once, refreshes it after every apply and
/// releases it before the next scene is uploaded.
pub trait RenderBackend {
    /// Create render resources for `scene`.
    fn upload(&mut self, scene: &SceneRoot) -> ModelHandle;

    /// Push visibility, placement and surface changes. Implementations clear
    /// the `needs_update` flag of every Phong surface they consume.
    fn refresh(&mut self, handle: ModelHandle, scene: &mut SceneRoot);

    /// Free the resources behind `handle`.
    fn release(&mut self, handle: ModelHandle);
}

/// Backend that keeps no GPU state, only bookkeeping.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    next_handle: u64,
    live: HashSet<ModelHandle>,
    uploads: usize,
    refreshes: usize,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uploaded and not yet released scenes.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn upload_count(&self) -> usize {
        self.uploads
    }

    pub fn refresh_count(&self) -> usize {
        self.refreshes
    }

    pub fn is_live(&self, handle: ModelHandle) -> bool {
        self.live.contains(&handle)
    }
}

impl RenderBackend for HeadlessBackend {
    fn upload(&mut self, scene: &SceneRoot) -> ModelHandle {
        let handle = ModelHandle(self.next_handle);
        self.next_handle += 1;
        self.live.insert(handle);
        self.uploads += 1;
        debug!(handle = handle.0, meshes = scene.mesh_count(), "upload");
        handle
    }

    fn refresh(&mut self, handle: ModelHandle, scene: &mut SceneRoot) {
        if !self.live.contains(&handle) {
            return;
        }
        for node in &mut scene.nodes {
            if let Some(material) = node.surface.as_phong_mut() {
                material.needs_update = false;
            }
        }
        self.refreshes += 1;
    }

    fn release(&mut self, handle: ModelHandle) {
        if self.live.remove(&handle) {
            debug!(handle = handle.0, "release");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_count() {
        let mut backend = HeadlessBackend::new();
        let scene = SceneRoot::new();
        let a = backend.upload(&scene);
        let b = backend.upload(&scene);
        assert_ne!(a, b);
        assert_eq!(backend.live_count(), 2);

        backend.release(a);
        backend.release(a);
        assert_eq!(backend.live_count(), 1);
        assert!(backend.is_live(b));
    }
}
