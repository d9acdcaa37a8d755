//! `ProjectSync`: drives the viewer session from the project store.
//!
//! Opening a project is split in three so that the only await point borrows
//! the store and nothing else:
//!
//! ```text
//! begin_open(id)  ─ sync: find record, dispatch extension, take a LoadTicket
//! fetch(&pending) ─ async: download the model bytes
//! finish_open(..) ─ sync: staleness check, parse, index, meta, transform, camera
//! ```

use std::fmt;

use partview_core::{PartId, PartMeta, PartsMeta, Transform};
use partview_io::{FormatRegistry, LoadedScene, ModelFormat};
use partview_viewer::{HeadlessBackend, LoadOutcome, LoadTicket, RenderBackend, ViewerSession};
use tracing::{debug, info, warn};

use crate::error::{Result, SyncError};
use crate::quote::Quote;
use crate::record::ProjectRecord;
use crate::store::ProjectStore;
use crate::wire::{ModelUpload, NewProject};

/// Where the open pipeline currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPhase {
    #[default]
    Idle,
    Loading,
    Indexed,
    MetaApplied,
    TransformApplied,
    CameraFitted,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncPhase::Idle => "idle",
            SyncPhase::Loading => "loading",
            SyncPhase::Indexed => "indexed",
            SyncPhase::MetaApplied => "meta-applied",
            SyncPhase::TransformApplied => "transform-applied",
            SyncPhase::CameraFitted => "camera-fitted",
        };
        f.write_str(name)
    }
}

/// A project open that has its ticket but not yet its bytes.
#[derive(Debug)]
pub struct PendingOpen {
    ticket: LoadTicket,
    project_id: String,
    model_url: String,
    format: ModelFormat,
    parts_meta: PartsMeta,
    transform: Transform,
}

impl PendingOpen {
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn model_url(&self) -> &str {
        &self.model_url
    }

    pub fn format(&self) -> ModelFormat {
        self.format
    }
}

/// User input for a new project. The transform and part metadata are taken
/// from the session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProjectDraft {
    pub name: String,
    pub author: String,
    pub password: String,
    pub date: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Project list cache, active-project binding and the viewer session, kept
/// consistent with a [`ProjectStore`].
pub struct ProjectSync<S: ProjectStore, B: RenderBackend = HeadlessBackend> {
    store: S,
    session: ViewerSession<B>,
    registry: FormatRegistry,
    projects: Vec<ProjectRecord>,
    active_project: Option<String>,
    phase: SyncPhase,
}

impl<S: ProjectStore> ProjectSync<S> {
    /// Sync over `store` with a headless viewer session.
    pub fn headless(store: S) -> Self {
        Self::new(store, ViewerSession::default())
    }
}

impl<S: ProjectStore, B: RenderBackend> ProjectSync<S, B> {
    pub fn new(store: S, session: ViewerSession<B>) -> Self {
        Self {
            store,
            session,
            registry: FormatRegistry::with_defaults(),
            projects: Vec::new(),
            active_project: None,
            phase: SyncPhase::Idle,
        }
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn session(&self) -> &ViewerSession<B> {
        &self.session
    }

    /// Local edits (part colors, visibility, transform) go through here and
    /// are saved with the `save_*` calls.
    pub fn session_mut(&mut self) -> &mut ViewerSession<B> {
        &mut self.session
    }

    /// Cached project list as of the last successful refresh.
    pub fn projects(&self) -> &[ProjectRecord] {
        &self.projects
    }

    pub fn project(&self, id: &str) -> Option<&ProjectRecord> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn active_project_id(&self) -> Option<&str> {
        self.active_project.as_deref()
    }

    pub fn active_project(&self) -> Option<&ProjectRecord> {
        self.active_project.as_deref().and_then(|id| self.project(id))
    }

    fn set_phase(&mut self, phase: SyncPhase) {
        debug!(from = %self.phase, to = %phase, "sync phase");
        self.phase = phase;
    }

    /// Replace the cached list with the store's. On failure the cache is kept.
    pub async fn refresh_projects(&mut self) -> Result<&[ProjectRecord]> {
        let projects = self.store.list_projects().await?;
        debug!(count = projects.len(), "project list refreshed");
        self.projects = projects;
        Ok(&self.projects)
    }

    async fn refresh_quietly(&mut self) {
        if let Err(err) = self.refresh_projects().await {
            warn!(%err, "project list refresh failed");
        }
    }

    /// Refresh after a store call: always on success, and on `NotFound` so a
    /// project deleted elsewhere drops out of the list.
    async fn settle<T>(&mut self, action: &str, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                info!(action, "store updated");
                self.refresh_quietly().await;
                Ok(value)
            }
            Err(err) => {
                warn!(action, %err, "store call failed");
                if err.is_not_found() {
                    self.refresh_quietly().await;
                }
                Err(err)
            }
        }
    }

    // -- Opening --

    /// Open a cached project: fetch its model and install it. An id missing
    /// from the cache refreshes the list before failing.
    pub async fn open_project(&mut self, id: &str) -> Result<LoadOutcome> {
        let pending = match self.begin_open(id) {
            Ok(pending) => pending,
            Err(err) => return self.settle("open project", Err(err)).await,
        };
        let bytes = match self.fetch(&pending).await {
            Ok(bytes) => bytes,
            Err(err) => {
                if self.session.is_current(&pending.ticket) {
                    self.set_phase(SyncPhase::Idle);
                }
                return Err(err);
            }
        };
        self.finish_open(pending, bytes)
    }

    /// Start opening `id`. Releases the current model and invalidates any
    /// load still in flight.
    pub fn begin_open(&mut self, id: &str) -> Result<PendingOpen> {
        let record = self
            .project(id)
            .ok_or_else(|| SyncError::NotFound(format!("project '{id}'")))?;
        let model_url = record
            .model_url
            .clone()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| SyncError::validation(format!("project '{id}' has no model")))?;
        let file_name = record.model_file_name().unwrap_or(&model_url);
        let format = self.registry.dispatch(file_name)?;
        let parts_meta = record.parts_meta.clone();
        let transform = record.transform();

        let ticket = self.session.begin_load();
        self.active_project = None;
        self.set_phase(SyncPhase::Loading);
        info!(id, %format, "opening project");

        Ok(PendingOpen {
            ticket,
            project_id: id.to_string(),
            model_url,
            format,
            parts_meta,
            transform,
        })
    }

    /// Download the model bytes for a pending open.
    pub async fn fetch(&self, pending: &PendingOpen) -> Result<Vec<u8>> {
        self.store.fetch_asset(&pending.model_url).await
    }

    /// Install fetched bytes. A pending open whose ticket was superseded is
    /// dropped without touching any state.
    pub fn finish_open(&mut self, pending: PendingOpen, bytes: Vec<u8>) -> Result<LoadOutcome> {
        let PendingOpen {
            ticket,
            project_id,
            format,
            parts_meta,
            transform,
            ..
        } = pending;

        if !self.session.is_current(&ticket) {
            warn!(id = %project_id, "dropping superseded project open");
            return Ok(LoadOutcome::Superseded);
        }
        let outcome = self.install(ticket, format, &bytes, &parts_meta, transform)?;
        self.active_project = Some(project_id);
        Ok(outcome)
    }

    /// Show a file from disk. Detaches the active project; no stored
    /// metadata and the default transform are used.
    pub fn load_local_file(&mut self, file_name: &str, bytes: &[u8]) -> Result<LoadOutcome> {
        let format = self.registry.dispatch(file_name)?;
        let ticket = self.session.begin_load();
        self.active_project = None;
        self.set_phase(SyncPhase::Loading);
        info!(file_name, %format, "loading local file");
        self.install(ticket, format, bytes, &PartsMeta::new(), Transform::default())
    }

    fn install(
        &mut self,
        ticket: LoadTicket,
        format: ModelFormat,
        bytes: &[u8],
        parts_meta: &PartsMeta,
        transform: Transform,
    ) -> Result<LoadOutcome> {
        let scene = match self.registry.read_as(bytes, format) {
            Ok(scene) => scene,
            Err(err) => {
                self.set_phase(SyncPhase::Idle);
                return Err(err.into());
            }
        };

        let outcome = self.session.complete_load(ticket, LoadedScene { format, scene });
        if outcome == LoadOutcome::Superseded {
            return Ok(outcome);
        }
        self.set_phase(SyncPhase::Indexed);

        self.session.apply_parts_meta(parts_meta)?;
        self.set_phase(SyncPhase::MetaApplied);

        self.session.set_transform(transform);
        self.set_phase(SyncPhase::TransformApplied);

        self.session.fit_camera()?;
        self.set_phase(SyncPhase::CameraFitted);

        self.set_phase(SyncPhase::Idle);
        Ok(outcome)
    }

    // -- Mutations --

    fn active_id(&self) -> Result<String> {
        self.active_project
            .clone()
            .ok_or_else(|| SyncError::validation("no active project"))
    }

    fn require_model(&self) -> Result<()> {
        if self.session.has_model() {
            Ok(())
        } else {
            Err(SyncError::validation("no model loaded"))
        }
    }

    fn check_upload(&self, file_name: &str, bytes: &[u8]) -> Result<()> {
        if file_name.trim().is_empty() || bytes.is_empty() {
            return Err(SyncError::validation("model file is required"));
        }
        self.registry.dispatch(file_name)?;
        Ok(())
    }

    /// Save a new project with the session's transform and the metadata of
    /// any parts edited since the model was loaded.
    /// On success the new project becomes the active one.
    pub async fn create_project(&mut self, draft: ProjectDraft) -> Result<String> {
        require(&draft.name, "project name")?;
        require(&draft.password, "password")?;
        self.check_upload(&draft.file_name, &draft.bytes)?;

        let project = NewProject {
            name: draft.name,
            author: draft.author,
            password: draft.password,
            date: draft.date,
            model: ModelUpload::new(draft.file_name, draft.bytes),
            transform: self.session.transform(),
            parts_meta: self.session.edited_parts_meta(),
        };
        let result = self.store.create_project(project).await;
        let id = self.settle("create project", result).await?;
        self.active_project = Some(id.clone());
        Ok(id)
    }

    /// Upload a new model file for the active project.
    pub async fn replace_model(&mut self, file_name: &str, bytes: Vec<u8>, password: &str) -> Result<()> {
        let id = self.active_id()?;
        require(password, "password")?;
        self.check_upload(file_name, &bytes)?;

        let result = self
            .store
            .replace_model(&id, ModelUpload::new(file_name, bytes), password)
            .await;
        self.settle("replace model", result).await
    }

    /// Persist the session transform for the active project.
    pub async fn save_transform(&mut self, password: &str) -> Result<()> {
        let id = self.active_id()?;
        self.require_model()?;
        require(password, "password")?;

        let transform = self.session.transform();
        let result = self.store.update_transform(&id, &transform, password).await;
        self.settle("save transform", result).await
    }

    pub async fn rename_project(&mut self, name: &str, password: &str) -> Result<()> {
        let id = self.active_id()?;
        require(name, "project name")?;
        require(password, "password")?;

        let result = self.store.rename_project(&id, name, password).await;
        self.settle("rename project", result).await
    }

    pub async fn save_notes(&mut self, notes: &str, password: &str) -> Result<()> {
        let id = self.active_id()?;
        require(password, "password")?;

        let result = self.store.update_notes(&id, notes, password).await;
        self.settle("save notes", result).await
    }

    /// Persist one part's current name, notes, color and preset.
    pub async fn save_part_meta(&mut self, part: PartId, password: &str) -> Result<()> {
        let id = self.active_id()?;
        self.require_model()?;
        require(password, "password")?;
        let meta = self
            .session
            .part(part)
            .map(PartMeta::from_part)
            .ok_or(partview_viewer::ViewerError::UnknownPart(part))?;

        let result = self.store.update_part_meta(&id, part, &meta, password).await;
        self.settle("save part meta", result).await
    }

    /// Delete a project. Deleting the active project unbinds it; the model
    /// stays on screen.
    pub async fn delete_project(&mut self, id: &str, password: &str) -> Result<()> {
        require(id, "project id")?;
        require(password, "password")?;

        let result = self.store.delete_project(id, password).await;
        self.settle("delete project", result).await?;
        if self.active_project.as_deref() == Some(id) {
            self.active_project = None;
        }
        Ok(())
    }

    // -- Quotes --

    pub async fn load_quote(&self, id: &str) -> Result<Quote> {
        require(id, "project id")?;
        self.store.load_quote(id).await
    }

    /// Recompute the total and save. Returns the quote as sent.
    pub async fn save_quote(&self, id: &str, mut quote: Quote) -> Result<Quote> {
        require(id, "project id")?;
        quote.recompute_total();
        self.store.save_quote(id, &quote).await?;
        info!(id, total = quote.total, "quote saved");
        Ok(quote)
    }

    /// Spreadsheet bytes for a quote.
    pub async fn export_quote(&self, id: &str) -> Result<Vec<u8>> {
        require(id, "project id")?;
        self.store.export_quote(id).await
    }
}

fn require(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SyncError::validation(format!("{what} is required")));
    }
    Ok(())
}
