//! In-process project store.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use indexmap::IndexMap;
use partview_core::{PartId, PartMeta, Transform};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::error::{Result, SyncError};
use crate::quote::Quote;
use crate::record::ProjectRecord;
use crate::store::ProjectStore;
use crate::wire::{ModelUpload, NewProject};

struct StoredProject {
    record: ProjectRecord,
    password_hash: String,
}

#[derive(Default)]
struct State {
    projects: IndexMap<String, StoredProject>,
    assets: HashMap<String, Vec<u8>>,
    quotes: HashMap<String, Quote>,
    next_id: u64,
}

/// [`ProjectStore`] kept in memory, with the same validation and password
/// rules as the HTTP store.
///
/// Passwords are kept as salted SHA-256 digests. Single-threaded: state lives
/// in a `RefCell` and no borrow is held across an await.
#[derive(Default)]
pub struct MemoryProjectStore {
    state: RefCell<State>,
    calls: Cell<usize>,
}

impl MemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of store calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.get()
    }

    /// Whether an asset is stored under `model_url`.
    pub fn has_asset(&self, model_url: &str) -> bool {
        self.state.borrow().assets.contains_key(model_url)
    }

    /// Store a quote directly, bypassing any project check.
    pub fn insert_quote(&self, id: &str, quote: Quote) {
        self.state.borrow_mut().quotes.insert(id.to_string(), quote);
    }

    fn record_call(&self) {
        self.calls.set(self.calls.get() + 1);
    }

    /// Run `f` on a project after checking its password.
    fn with_project<T>(
        &self,
        id: &str,
        password: &str,
        f: impl FnOnce(&mut State, &str) -> Result<T>,
    ) -> Result<T> {
        self.record_call();
        if password.is_empty() {
            return Err(SyncError::validation("password is required"));
        }
        let mut state = self.state.borrow_mut();
        let project = state
            .projects
            .get(id)
            .ok_or_else(|| SyncError::NotFound(format!("project '{id}'")))?;
        if project.password_hash != hash_password(id, password) {
            return Err(SyncError::Authorization("wrong password".into()));
        }
        f(&mut *state, id)
    }
}

fn hash_password(id: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(id.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn asset_url(id: &str, file_name: &str) -> String {
    format!("/uploads/{id}/{file_name}")
}

fn record_mut<'a>(state: &'a mut State, id: &str) -> Result<&'a mut ProjectRecord> {
    state
        .projects
        .get_mut(id)
        .map(|p| &mut p.record)
        .ok_or_else(|| SyncError::NotFound(format!("project '{id}'")))
}

impl ProjectStore for MemoryProjectStore {
    async fn list_projects(&self) -> Result<Vec<ProjectRecord>> {
        self.record_call();
        Ok(self
            .state
            .borrow()
            .projects
            .values()
            .map(|p| p.record.clone())
            .collect())
    }

    async fn create_project(&self, project: NewProject) -> Result<String> {
        self.record_call();
        if project.name.trim().is_empty() {
            return Err(SyncError::validation("project name is required"));
        }
        if project.password.is_empty() {
            return Err(SyncError::validation("password is required"));
        }
        if project.model.bytes.is_empty() || project.model.file_name.is_empty() {
            return Err(SyncError::validation("model file is required"));
        }

        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let id = format!("p{}", state.next_id);
        let model_url = asset_url(&id, &project.model.file_name);

        let record = ProjectRecord {
            id: id.clone(),
            name: project.name,
            author: project.author,
            date: project.date,
            position: project.transform.position,
            rotation: project.transform.rotation,
            model_file: Some(project.model.file_name),
            model_url: Some(model_url.clone()),
            parts_meta: project.parts_meta,
            pending_notes: String::new(),
        };
        state.assets.insert(model_url, project.model.bytes);
        state.projects.insert(
            id.clone(),
            StoredProject {
                record,
                password_hash: hash_password(&id, &project.password),
            },
        );
        info!(id = %id, "created project in memory store");
        Ok(id)
    }

    async fn replace_model(&self, id: &str, model: ModelUpload, password: &str) -> Result<()> {
        if model.bytes.is_empty() || model.file_name.is_empty() {
            self.record_call();
            return Err(SyncError::validation("model file is required"));
        }
        self.with_project(id, password, |state, id| {
            let record = record_mut(state, id)?;
            let old_url = record.model_url.take();
            let new_url = asset_url(id, &model.file_name);
            record.model_file = Some(model.file_name);
            record.model_url = Some(new_url.clone());
            // Part ids of the old model mean nothing for the new one
            record.parts_meta.clear();
            if let Some(old_url) = old_url {
                state.assets.remove(&old_url);
            }
            state.assets.insert(new_url, model.bytes);
            Ok(())
        })
    }

    async fn update_transform(&self, id: &str, transform: &Transform, password: &str) -> Result<()> {
        self.with_project(id, password, |state, id| {
            let record = record_mut(state, id)?;
            record.position = transform.position;
            record.rotation = transform.rotation;
            Ok(())
        })
    }

    async fn rename_project(&self, id: &str, name: &str, password: &str) -> Result<()> {
        if name.trim().is_empty() {
            self.record_call();
            return Err(SyncError::validation("project name is required"));
        }
        self.with_project(id, password, |state, id| {
            record_mut(state, id)?.name = name.to_string();
            Ok(())
        })
    }

    async fn update_notes(&self, id: &str, notes: &str, password: &str) -> Result<()> {
        self.with_project(id, password, |state, id| {
            record_mut(state, id)?.pending_notes = notes.to_string();
            Ok(())
        })
    }

    async fn update_part_meta(
        &self,
        id: &str,
        part: PartId,
        meta: &PartMeta,
        password: &str,
    ) -> Result<()> {
        self.with_project(id, password, |state, id| {
            let entry = record_mut(state, id)?.parts_meta.entry(part).or_default();
            // Fields left out of the update keep their stored value
            if meta.name.is_some() {
                entry.name = meta.name.clone();
            }
            if meta.notes.is_some() {
                entry.notes = meta.notes.clone();
            }
            if meta.color.is_some() {
                entry.color = meta.color.clone();
            }
            if meta.material_preset.is_some() {
                entry.material_preset = meta.material_preset.clone();
            }
            Ok(())
        })
    }

    async fn delete_project(&self, id: &str, password: &str) -> Result<()> {
        self.with_project(id, password, |state, id| {
            if let Some(project) = state.projects.shift_remove(id) {
                if let Some(url) = project.record.model_url {
                    state.assets.remove(&url);
                }
            }
            state.quotes.remove(id);
            Ok(())
        })
    }

    async fn fetch_asset(&self, model_url: &str) -> Result<Vec<u8>> {
        self.record_call();
        self.state
            .borrow()
            .assets
            .get(model_url)
            .cloned()
            .ok_or_else(|| SyncError::NotFound(format!("asset '{model_url}'")))
    }

    async fn load_quote(&self, id: &str) -> Result<Quote> {
        self.record_call();
        Ok(self.state.borrow().quotes.get(id).cloned().unwrap_or_default())
    }

    async fn save_quote(&self, id: &str, quote: &Quote) -> Result<()> {
        self.record_call();
        self.state
            .borrow_mut()
            .quotes
            .insert(id.to_string(), quote.clone());
        Ok(())
    }

    /// Tab-separated rows; the HTTP store returns a real spreadsheet.
    async fn export_quote(&self, id: &str) -> Result<Vec<u8>> {
        self.record_call();
        let state = self.state.borrow();
        let quote = state
            .quotes
            .get(id)
            .ok_or_else(|| SyncError::NotFound(format!("quote '{id}'")))?;
        let mut out = String::from("concepto\tcantidad\tprecio\tlink\n");
        for item in &quote.items {
            out.push_str(&format!(
                "{}\t{}\t{}\t{}\n",
                item.concepto, item.cantidad, item.precio, item.link
            ));
        }
        out.push_str(&format!("total\t\t{}\t\n", quote.total));
        Ok(out.into_bytes())
    }
}
