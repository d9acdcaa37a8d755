//! partview-sync: keeps a viewer session in step with a project store.
//!
//! [`ProjectSync`] owns the cached project list, the active-project binding
//! and a [`partview_viewer::ViewerSession`]. It talks to any
//! [`ProjectStore`]: [`HttpProjectStore`] for the REST API, or
//! [`MemoryProjectStore`] for tests and offline use.
//!
//! ```ignore
//! use partview_sync::{HttpProjectStore, ProjectSync, SyncConfig};
//!
//! let store = HttpProjectStore::new(SyncConfig::from_env())?;
//! let mut sync = ProjectSync::headless(store);
//! sync.refresh_projects().await?;
//! sync.open_project("p1").await?;
//! sync.session_mut().set_part_color(PartId(2), Color::rgb(255, 0, 0))?;
//! sync.save_part_meta(PartId(2), "abc123").await?;
//! ```
//!
//! Every mutation validates locally first, then calls the store, then
//! refreshes the cached list. A failed call leaves local state as it was.

pub mod config;
pub mod error;
pub mod http;
pub mod memory;
pub mod quote;
pub mod record;
pub mod store;
pub mod sync;
pub mod wire;

pub use config::SyncConfig;
pub use error::{Result, SyncError};
pub use http::HttpProjectStore;
pub use memory::MemoryProjectStore;
pub use quote::{Quote, QuoteItem};
pub use record::{normalize_parts_meta, ProjectRecord};
pub use store::ProjectStore;
pub use sync::{PendingOpen, ProjectDraft, ProjectSync, SyncPhase};
pub use wire::{ModelUpload, NewProject};
