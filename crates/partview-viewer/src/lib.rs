//! partview-viewer: parts, transforms and picking over a loaded scene.
//!
//! A [`ViewerSession`] owns at most one active model. Loading goes through a
//! ticket so that a slow load can never overwrite a newer one:
//!
//! ```ignore
//! use partview_viewer::{LoadOutcome, ViewerSession};
//!
//! let mut session = ViewerSession::default();
//! let ticket = session.begin_load();
//! let loaded = partview_io::load(&bytes, "bracket.stl")?;
//! if session.complete_load(ticket, loaded) == LoadOutcome::Applied {
//!     session.apply_parts_meta(&stored_meta)?;
//!     session.fit_camera()?;
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! SceneRoot ─> PartIndexer ─> PartIndex + default parts
//!                                 │
//!            PartsMeta ─> MetaReconciler
//!                                 │
//!                            ViewState ─> TransformController::apply ─> SceneRoot
//! ```

pub mod backend;
pub mod camera;
pub mod error;
pub mod indexer;
pub mod reconcile;
pub mod selection;
pub mod session;
pub mod transform;

pub use backend::{HeadlessBackend, ModelHandle, RenderBackend};
pub use camera::Camera;
pub use error::{Result, ViewerError};
pub use indexer::{PartIndex, PartIndexer};
pub use reconcile::MetaReconciler;
pub use selection::{intersect_triangle, pick, Hit, Ray, Selection, SELECTION_TIMEOUT};
pub use session::{LoadOutcome, LoadTicket, ViewerSession};
pub use transform::{ActiveModel, TransformController, ViewState};
