//! The project store contract.

use partview_core::{PartId, PartMeta, Transform};

use crate::error::Result;
use crate::quote::Quote;
use crate::record::ProjectRecord;
use crate::wire::{ModelUpload, NewProject};

/// Remote persistence for projects, their model assets and quotes.
///
/// Password-protected calls fail with `Authorization` on a wrong password and
/// `NotFound` for an unknown project id. Implementations never retry.
#[allow(async_fn_in_trait)]
pub trait ProjectStore {
    /// Every saved project.
    async fn list_projects(&self) -> Result<Vec<ProjectRecord>>;

    /// Create a project and return its id.
    async fn create_project(&self, project: NewProject) -> Result<String>;

    async fn replace_model(&self, id: &str, model: ModelUpload, password: &str) -> Result<()>;

    async fn update_transform(&self, id: &str, transform: &Transform, password: &str) -> Result<()>;

    async fn rename_project(&self, id: &str, name: &str, password: &str) -> Result<()>;

    async fn update_notes(&self, id: &str, notes: &str, password: &str) -> Result<()>;

    async fn update_part_meta(
        &self,
        id: &str,
        part: PartId,
        meta: &PartMeta,
        password: &str,
    ) -> Result<()>;

    async fn delete_project(&self, id: &str, password: &str) -> Result<()>;

    /// Raw bytes of a model asset referenced by a record's `modelUrl`.
    async fn fetch_asset(&self, model_url: &str) -> Result<Vec<u8>>;

    async fn load_quote(&self, id: &str) -> Result<Quote>;

    async fn save_quote(&self, id: &str, quote: &Quote) -> Result<()>;

    /// The quote rendered as a spreadsheet.
    async fn export_quote(&self, id: &str) -> Result<Vec<u8>>;
}
