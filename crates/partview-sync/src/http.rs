//! Project store client over HTTP.

use partview_core::{PartId, PartMeta, Transform};
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Url};
use tracing::{debug, info};

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::quote::Quote;
use crate::record::ProjectRecord;
use crate::store::ProjectStore;
use crate::wire::{
    check_json, check_response, check_status, Envelope, ModelUpload, NewProject, NotesRequest,
    PartMetaUpdate, PasswordBody, RenameRequest, TransformUpdate,
};

/// [`ProjectStore`] backed by the project REST API.
pub struct HttpProjectStore {
    config: SyncConfig,
    http: reqwest::Client,
}

impl HttpProjectStore {
    pub fn new(config: SyncConfig) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// `<api_url>/<segments...>` with each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let invalid = || SyncError::validation(format!("invalid API URL '{}'", self.config.api_url));
        let mut url = Url::parse(&self.config.api_url).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn project(&self, id: &str, action: Option<&str>) -> Result<Url> {
        match action {
            Some(action) => self.endpoint(&["api", "projects", id, action]),
            None => self.endpoint(&["api", "projects", id]),
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Envelope> {
        let resp = request.send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        debug!(status, bytes = body.len(), "store response");
        check_response(status, &body)
    }

    async fn send_bytes(&self, request: RequestBuilder) -> Result<Vec<u8>> {
        let resp = request.send().await?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await?;
        check_status(status, &body)?;
        Ok(body.to_vec())
    }
}

fn model_part(model: ModelUpload) -> Part {
    Part::bytes(model.bytes).file_name(model.file_name)
}

impl ProjectStore for HttpProjectStore {
    async fn list_projects(&self) -> Result<Vec<ProjectRecord>> {
        let envelope = self.send(self.http.get(self.endpoint(&["api", "projects"])?)).await?;
        Ok(envelope.projects.unwrap_or_default())
    }

    async fn create_project(&self, project: NewProject) -> Result<String> {
        let mut form = Form::new();
        for (name, value) in project.form_fields()? {
            form = form.text(name, value);
        }
        let form = form.part("model", model_part(project.model));

        let envelope = self
            .send(self.http.post(self.endpoint(&["api", "projects"])?).multipart(form))
            .await?;
        let id = match envelope.project_id {
            Some(serde_json::Value::String(id)) => id,
            Some(serde_json::Value::Number(id)) => id.to_string(),
            _ => {
                return Err(SyncError::Protocol {
                    status: 200,
                    body: "response is missing projectId".into(),
                })
            }
        };
        info!(id = %id, name = %project.name, "created project");
        Ok(id)
    }

    async fn replace_model(&self, id: &str, model: ModelUpload, password: &str) -> Result<()> {
        let form = Form::new()
            .text("password", password.to_string())
            .part("model", model_part(model));
        self.send(self.http.put(self.project(id, Some("model"))?).multipart(form))
            .await?;
        Ok(())
    }

    async fn update_transform(&self, id: &str, transform: &Transform, password: &str) -> Result<()> {
        let body = TransformUpdate::new(transform, password);
        self.send(self.http.put(self.project(id, Some("transform"))?).json(&body))
            .await?;
        Ok(())
    }

    async fn rename_project(&self, id: &str, name: &str, password: &str) -> Result<()> {
        let body = RenameRequest { name, password };
        self.send(self.http.put(self.project(id, Some("rename"))?).json(&body))
            .await?;
        Ok(())
    }

    async fn update_notes(&self, id: &str, notes: &str, password: &str) -> Result<()> {
        let body = NotesRequest { notes, password };
        self.send(self.http.put(self.project(id, Some("notes"))?).json(&body))
            .await?;
        Ok(())
    }

    async fn update_part_meta(
        &self,
        id: &str,
        part: PartId,
        meta: &PartMeta,
        password: &str,
    ) -> Result<()> {
        let body = PartMetaUpdate::new(part, meta, password);
        self.send(self.http.put(self.project(id, Some("parts-meta"))?).json(&body))
            .await?;
        Ok(())
    }

    async fn delete_project(&self, id: &str, password: &str) -> Result<()> {
        let body = PasswordBody { password };
        self.send(self.http.delete(self.project(id, None)?).json(&body))
            .await?;
        Ok(())
    }

    async fn fetch_asset(&self, model_url: &str) -> Result<Vec<u8>> {
        let url = self.config.resolve(model_url);
        debug!(url = %url, "fetching model asset");
        self.send_bytes(self.http.get(url)).await
    }

    async fn load_quote(&self, id: &str) -> Result<Quote> {
        let resp = self.http.get(self.endpoint(&["api", "quotes", id])?).send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        let value = check_json(status, &body)?;
        // Some stores wrap the quote, others return it bare
        let quote = value.get("quote").cloned().unwrap_or(value);
        serde_json::from_value(quote).map_err(|_| SyncError::Protocol { status, body })
    }

    async fn save_quote(&self, id: &str, quote: &Quote) -> Result<()> {
        let resp = self
            .http
            .put(self.endpoint(&["api", "quotes", id])?)
            .json(quote)
            .send()
            .await?;
        let status = resp.status().as_u16();
        check_json(status, &resp.text().await?)?;
        Ok(())
    }

    async fn export_quote(&self, id: &str) -> Result<Vec<u8>> {
        self.send_bytes(self.http.get(self.endpoint(&["api", "quotes", id, "excel"])?))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(base: &str) -> HttpProjectStore {
        HttpProjectStore::new(SyncConfig::new(base)).unwrap()
    }

    #[test]
    fn test_endpoints() {
        let store = store("http://localhost:3000");
        assert_eq!(
            store.project("p1", Some("parts-meta")).unwrap().as_str(),
            "http://localhost:3000/api/projects/p1/parts-meta"
        );
        assert_eq!(
            store.endpoint(&["api", "quotes", "p1", "excel"]).unwrap().as_str(),
            "http://localhost:3000/api/quotes/p1/excel"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path_and_escapes_ids() {
        let store = store("https://example.com/store/");
        assert_eq!(
            store.project("a b/c", None).unwrap().as_str(),
            "https://example.com/store/api/projects/a%20b%2Fc"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let store = store("not a url");
        assert!(matches!(store.endpoint(&["api"]), Err(SyncError::Validation(_))));
    }

    #[tokio::test]
    async fn test_unreachable_store_is_network_error() {
        // Port 9 (discard) on localhost is closed in test environments
        let store = store("http://127.0.0.1:9");
        let err = store.list_projects().await.unwrap_err();
        assert!(matches!(err, SyncError::Network(_)));
    }
}
