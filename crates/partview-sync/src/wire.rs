//! Request and response bodies exchanged with the project store.

use partview_core::{PartId, PartMeta, PartsMeta, Transform, Vec3Value};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};
use crate::record::ProjectRecord;

/// A model file to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ModelUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

/// Everything `POST /api/projects` needs.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProject {
    pub name: String,
    pub author: String,
    pub password: String,
    pub date: String,
    pub model: ModelUpload,
    pub transform: Transform,
    pub parts_meta: PartsMeta,
}

impl NewProject {
    /// The text fields of the multipart form, in send order. Structured
    /// values travel as JSON strings.
    pub fn form_fields(&self) -> Result<Vec<(&'static str, String)>> {
        Ok(vec![
            ("projectName", self.name.clone()),
            ("author", self.author.clone()),
            ("password", self.password.clone()),
            ("date", self.date.clone()),
            ("position", serde_json::to_string(&self.transform.position)?),
            ("rotation", serde_json::to_string(&self.transform.rotation)?),
            ("partsMeta", serde_json::to_string(&self.parts_meta)?),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransformUpdate<'a> {
    pub position: Vec3Value,
    pub rotation: Vec3Value,
    pub password: &'a str,
}

impl<'a> TransformUpdate<'a> {
    pub fn new(transform: &Transform, password: &'a str) -> Self {
        Self {
            position: transform.position,
            rotation: transform.rotation,
            password,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenameRequest<'a> {
    pub name: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotesRequest<'a> {
    pub notes: &'a str,
    pub password: &'a str,
}

/// One part's metadata, keyed by its canonical string id.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartMetaUpdate<'a> {
    pub part_id: String,
    #[serde(flatten)]
    pub meta: &'a PartMeta,
    pub password: &'a str,
}

impl<'a> PartMetaUpdate<'a> {
    pub fn new(part: PartId, meta: &'a PartMeta, password: &'a str) -> Self {
        Self {
            part_id: part.to_key(),
            meta,
            password,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PasswordBody<'a> {
    pub password: &'a str,
}

/// The `{ok, ...}` envelope every JSON response is wrapped in.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub ok: bool,
    #[serde(default)]
    pub projects: Option<Vec<ProjectRecord>>,
    #[serde(default)]
    pub project_id: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Map a store response to a JSON value.
///
/// 400 is a validation failure, 401 and 403 are authorization failures and
/// 404 is not-found. Any other non-2xx status, a body that is not JSON, or
/// `ok: false` is a protocol error carrying the raw body.
pub fn check_json(status: u16, body: &str) -> Result<serde_json::Value> {
    let message = || error_message(body);
    match status {
        200..=299 => {}
        400 => return Err(SyncError::Validation(message())),
        401 | 403 => return Err(SyncError::Authorization(message())),
        404 => return Err(SyncError::NotFound(message())),
        _ => return Err(protocol(status, body)),
    }
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|_| protocol(status, body))?;
    if value.get("ok").and_then(|ok| ok.as_bool()) == Some(false) {
        return Err(protocol(status, body));
    }
    Ok(value)
}

/// [`check_json`] for endpoints that answer with an `{ok, ...}` envelope.
pub fn check_response(status: u16, body: &str) -> Result<Envelope> {
    let value = check_json(status, body)?;
    serde_json::from_value(value).map_err(|_| protocol(status, body))
}

/// Status check for endpoints that return raw bytes instead of an envelope.
pub fn check_status(status: u16, body: &[u8]) -> Result<()> {
    if (200..300).contains(&status) {
        return Ok(());
    }
    check_json(status, &String::from_utf8_lossy(body)).map(|_| ())
}

fn protocol(status: u16, body: &str) -> SyncError {
    SyncError::Protocol {
        status,
        body: body.to_string(),
    }
}

/// The store's `error` field when present, else the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_part_meta_payload() {
        let meta = PartMeta {
            name: Some("Hinge".into()),
            notes: Some("M4 holes".into()),
            color: Some("#ff0000".into()),
            material_preset: Some("metal".into()),
        };
        insta::assert_json_snapshot!(PartMetaUpdate::new(PartId(2), &meta, "abc123"), @r###"
        {
          "partId": "2",
          "name": "Hinge",
          "notes": "M4 holes",
          "color": "#ff0000",
          "materialPreset": "metal",
          "password": "abc123"
        }
        "###);
    }

    #[test]
    fn test_rename_and_delete_payloads() {
        insta::assert_json_snapshot!(RenameRequest { name: "Bracket v2", password: "abc123" }, @r###"
        {
          "name": "Bracket v2",
          "password": "abc123"
        }
        "###);
        insta::assert_json_snapshot!(PasswordBody { password: "abc123" }, @r###"
        {
          "password": "abc123"
        }
        "###);
    }

    #[test]
    fn test_transform_payload() {
        let transform = Transform::new(Vec3Value::new(1.5, 0.0, -2.0), Vec3Value::new(0.0, 90.0, 0.0));
        let value = serde_json::to_value(TransformUpdate::new(&transform, "abc123")).unwrap();
        assert_eq!(
            value,
            json!({
                "position": {"x": 1.5, "y": 0.0, "z": -2.0},
                "rotation": {"x": 0.0, "y": 90.0, "z": 0.0},
                "password": "abc123"
            })
        );
    }

    #[test]
    fn test_create_form_fields() {
        let mut parts_meta = PartsMeta::new();
        parts_meta.insert(
            PartId(1),
            PartMeta {
                name: Some("Lid".into()),
                ..Default::default()
            },
        );
        let project = NewProject {
            name: "Bracket v1".into(),
            author: "Ana".into(),
            password: "abc123".into(),
            date: "2024-05-02".into(),
            model: ModelUpload::new("bracket.obj", b"v 0 0 0".to_vec()),
            transform: Transform::default(),
            parts_meta,
        };
        let fields = project.form_fields().unwrap();
        let names: Vec<_> = fields.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            names,
            ["projectName", "author", "password", "date", "position", "rotation", "partsMeta"]
        );
        assert_eq!(fields[6].1, r#"{"1":{"name":"Lid"}}"#);
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            check_response(400, r#"{"ok":false,"error":"missing name"}"#),
            Err(SyncError::Validation(m)) if m == "missing name"
        ));
        assert!(matches!(check_response(401, ""), Err(SyncError::Authorization(_))));
        assert!(matches!(check_response(403, "nope"), Err(SyncError::Authorization(m)) if m == "nope"));
        assert!(matches!(check_response(404, "{}"), Err(SyncError::NotFound(_))));
        assert!(matches!(
            check_response(500, "boom"),
            Err(SyncError::Protocol { status: 500, body }) if body == "boom"
        ));
    }

    #[test]
    fn test_bad_success_bodies_are_protocol_errors() {
        assert!(matches!(
            check_response(200, "<html>"),
            Err(SyncError::Protocol { status: 200, .. })
        ));
        assert!(matches!(
            check_response(200, r#"{"ok": false}"#),
            Err(SyncError::Protocol { status: 200, .. })
        ));
        let envelope = check_response(200, r#"{"ok": true, "projectId": "p9"}"#).unwrap();
        assert_eq!(envelope.project_id, Some(json!("p9")));
        // Quote bodies carry no envelope
        assert!(check_json(200, r#"{"items": [], "total": 0}"#).is_ok());
        assert!(check_response(200, r#"{"items": []}"#).is_err());
    }

    #[test]
    fn test_binary_status() {
        assert!(check_status(200, b"PK\x03\x04").is_ok());
        assert!(matches!(check_status(404, b"missing"), Err(SyncError::NotFound(_))));
    }
}
