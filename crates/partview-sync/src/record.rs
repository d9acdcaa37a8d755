//! Project records as listed by the store.

use partview_core::{PartId, PartMeta, PartsMeta, Transform, Vec3Value};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

/// A saved project.
///
/// Missing or `null` fields deserialize to their defaults so that records
/// written by older store versions still list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default, deserialize_with = "or_default")]
    pub name: String,
    #[serde(default, deserialize_with = "or_default")]
    pub author: String,
    #[serde(default, deserialize_with = "or_default")]
    pub date: String,
    #[serde(default, deserialize_with = "or_default")]
    pub position: Vec3Value,
    #[serde(default, deserialize_with = "or_default")]
    pub rotation: Vec3Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_url: Option<String>,
    #[serde(default, deserialize_with = "parts_meta")]
    pub parts_meta: PartsMeta,
    #[serde(default, deserialize_with = "or_default")]
    pub pending_notes: String,
}

impl ProjectRecord {
    pub fn transform(&self) -> Transform {
        Transform::new(self.position, self.rotation)
    }

    /// File name used for extension dispatch: the stored file name, else the
    /// last segment of the model URL.
    pub fn model_file_name(&self) -> Option<&str> {
        self.model_file
            .as_deref()
            .filter(|f| !f.is_empty())
            .or_else(|| {
                self.model_url
                    .as_deref()
                    .map(|url| url.rsplit('/').next().unwrap_or(url))
                    .filter(|f| !f.is_empty())
            })
    }
}

fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Ids arrive as strings from current stores and as numbers from some older
/// ones.
fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "project id must be a string or number, got {other}"
        ))),
    }
}

fn parts_meta<'de, D: Deserializer<'de>>(deserializer: D) -> Result<PartsMeta, D::Error> {
    Ok(normalize_parts_meta(Value::deserialize(deserializer)?))
}

/// Normalize a raw `partsMeta` value.
///
/// Objects are keyed by decimal part ids; arrays use the element index as the
/// id. Entries with an unparseable key or a malformed value are dropped with a
/// warning. Anything else yields an empty map.
pub fn normalize_parts_meta(raw: Value) -> PartsMeta {
    let mut meta = PartsMeta::new();
    let mut insert = |key: &str, id: Option<PartId>, value: Value| {
        let Some(id) = id else {
            warn!(key, "dropping partsMeta entry with invalid part id");
            return;
        };
        match serde_json::from_value::<PartMeta>(value) {
            Ok(entry) => {
                meta.insert(id, entry);
            }
            Err(err) => warn!(key, %err, "dropping malformed partsMeta entry"),
        }
    };

    match raw {
        Value::Object(map) => {
            for (key, value) in map {
                insert(&key, PartId::from_key(&key).ok(), value);
            }
        }
        Value::Array(items) => {
            for (i, value) in items.into_iter().enumerate() {
                if value.is_null() {
                    continue;
                }
                insert(&i.to_string(), u32::try_from(i).ok().map(PartId), value);
            }
        }
        Value::Null => {}
        other => warn!(value = %other, "ignoring partsMeta that is neither object nor array"),
    }
    meta
}
