//! Chat session and episodic record types.
//!
//! Both kinds live in the vector store as points whose payload is
//! `{"page_content": ..., "metadata": {...}}`. The typed wrappers below keep
//! the raw metadata map so fields written by other parties survive a
//! read-modify-write cycle.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::{ConfabError, ConfabResult};
use crate::traits::VectorRecord;

/// Payload key holding the embedded text.
pub const PAGE_CONTENT_KEY: &str = "page_content";
/// Payload key holding the metadata object.
pub const METADATA_KEY: &str = "metadata";

/// Current time in seconds since the epoch, with sub-second precision.
pub fn now_ts() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Build a point payload from content and metadata.
pub fn point_payload(page_content: &str, metadata: &Map<String, Value>) -> HashMap<String, Value> {
    HashMap::from([
        (
            PAGE_CONTENT_KEY.to_string(),
            Value::String(page_content.to_string()),
        ),
        (METADATA_KEY.to_string(), Value::Object(metadata.clone())),
    ])
}

fn split_payload(record: &VectorRecord) -> (String, Map<String, Value>) {
    let page_content = record
        .payload
        .get(PAGE_CONTENT_KEY)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();
    let metadata = record
        .payload
        .get(METADATA_KEY)
        .and_then(|v| v.as_object())
        .cloned()
        .unwrap_or_default();
    (page_content, metadata)
}

/// A persisted chat thread owned by one user.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSession {
    pub id: String,
    pub page_content: String,
    pub metadata: Map<String, Value>,
    pub vector: Vec<f32>,
}

impl ChatSession {
    /// Build the metadata of a brand new session.
    ///
    /// `extra` is merged over the defaults; a blank name falls back to
    /// `default_name` and a blank content falls back to the name.
    pub fn new_metadata(
        source: &str,
        content: Option<&str>,
        extra: Map<String, Value>,
        default_name: &str,
    ) -> Map<String, Value> {
        let mut metadata = Map::new();
        metadata.insert("source".into(), Value::String(source.to_string()));
        metadata.insert("when".into(), Value::from(now_ts()));
        metadata.insert(
            "content".into(),
            Value::String(content.unwrap_or_default().to_string()),
        );
        metadata.extend(extra);

        let has_name = metadata
            .get("name")
            .and_then(|v| v.as_str())
            .map_or(false, |s| !s.is_empty());
        if !has_name {
            metadata.insert("name".into(), Value::String(default_name.to_string()));
        }
        metadata
            .entry("deleted")
            .or_insert(Value::Bool(false));

        let content_blank = metadata
            .get("content")
            .and_then(|v| v.as_str())
            .map_or(true, |s| s.trim().is_empty());
        if content_blank {
            let name = metadata.get("name").cloned().unwrap_or_default();
            metadata.insert("content".into(), name);
        }
        metadata
    }

    /// Parse a session from a stored point.
    pub fn from_record(record: VectorRecord) -> ConfabResult<Self> {
        let (page_content, metadata) = split_payload(&record);
        if metadata.get("source").and_then(|v| v.as_str()).is_none() {
            return Err(ConfabError::vector_store(format!(
                "chat point '{}' has no owner in its metadata",
                record.id
            )));
        }
        Ok(Self {
            id: record.id,
            page_content,
            metadata,
            vector: record.vector,
        })
    }

    /// Owner user id.
    pub fn source(&self) -> &str {
        self.metadata
            .get("source")
            .and_then(|v| v.as_str())
            .unwrap_or("")
    }

    /// Display name.
    pub fn name(&self) -> &str {
        self.metadata
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or("")
    }

    /// Embedding input text.
    pub fn content(&self) -> &str {
        self.metadata
            .get("content")
            .and_then(|v| v.as_str())
            .unwrap_or(&self.page_content)
    }

    /// Creation time.
    pub fn when(&self) -> f64 {
        self.metadata
            .get("when")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0)
    }

    /// Time of the last reconciled turn.
    pub fn last_update(&self) -> Option<f64> {
        self.metadata.get("last_update").and_then(|v| v.as_f64())
    }

    /// Soft-delete flag.
    pub fn is_deleted(&self) -> bool {
        self.metadata
            .get("deleted")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.metadata.insert("name".into(), Value::String(name.into()));
    }

    pub fn set_last_update(&mut self, ts: f64) {
        self.metadata.insert("last_update".into(), Value::from(ts));
    }

    pub fn set_deleted(&mut self, deleted: bool) {
        self.metadata.insert("deleted".into(), Value::Bool(deleted));
    }

    /// Payload to write back on overwrite.
    pub fn to_payload(&self) -> HashMap<String, Value> {
        point_payload(&self.page_content, &self.metadata)
    }

    /// API representation.
    pub fn into_point(self) -> MemoryPoint {
        MemoryPoint {
            id: self.id,
            content: self.page_content,
            metadata: self.metadata,
            vector: self.vector,
        }
    }
}

/// A stored user/assistant exchange tied to a chat.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodicRecord {
    pub id: String,
    pub page_content: String,
    pub metadata: Map<String, Value>,
}

impl EpisodicRecord {
    /// Parse a record from a stored point.
    pub fn from_record(record: VectorRecord) -> Self {
        let (page_content, metadata) = split_payload(&record);
        Self {
            id: record.id,
            page_content,
            metadata,
        }
    }

    pub fn when(&self) -> f64 {
        self.metadata
            .get("when")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0)
    }

    /// The user's message, if this record was stamped as a chat turn.
    pub fn text(&self) -> Option<&str> {
        self.metadata.get("text").and_then(|v| v.as_str())
    }

    /// The assistant reply, if the key is present at all.
    pub fn bot(&self) -> Option<&str> {
        self.metadata.get("bot").and_then(|v| v.as_str())
    }

    /// A turn stays open until the reply is attached.
    pub fn is_open(&self) -> bool {
        self.bot().map_or(true, str::is_empty)
    }

    pub fn set_bot(&mut self, reply: impl Into<String>) {
        self.metadata.insert("bot".into(), Value::String(reply.into()));
    }

    pub fn to_payload(&self) -> HashMap<String, Value> {
        point_payload(&self.page_content, &self.metadata)
    }

    pub fn summary(&self) -> PointSummary {
        PointSummary {
            id: self.id.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

/// A point as returned to API callers on creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryPoint {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub vector: Vec<f32>,
}

/// Id plus metadata of a point, as listed by metadata queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointSummary {
    pub id: String,
    pub metadata: Map<String, Value>,
}

impl From<&ChatSession> for PointSummary {
    fn from(session: &ChatSession) -> Self {
        Self {
            id: session.id.clone(),
            metadata: session.metadata.clone(),
        }
    }
}

impl From<VectorRecord> for PointSummary {
    fn from(record: VectorRecord) -> Self {
        let (_, metadata) = split_payload(&record);
        Self {
            id: record.id,
            metadata,
        }
    }
}

/// Note attached to listings that matched nothing.
pub const NO_POINTS_MESSAGE: &str = "No points found matching metadata criteria";

/// Result of a metadata listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointList {
    pub points: Vec<PointSummary>,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PointList {
    /// Build a listing; an empty one carries the explanatory note.
    pub fn new(points: Vec<PointSummary>) -> Self {
        let count = points.len();
        let message = (count == 0).then(|| NO_POINTS_MESSAGE.to_string());
        Self {
            points,
            count,
            message,
        }
    }
}

/// A chat's messages plus its name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatExport {
    #[serde(rename = "Messages")]
    pub messages: PointList,
    #[serde(rename = "Name")]
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_metadata_defaults() {
        let metadata = ChatSession::new_metadata("alice", None, Map::new(), "New Unnamed Chat");
        assert_eq!(metadata["source"], json!("alice"));
        assert_eq!(metadata["name"], json!("New Unnamed Chat"));
        assert_eq!(metadata["content"], json!("New Unnamed Chat"));
        assert_eq!(metadata["deleted"], json!(false));
        assert!(metadata["when"].as_f64().unwrap() > 0.0);
    }

    #[test]
    fn test_new_metadata_prefers_supplied_content_and_name() {
        let mut extra = Map::new();
        extra.insert("name".into(), json!("Trip planning"));
        extra.insert("color".into(), json!("blue"));
        let metadata = ChatSession::new_metadata("alice", Some("  "), extra, "Default");
        assert_eq!(metadata["name"], json!("Trip planning"));
        assert_eq!(metadata["content"], json!("Trip planning"));
        assert_eq!(metadata["color"], json!("blue"));

        let metadata = ChatSession::new_metadata("alice", Some("about rust"), Map::new(), "Default");
        assert_eq!(metadata["content"], json!("about rust"));
    }

    #[test]
    fn test_session_from_record_requires_owner() {
        let record = VectorRecord::new("x", vec![], point_payload("", &Map::new()));
        assert!(ChatSession::from_record(record).is_err());
    }

    #[test]
    fn test_episodic_open_flag() {
        let mut metadata = Map::new();
        metadata.insert("text".into(), json!("hi"));
        let record = VectorRecord::new("e1", vec![], point_payload("hi", &metadata));
        let mut episode = EpisodicRecord::from_record(record);
        assert!(episode.is_open());
        episode.set_bot("");
        assert!(episode.is_open());
        episode.set_bot("hello!");
        assert!(!episode.is_open());
        assert_eq!(episode.bot(), Some("hello!"));
    }

    #[test]
    fn test_empty_point_list_has_note() {
        let list = PointList::new(vec![]);
        assert_eq!(list.count, 0);
        assert_eq!(list.message.as_deref(), Some(NO_POINTS_MESSAGE));
        let value = serde_json::to_value(PointList::new(vec![PointSummary {
            id: "a".into(),
            metadata: Map::new(),
        }]))
        .unwrap();
        assert!(value.get("message").is_none());
    }
}
