//! Core record types shared across docindex.
//!
//! These types are deliberately free of index/storage dependencies so the
//! extractor, the index and the CLI can all speak the same record shape.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod config;

/// Position of a record inside the index; the only link between a vector and its record.
pub type Position = usize;

/// Field name reserved for the similarity attached to search results.
pub const SCORE_FIELD: &str = "score";

fn default_kind() -> String {
    "text".to_string()
}

/// Metadata record stored alongside every vector.
///
/// `content`, `file` and `type` are typed; anything else the caller supplies
/// lands in `extra` and round-trips untouched (insertion order preserved).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub content: String,
    #[serde(default)]
    pub file: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl DocumentRecord {
    pub fn new(
        content: impl Into<String>,
        file: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            file: file.into(),
            kind: kind.into(),
            extra: IndexMap::new(),
        }
    }

    /// Builder-style helper for attaching an extra field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}

/// A copy of a stored record with its similarity to the query attached.
///
/// Serializes flat, i.e. `{"content": .., "file": .., "type": .., "score": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub record: DocumentRecord,
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extra_fields_round_trip_through_json() {
        let rec = DocumentRecord::new("hello", "notes/a.md", "markdown")
            .with_field("chunk", 3)
            .with_field("tags", json!(["x", "y"]));

        let text = serde_json::to_string(&rec).unwrap();
        let back: DocumentRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(back, rec);
        assert_eq!(back.field("chunk"), Some(&json!(3)));
    }

    #[test]
    fn missing_optional_fields_take_defaults() {
        let back: DocumentRecord = serde_json::from_str(r#"{"content":"x"}"#).unwrap();
        assert_eq!(back.file, "");
        assert_eq!(back.kind, "text");
        assert!(back.extra.is_empty());
    }

    #[test]
    fn search_hit_serializes_flat() {
        let hit = SearchHit {
            record: DocumentRecord::new("a", "f1", "code"),
            score: 1.0,
        };
        let v = serde_json::to_value(&hit).unwrap();
        assert_eq!(v["type"], json!("code"));
        assert_eq!(v[SCORE_FIELD], json!(1.0));
    }
}
