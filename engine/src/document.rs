//! Remote documents as fetched from the remote collection.
//!
//! The remote side stores loosely typed JSON, so parsing is lenient: a
//! document missing optional fields falls back to defaults instead of
//! failing the whole sync. Only a document without any resolvable id is
//! rejected.

use crate::{error::Result, Error, TaskId, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A document exactly as returned by the remote collection: the key it is
/// stored under plus its raw field data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    pub key: String,
    pub data: Value,
}

impl RawDocument {
    pub fn new(key: impl Into<String>, data: Value) -> Self {
        Self {
            key: key.into(),
            data,
        }
    }
}

/// A parsed remote document. Optional fields stay `None` when absent or of
/// the wrong type; defaults are applied by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDocument {
    pub id: TaskId,
    pub title: Option<String>,
    pub is_done: Option<bool>,
    pub created_at: Option<Timestamp>,
}

impl RemoteDocument {
    /// Parse a raw document.
    ///
    /// The task id is the `id` field when it is a non-empty string, else
    /// the storage key. Titles written by older clients under `name` are
    /// accepted.
    pub fn parse(raw: &RawDocument) -> Result<Self> {
        let data = &raw.data;
        if !data.is_object() {
            return Err(Error::InvalidDocument(format!(
                "document '{}' is not an object",
                raw.key
            )));
        }

        let id = data
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .unwrap_or(raw.key.as_str());
        if id.is_empty() {
            return Err(Error::InvalidDocument("document has no id".into()));
        }

        let title = data
            .get("title")
            .and_then(Value::as_str)
            .or_else(|| data.get("name").and_then(Value::as_str))
            .map(str::to_owned);

        Ok(Self {
            id: id.to_owned(),
            title,
            is_done: data.get("isDone").and_then(Value::as_bool),
            created_at: data.get("createdAt").and_then(parse_timestamp),
        })
    }

    /// Title, or the empty string when the document has none.
    pub fn title_or_default(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }

    /// Done flag, `false` when absent.
    pub fn is_done_or_default(&self) -> bool {
        self.is_done.unwrap_or(false)
    }

    /// Creation time, `now` when absent.
    pub fn created_at_or(&self, now: Timestamp) -> Timestamp {
        self.created_at.unwrap_or(now)
    }
}

/// Accepts epoch milliseconds as a number, or a `{seconds, nanoseconds}`
/// timestamp object. Values above `i64::MAX` milliseconds, or that overflow
/// while converting, count as missing.
fn parse_timestamp(value: &Value) -> Option<Timestamp> {
    let millis = match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|ms| ms.is_finite() && *ms >= 0.0)
                .map(|ms| ms as u64)
        }),
        Value::Object(obj) => {
            let seconds = obj.get("seconds")?.as_u64()?;
            let nanos = obj
                .get("nanoseconds")
                .and_then(Value::as_u64)
                .unwrap_or(0);
            seconds
                .checked_mul(1000)?
                .checked_add(nanos / 1_000_000)
        }
        _ => None,
    }?;

    (millis <= MAX_TIMESTAMP).then_some(millis)
}

/// Largest timestamp the local store can hold.
const MAX_TIMESTAMP: Timestamp = i64::MAX as Timestamp;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_full_document() {
        let raw = RawDocument::new(
            "abc",
            json!({"id": "abc", "title": "Buy milk", "isDone": true, "createdAt": 1706745600000u64}),
        );
        let doc = RemoteDocument::parse(&raw).unwrap();
        assert_eq!(doc.id, "abc");
        assert_eq!(doc.title.as_deref(), Some("Buy milk"));
        assert_eq!(doc.is_done, Some(true));
        assert_eq!(doc.created_at, Some(1706745600000));
    }

    #[test]
    fn id_falls_back_to_key() {
        let doc = RemoteDocument::parse(&RawDocument::new("key-1", json!({"title": "x"}))).unwrap();
        assert_eq!(doc.id, "key-1");

        let doc =
            RemoteDocument::parse(&RawDocument::new("key-2", json!({"id": "", "title": "x"})))
                .unwrap();
        assert_eq!(doc.id, "key-2");
    }

    #[test]
    fn document_without_any_id_is_rejected() {
        let result = RemoteDocument::parse(&RawDocument::new("", json!({"title": "x"})));
        assert!(matches!(result, Err(Error::InvalidDocument(_))));

        let result = RemoteDocument::parse(&RawDocument::new("k", json!("not an object")));
        assert!(matches!(result, Err(Error::InvalidDocument(_))));
    }

    #[test]
    fn missing_fields_use_defaults() {
        let doc = RemoteDocument::parse(&RawDocument::new("k", json!({}))).unwrap();
        assert_eq!(doc.title_or_default(), "");
        assert!(!doc.is_done_or_default());
        assert_eq!(doc.created_at_or(42), 42);
    }

    #[test]
    fn wrong_types_are_treated_as_missing() {
        let doc = RemoteDocument::parse(&RawDocument::new(
            "k",
            json!({"title": 7, "isDone": "yes", "createdAt": "yesterday"}),
        ))
        .unwrap();
        assert_eq!(doc.title, None);
        assert_eq!(doc.is_done, None);
        assert_eq!(doc.created_at, None);
    }

    #[test]
    fn legacy_name_field() {
        let doc = RemoteDocument::parse(&RawDocument::new("k", json!({"name": "Old title"})))
            .unwrap();
        assert_eq!(doc.title_or_default(), "Old title");

        // `title` takes precedence
        let doc = RemoteDocument::parse(&RawDocument::new(
            "k",
            json!({"name": "Old", "title": "New"}),
        ))
        .unwrap();
        assert_eq!(doc.title_or_default(), "New");
    }

    #[test]
    fn timestamp_object() {
        let doc = RemoteDocument::parse(&RawDocument::new(
            "k",
            json!({"createdAt": {"seconds": 1706745600u64, "nanoseconds": 250000000u64}}),
        ))
        .unwrap();
        assert_eq!(doc.created_at, Some(1706745600250));
    }

    #[test]
    fn overflowing_timestamp_object_is_missing() {
        let doc = RemoteDocument::parse(&RawDocument::new(
            "k",
            json!({"title": "Still parsed", "createdAt": {"seconds": u64::MAX}}),
        ))
        .unwrap();
        assert_eq!(doc.created_at, None);
        assert_eq!(doc.title_or_default(), "Still parsed");

        let doc = RemoteDocument::parse(&RawDocument::new(
            "k",
            json!({"createdAt": {"seconds": u64::MAX / 1000, "nanoseconds": 999_999_999u64}}),
        ))
        .unwrap();
        assert_eq!(doc.created_at, None);
    }

    #[test]
    fn timestamp_beyond_signed_range_is_missing() {
        let too_big = i64::MAX as u64 + 1;
        let doc = RemoteDocument::parse(&RawDocument::new("k", json!({"createdAt": too_big})))
            .unwrap();
        assert_eq!(doc.created_at, None);

        let doc = RemoteDocument::parse(&RawDocument::new("k", json!({"createdAt": i64::MAX})))
            .unwrap();
        assert_eq!(doc.created_at, Some(i64::MAX as u64));
    }

    #[test]
    fn negative_timestamp_is_missing() {
        let doc =
            RemoteDocument::parse(&RawDocument::new("k", json!({"createdAt": -5}))).unwrap();
        assert_eq!(doc.created_at, None);
    }
}
