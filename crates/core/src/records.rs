use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::types::{Namespace, SearchId};

/// Request parameters that produced a record, stored as `search_metadata`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchMetadata {
    pub search_id: SearchId,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub search_timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_type: Option<String>,
    /// Namespace specific request parameters (query, dates, location, ...)
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl SearchMetadata {
    pub fn new(search_id: SearchId) -> Self {
        Self {
            search_id,
            search_timestamp: Utc::now(),
            search_type: None,
            params: Map::new(),
        }
    }

    pub fn with_timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.search_timestamp = at;
        self
    }

    pub fn with_type(mut self, search_type: impl Into<String>) -> Self {
        self.search_type = Some(search_type.into());
        self
    }

    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    /// String parameter, `None` when absent, null or not a string
    pub fn text(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }
}

/// Parse an RFC 3339 timestamp, or a naive ISO 8601 one (as older records
/// carry) taken to be UTC.
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    match DateTime::parse_from_rfc3339(text) {
        Ok(at) => Ok(at.with_timezone(&Utc)),
        Err(_) => NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| Utc.from_utc_datetime(&naive)),
    }
}

fn deserialize_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let text = String::deserialize(deserializer)?;
    parse_timestamp(&text).map_err(de::Error::custom)
}

/// A payload type bound to the namespace it is stored in
pub trait NamespacedPayload: Serialize + DeserializeOwned + Send + Sync + 'static {
    const NAMESPACE: Namespace;
}

/// One persisted unit of provider output plus the metadata that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRecord<P> {
    #[serde(rename = "search_metadata")]
    pub metadata: SearchMetadata,
    #[serde(flatten)]
    pub payload: P,
}

impl<P> SearchRecord<P> {
    pub fn new(metadata: SearchMetadata, payload: P) -> Self {
        Self { metadata, payload }
    }

    pub fn id(&self) -> &SearchId {
        &self.metadata.search_id
    }

    pub fn map<Q>(self, f: impl FnOnce(P) -> Q) -> SearchRecord<Q> {
        SearchRecord {
            metadata: self.metadata,
            payload: f(self.payload),
        }
    }
}
