//! Human-legible search identifiers.
//!
//! An identifier is the normalized rendering of each non-empty request
//! parameter, in a fixed order per namespace, joined by `_` and followed by a
//! `YYYYMMDD_HHMMSS` timestamp.

use chrono::{DateTime, Utc};

use crate::types::SearchId;

/// Timestamp suffix format appended to every identifier
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Lower-case the value and turn whitespace and commas into underscores.
pub fn normalize(value: &str) -> String {
    value
        .trim()
        .chars()
        .map(|c| {
            if c.is_whitespace() || c == ',' {
                '_'
            } else {
                c
            }
        })
        .collect::<String>()
        .to_lowercase()
}

/// Builds a [`SearchId`] from ordered request parameters.
#[derive(Debug, Default, Clone)]
pub struct SearchIdBuilder {
    parts: Vec<String>,
}

impl SearchIdBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter. Empty values are omitted, no placeholder is left.
    pub fn part(mut self, value: impl AsRef<str>) -> Self {
        let normalized = normalize(value.as_ref());
        if !normalized.is_empty() {
            self.parts.push(normalized);
        }
        self
    }

    pub fn optional<S: AsRef<str>>(self, value: Option<S>) -> Self {
        match value {
            Some(v) => self.part(v),
            None => self,
        }
    }

    /// Append a coordinate with its decimal point replaced by `_`.
    pub fn coordinate(self, value: f64) -> Self {
        self.part(value.to_string().replace('.', "_"))
    }

    pub fn build_at(self, at: DateTime<Utc>) -> SearchId {
        let mut parts = self.parts;
        parts.push(at.format(TIMESTAMP_FORMAT).to_string());
        SearchId(parts.join("_"))
    }

    pub fn build(self) -> SearchId {
        self.build_at(Utc::now())
    }
}
