//! Markdown rendering helpers for digests.

use serde_json::Value;
use std::fmt::Display;

use crate::records::SearchMetadata;

/// Placeholder for a missing optional field
pub const NOT_AVAILABLE: &str = "N/A";

pub fn or_na<T: Display>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Render a JSON value inline: strings unquoted, null as `N/A`
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => NOT_AVAILABLE.to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => (if *b { "Yes" } else { "No" }).to_string(),
        Value::Array(items) => items.iter().map(value_text).collect::<Vec<_>>().join(", "),
        Value::Object(_) => value.to_string(),
    }
}

/// Follow a path of object keys
pub fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(value, |current, key| current.get(key))
        .filter(|v| !v.is_null())
}

pub fn lookup_text(value: Option<&Value>, path: &[&str]) -> String {
    value
        .and_then(|v| lookup(v, path))
        .map(value_text)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// A metadata parameter rendered inline, `N/A` when absent or null
pub fn param(metadata: &SearchMetadata, key: &str) -> String {
    metadata
        .get(key)
        .filter(|v| !v.is_null())
        .map(value_text)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Upper-case the first letter of every word; `_` separates words
pub fn title_case(text: &str) -> String {
    text.split(|c: char| c == '_' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Cut text to `max` characters, marking the cut with `...`
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(max).collect::<String>())
    }
}

/// Markdown document builder
#[derive(Debug, Default)]
pub struct Doc {
    out: String,
}

impl Doc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn heading(&mut self, level: usize, text: impl Display) -> &mut Self {
        self.out.push_str(&format!("{} {}\n", "#".repeat(level), text));
        self
    }

    /// `- **Label**: value`
    pub fn field(&mut self, label: &str, value: impl Display) -> &mut Self {
        self.out.push_str(&format!("- **{}**: {}\n", label, value));
        self
    }

    /// Indented `- Label: value` under a field
    pub fn sub_field(&mut self, label: &str, value: impl Display) -> &mut Self {
        self.out.push_str(&format!("  - {}: {}\n", label, value));
        self
    }

    pub fn line(&mut self, text: impl Display) -> &mut Self {
        self.out.push_str(&format!("{}\n", text));
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.out.push('\n');
        self
    }

    pub fn rule(&mut self) -> &mut Self {
        self.out.push_str("---\n\n");
        self
    }

    /// `+K more <label>` when only `shown` of `total` items were rendered
    pub fn more(&mut self, total: usize, shown: usize, label: &str) -> &mut Self {
        if total > shown {
            self.out.push_str(&format!("+{} more {}\n\n", total - shown, label));
        }
        self
    }

    pub fn finish(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_text() {
        assert_eq!(value_text(&json!("Paris")), "Paris");
        assert_eq!(value_text(&json!(120)), "120");
        assert_eq!(value_text(&json!(null)), "N/A");
        assert_eq!(value_text(&json!(["a", 1])), "a, 1");
    }

    #[test]
    fn test_lookup() {
        let value = json!({"location": {"city": "Topeka", "state": null}});
        assert_eq!(lookup_text(Some(&value), &["location", "city"]), "Topeka");
        assert_eq!(lookup_text(Some(&value), &["location", "state"]), "N/A");
        assert_eq!(lookup_text(None, &["location"]), "N/A");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("vacation_rentals"), "Vacation Rentals");
        assert_eq!(title_case("HOTEL"), "Hotel");
    }

    #[test]
    fn test_doc() {
        let mut doc = Doc::new();
        doc.heading(2, "Search Details")
            .field("Route", "LAX → CDG")
            .more(7, 5, "options");
        assert_eq!(
            doc.finish(),
            "## Search Details\n- **Route**: LAX → CDG\n+2 more options\n\n"
        );
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(or_na(None::<u32>), "N/A");
    }
}
