//! Primitive checks the namespace filters are composed of.
//!
//! Every check is vacuously true when its parameter is absent. An empty list
//! counts as absent.

use serde::{Deserialize, Serialize};

/// Inclusive numeric range with optional bounds
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NumericRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl NumericRange {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }

    /// Like [`contains`](Self::contains), but an unknown value passes
    pub fn admits(&self, value: Option<f64>) -> bool {
        value.map_or(true, |v| self.contains(v))
    }
}

pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// True when any keyword is a case-insensitive substring of any field
pub fn any_keyword_in(keywords: &[String], fields: &[Option<&str>]) -> bool {
    if keywords.is_empty() {
        return true;
    }
    keywords.iter().any(|keyword| {
        fields
            .iter()
            .flatten()
            .any(|field| contains_ignore_case(field, keyword))
    })
}

/// True when every required value is present, compared case-insensitively
pub fn all_present(required: &[String], available: &[String]) -> bool {
    let available: Vec<String> = available.iter().map(|a| a.to_lowercase()).collect();
    required
        .iter()
        .all(|r| available.contains(&r.to_lowercase()))
}

/// True when any wanted value equals any available one, case-insensitively
pub fn any_equal<'a>(wanted: &[String], available: impl IntoIterator<Item = &'a str>) -> bool {
    if wanted.is_empty() {
        return true;
    }
    let available: Vec<String> = available.into_iter().map(str::to_lowercase).collect();
    wanted
        .iter()
        .any(|w| available.contains(&w.to_lowercase()))
}

/// Numbers embedded in free text ("5 to 10 mph" yields 5 and 10)
pub fn numbers_in(text: &str) -> Vec<f64> {
    text.split(|c: char| !(c.is_ascii_digit() || c == '.'))
        .filter(|token| !token.is_empty())
        .filter_map(|token| token.parse::<f64>().ok())
        .collect()
}

/// Highest number embedded in free text
pub fn highest_number(text: &str) -> Option<f64> {
    numbers_in(text).into_iter().reduce(f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_range_is_inclusive() {
        let range = NumericRange::new(Some(100.0), Some(200.0));
        assert!(range.contains(100.0));
        assert!(range.contains(200.0));
        assert!(!range.contains(99.99));
        assert!(!range.contains(200.01));
        assert!(NumericRange::default().contains(-1e9));
        assert!(range.admits(None));
    }

    #[test]
    fn test_keywords() {
        let keywords = strings(&["jazz"]);
        assert!(any_keyword_in(&keywords, &[Some("Jazz Night"), None]));
        assert!(!any_keyword_in(&keywords, &[Some("Food Fair"), Some("street food")]));
        assert!(any_keyword_in(&[], &[None]));
    }

    #[test]
    fn test_membership() {
        let available = strings(&["Free Wi-Fi", "Pool", "Spa"]);
        assert!(all_present(&strings(&["pool", "free wi-fi"]), &available));
        assert!(!all_present(&strings(&["pool", "gym"]), &available));
        assert!(all_present(&[], &available));

        assert!(any_equal(&strings(&["air france"]), ["Air France", "Delta"]));
        assert!(!any_equal(&strings(&["air"]), ["Air France"]));
        assert!(any_equal(&[], ["Delta"]));
    }

    #[test]
    fn test_numbers_in_text() {
        assert_eq!(numbers_in("5 to 10 mph"), vec![5.0, 10.0]);
        assert_eq!(highest_number("15 mph"), Some(15.0));
        assert_eq!(highest_number("calm"), None);
    }
}
