use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::nullable;
use crate::records::NamespacedPayload;
use crate::types::Namespace;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventsPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_parameters: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_information: Option<Value>,
    #[serde(default, deserialize_with = "nullable")]
    pub events_results: Vec<EventResult>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NamespacedPayload for EventsPayload {
    const NAMESPACE: Namespace = Namespace::Events;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<EventDate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "nullable")]
    pub address: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<Venue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EventResult {
    pub fn when(&self) -> Option<&str> {
        self.date.as_ref().and_then(|d| d.when.as_deref())
    }

    pub fn venue_name(&self) -> Option<&str> {
        self.venue.as_ref().and_then(|v| v.name.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventDate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Venue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
