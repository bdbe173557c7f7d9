use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::records::NamespacedPayload;
use crate::types::Namespace;

/// Forward lookups fill `location_data` (or `locations` when several matches
/// were requested); reverse lookups fill `coordinates` and `address`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeocodePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_results: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_data: Option<GeocodedPlace>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<GeocodedPlace>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NamespacedPayload for GeocodePayload {
    const NAMESPACE: Namespace = Namespace::Geocode;
}

impl GeocodePayload {
    pub fn is_reverse(&self) -> bool {
        self.coordinates.is_some()
    }

    /// Every place the record resolved to
    pub fn places(&self) -> Vec<&GeocodedPlace> {
        self.location_data
            .iter()
            .chain(self.locations.iter().flatten())
            .collect()
    }

    /// Display names of forward results plus the address of a reverse lookup
    pub fn display_names(&self) -> Vec<&str> {
        self.places()
            .into_iter()
            .filter_map(|p| p.display_name.as_deref())
            .chain(self.address.as_deref())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeocodedPlace {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}
