use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SearchError;

/// Identifier of a stored search, unique within its namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchId(pub String);

impl SearchId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SearchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SearchId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Domain partition of the store. Each namespace has an isolated storage
/// area and its own filter semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    Flights,
    Hotels,
    Events,
    Finance,
    Weather,
    Geocode,
}

impl Namespace {
    pub const ALL: [Namespace; 6] = [
        Namespace::Flights,
        Namespace::Hotels,
        Namespace::Events,
        Namespace::Finance,
        Namespace::Weather,
        Namespace::Geocode,
    ];

    /// Name of the storage area (directory or table) holding this namespace
    pub fn storage_name(&self) -> &'static str {
        match self {
            Namespace::Flights => "flights",
            Namespace::Hotels => "hotels",
            Namespace::Events => "events",
            Namespace::Finance => "finance",
            Namespace::Weather => "weather_data",
            Namespace::Geocode => "geocoded_locations",
        }
    }

    /// URI scheme of the namespace's MCP resources
    pub fn scheme(&self) -> &'static str {
        match self {
            Namespace::Flights => "flights",
            Namespace::Hotels => "hotels",
            Namespace::Events => "events",
            Namespace::Finance => "finance",
            Namespace::Weather => "weather",
            Namespace::Geocode => "geocoder",
        }
    }

    pub fn from_scheme(scheme: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ns| ns.scheme() == scheme)
    }

    /// Singular noun used in messages ("No flight search found ...")
    pub fn noun(&self) -> &'static str {
        match self {
            Namespace::Flights => "flight",
            Namespace::Hotels => "hotel",
            Namespace::Events => "event",
            Namespace::Finance => "finance",
            Namespace::Weather => "weather",
            Namespace::Geocode => "geocoded location",
        }
    }

    /// Heading used in digests ("# Flight Searches")
    pub fn title(&self) -> &'static str {
        match self {
            Namespace::Flights => "Flight",
            Namespace::Hotels => "Hotel",
            Namespace::Events => "Event",
            Namespace::Finance => "Finance",
            Namespace::Weather => "Weather",
            Namespace::Geocode => "Geocoded Location",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Namespace::Flights => "flights",
            Namespace::Hotels => "hotels",
            Namespace::Events => "events",
            Namespace::Finance => "finance",
            Namespace::Weather => "weather",
            Namespace::Geocode => "geocode",
        };
        f.write_str(name)
    }
}

impl FromStr for Namespace {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ns| ns.to_string() == s || ns.storage_name() == s || ns.scheme() == s)
            .ok_or_else(|| SearchError::InvalidArguments(format!("Unknown namespace: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_names() {
        assert_eq!(Namespace::Weather.storage_name(), "weather_data");
        assert_eq!(Namespace::Geocode.scheme(), "geocoder");
        assert_eq!(Namespace::from_scheme("geocoder"), Some(Namespace::Geocode));
        assert_eq!(Namespace::from_scheme("nope"), None);
    }

    #[test]
    fn test_namespace_from_str() {
        assert_eq!("flights".parse::<Namespace>().unwrap(), Namespace::Flights);
        assert_eq!("weather_data".parse::<Namespace>().unwrap(), Namespace::Weather);
        assert!("trains".parse::<Namespace>().is_err());
    }
}
