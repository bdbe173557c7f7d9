//! Typed per-namespace payloads.
//!
//! Each struct models the fields the filters and digests read. Everything
//! else the provider returned is kept verbatim in a flattened `extra` map so
//! a stored record round-trips without loss.

pub mod events;
pub mod finance;
pub mod flights;
pub mod geocode;
pub mod hotels;
pub mod weather;

pub use events::*;
pub use finance::*;
pub use flights::*;
pub use geocode::*;
pub use hotels::*;
pub use weather::*;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Number;

use crate::records::{NamespacedPayload, SearchRecord};
use crate::types::Namespace;

/// Payload of any namespace, for callers that only know the namespace at runtime
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Flights(FlightsPayload),
    Hotels(HotelsPayload),
    Events(EventsPayload),
    Finance(FinancePayload),
    Weather(WeatherPayload),
    Geocode(GeocodePayload),
}

impl Payload {
    pub fn namespace(&self) -> Namespace {
        match self {
            Payload::Flights(_) => FlightsPayload::NAMESPACE,
            Payload::Hotels(_) => HotelsPayload::NAMESPACE,
            Payload::Events(_) => EventsPayload::NAMESPACE,
            Payload::Finance(_) => FinancePayload::NAMESPACE,
            Payload::Weather(_) => WeatherPayload::NAMESPACE,
            Payload::Geocode(_) => GeocodePayload::NAMESPACE,
        }
    }

    /// Decode stored bytes with the payload type of `namespace`.
    pub fn decode(namespace: Namespace, bytes: &[u8]) -> serde_json::Result<SearchRecord<Payload>> {
        fn typed<P: NamespacedPayload>(
            bytes: &[u8],
            wrap: fn(P) -> Payload,
        ) -> serde_json::Result<SearchRecord<Payload>> {
            serde_json::from_slice::<SearchRecord<P>>(bytes).map(|record| record.map(wrap))
        }

        match namespace {
            Namespace::Flights => typed(bytes, Payload::Flights),
            Namespace::Hotels => typed(bytes, Payload::Hotels),
            Namespace::Events => typed(bytes, Payload::Events),
            Namespace::Finance => typed(bytes, Payload::Finance),
            Namespace::Weather => typed(bytes, Payload::Weather),
            Namespace::Geocode => typed(bytes, Payload::Geocode),
        }
    }
}

/// Treat an explicit `null` like a missing key.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub(crate) fn as_f64(number: &Option<Number>) -> Option<f64> {
    number.as_ref().and_then(Number::as_f64)
}
