use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use super::{as_f64, nullable};
use crate::records::NamespacedPayload;
use crate::types::Namespace;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlightsPayload {
    #[serde(default, deserialize_with = "nullable")]
    pub best_flights: Vec<FlightOffer>,
    #[serde(default, deserialize_with = "nullable")]
    pub other_flights: Vec<FlightOffer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_insights: Option<PriceInsights>,
    #[serde(default, deserialize_with = "nullable")]
    pub airports: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NamespacedPayload for FlightsPayload {
    const NAMESPACE: Namespace = Namespace::Flights;
}

impl FlightsPayload {
    pub fn total_offers(&self) -> usize {
        self.best_flights.len() + self.other_flights.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceInsights {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lowest_price: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_level: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "nullable")]
    pub typical_price_range: Vec<Number>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One bookable itinerary: a price and its legs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlightOffer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Number>,
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "nullable")]
    pub flights: Vec<FlightLeg>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<Number>,
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "nullable")]
    pub layovers: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FlightOffer {
    /// Price used for filtering; a missing price counts as 0.
    pub fn price_or_zero(&self) -> f64 {
        as_f64(&self.price).unwrap_or(0.0)
    }

    pub fn airlines(&self) -> impl Iterator<Item = &str> {
        self.flights.iter().filter_map(|leg| leg.airline.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlightLeg {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub airline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flight_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departure_airport: Option<AirportTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival_airport: Option<AirportTime>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AirportTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_fields_survive() {
        let raw = json!({
            "best_flights": [{
                "price": 120,
                "type": "One way",
                "carbon_emissions": {"this_flight": 91000},
                "flights": [{"airline": "Air France", "airplane": "A350"}]
            }],
            "other_flights": null,
            "search_parameters": {"engine": "google_flights"}
        });

        let payload: FlightsPayload = serde_json::from_value(raw).unwrap();
        assert_eq!(payload.best_flights[0].price_or_zero(), 120.0);
        assert!(payload.other_flights.is_empty());
        assert_eq!(payload.best_flights[0].airlines().collect::<Vec<_>>(), vec!["Air France"]);

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["best_flights"][0]["price"], 120);
        assert_eq!(value["best_flights"][0]["carbon_emissions"]["this_flight"], 91000);
        assert_eq!(value["best_flights"][0]["flights"][0]["airplane"], "A350");
        assert_eq!(value["search_parameters"]["engine"], "google_flights");
        assert_eq!(value["other_flights"], json!([]));
    }

    #[test]
    fn test_missing_price_counts_as_zero() {
        let offer = FlightOffer::default();
        assert_eq!(offer.price_or_zero(), 0.0);
    }
}
