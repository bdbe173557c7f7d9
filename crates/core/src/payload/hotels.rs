use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use super::{as_f64, nullable};
use crate::records::NamespacedPayload;
use crate::types::Namespace;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HotelsPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_information: Option<Value>,
    #[serde(default, deserialize_with = "nullable")]
    pub properties: Vec<HotelProperty>,
    #[serde(default, deserialize_with = "nullable")]
    pub brands: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serpapi_pagination: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NamespacedPayload for HotelsPayload {
    const NAMESPACE: Namespace = Namespace::Hotels;
}

impl HotelsPayload {
    /// Lowest and highest nightly rate among properties that report one
    pub fn price_range(&self) -> Option<(f64, f64)> {
        self.properties
            .iter()
            .filter_map(HotelProperty::nightly_rate)
            .filter(|price| *price > 0.0)
            .fold(None, |range, price| match range {
                None => Some((price, price)),
                Some((lo, hi)) => Some((lo.min(price), hi.max(price))),
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HotelProperty {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotel_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_hotel_class: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_per_night: Option<NightlyRate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_rating: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_rating: Option<Number>,
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "nullable")]
    pub amenities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deal: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HotelProperty {
    pub fn nightly_rate(&self) -> Option<f64> {
        self.rate_per_night
            .as_ref()
            .and_then(|rate| as_f64(&rate.extracted_lowest))
    }

    pub fn rating(&self) -> Option<f64> {
        as_f64(&self.overall_rating)
    }

    pub fn class(&self) -> Option<i64> {
        self.extracted_hotel_class.as_ref().and_then(|n| {
            n.as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NightlyRate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lowest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_lowest: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_taxes_fees: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_price_range_ignores_unpriced_properties() {
        let payload: HotelsPayload = serde_json::from_value(json!({
            "properties": [
                {"name": "A", "rate_per_night": {"extracted_lowest": 180}},
                {"name": "B"},
                {"name": "C", "rate_per_night": {"extracted_lowest": 95.5}}
            ]
        }))
        .unwrap();
        assert_eq!(payload.price_range(), Some((95.5, 180.0)));
        assert_eq!(HotelsPayload::default().price_range(), None);
    }

    #[test]
    fn test_type_field_is_renamed() {
        let property: HotelProperty =
            serde_json::from_value(json!({"type": "vacation rental", "extracted_hotel_class": 4}))
                .unwrap();
        assert_eq!(property.kind.as_deref(), Some("vacation rental"));
        assert_eq!(property.class(), Some(4));
        assert_eq!(serde_json::to_value(&property).unwrap()["type"], "vacation rental");
    }
}
