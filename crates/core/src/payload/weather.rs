use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use super::as_f64;
use crate::records::NamespacedPayload;
use crate::types::Namespace;

/// Forecast, alert or current-conditions data. Which lists are present
/// depends on `search_metadata.search_type`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Value>,
    /// `daily` or `hourly`; only set on forecast records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forecast_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub periods: Option<Vec<ForecastPeriod>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alerts: Option<Vec<WeatherAlert>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NamespacedPayload for WeatherPayload {
    const NAMESPACE: Namespace = Namespace::Weather;
}

impl WeatherPayload {
    pub fn is_forecast(&self) -> bool {
        self.forecast_type.is_some()
    }

    pub fn periods(&self) -> &[ForecastPeriod] {
        self.periods.as_deref().unwrap_or(&[])
    }

    pub fn alerts(&self) -> &[WeatherAlert] {
        self.alerts.as_deref().unwrap_or(&[])
    }

    /// Dated entries of a Weatherstack `forecast` or `historical` map, in
    /// date order
    pub fn days(&self, key: &str) -> Vec<(&str, &Value)> {
        let mut days: Vec<(&str, &Value)> = self
            .extra
            .get(key)
            .and_then(Value::as_object)
            .map(|days| days.iter().map(|(date, day)| (date.as_str(), day)).collect())
            .unwrap_or_default();
        days.sort_by_key(|(date, _)| *date);
        days
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastPeriod {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_daytime: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability_of_precipitation: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_speed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_direction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_forecast: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detailed_forecast: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ForecastPeriod {
    pub fn temperature(&self) -> Option<f64> {
        as_f64(&self.temperature)
    }

    pub fn precipitation_chance(&self) -> Option<f64> {
        as_f64(&self.probability_of_precipitation)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherAlert {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certainty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
