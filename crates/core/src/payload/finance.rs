use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use super::as_f64;
use crate::records::NamespacedPayload;
use crate::types::Namespace;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<FinanceSummary>,
    /// Region name (`us`, `europe`, `currencies`, ...) to its quotes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markets: Option<BTreeMap<String, MarketSection>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_events: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub news_results: Option<Vec<Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NamespacedPayload for FinancePayload {
    const NAMESPACE: Namespace = Namespace::Finance;
}

impl FinancePayload {
    /// List-valued market regions and their quotes
    pub fn quote_regions(&self) -> impl Iterator<Item = (&String, &Vec<MarketQuote>)> {
        self.markets
            .iter()
            .flat_map(|markets| markets.iter())
            .filter_map(|(region, section)| match section {
                MarketSection::Quotes(quotes) => Some((region, quotes)),
                MarketSection::Other(_) => None,
            })
    }

    pub fn quotes_in(&self, region: &str) -> &[MarketQuote] {
        match self.markets.as_ref().and_then(|m| m.get(region)) {
            Some(MarketSection::Quotes(quotes)) => quotes,
            _ => &[],
        }
    }

    /// Prices from the `graph` series
    pub fn graph_prices(&self) -> Vec<f64> {
        self.graph
            .iter()
            .flatten()
            .filter_map(|point| point.get("price").and_then(Value::as_f64))
            .filter(|price| *price != 0.0)
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinanceSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,
    /// Display price as sent by the provider, often a formatted string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_price: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_movement: Option<PriceMovement>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FinanceSummary {
    pub fn extracted_price(&self) -> Option<f64> {
        as_f64(&self.extracted_price)
    }
}

/// A market region is usually a list of quotes; anything else is kept as is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MarketSection {
    Quotes(Vec<MarketQuote>),
    Other(Value),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketQuote {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_movement: Option<PriceMovement>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MarketQuote {
    pub fn price(&self) -> Option<f64> {
        as_f64(&self.price)
    }

    /// Absolute percentage change, 0 when not reported
    pub fn abs_percentage(&self) -> f64 {
        self.price_movement
            .as_ref()
            .and_then(|m| as_f64(&m.percentage))
            .map(f64::abs)
            .unwrap_or(0.0)
    }

    pub fn movement(&self) -> &str {
        self.price_movement
            .as_ref()
            .and_then(|m| m.movement.as_deref())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceMovement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub movement: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_non_list_regions_are_kept_but_skipped() {
        let payload: FinancePayload = serde_json::from_value(json!({
            "markets": {
                "us": [{"name": "S&P 500", "price": 5000.1,
                        "price_movement": {"percentage": -1.2, "movement": "Down"}}],
                "top_news": {"title": "Markets rally"}
            }
        }))
        .unwrap();

        let regions: Vec<_> = payload.quote_regions().map(|(r, _)| r.as_str()).collect();
        assert_eq!(regions, vec!["us"]);
        assert_eq!(payload.quotes_in("us")[0].abs_percentage(), 1.2);
        assert_eq!(payload.quotes_in("us")[0].movement(), "Down");
        assert!(payload.quotes_in("top_news").is_empty());

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["markets"]["top_news"]["title"], "Markets rally");
    }

    #[test]
    fn test_graph_prices() {
        let payload: FinancePayload = serde_json::from_value(json!({
            "graph": [{"price": 10.5}, {"price": 0}, {"date": "x"}, {"price": 12}]
        }))
        .unwrap();
        assert_eq!(payload.graph_prices(), vec![10.5, 12.0]);
    }
}
