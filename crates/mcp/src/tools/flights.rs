// Flight search over SerpAPI's Google Flights engine

use anyhow::Result;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use wayfarer_core::filter::{AirlineFilter, FlightPriceFilter};
use wayfarer_core::payload::FlightsPayload;
use wayfarer_core::{Namespace, SearchError, SearchIdBuilder, SearchMetadata, SearchRecord, SearchResult};

use super::{
    build_payload, field, json_schema_array, json_schema_integer, json_schema_number,
    json_schema_object, json_schema_string, list_field, parse_args, respond, FilterSpec,
    FilterTool, GetDetailsTool, ListSearchesTool, SearchDetailTool, Tool, ToolContext,
    ToolRegistry,
};
use crate::protocol::{CallToolResult, ToolSchema};
use crate::providers::ProviderRequest;

const TRAVEL_CLASSES: [&str; 4] = ["Economy", "Premium economy", "Business", "First"];

pub fn register(registry: &mut ToolRegistry, ctx: &ToolContext) {
    registry.register(Arc::new(SearchFlightsTool::new(ctx.clone())));
    registry.register(Arc::new(GetDetailsTool::new(
        "get_flight_details",
        Namespace::Flights,
        ctx.store.clone(),
    )));
    registry.register(Arc::new(FilterTool::<FlightPriceFilter>::new(ctx.engine.clone())));
    registry.register(Arc::new(FilterTool::<AirlineFilter>::new(ctx.engine.clone())));
    registry.register(Arc::new(ListSearchesTool::new(
        "list_flight_searches",
        Namespace::Flights,
        ctx.catalog.clone(),
    )));
    registry.register(Arc::new(SearchDetailTool::new(
        "get_flight_search_detail",
        Namespace::Flights,
        ctx.catalog.clone(),
    )));
}

fn one() -> u32 {
    1
}

fn usd() -> String {
    "USD".to_string()
}

fn us() -> String {
    "us".to_string()
}

fn en() -> String {
    "en".to_string()
}

#[derive(Debug, Deserialize)]
struct SearchFlightsArgs {
    departure_id: String,
    arrival_id: String,
    outbound_date: String,
    #[serde(default)]
    return_date: Option<String>,
    /// 1 round trip, 2 one way, 3 multi-city
    #[serde(default = "one")]
    trip_type: u32,
    #[serde(default = "one")]
    adults: u32,
    #[serde(default)]
    children: u32,
    #[serde(default)]
    infants_in_seat: u32,
    #[serde(default)]
    infants_on_lap: u32,
    #[serde(default = "one")]
    travel_class: u32,
    #[serde(default = "usd")]
    currency: String,
    #[serde(default = "us")]
    country: String,
    #[serde(default = "en")]
    language: String,
    #[serde(default)]
    max_results: Option<usize>,
}

impl SearchFlightsArgs {
    fn validate(&self) -> SearchResult<()> {
        if !(1..=3).contains(&self.trip_type) {
            return Err(SearchError::InvalidArguments(format!(
                "trip_type must be 1, 2 or 3, got {}",
                self.trip_type
            )));
        }
        if !(1..=4).contains(&self.travel_class) {
            return Err(SearchError::InvalidArguments(format!(
                "travel_class must be between 1 and 4, got {}",
                self.travel_class
            )));
        }
        if self.trip_type == 1 && self.return_date.as_deref().map_or(true, str::is_empty) {
            return Err(SearchError::InvalidArguments(
                "Return date is required for round trip flights".to_string(),
            ));
        }
        Ok(())
    }

    fn trip_type_name(&self) -> &'static str {
        match self.trip_type {
            1 => "Round trip",
            2 => "One way",
            _ => "Multi-city",
        }
    }

    fn travel_class_name(&self) -> &'static str {
        TRAVEL_CLASSES[(self.travel_class.clamp(1, 4) - 1) as usize]
    }
}

pub struct SearchFlightsTool {
    ctx: ToolContext,
}

impl SearchFlightsTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    async fn search(&self, args: SearchFlightsArgs) -> SearchResult<Value> {
        args.validate()?;
        let return_date = if args.trip_type == 1 { args.return_date.clone() } else { None };

        let request = ProviderRequest::new("search")
            .param("engine", "google_flights")
            .param("departure_id", &args.departure_id)
            .param("arrival_id", &args.arrival_id)
            .param("outbound_date", &args.outbound_date)
            .optional("return_date", return_date.as_deref())
            .param("type", args.trip_type)
            .param("adults", args.adults)
            .param("children", args.children)
            .param("infants_in_seat", args.infants_in_seat)
            .param("infants_on_lap", args.infants_on_lap)
            .param("travel_class", args.travel_class)
            .param("currency", &args.currency)
            .param("gl", &args.country)
            .param("hl", &args.language);
        let body = self.ctx.providers.serpapi.fetch(request).await?;

        let search_id = SearchIdBuilder::new()
            .part(&args.departure_id)
            .part(&args.arrival_id)
            .part(&args.outbound_date)
            .optional(return_date.as_deref())
            .build();
        let metadata = SearchMetadata::new(search_id.clone())
            .param("departure", args.departure_id.as_str())
            .param("arrival", args.arrival_id.as_str())
            .param("outbound_date", args.outbound_date.as_str())
            .param("return_date", return_date.clone())
            .param("trip_type", args.trip_type_name())
            .param(
                "passengers",
                json!({
                    "adults": args.adults,
                    "children": args.children,
                    "infants_in_seat": args.infants_in_seat,
                    "infants_on_lap": args.infants_on_lap
                }),
            )
            .param("travel_class", args.travel_class_name())
            .param("currency", args.currency.as_str());

        let max = args.max_results.unwrap_or(self.ctx.limits.flights);
        let mut fields = Map::new();
        fields.insert("best_flights".into(), list_field(&body, "best_flights", max));
        fields.insert("other_flights".into(), list_field(&body, "other_flights", max));
        fields.insert("price_insights".into(), field(&body, "price_insights"));
        fields.insert("airports".into(), list_field(&body, "airports", usize::MAX));
        let payload: FlightsPayload = build_payload("serpapi", fields)?;

        let record = SearchRecord::new(metadata, payload);
        self.ctx.store.put(&record).await?;

        Ok(json!({
            "search_id": search_id,
            "total_best_flights": record.payload.best_flights.len(),
            "total_other_flights": record.payload.other_flights.len(),
            "price_range": {
                "lowest_price": record.payload.price_insights.as_ref().and_then(|p| p.lowest_price.clone()),
                "currency": args.currency.as_str()
            },
            "search_parameters": record.metadata
        }))
    }
}

#[async_trait::async_trait]
impl Tool for SearchFlightsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "search_flights".to_string(),
            description: "Search for flights with Google Flights and store the results".to_string(),
            input_schema: json_schema_object(
                json!({
                    "departure_id": json_schema_string("Departure airport code (e.g. 'LAX') or location kgmid"),
                    "arrival_id": json_schema_string("Arrival airport code (e.g. 'CDG') or location kgmid"),
                    "outbound_date": json_schema_string("Departure date, YYYY-MM-DD"),
                    "return_date": json_schema_string("Return date, YYYY-MM-DD (required for round trips)"),
                    "trip_type": json_schema_integer("1 = round trip (default), 2 = one way, 3 = multi-city"),
                    "adults": json_schema_integer("Adult passengers (default 1)"),
                    "children": json_schema_integer("Child passengers (default 0)"),
                    "infants_in_seat": json_schema_integer("Infants in seat (default 0)"),
                    "infants_on_lap": json_schema_integer("Infants on lap (default 0)"),
                    "travel_class": json_schema_integer("1 = economy (default), 2 = premium economy, 3 = business, 4 = first"),
                    "currency": json_schema_string("Price currency (default 'USD')"),
                    "country": json_schema_string("Country code (default 'us')"),
                    "language": json_schema_string("Language code (default 'en')"),
                    "max_results": json_schema_integer("Maximum offers to store per list")
                }),
                vec!["departure_id", "arrival_id", "outbound_date"],
            ),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let result = match parse_args::<SearchFlightsArgs>(arguments) {
            Ok(args) => self.search(args).await,
            Err(e) => Err(e),
        };
        Ok(respond(result))
    }
}

impl FilterSpec for FlightPriceFilter {
    const NAME: &'static str = "filter_flights_by_price";
    const DESCRIPTION: &'static str =
        "Filter stored flight offers by price range; offers without a price count as 0";

    fn properties() -> Value {
        json!({
            "min_price": json_schema_number("Minimum price, inclusive"),
            "max_price": json_schema_number("Maximum price, inclusive")
        })
    }
}

impl FilterSpec for AirlineFilter {
    const NAME: &'static str = "filter_flights_by_airline";
    const DESCRIPTION: &'static str =
        "Filter stored flight offers to those with a leg operated by one of the given airlines";

    fn properties() -> Value {
        json!({
            "airlines": json_schema_array(json!({"type": "string"}), "Airline names, e.g. ['Delta', 'Air France']")
        })
    }

    fn required() -> Vec<&'static str> {
        vec!["airlines"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::stub::StubProvider;
    use crate::tools::testing::{context, error_text, json_of};
    use wayfarer_core::SearchId;

    #[tokio::test]
    async fn test_search_stores_record() {
        let stub = StubProvider::new();
        stub.respond(Ok(json!({
            "best_flights": [{"price": 120}, {"price": 450}],
            "other_flights": [{"price": 300}],
            "price_insights": {"lowest_price": 120, "price_level": "low"},
            "search_metadata": {"id": "serpapi-internal"}
        })));
        let ctx = context(&stub);
        let tool = SearchFlightsTool::new(ctx.clone());

        let summary = json_of(
            &tool
                .execute(json!({
                    "departure_id": "LAX",
                    "arrival_id": "CDG",
                    "outbound_date": "2025-06-01",
                    "trip_type": 2,
                    "max_results": 1
                }))
                .await
                .unwrap(),
        );
        let search_id = summary["search_id"].as_str().unwrap().to_string();
        assert!(search_id.starts_with("lax_cdg_2025-06-01_"));
        assert_eq!(summary["total_best_flights"], 1);
        assert_eq!(summary["price_range"]["lowest_price"], 120);
        assert_eq!(summary["search_parameters"]["trip_type"], "One way");
        assert_eq!(summary["search_parameters"]["travel_class"], "Economy");

        let request = &stub.requests()[0];
        assert_eq!(request.get("engine"), Some("google_flights"));
        assert_eq!(request.get("type"), Some("2"));
        assert_eq!(request.get("return_date"), None);

        let record = ctx
            .store
            .get::<FlightsPayload>(&SearchId::new(search_id))
            .await
            .unwrap();
        assert_eq!(record.payload.best_flights.len(), 1);
        assert_eq!(record.metadata.get("passengers").unwrap()["adults"], 1);
    }

    #[tokio::test]
    async fn test_round_trip_requires_return_date() {
        let stub = StubProvider::new();
        let tool = SearchFlightsTool::new(context(&stub));
        let result = tool
            .execute(json!({"departure_id": "LAX", "arrival_id": "CDG", "outbound_date": "2025-06-01"}))
            .await
            .unwrap();
        assert!(error_text(&result).contains("Return date is required"));
        assert!(stub.requests().is_empty());

        let result = tool
            .execute(json!({
                "departure_id": "LAX", "arrival_id": "CDG", "outbound_date": "2025-06-01",
                "trip_type": 2, "travel_class": 9
            }))
            .await
            .unwrap();
        assert!(error_text(&result).contains("travel_class"));
    }

    #[tokio::test]
    async fn test_provider_failure_writes_nothing() {
        let stub = StubProvider::new();
        stub.respond(Err(SearchError::provider("serpapi", "HTTP 503: unavailable")));
        let ctx = context(&stub);
        let tool = SearchFlightsTool::new(ctx.clone());

        let result = tool
            .execute(json!({
                "departure_id": "LAX", "arrival_id": "CDG",
                "outbound_date": "2025-06-01", "return_date": "2025-06-10"
            }))
            .await
            .unwrap();
        assert!(error_text(&result).contains("[provider_unavailable]"));
        assert!(ctx.store.list(Namespace::Flights).await.unwrap().is_empty());
    }
}
