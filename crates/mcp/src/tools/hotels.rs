// Hotel and vacation rental search over SerpAPI's Google Hotels engine

use anyhow::Result;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use wayfarer_core::filter::{AmenityFilter, HotelClassFilter, HotelPriceFilter, RatingFilter};
use wayfarer_core::payload::HotelsPayload;
use wayfarer_core::{
    Namespace, SearchError, SearchIdBuilder, SearchMetadata, SearchRecord, SearchResult,
};

use super::{
    build_payload, field, json_schema_array, json_schema_boolean, json_schema_integer,
    json_schema_number, json_schema_object, json_schema_string, list_field, parse_args, respond,
    FilterSpec, FilterTool, GetDetailsTool, ListSearchesTool, SearchDetailTool, Tool, ToolContext,
    ToolRegistry,
};
use crate::protocol::{CallToolResult, ToolSchema};
use crate::providers::ProviderRequest;

pub fn register(registry: &mut ToolRegistry, ctx: &ToolContext) {
    registry.register(Arc::new(SearchHotelsTool::new(ctx.clone())));
    registry.register(Arc::new(PropertyDetailsTool::new(ctx.clone())));
    registry.register(Arc::new(GetDetailsTool::new(
        "get_hotel_details",
        Namespace::Hotels,
        ctx.store.clone(),
    )));
    registry.register(Arc::new(FilterTool::<HotelPriceFilter>::new(ctx.engine.clone())));
    registry.register(Arc::new(FilterTool::<RatingFilter>::new(ctx.engine.clone())));
    registry.register(Arc::new(FilterTool::<AmenityFilter>::new(ctx.engine.clone())));
    registry.register(Arc::new(FilterTool::<HotelClassFilter>::new(ctx.engine.clone())));
    registry.register(Arc::new(ListSearchesTool::new(
        "list_hotel_searches",
        Namespace::Hotels,
        ctx.catalog.clone(),
    )));
    registry.register(Arc::new(SearchDetailTool::new(
        "get_hotel_search_detail",
        Namespace::Hotels,
        ctx.catalog.clone(),
    )));
}

fn two() -> u32 {
    2
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
struct SearchHotelsArgs {
    location: String,
    check_in_date: String,
    check_out_date: String,
    #[serde(default = "two")]
    adults: u32,
    #[serde(default)]
    children: u32,
    #[serde(default)]
    children_ages: Option<Vec<u32>>,
    #[serde(default = "usd")]
    currency: String,
    #[serde(default = "us")]
    country: String,
    #[serde(default = "en")]
    language: String,
    #[serde(default)]
    sort_by: Option<u32>,
    #[serde(default)]
    hotel_class: Option<Vec<u32>>,
    #[serde(default)]
    amenities: Option<Vec<u32>>,
    #[serde(default)]
    property_types: Option<Vec<u32>>,
    #[serde(default)]
    brands: Option<Vec<u32>>,
    #[serde(default)]
    free_cancellation: bool,
    #[serde(default)]
    special_offers: bool,
    #[serde(default)]
    vacation_rentals: bool,
    #[serde(default)]
    bedrooms: Option<u32>,
    #[serde(default)]
    max_results: Option<usize>,
}

/// Comma-joined id list, `None` when absent or empty
fn joined(values: &Option<Vec<u32>>) -> Option<String> {
    values
        .as_ref()
        .filter(|v| !v.is_empty())
        .map(|v| v.iter().map(u32::to_string).collect::<Vec<_>>().join(","))
}

fn flag(enabled: bool) -> Option<&'static str> {
    enabled.then_some("true")
}

impl SearchHotelsArgs {
    fn search_type(&self) -> &'static str {
        if self.vacation_rentals {
            "vacation_rentals"
        } else {
            "hotels"
        }
    }

    fn guests_text(&self) -> String {
        let mut text = format!("{} adults", self.adults);
        if self.children > 0 {
            text.push_str(&format!(", {} children", self.children));
        }
        text
    }

    fn request(&self) -> ProviderRequest {
        ProviderRequest::new("search")
            .param("engine", "google_hotels")
            .param("q", &self.location)
            .param("check_in_date", &self.check_in_date)
            .param("check_out_date", &self.check_out_date)
            .param("adults", self.adults)
            .param("children", self.children)
            .param("currency", &self.currency)
            .param("gl", &self.country)
            .param("hl", &self.language)
            .optional("children_ages", joined(&self.children_ages))
            .optional("sort_by", self.sort_by)
            .optional("hotel_class", joined(&self.hotel_class))
            .optional("amenities", joined(&self.amenities))
            .optional("property_types", joined(&self.property_types))
            .optional("brands", joined(&self.brands))
            .optional("free_cancellation", flag(self.free_cancellation))
            .optional("special_offers", flag(self.special_offers))
            .optional("vacation_rentals", flag(self.vacation_rentals))
            .optional("bedrooms", self.bedrooms)
    }
}

pub struct SearchHotelsTool {
    ctx: ToolContext,
}

impl SearchHotelsTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    async fn search(&self, args: SearchHotelsArgs) -> SearchResult<Value> {
        let body = self.ctx.providers.serpapi.fetch(args.request()).await?;

        let search_id = SearchIdBuilder::new()
            .part(&args.location)
            .part(&args.check_in_date)
            .part(&args.check_out_date)
            .build();
        let metadata = SearchMetadata::new(search_id.clone())
            .with_type(args.search_type())
            .param("location", args.location.as_str())
            .param("check_in_date", args.check_in_date.as_str())
            .param("check_out_date", args.check_out_date.as_str())
            .param(
                "guests",
                json!({
                    "adults": args.adults,
                    "children": args.children,
                    "children_ages": args.children_ages
                }),
            )
            .param("currency", args.currency.as_str())
            .param(
                "filters",
                json!({
                    "sort_by": args.sort_by,
                    "hotel_class": args.hotel_class,
                    "amenities": args.amenities,
                    "property_types": args.property_types,
                    "brands": args.brands,
                    "free_cancellation": args.free_cancellation,
                    "special_offers": args.special_offers,
                    "bedrooms": args.bedrooms
                }),
            );

        let max = args.max_results.unwrap_or(self.ctx.limits.hotels);
        let mut fields = Map::new();
        fields.insert("search_information".into(), field(&body, "search_information"));
        fields.insert("properties".into(), list_field(&body, "properties", max));
        fields.insert("brands".into(), list_field(&body, "brands", usize::MAX));
        fields.insert("serpapi_pagination".into(), field(&body, "serpapi_pagination"));
        let payload: HotelsPayload = build_payload("serpapi", fields)?;

        let record = SearchRecord::new(metadata, payload);
        self.ctx.store.put(&record).await?;

        let price_range = record.payload.price_range().map(|(min_price, max_price)| {
            json!({
                "min_price": min_price,
                "max_price": max_price,
                "currency": args.currency.as_str()
            })
        });

        Ok(json!({
            "search_id": search_id,
            "total_properties": record.payload.properties.len(),
            "location": args.location.as_str(),
            "dates": format!("{} to {}", args.check_in_date, args.check_out_date),
            "guests": args.guests_text(),
            "price_range": price_range,
            "search_type": args.search_type(),
            "search_parameters": record.metadata
        }))
    }
}

#[async_trait::async_trait]
impl Tool for SearchHotelsTool {
    fn schema(&self) -> ToolSchema {
        let ids = |description: &str| json_schema_array(json!({"type": "integer"}), description);
        ToolSchema {
            name: "search_hotels".to_string(),
            description: "Search for hotels or vacation rentals with Google Hotels and store the results"
                .to_string(),
            input_schema: json_schema_object(
                json!({
                    "location": json_schema_string("Search location, e.g. 'Paris' or 'Bali Resorts'"),
                    "check_in_date": json_schema_string("Check-in date, YYYY-MM-DD"),
                    "check_out_date": json_schema_string("Check-out date, YYYY-MM-DD"),
                    "adults": json_schema_integer("Adult guests (default 2)"),
                    "children": json_schema_integer("Child guests (default 0)"),
                    "children_ages": ids("Ages of the children, 1 to 17"),
                    "currency": json_schema_string("Price currency (default 'USD')"),
                    "country": json_schema_string("Country code (default 'us')"),
                    "language": json_schema_string("Language code (default 'en')"),
                    "sort_by": json_schema_integer("3 = lowest price, 8 = highest rating, 13 = most reviewed"),
                    "hotel_class": ids("Hotel classes, 2 to 5 stars"),
                    "amenities": ids("Amenity ids"),
                    "property_types": ids("Property type ids"),
                    "brands": ids("Brand ids"),
                    "free_cancellation": json_schema_boolean("Only hotels with free cancellation"),
                    "special_offers": json_schema_boolean("Only hotels with special offers"),
                    "vacation_rentals": json_schema_boolean("Search vacation rentals instead of hotels"),
                    "bedrooms": json_schema_integer("Minimum bedrooms (vacation rentals only)"),
                    "max_results": json_schema_integer("Maximum properties to store")
                }),
                vec!["location", "check_in_date", "check_out_date"],
            ),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let result = match parse_args::<SearchHotelsArgs>(arguments) {
            Ok(args) => self.search(args).await,
            Err(e) => Err(e),
        };
        Ok(respond(result))
    }
}

#[derive(Debug, Deserialize)]
struct PropertyDetailsArgs {
    property_token: String,
    #[serde(default)]
    check_in_date: Option<String>,
    #[serde(default)]
    check_out_date: Option<String>,
    #[serde(default = "usd")]
    currency: String,
    #[serde(default = "us")]
    country: String,
    #[serde(default = "en")]
    language: String,
}

/// Live details of one property, looked up by the `property_token` of a
/// stored hotel search. The answer is passed through and not stored.
pub struct PropertyDetailsTool {
    ctx: ToolContext,
}

impl PropertyDetailsTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    async fn details(&self, args: PropertyDetailsArgs) -> SearchResult<Value> {
        if args.property_token.trim().is_empty() {
            return Err(SearchError::InvalidArguments(
                "property_token must not be empty".to_string(),
            ));
        }
        let request = ProviderRequest::new("search")
            .param("engine", "google_hotels")
            .param("property_token", &args.property_token)
            .optional("check_in_date", args.check_in_date.as_deref())
            .optional("check_out_date", args.check_out_date.as_deref())
            .param("currency", &args.currency)
            .param("gl", &args.country)
            .param("hl", &args.language);
        self.ctx.providers.serpapi.fetch(request).await
    }
}

#[async_trait::async_trait]
impl Tool for PropertyDetailsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_property_details".to_string(),
            description: "Get live details of one hotel or rental by the property_token from a hotel search"
                .to_string(),
            input_schema: json_schema_object(
                json!({
                    "property_token": json_schema_string("property_token of a property in a hotel search"),
                    "check_in_date": json_schema_string("Check-in date, YYYY-MM-DD (optional)"),
                    "check_out_date": json_schema_string("Check-out date, YYYY-MM-DD (optional)"),
                    "currency": json_schema_string("Price currency (default 'USD')"),
                    "country": json_schema_string("Country code (default 'us')"),
                    "language": json_schema_string("Language code (default 'en')")
                }),
                vec!["property_token"],
            ),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let result = match parse_args::<PropertyDetailsArgs>(arguments) {
            Ok(args) => self.details(args).await,
            Err(e) => Err(e),
        };
        Ok(respond(result))
    }
}

impl FilterSpec for HotelPriceFilter {
    const NAME: &'static str = "filter_hotels_by_price";
    const DESCRIPTION: &'static str =
        "Filter stored hotel properties by nightly rate; properties without a rate are excluded";

    fn properties() -> Value {
        json!({
            "min_price": json_schema_number("Minimum nightly rate, inclusive"),
            "max_price": json_schema_number("Maximum nightly rate, inclusive")
        })
    }
}

impl FilterSpec for RatingFilter {
    const NAME: &'static str = "filter_hotels_by_rating";
    const DESCRIPTION: &'static str = "Filter stored hotel properties by minimum overall rating";

    fn properties() -> Value {
        json!({
            "min_rating": json_schema_number("Minimum overall rating, 1.0 to 5.0 (default 4.0)")
        })
    }
}

impl FilterSpec for AmenityFilter {
    const NAME: &'static str = "filter_hotels_by_amenities";
    const DESCRIPTION: &'static str =
        "Filter stored hotel properties to those offering every required amenity";

    fn properties() -> Value {
        json!({
            "required_amenities": json_schema_array(
                json!({"type": "string"}),
                "Amenities that must all be present, e.g. ['Free Wi-Fi', 'Pool']"
            )
        })
    }

    fn required() -> Vec<&'static str> {
        vec!["required_amenities"]
    }
}

impl FilterSpec for HotelClassFilter {
    const NAME: &'static str = "filter_hotels_by_class";
    const DESCRIPTION: &'static str = "Filter stored hotel properties by star class";

    fn properties() -> Value {
        json!({
            "hotel_classes": json_schema_array(json!({"type": "integer"}), "Accepted classes, e.g. [4, 5]")
        })
    }

    fn required() -> Vec<&'static str> {
        vec!["hotel_classes"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::stub::StubProvider;
    use crate::tools::testing::{context, error_text, json_of};
    use wayfarer_core::SearchId;

    fn body() -> Value {
        json!({
            "search_information": {"total_results": 3},
            "properties": [
                {"name": "Hotel A", "rate_per_night": {"lowest": "$101", "extracted_lowest": 101}, "overall_rating": 4.5},
                {"name": "Hotel B", "rate_per_night": {"lowest": "$250", "extracted_lowest": 250}},
                {"name": "Hotel C"}
            ],
            "brands": [{"id": 33, "name": "Hilton"}]
        })
    }

    #[tokio::test]
    async fn test_search_hotels() {
        let stub = StubProvider::new();
        stub.respond(Ok(body()));
        let ctx = context(&stub);
        let tool = SearchHotelsTool::new(ctx.clone());

        let summary = json_of(
            &tool
                .execute(json!({
                    "location": "New York",
                    "check_in_date": "2025-06-15",
                    "check_out_date": "2025-06-20",
                    "children": 1,
                    "children_ages": [7],
                    "hotel_class": [4, 5],
                    "free_cancellation": true
                }))
                .await
                .unwrap(),
        );
        let search_id = summary["search_id"].as_str().unwrap().to_string();
        assert!(search_id.starts_with("new_york_2025-06-15_2025-06-20_"));
        assert_eq!(summary["total_properties"], 3);
        assert_eq!(summary["guests"], "2 adults, 1 children");
        assert_eq!(summary["dates"], "2025-06-15 to 2025-06-20");
        assert_eq!(summary["price_range"]["min_price"], 101.0);
        assert_eq!(summary["price_range"]["max_price"], 250.0);
        assert_eq!(summary["search_type"], "hotels");

        let request = &stub.requests()[0];
        assert_eq!(request.get("engine"), Some("google_hotels"));
        assert_eq!(request.get("q"), Some("New York"));
        assert_eq!(request.get("adults"), Some("2"));
        assert_eq!(request.get("hotel_class"), Some("4,5"));
        assert_eq!(request.get("children_ages"), Some("7"));
        assert_eq!(request.get("free_cancellation"), Some("true"));
        assert_eq!(request.get("special_offers"), None);
        assert_eq!(request.get("sort_by"), None);

        let record = ctx
            .store
            .get::<HotelsPayload>(&SearchId::new(search_id))
            .await
            .unwrap();
        assert_eq!(record.metadata.search_type.as_deref(), Some("hotels"));
        assert_eq!(record.metadata.get("filters").unwrap()["hotel_class"], json!([4, 5]));
    }

    #[tokio::test]
    async fn test_max_results_bounds_stored_properties() {
        let stub = StubProvider::new();
        stub.respond(Ok(body()));
        let ctx = context(&stub);
        let tool = SearchHotelsTool::new(ctx.clone());

        let summary = json_of(
            &tool
                .execute(json!({
                    "location": "Paris",
                    "check_in_date": "2025-06-15",
                    "check_out_date": "2025-06-20",
                    "vacation_rentals": true,
                    "max_results": 1
                }))
                .await
                .unwrap(),
        );
        assert_eq!(summary["total_properties"], 1);
        assert_eq!(summary["search_type"], "vacation_rentals");
        assert_eq!(summary["guests"], "2 adults");
    }

    #[test]
    fn test_joined() {
        assert_eq!(joined(&Some(vec![17, 12])), Some("17,12".to_string()));
        assert_eq!(joined(&Some(vec![])), None);
        assert_eq!(joined(&None), None);
    }

    #[tokio::test]
    async fn test_property_details_pass_through() {
        let stub = StubProvider::new();
        stub.respond(Ok(json!({
            "name": "The Ritz London",
            "overall_rating": 4.7,
            "prices": [{"source": "Booking.com", "rate_per_night": {"lowest": "$1,020"}}]
        })));
        let ctx = context(&stub);
        let tool = PropertyDetailsTool::new(ctx.clone());

        let details = json_of(
            &tool
                .execute(json!({"property_token": "ChYIq6SB", "check_in_date": "2025-06-01"}))
                .await
                .unwrap(),
        );
        assert_eq!(details["name"], "The Ritz London");
        assert_eq!(details["prices"][0]["source"], "Booking.com");

        let request = &stub.requests()[0];
        assert_eq!(request.get("engine"), Some("google_hotels"));
        assert_eq!(request.get("property_token"), Some("ChYIq6SB"));
        assert_eq!(request.get("check_in_date"), Some("2025-06-01"));
        assert_eq!(request.get("check_out_date"), None);
        assert_eq!(request.get("gl"), Some("us"));
        assert!(ctx.store.list(Namespace::Hotels).await.unwrap().is_empty());

        let result = tool.execute(json!({"property_token": " "})).await.unwrap();
        assert!(error_text(&result).contains("[invalid_arguments]"));
    }
}
