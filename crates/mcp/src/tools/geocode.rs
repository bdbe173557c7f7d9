// Forward, reverse and batch geocoding over Nominatim, distances between
// coordinates, and search across stored locations

use anyhow::Result;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use wayfarer_core::filter::LocationQuery;
use wayfarer_core::payload::GeocodePayload;
use wayfarer_core::{
    FilterEngine, Namespace, SearchError, SearchIdBuilder, SearchMetadata, SearchRecord,
    SearchResult,
};

use super::{
    build_payload, json_schema_array, json_schema_boolean, json_schema_integer, json_schema_number,
    json_schema_object, json_schema_string, parse_args, respond, GetDetailsTool, ListSearchesTool,
    SearchDetailTool, Tool, ToolContext, ToolRegistry,
};
use crate::protocol::{CallToolResult, ToolSchema};
use crate::providers::ProviderRequest;

pub fn register(registry: &mut ToolRegistry, ctx: &ToolContext) {
    registry.register(Arc::new(GeocodeTool::new(ctx.clone())));
    registry.register(Arc::new(ReverseGeocodeTool::new(ctx.clone())));
    registry.register(Arc::new(BatchGeocodeTool::new(ctx.clone())));
    registry.register(Arc::new(DistanceTool));
    registry.register(Arc::new(GetDetailsTool::new(
        "get_location_details",
        Namespace::Geocode,
        ctx.store.clone(),
    )));
    registry.register(Arc::new(SearchLocationsTool::new(
        ctx.engine.clone(),
        ctx.limits.locations,
    )));
    registry.register(Arc::new(ListSearchesTool::new(
        "list_geocoded_locations",
        Namespace::Geocode,
        ctx.catalog.clone(),
    )));
    registry.register(Arc::new(SearchDetailTool::new(
        "get_geocoded_location_detail",
        Namespace::Geocode,
        ctx.catalog.clone(),
    )));
}

fn yes() -> bool {
    true
}

fn en() -> String {
    "en".to_string()
}

fn street_level() -> u8 {
    18
}

/// Nominatim reports coordinates as strings
fn coordinate(place: &Value, key: &str) -> Option<f64> {
    match place.get(key)? {
        Value::String(text) => text.parse().ok(),
        other => other.as_f64(),
    }
}

fn place(raw: &Value) -> Option<Value> {
    Some(json!({
        "latitude": coordinate(raw, "lat")?,
        "longitude": coordinate(raw, "lon")?,
        "display_name": raw.get("display_name"),
        "raw_data": raw
    }))
}

/// The stored payload plus the id it was stored under
fn with_location_id(record: &SearchRecord<GeocodePayload>) -> SearchResult<Value> {
    let mut value =
        serde_json::to_value(&record.payload).map_err(|e| SearchError::Unexpected(e.to_string()))?;
    if let Value::Object(map) = &mut value {
        map.insert("location_id".into(), json!(record.id()));
    }
    Ok(value)
}

#[derive(Debug, Deserialize)]
struct GeocodeArgs {
    location: String,
    #[serde(default = "yes")]
    exactly_one: bool,
    #[serde(default = "en")]
    language: String,
    #[serde(default = "yes")]
    addressdetails: bool,
    /// Comma separated ISO codes, e.g. "us,ca"
    #[serde(default)]
    country_codes: Option<String>,
}

pub struct GeocodeTool {
    ctx: ToolContext,
}

impl GeocodeTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    async fn geocode(&self, args: GeocodeArgs) -> SearchResult<Value> {
        let record = self.lookup(&args).await?;
        with_location_id(&record)
    }

    async fn lookup(&self, args: &GeocodeArgs) -> SearchResult<SearchRecord<GeocodePayload>> {
        let limit = if args.exactly_one { 1 } else { self.ctx.limits.locations };
        let request = ProviderRequest::new("search")
            .param("q", &args.location)
            .param("format", "jsonv2")
            .param("limit", limit)
            .param("addressdetails", u8::from(args.addressdetails))
            .param("accept-language", &args.language)
            .optional("countrycodes", args.country_codes.as_deref().filter(|c| !c.is_empty()));
        let body = self.ctx.providers.nominatim.fetch(request).await?;

        let places: Vec<Value> = body
            .as_array()
            .map(|results| results.iter().filter_map(place).collect())
            .unwrap_or_default();
        if places.is_empty() {
            return Err(SearchError::no_results(
                "nominatim",
                format!("No coordinates found for location: {}", args.location),
            ));
        }

        let mut fields = Map::new();
        fields.insert("query".into(), json!(args.location));
        fields.insert("multiple_results".into(), json!(!args.exactly_one));
        if args.exactly_one {
            fields.insert("location_data".into(), places[0].clone());
        } else {
            fields.insert("count".into(), json!(places.len()));
            fields.insert("locations".into(), Value::Array(places));
        }
        let payload: GeocodePayload = build_payload("nominatim", fields)?;

        let search_id = SearchIdBuilder::new().part(&args.location).build();
        let metadata = SearchMetadata::new(search_id)
            .with_type("geocode")
            .param("query", args.location.as_str())
            .param("exactly_one", args.exactly_one)
            .param("language", args.language.as_str())
            .param("country_codes", args.country_codes.clone());

        let record = SearchRecord::new(metadata, payload);
        self.ctx.store.put(&record).await?;
        Ok(record)
    }
}

#[async_trait::async_trait]
impl Tool for GeocodeTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "geocode_location".to_string(),
            description: "Convert a place name or address to coordinates and store the result"
                .to_string(),
            input_schema: json_schema_object(
                json!({
                    "location": json_schema_string("Place to look up, e.g. 'Ashburn, Virginia'"),
                    "exactly_one": json_schema_boolean("Return only the best match (default true)"),
                    "language": json_schema_string("Result language (default 'en')"),
                    "addressdetails": json_schema_boolean("Include address components (default true)"),
                    "country_codes": json_schema_string("Limit to countries, e.g. 'us,ca'")
                }),
                vec!["location"],
            ),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let result = match parse_args::<GeocodeArgs>(arguments) {
            Ok(args) => self.geocode(args).await,
            Err(e) => Err(e),
        };
        Ok(respond(result))
    }
}

#[derive(Debug, Deserialize)]
struct ReverseGeocodeArgs {
    latitude: f64,
    longitude: f64,
    #[serde(default = "en")]
    language: String,
    /// 1 (country) to 18 (building)
    #[serde(default = "street_level")]
    zoom: u8,
}

pub struct ReverseGeocodeTool {
    ctx: ToolContext,
}

impl ReverseGeocodeTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    async fn reverse(&self, args: ReverseGeocodeArgs) -> SearchResult<Value> {
        let request = ProviderRequest::new("reverse")
            .param("lat", args.latitude)
            .param("lon", args.longitude)
            .param("zoom", args.zoom)
            .param("format", "jsonv2")
            .param("accept-language", &args.language);
        let body = self.ctx.providers.nominatim.fetch(request).await?;

        let Some(address) = body.get("display_name").and_then(Value::as_str) else {
            return Err(SearchError::no_results(
                "nominatim",
                format!(
                    "No address found for coordinates: {}, {}",
                    args.latitude, args.longitude
                ),
            ));
        };

        let mut fields = Map::new();
        fields.insert(
            "coordinates".into(),
            json!({"latitude": args.latitude, "longitude": args.longitude}),
        );
        fields.insert("address".into(), json!(address));
        fields.insert("raw_data".into(), body.clone());
        let payload: GeocodePayload = build_payload("nominatim", fields)?;

        let search_id = SearchIdBuilder::new()
            .part("reverse")
            .coordinate(args.latitude)
            .coordinate(args.longitude)
            .build();
        let metadata = SearchMetadata::new(search_id)
            .with_type("reverse")
            .param("latitude", args.latitude)
            .param("longitude", args.longitude)
            .param("language", args.language.as_str())
            .param("zoom", args.zoom);

        let record = SearchRecord::new(metadata, payload);
        self.ctx.store.put(&record).await?;
        with_location_id(&record)
    }
}

#[async_trait::async_trait]
impl Tool for ReverseGeocodeTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "reverse_geocode".to_string(),
            description: "Convert coordinates to an address and store the result".to_string(),
            input_schema: json_schema_object(
                json!({
                    "latitude": json_schema_number("Latitude, e.g. 39.0458"),
                    "longitude": json_schema_number("Longitude, e.g. -77.5011"),
                    "language": json_schema_string("Result language (default 'en')"),
                    "zoom": json_schema_integer("Detail level, 1 to 18 (default 18)")
                }),
                vec!["latitude", "longitude"],
            ),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let result = match parse_args::<ReverseGeocodeArgs>(arguments) {
            Ok(args) => self.reverse(args).await,
            Err(e) => Err(e),
        };
        Ok(respond(result))
    }
}

#[derive(Debug, Deserialize)]
struct BatchGeocodeArgs {
    locations: Vec<String>,
}

/// Geocodes several places one after another. Each place is stored as its
/// own record, and the batch outcome is stored as a `batch` record.
pub struct BatchGeocodeTool {
    ctx: ToolContext,
    single: GeocodeTool,
}

impl BatchGeocodeTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self {
            single: GeocodeTool::new(ctx.clone()),
            ctx,
        }
    }

    async fn batch(&self, args: BatchGeocodeArgs) -> SearchResult<Value> {
        if args.locations.is_empty() {
            return Err(SearchError::InvalidArguments(
                "At least one location is required".to_string(),
            ));
        }

        let mut results = Vec::with_capacity(args.locations.len());
        let mut successful = 0usize;
        for location in &args.locations {
            let lookup = GeocodeArgs {
                location: location.clone(),
                exactly_one: true,
                language: en(),
                addressdetails: true,
                country_codes: None,
            };
            match self.single.lookup(&lookup).await {
                Ok(record) => {
                    successful += 1;
                    results.push(json!({
                        "query": location,
                        "success": true,
                        "location_id": record.id(),
                        "location_data": record.payload.location_data
                    }));
                }
                Err(e) => results.push(json!({
                    "query": location,
                    "success": false,
                    "error": format!("[{}] {}", e.kind(), e)
                })),
            }
        }

        let mut fields = Map::new();
        fields.insert("total_locations".into(), json!(args.locations.len()));
        fields.insert("successful".into(), json!(successful));
        fields.insert("failed".into(), json!(args.locations.len() - successful));
        fields.insert("results".into(), Value::Array(results));
        let payload: GeocodePayload = build_payload("nominatim", fields)?;

        let search_id = SearchIdBuilder::new().part("batch").build();
        let metadata = SearchMetadata::new(search_id)
            .with_type("batch")
            .param("locations", args.locations.clone());

        let record = SearchRecord::new(metadata, payload);
        self.ctx.store.put(&record).await?;
        let mut value = serde_json::to_value(&record.payload)
            .map_err(|e| SearchError::Unexpected(e.to_string()))?;
        if let Value::Object(map) = &mut value {
            map.insert("batch_id".into(), json!(record.id()));
        }
        Ok(value)
    }
}

#[async_trait::async_trait]
impl Tool for BatchGeocodeTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "batch_geocode".to_string(),
            description: "Geocode several place names and store each result plus the batch outcome"
                .to_string(),
            input_schema: json_schema_object(
                json!({
                    "locations": json_schema_array(json!({"type": "string"}), "Place names to look up")
                }),
                vec!["locations"],
            ),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let result = match parse_args::<BatchGeocodeArgs>(arguments) {
            Ok(args) => self.batch(args).await,
            Err(e) => Err(e),
        };
        Ok(respond(result))
    }
}

/// WGS-84 semi-major axis in metres
const WGS84_A: f64 = 6_378_137.0;
/// WGS-84 flattening
const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// Mean earth radius in metres, used when the ellipsoidal solution does not
/// converge (nearly antipodal points)
const MEAN_RADIUS: f64 = 6_371_008.8;

/// Ellipsoidal distance in metres (Vincenty's inverse formula on WGS-84)
fn geodesic_metres(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let b = WGS84_A * (1.0 - WGS84_F);
    let l = (lon2 - lon1).to_radians();
    let u1 = ((1.0 - WGS84_F) * lat1.to_radians().tan()).atan();
    let u2 = ((1.0 - WGS84_F) * lat2.to_radians().tan()).atan();
    let (sin_u1, cos_u1) = u1.sin_cos();
    let (sin_u2, cos_u2) = u2.sin_cos();

    let mut lambda = l;
    for _ in 0..200 {
        let (sin_lambda, cos_lambda) = lambda.sin_cos();
        let sin_sigma = ((cos_u2 * sin_lambda).powi(2)
            + (cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda).powi(2))
        .sqrt();
        if sin_sigma == 0.0 {
            return 0.0;
        }
        let cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
        let sigma = sin_sigma.atan2(cos_sigma);
        let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
        let cos2_alpha = 1.0 - sin_alpha * sin_alpha;
        let cos_2sigma_m = if cos2_alpha == 0.0 {
            0.0
        } else {
            cos_sigma - 2.0 * sin_u1 * sin_u2 / cos2_alpha
        };
        let c = WGS84_F / 16.0 * cos2_alpha * (4.0 + WGS84_F * (4.0 - 3.0 * cos2_alpha));
        let previous = lambda;
        lambda = l
            + (1.0 - c)
                * WGS84_F
                * sin_alpha
                * (sigma
                    + c * sin_sigma
                        * (cos_2sigma_m + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m.powi(2))));

        if (lambda - previous).abs() < 1e-12 {
            let u_sq = cos2_alpha * (WGS84_A.powi(2) - b.powi(2)) / b.powi(2);
            let big_a =
                1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
            let big_b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
            let delta_sigma = big_b
                * sin_sigma
                * (cos_2sigma_m
                    + big_b / 4.0
                        * (cos_sigma * (-1.0 + 2.0 * cos_2sigma_m.powi(2))
                            - big_b / 6.0
                                * cos_2sigma_m
                                * (-3.0 + 4.0 * sin_sigma.powi(2))
                                * (-3.0 + 4.0 * cos_2sigma_m.powi(2))));
            return b * big_a * (sigma - delta_sigma);
        }
    }

    tracing::debug!(lat1, lon1, lat2, lon2, "Geodesic did not converge, using great circle");
    great_circle_metres(lat1, lon1, lat2, lon2)
}

fn great_circle_metres(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * MEAN_RADIUS * h.sqrt().min(1.0).asin()
}

fn kilometres() -> String {
    "km".to_string()
}

#[derive(Debug, Deserialize)]
struct DistanceArgs {
    lat1: f64,
    lon1: f64,
    lat2: f64,
    lon2: f64,
    /// `km`, `miles` or `nm`
    #[serde(default = "kilometres")]
    unit: String,
}

fn check_point(lat: f64, lon: f64) -> SearchResult<()> {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(SearchError::InvalidArguments(format!(
            "Coordinates out of range: {}, {}",
            lat, lon
        )));
    }
    Ok(())
}

/// Distance between two coordinates. Pure computation, nothing is stored.
pub struct DistanceTool;

impl DistanceTool {
    fn distance(&self, args: DistanceArgs) -> SearchResult<Value> {
        check_point(args.lat1, args.lon1)?;
        check_point(args.lat2, args.lon2)?;

        let metres = geodesic_metres(args.lat1, args.lon1, args.lat2, args.lon2);
        let (unit, distance) = match args.unit.to_lowercase().as_str() {
            "miles" => ("miles", metres / 1_609.344),
            "nm" => ("nm", metres / 1_852.0),
            _ => ("km", metres / 1_000.0),
        };
        Ok(json!({
            "distance": (distance * 100.0).round() / 100.0,
            "unit": unit,
            "point1": {"latitude": args.lat1, "longitude": args.lon1},
            "point2": {"latitude": args.lat2, "longitude": args.lon2},
            "calculation_method": "geodesic"
        }))
    }
}

#[async_trait::async_trait]
impl Tool for DistanceTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "calculate_distance".to_string(),
            description: "Calculate the geodesic distance between two coordinates".to_string(),
            input_schema: json_schema_object(
                json!({
                    "lat1": json_schema_number("Latitude of the first point"),
                    "lon1": json_schema_number("Longitude of the first point"),
                    "lat2": json_schema_number("Latitude of the second point"),
                    "lon2": json_schema_number("Longitude of the second point"),
                    "unit": json_schema_string("km (default), miles or nm")
                }),
                vec!["lat1", "lon1", "lat2", "lon2"],
            ),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let result = parse_args::<DistanceArgs>(arguments).and_then(|args| self.distance(args));
        Ok(respond(result))
    }
}

#[derive(Debug, Deserialize)]
struct SearchLocationsArgs {
    query: String,
    #[serde(default)]
    max_results: Option<usize>,
}

/// Substring search over stored geocoding records, newest first
pub struct SearchLocationsTool {
    engine: FilterEngine,
    default_max: usize,
}

impl SearchLocationsTool {
    pub fn new(engine: FilterEngine, default_max: usize) -> Self {
        Self { engine, default_max }
    }
}

#[async_trait::async_trait]
impl Tool for SearchLocationsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "search_locations".to_string(),
            description: "Search previously geocoded locations by query text or display name"
                .to_string(),
            input_schema: json_schema_object(
                json!({
                    "query": json_schema_string("Text to look for"),
                    "max_results": json_schema_integer("Maximum records to return (default 10)")
                }),
                vec!["query"],
            ),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let result = match parse_args::<SearchLocationsArgs>(arguments) {
            Ok(args) => {
                let query = LocationQuery {
                    query: args.query,
                    max_results: args.max_results.unwrap_or(self.default_max),
                };
                self.engine.search_locations(&query).await
            }
            Err(e) => Err(e),
        };
        Ok(respond(result))
    }
}
