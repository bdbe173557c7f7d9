// Forecasts, alerts and observations from the National Weather Service;
// current, forecast and historical weather from Weatherstack

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use wayfarer_core::filter::ForecastConditionsFilter;
use wayfarer_core::payload::WeatherPayload;
use wayfarer_core::{
    Namespace, SearchError, SearchIdBuilder, SearchMetadata, SearchRecord, SearchResult,
};

use super::{
    build_payload, field, json_schema_array, json_schema_boolean, json_schema_integer,
    json_schema_number, json_schema_object, json_schema_string, parse_args, respond, FilterSpec, FilterTool,
    GetDetailsTool, ListSearchesTool, SearchDetailTool, Tool, ToolContext, ToolRegistry,
};
use crate::protocol::{CallToolResult, ToolSchema};
use crate::providers::ProviderRequest;

pub fn register(registry: &mut ToolRegistry, ctx: &ToolContext) {
    registry.register(Arc::new(ForecastTool::new(ctx.clone())));
    registry.register(Arc::new(AlertsTool::new(ctx.clone())));
    registry.register(Arc::new(CurrentWeatherTool::new(ctx.clone())));
    registry.register(Arc::new(LocationInfoTool::new(ctx.clone())));
    registry.register(Arc::new(CurrentConditionsTool::new(ctx.clone())));
    registry.register(Arc::new(DailyForecastTool::new(ctx.clone())));
    registry.register(Arc::new(HistoricalWeatherTool::new(ctx.clone())));
    registry.register(Arc::new(CompareWeatherTool::new(ctx.clone())));
    registry.register(Arc::new(GetDetailsTool::new(
        "get_weather_data_details",
        Namespace::Weather,
        ctx.store.clone(),
    )));
    registry.register(Arc::new(FilterTool::<ForecastConditionsFilter>::new(ctx.engine.clone())));
    registry.register(Arc::new(ListSearchesTool::new(
        "list_weather_searches",
        Namespace::Weather,
        ctx.catalog.clone(),
    )));
    registry.register(Arc::new(SearchDetailTool::new(
        "get_weather_search_detail",
        Namespace::Weather,
        ctx.catalog.clone(),
    )));
}

/// `value` of an NWS quantitative field such as `{"unitCode": ..., "value": 20}`
fn quantity(source: &Value, key: &str) -> Value {
    source
        .get(key)
        .and_then(|q| q.get("value"))
        .cloned()
        .unwrap_or(Value::Null)
}

/// Copy camelCase NWS fields into a snake_case object
fn rename(source: &Value, pairs: &[(&str, &str)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(from, to)| ((*to).to_string(), field(source, from)))
        .collect()
}

fn forecast_period(period: &Value) -> Value {
    let mut out = rename(
        period,
        &[
            ("number", "number"),
            ("name", "name"),
            ("startTime", "start_time"),
            ("endTime", "end_time"),
            ("isDaytime", "is_daytime"),
            ("temperature", "temperature"),
            ("temperatureUnit", "temperature_unit"),
            ("temperatureTrend", "temperature_trend"),
            ("windSpeed", "wind_speed"),
            ("windDirection", "wind_direction"),
            ("icon", "icon"),
            ("shortForecast", "short_forecast"),
            ("detailedForecast", "detailed_forecast"),
        ],
    );
    out.insert(
        "probability_of_precipitation".into(),
        quantity(period, "probabilityOfPrecipitation"),
    );
    out.insert("dewpoint".into(), quantity(period, "dewpoint"));
    out.insert("relative_humidity".into(), quantity(period, "relativeHumidity"));
    Value::Object(out)
}

fn alert(feature: &Value) -> Value {
    let properties = feature.get("properties").unwrap_or(&Value::Null);
    let mut out = rename(
        properties,
        &[
            ("id", "id"),
            ("areaDesc", "area_desc"),
            ("geocode", "geocode"),
            ("sent", "sent"),
            ("effective", "effective"),
            ("onset", "onset"),
            ("expires", "expires"),
            ("ends", "ends"),
            ("status", "status"),
            ("messageType", "message_type"),
            ("category", "category"),
            ("severity", "severity"),
            ("certainty", "certainty"),
            ("urgency", "urgency"),
            ("response", "response"),
            ("senderCode", "sender_code"),
            ("senderName", "sender_name"),
            ("headline", "headline"),
            ("description", "description"),
            ("instruction", "instruction"),
            ("event", "event"),
            ("parameters", "parameters"),
        ],
    );
    out.insert("geometry".into(), field(feature, "geometry"));
    Value::Object(out)
}

/// The stored payload with the new search id, as returned by NWS tools
fn with_search_id(record: &SearchRecord<WeatherPayload>) -> SearchResult<Value> {
    let mut value =
        serde_json::to_value(&record.payload).map_err(|e| SearchError::Unexpected(e.to_string()))?;
    if let Value::Object(map) = &mut value {
        map.insert("search_id".into(), json!(record.id()));
    }
    Ok(value)
}

fn schema(name: &str, description: &str, properties: Value, required: Vec<&str>) -> ToolSchema {
    ToolSchema {
        name: name.to_string(),
        description: description.to_string(),
        input_schema: json_schema_object(properties, required),
    }
}

#[derive(Debug, Deserialize)]
struct ForecastArgs {
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    hourly: bool,
}

#[derive(Debug, Deserialize)]
struct PointArgs {
    latitude: f64,
    longitude: f64,
}

fn point_properties() -> Value {
    json!({
        "latitude": json_schema_number("Latitude, e.g. 39.7456"),
        "longitude": json_schema_number("Longitude, e.g. -97.0892")
    })
}

async fn fetch_point(ctx: &ToolContext, latitude: f64, longitude: f64) -> SearchResult<Value> {
    ctx.providers
        .nws
        .fetch(ProviderRequest::new(format!("points/{},{}", latitude, longitude)))
        .await
}

pub struct ForecastTool {
    ctx: ToolContext,
}

/// NWS grid cell serving a point
struct GridPoint {
    office: String,
    x: i64,
    y: i64,
    city: Value,
    state: Value,
}

impl GridPoint {
    fn from_points(body: &Value) -> SearchResult<Self> {
        let properties = body.get("properties").unwrap_or(&Value::Null);
        let office = properties
            .get("gridId")
            .or_else(|| properties.get("cwa"))
            .and_then(Value::as_str);
        let x = properties.get("gridX").and_then(Value::as_i64);
        let y = properties.get("gridY").and_then(Value::as_i64);
        let (Some(office), Some(x), Some(y)) = (office, x, y) else {
            return Err(SearchError::provider("nws", "Invalid grid coordinates for location"));
        };

        Ok(Self {
            office: office.to_string(),
            x,
            y,
            city: relative_place(properties, "city"),
            state: relative_place(properties, "state"),
        })
    }

    fn location(&self, latitude: f64, longitude: f64) -> Value {
        json!({
            "latitude": latitude,
            "longitude": longitude,
            "city": self.city,
            "state": self.state
        })
    }
}

/// City or state of the place nearest to an NWS point, `"Unknown"` if absent
fn relative_place(properties: &Value, key: &str) -> Value {
    properties
        .get("relativeLocation")
        .and_then(|r| r.get("properties"))
        .and_then(|p| p.get(key))
        .cloned()
        .unwrap_or_else(|| json!("Unknown"))
}

impl ForecastTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    async fn forecast(&self, args: ForecastArgs) -> SearchResult<Value> {
        let nws = &self.ctx.providers.nws;
        let points = fetch_point(&self.ctx, args.latitude, args.longitude).await?;
        let grid = GridPoint::from_points(&points)?;

        let forecast_type = if args.hourly { "hourly" } else { "daily" };
        let path = if args.hourly { "forecast/hourly" } else { "forecast" };
        let body = nws
            .fetch(ProviderRequest::new(format!(
                "gridpoints/{}/{},{}/{}",
                grid.office, grid.x, grid.y, path
            )))
            .await?;
        let properties = body.get("properties").unwrap_or(&Value::Null);
        let periods: Vec<Value> = properties
            .get("periods")
            .and_then(Value::as_array)
            .map(|periods| periods.iter().map(forecast_period).collect())
            .unwrap_or_default();

        let mut fields = Map::new();
        fields.insert("location".into(), grid.location(args.latitude, args.longitude));
        fields.insert(
            "grid".into(),
            json!({"office": grid.office, "gridX": grid.x, "gridY": grid.y}),
        );
        fields.insert("forecast_type".into(), json!(forecast_type));
        fields.insert("updated".into(), field(properties, "updated"));
        fields.insert("generated_at".into(), field(properties, "generatedAt"));
        fields.insert("elevation".into(), field(properties, "elevation"));
        fields.insert("periods".into(), Value::Array(periods));
        let payload: WeatherPayload = build_payload("nws", fields)?;

        let search_id = SearchIdBuilder::new()
            .part("forecast")
            .part(forecast_type)
            .coordinate(args.latitude)
            .coordinate(args.longitude)
            .build();
        let metadata = SearchMetadata::new(search_id)
            .with_type("forecast")
            .param("latitude", args.latitude)
            .param("longitude", args.longitude)
            .param("hourly", args.hourly);

        let record = SearchRecord::new(metadata, payload);
        self.ctx.store.put(&record).await?;
        with_search_id(&record)
    }
}

#[async_trait::async_trait]
impl Tool for ForecastTool {
    fn schema(&self) -> ToolSchema {
        schema(
            "get_weather_forecast",
            "Get the National Weather Service forecast for a US location and store it",
            json!({
                "latitude": json_schema_number("Latitude, e.g. 39.7456"),
                "longitude": json_schema_number("Longitude, e.g. -97.0892"),
                "hourly": json_schema_boolean("Hourly instead of daily periods (default false)")
            }),
            vec!["latitude", "longitude"],
        )
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let result = match parse_args::<ForecastArgs>(arguments) {
            Ok(args) => self.forecast(args).await,
            Err(e) => Err(e),
        };
        Ok(respond(result))
    }
}

/// Grid cell, forecast endpoints and zones of a point
pub struct LocationInfoTool {
    ctx: ToolContext,
}

impl LocationInfoTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    async fn location_info(&self, args: PointArgs) -> SearchResult<Value> {
        let points = fetch_point(&self.ctx, args.latitude, args.longitude).await?;
        let properties = points.get("properties").unwrap_or(&Value::Null);

        let mut fields = Map::new();
        fields.insert(
            "location".into(),
            json!({
                "latitude": args.latitude,
                "longitude": args.longitude,
                "city": relative_place(properties, "city"),
                "state": relative_place(properties, "state")
            }),
        );
        fields.insert(
            "grid".into(),
            json!({
                "office": field(properties, "cwa"),
                "gridX": field(properties, "gridX"),
                "gridY": field(properties, "gridY")
            }),
        );
        fields.insert(
            "forecast_endpoints".into(),
            json!({
                "forecast": field(properties, "forecast"),
                "forecast_hourly": field(properties, "forecastHourly"),
                "forecast_grid_data": field(properties, "forecastGridData")
            }),
        );
        fields.extend(rename(
            properties,
            &[
                ("observationStations", "observation_stations"),
                ("fireWeatherZone", "fire_weather_zone"),
                ("forecastZone", "forecast_zone"),
                ("county", "county"),
                ("timeZone", "time_zone"),
            ],
        ));
        let payload: WeatherPayload = build_payload("nws", fields)?;

        let search_id = SearchIdBuilder::new()
            .part("location")
            .coordinate(args.latitude)
            .coordinate(args.longitude)
            .build();
        let metadata = SearchMetadata::new(search_id)
            .with_type("location")
            .param("latitude", args.latitude)
            .param("longitude", args.longitude);

        let record = SearchRecord::new(metadata, payload);
        self.ctx.store.put(&record).await?;
        with_search_id(&record)
    }
}

#[async_trait::async_trait]
impl Tool for LocationInfoTool {
    fn schema(&self) -> ToolSchema {
        schema(
            "get_location_info",
            "Get the National Weather Service grid, forecast endpoints and zones for a US location and store them",
            point_properties(),
            vec!["latitude", "longitude"],
        )
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let result = match parse_args::<PointArgs>(arguments) {
            Ok(args) => self.location_info(args).await,
            Err(e) => Err(e),
        };
        Ok(respond(result))
    }
}

/// Stations asked for an observation before giving up
const STATIONS_TRIED: usize = 3;

/// NWS observation fields, camelCase source and snake_case name
const OBSERVED: &[(&str, &str)] = &[
    ("temperature", "temperature"),
    ("dewpoint", "dewpoint"),
    ("windDirection", "wind_direction"),
    ("windSpeed", "wind_speed"),
    ("windGust", "wind_gust"),
    ("barometricPressure", "barometric_pressure"),
    ("seaLevelPressure", "sea_level_pressure"),
    ("visibility", "visibility"),
    ("maxTemperatureLast24Hours", "max_temperature_last_24_hours"),
    ("minTemperatureLast24Hours", "min_temperature_last_24_hours"),
    ("precipitationLastHour", "precipitation_last_hour"),
    ("precipitationLast3Hours", "precipitation_last_3_hours"),
    ("precipitationLast6Hours", "precipitation_last_6_hours"),
    ("relativeHumidity", "relative_humidity"),
    ("windChill", "wind_chill"),
    ("heatIndex", "heat_index"),
];

/// `{"value", "unit"}` of an observed quantity, without the `wmoUnit:` prefix
fn observed(source: &Value, key: &str) -> Value {
    let unit = source
        .get(key)
        .and_then(|q| q.get("unitCode"))
        .and_then(Value::as_str)
        .unwrap_or("");
    json!({
        "value": quantity(source, key),
        "unit": unit.trim_start_matches("wmoUnit:")
    })
}

fn conditions(observation: &Value) -> Value {
    let mut out: Map<String, Value> = OBSERVED
        .iter()
        .map(|(from, to)| ((*to).to_string(), observed(observation, from)))
        .collect();
    out.insert(
        "cloud_layers".into(),
        observation.get("cloudLayers").cloned().unwrap_or_else(|| json!([])),
    );
    out.insert(
        "present_weather".into(),
        observation.get("presentWeather").cloned().unwrap_or_else(|| json!([])),
    );
    out.insert("text_description".into(), field(observation, "textDescription"));
    Value::Object(out)
}

/// Latest observation from the nearest station that has one
pub struct CurrentConditionsTool {
    ctx: ToolContext,
}

impl CurrentConditionsTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    async fn conditions(&self, args: PointArgs) -> SearchResult<Value> {
        let nws = &self.ctx.providers.nws;
        let points = fetch_point(&self.ctx, args.latitude, args.longitude).await?;
        let grid = GridPoint::from_points(&points)?;

        let stations = nws
            .fetch(ProviderRequest::new(format!(
                "gridpoints/{}/{},{}/stations",
                grid.office, grid.x, grid.y
            )))
            .await?;
        let features = stations
            .get("features")
            .and_then(Value::as_array)
            .filter(|features| !features.is_empty())
            .ok_or_else(|| {
                SearchError::no_results("nws", "No observation stations found for this location")
            })?;

        for feature in features.iter().take(STATIONS_TRIED) {
            let station = feature.get("properties").unwrap_or(&Value::Null);
            let Some(station_id) = station.get("stationIdentifier").and_then(Value::as_str) else {
                continue;
            };
            let body = match nws
                .fetch(ProviderRequest::new(format!(
                    "stations/{}/observations/latest",
                    station_id
                )))
                .await
            {
                Ok(body) => body,
                Err(e) => {
                    tracing::debug!(station = station_id, error = %e, "No observation from station");
                    continue;
                }
            };
            let Some(observation) = body.get("properties").filter(|p| p.is_object()) else {
                continue;
            };

            let mut fields = Map::new();
            fields.insert("location".into(), grid.location(args.latitude, args.longitude));
            fields.insert(
                "station".into(),
                json!({
                    "id": station_id,
                    "name": station.get("name").cloned().unwrap_or_else(|| json!("Unknown"))
                }),
            );
            fields.insert("observation_time".into(), field(observation, "timestamp"));
            fields.insert("conditions".into(), conditions(observation));
            let payload: WeatherPayload = build_payload("nws", fields)?;

            let search_id = SearchIdBuilder::new()
                .part("current")
                .coordinate(args.latitude)
                .coordinate(args.longitude)
                .build();
            let metadata = SearchMetadata::new(search_id)
                .with_type("current")
                .param("latitude", args.latitude)
                .param("longitude", args.longitude)
                .param("station", station_id);

            let record = SearchRecord::new(metadata, payload);
            self.ctx.store.put(&record).await?;
            return with_search_id(&record);
        }

        Err(SearchError::provider(
            "nws",
            "Unable to get current conditions from nearby stations",
        ))
    }
}

#[async_trait::async_trait]
impl Tool for CurrentConditionsTool {
    fn schema(&self) -> ToolSchema {
        schema(
            "get_current_conditions",
            "Get the latest National Weather Service station observation near a US location and store it",
            point_properties(),
            vec!["latitude", "longitude"],
        )
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let result = match parse_args::<PointArgs>(arguments) {
            Ok(args) => self.conditions(args).await,
            Err(e) => Err(e),
        };
        Ok(respond(result))
    }
}

fn active() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct AlertsArgs {
    /// Two-letter state or territory code
    #[serde(default)]
    area: Option<String>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    zone: Option<String>,
    #[serde(default)]
    point: Option<(f64, f64)>,
    #[serde(default = "active")]
    active_only: bool,
    #[serde(default)]
    urgency: Option<String>,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    certainty: Option<String>,
}

pub struct AlertsTool {
    ctx: ToolContext,
}

impl AlertsTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    async fn alerts(&self, args: AlertsArgs) -> SearchResult<Value> {
        let path = if args.active_only { "alerts/active" } else { "alerts" };
        let request = ProviderRequest::new(path)
            .optional("area", args.area.as_deref())
            .optional("region", args.region.as_deref())
            .optional("zone", args.zone.as_deref())
            .optional("point", args.point.map(|(lat, lon)| format!("{},{}", lat, lon)))
            .optional("urgency", args.urgency.as_deref())
            .optional("severity", args.severity.as_deref())
            .optional("certainty", args.certainty.as_deref());
        let body = self.ctx.providers.nws.fetch(request).await?;

        let alerts: Vec<Value> = body
            .get("features")
            .and_then(Value::as_array)
            .map(|features| features.iter().map(alert).collect())
            .unwrap_or_default();
        let parameters = json!({
            "area": args.area,
            "region": args.region,
            "zone": args.zone,
            "point": args.point,
            "active_only": args.active_only,
            "urgency": args.urgency,
            "severity": args.severity,
            "certainty": args.certainty
        });

        let mut fields = Map::new();
        fields.insert("search_parameters".into(), parameters.clone());
        fields.insert("total_alerts".into(), json!(alerts.len()));
        fields.insert("alerts".into(), Value::Array(alerts));
        let payload: WeatherPayload = build_payload("nws", fields)?;

        let search_id = SearchIdBuilder::new()
            .part("alerts")
            .part(args.area.as_deref().unwrap_or("all"))
            .build();
        let mut metadata = SearchMetadata::new(search_id).with_type("alerts");
        if let Value::Object(parameters) = parameters {
            metadata.params.extend(parameters);
        }

        let record = SearchRecord::new(metadata, payload);
        self.ctx.store.put(&record).await?;
        with_search_id(&record)
    }
}

#[async_trait::async_trait]
impl Tool for AlertsTool {
    fn schema(&self) -> ToolSchema {
        schema(
            "get_weather_alerts",
            "Get National Weather Service alerts for an area, zone or point and store them",
            json!({
                "area": json_schema_string("State or territory code, e.g. 'KS'"),
                "region": json_schema_string("Region code, e.g. 'US'"),
                "zone": json_schema_string("Zone id, e.g. 'ILZ014'"),
                "point": json_schema_array(json!({"type": "number"}), "[latitude, longitude]"),
                "active_only": json_schema_boolean("Only active alerts (default true)"),
                "urgency": json_schema_string("Immediate, Expected, Future, Past or Unknown"),
                "severity": json_schema_string("Extreme, Severe, Moderate, Minor or Unknown"),
                "certainty": json_schema_string("Observed, Likely, Possible, Unlikely or Unknown")
            }),
            vec![],
        )
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let result = match parse_args::<AlertsArgs>(arguments) {
            Ok(args) => self.alerts(args).await,
            Err(e) => Err(e),
        };
        Ok(respond(result))
    }
}

fn metric() -> String {
    "m".to_string()
}

fn en() -> String {
    "en".to_string()
}

fn five_days() -> u32 {
    5
}

#[derive(Debug, Deserialize)]
struct CurrentWeatherArgs {
    /// City name, "lat,lon", IP address or ZIP code
    location: String,
    /// m = Celsius, f = Fahrenheit, s = Kelvin
    #[serde(default = "metric")]
    units: String,
    #[serde(default = "en")]
    language: String,
}

/// Display units for a Weatherstack unit system
struct Units {
    temperature: &'static str,
    speed: &'static str,
    distance: &'static str,
}

impl Units {
    fn of(system: &str) -> Self {
        match system {
            "f" => Self {
                temperature: "°F",
                speed: "mph",
                distance: "miles",
            },
            "s" => Self {
                temperature: "K",
                speed: "km/h",
                distance: "km",
            },
            _ => Self {
                temperature: "°C",
                speed: "km/h",
                distance: "km",
            },
        }
    }
}

fn display(source: Option<&Value>, key: &str) -> String {
    match source.and_then(|s| s.get(key)) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Null) | None => "N/A".to_string(),
        Some(other) => other.to_string(),
    }
}

fn name_or_unknown<'a>(source: Option<&'a Value>, key: &str) -> &'a str {
    source
        .and_then(|s| s.get(key))
        .and_then(Value::as_str)
        .unwrap_or("Unknown")
}

/// Numeric reading that Weatherstack may send as a number or a string
fn reading(source: Option<&Value>, key: &str) -> Option<f64> {
    match source?.get(key)? {
        Value::String(text) => text.parse().ok(),
        other => other.as_f64(),
    }
}

/// Where a Weatherstack answer resolved the query to
fn place_summary(location: Option<&Value>) -> Value {
    json!({
        "name": name_or_unknown(location, "name"),
        "country": name_or_unknown(location, "country"),
        "region": name_or_unknown(location, "region"),
        "coordinates": format!("{}, {}", display(location, "lat"), display(location, "lon")),
        "local_time": display(location, "localtime"),
        "timezone": display(location, "timezone_id")
    })
}

/// Store a Weatherstack answer under `search_id`, keeping the given keys
async fn store_weatherstack(
    ctx: &ToolContext,
    body: &Value,
    keys: &[&str],
    metadata: SearchMetadata,
) -> SearchResult<SearchRecord<WeatherPayload>> {
    let mut fields = Map::new();
    for key in keys {
        let value = match body.get(*key) {
            Some(value) if !value.is_null() => value.clone(),
            _ => json!({}),
        };
        fields.insert((*key).into(), value);
    }
    let payload: WeatherPayload = build_payload("weatherstack", fields)?;
    let record = SearchRecord::new(metadata, payload);
    ctx.store.put(&record).await?;
    Ok(record)
}

pub struct CurrentWeatherTool {
    ctx: ToolContext,
}

impl CurrentWeatherTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    async fn fetch(&self, args: &CurrentWeatherArgs) -> SearchResult<SearchRecord<WeatherPayload>> {
        let request = ProviderRequest::new("current")
            .param("query", &args.location)
            .param("units", &args.units)
            .param("language", &args.language);
        let body = self.ctx.providers.weatherstack.fetch(request).await?;

        let search_id = SearchIdBuilder::new()
            .part("current")
            .part(&args.location)
            .build();
        let metadata = SearchMetadata::new(search_id)
            .with_type("current")
            .param("location_query", args.location.as_str())
            .param("units", args.units.as_str())
            .param("language", args.language.as_str());
        store_weatherstack(&self.ctx, &body, &["request", "location", "current"], metadata).await
    }

    async fn current(&self, args: CurrentWeatherArgs) -> SearchResult<Value> {
        let record = self.fetch(&args).await?;
        Ok(current_summary(&record, &args.units))
    }
}

fn current_summary(record: &SearchRecord<WeatherPayload>, units: &str) -> Value {
    let units = Units::of(units);
    let current = record.payload.current.as_ref();
    let description = current
        .and_then(|c| c.get("weather_descriptions"))
        .and_then(|d| d.get(0))
        .and_then(Value::as_str)
        .unwrap_or("N/A");

    json!({
        "search_id": record.id(),
        "location": place_summary(record.payload.location.as_ref()),
        "current_weather": {
            "temperature": format!("{}{}", display(current, "temperature"), units.temperature),
            "description": description,
            "feels_like": format!("{}{}", display(current, "feelslike"), units.temperature),
            "humidity": format!("{}%", display(current, "humidity")),
            "wind": format!(
                "{} {} {}",
                display(current, "wind_speed"),
                units.speed,
                current.and_then(|c| c.get("wind_dir")).and_then(Value::as_str).unwrap_or("")
            )
            .trim_end()
            .to_string(),
            "pressure": format!("{} mb", display(current, "pressure")),
            "visibility": format!("{} {}", display(current, "visibility"), units.distance),
            "uv_index": current.and_then(|c| c.get("uv_index")).cloned().unwrap_or_else(|| json!("N/A")),
            "cloud_cover": format!("{}%", display(current, "cloudcover"))
        },
        "air_quality": current.and_then(|c| c.get("air_quality")).cloned().unwrap_or_else(|| json!({})),
        "search_parameters": record.metadata
    })
}

#[async_trait::async_trait]
impl Tool for CurrentWeatherTool {
    fn schema(&self) -> ToolSchema {
        schema(
            "get_current_weather",
            "Get current weather for any location with Weatherstack and store it",
            json!({
                "location": json_schema_string("City name, 'lat,lon', IP address or ZIP code"),
                "units": json_schema_string("m = Celsius (default), f = Fahrenheit, s = Kelvin"),
                "language": json_schema_string("Language code (default 'en')")
            }),
            vec!["location"],
        )
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let result = match parse_args::<CurrentWeatherArgs>(arguments) {
            Ok(args) => self.current(args).await,
            Err(e) => Err(e),
        };
        Ok(respond(result))
    }
}

/// Forecast days Weatherstack serves
const FORECAST_DAYS: std::ops::RangeInclusive<u32> = 1..=14;

#[derive(Debug, Deserialize)]
struct DailyForecastArgs {
    location: String,
    #[serde(default = "five_days")]
    forecast_days: u32,
    #[serde(default)]
    hourly: bool,
    #[serde(default = "metric")]
    units: String,
    #[serde(default = "en")]
    language: String,
}

/// `first to last` over the dates of a forecast or historical map
fn date_range(days: &Value) -> String {
    let dates: Vec<&String> = days.as_object().map(|d| d.keys().collect()).unwrap_or_default();
    match (dates.iter().min(), dates.iter().max()) {
        (Some(first), Some(last)) => format!("{} to {}", first, last),
        _ => "N/A to N/A".to_string(),
    }
}

fn day_count(days: &Value) -> usize {
    days.as_object().map(Map::len).unwrap_or(0)
}

/// Multi-day Weatherstack forecast for any location
pub struct DailyForecastTool {
    ctx: ToolContext,
}

impl DailyForecastTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    async fn forecast(&self, args: DailyForecastArgs) -> SearchResult<Value> {
        if !FORECAST_DAYS.contains(&args.forecast_days) {
            return Err(SearchError::InvalidArguments(
                "forecast_days must be between 1 and 14".to_string(),
            ));
        }

        let request = ProviderRequest::new("forecast")
            .param("query", &args.location)
            .param("forecast_days", args.forecast_days)
            .param("hourly", u8::from(args.hourly))
            .param("units", &args.units)
            .param("language", &args.language);
        let body = self.ctx.providers.weatherstack.fetch(request).await?;

        let search_id = SearchIdBuilder::new()
            .part("forecast")
            .part(&args.location)
            .part(format!("{}d", args.forecast_days))
            .build();
        let metadata = SearchMetadata::new(search_id)
            .with_type("forecast")
            .param("location_query", args.location.as_str())
            .param("forecast_days", args.forecast_days)
            .param("hourly", args.hourly)
            .param("units", args.units.as_str())
            .param("language", args.language.as_str());
        let record = store_weatherstack(
            &self.ctx,
            &body,
            &["request", "location", "current", "forecast"],
            metadata,
        )
        .await?;

        let days = record.payload.extra.get("forecast").unwrap_or(&Value::Null);
        Ok(json!({
            "search_id": record.id(),
            "location": place_summary(record.payload.location.as_ref()),
            "forecast_summary": {
                "total_days": day_count(days),
                "date_range": date_range(days),
                "includes_hourly": args.hourly
            },
            "search_parameters": record.metadata
        }))
    }
}

#[async_trait::async_trait]
impl Tool for DailyForecastTool {
    fn schema(&self) -> ToolSchema {
        schema(
            "get_weatherstack_forecast",
            "Get a 1 to 14 day Weatherstack forecast for any location and store it",
            json!({
                "location": json_schema_string("City name, 'lat,lon', IP address or ZIP code"),
                "forecast_days": json_schema_integer("Days to forecast, 1 to 14 (default 5)"),
                "hourly": json_schema_boolean("Include hourly data (default false)"),
                "units": json_schema_string("m = Celsius (default), f = Fahrenheit, s = Kelvin"),
                "language": json_schema_string("Language code (default 'en')")
            }),
            vec!["location"],
        )
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let result = match parse_args::<DailyForecastArgs>(arguments) {
            Ok(args) => self.forecast(args).await,
            Err(e) => Err(e),
        };
        Ok(respond(result))
    }
}

#[derive(Debug, Deserialize)]
struct HistoricalArgs {
    location: String,
    /// `YYYY-MM-DD`
    date: String,
    #[serde(default)]
    end_date: Option<String>,
    #[serde(default)]
    hourly: bool,
    #[serde(default = "metric")]
    units: String,
    #[serde(default = "en")]
    language: String,
}

fn check_date(name: &str, value: &str) -> SearchResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        SearchError::InvalidArguments(format!("{} must be a YYYY-MM-DD date, got '{}'", name, value))
    })
}

/// Past weather for one day or a date range, from Weatherstack
pub struct HistoricalWeatherTool {
    ctx: ToolContext,
}

impl HistoricalWeatherTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    async fn historical(&self, args: HistoricalArgs) -> SearchResult<Value> {
        let start = check_date("date", &args.date)?;
        let end_date = args.end_date.as_deref().filter(|d| !d.is_empty());
        if let Some(end_date) = end_date {
            if check_date("end_date", end_date)? < start {
                return Err(SearchError::InvalidArguments(
                    "end_date must not be before date".to_string(),
                ));
            }
        }

        let request = ProviderRequest::new("historical")
            .param("query", &args.location)
            .param("hourly", u8::from(args.hourly))
            .param("units", &args.units)
            .param("language", &args.language);
        let request = match end_date {
            Some(end_date) => request
                .param("historical_date_start", &args.date)
                .param("historical_date_end", end_date),
            None => request.param("historical_date", &args.date),
        };
        let body = self.ctx.providers.weatherstack.fetch(request).await?;

        let range = match end_date {
            Some(end_date) => format!("{}_to_{}", args.date, end_date),
            None => args.date.clone(),
        };
        let search_id = SearchIdBuilder::new()
            .part("historical")
            .part(&args.location)
            .part(&range)
            .build();
        let metadata = SearchMetadata::new(search_id)
            .with_type("historical")
            .param("location_query", args.location.as_str())
            .param("start_date", args.date.as_str())
            .param("end_date", end_date)
            .param("hourly", args.hourly)
            .param("units", args.units.as_str())
            .param("language", args.language.as_str());
        let record = store_weatherstack(
            &self.ctx,
            &body,
            &["request", "location", "current", "historical"],
            metadata,
        )
        .await?;

        let days = record.payload.extra.get("historical").unwrap_or(&Value::Null);
        Ok(json!({
            "search_id": record.id(),
            "location": place_summary(record.payload.location.as_ref()),
            "historical_summary": {
                "total_days": day_count(days),
                "date_range": range.replace("_to_", " to "),
                "includes_hourly": args.hourly
            },
            "search_parameters": record.metadata
        }))
    }
}

#[async_trait::async_trait]
impl Tool for HistoricalWeatherTool {
    fn schema(&self) -> ToolSchema {
        schema(
            "get_historical_weather",
            "Get past weather for a date or date range from Weatherstack and store it",
            json!({
                "location": json_schema_string("City name, 'lat,lon', IP address or ZIP code"),
                "date": json_schema_string("Day in YYYY-MM-DD format, back to 2015"),
                "end_date": json_schema_string("Last day of a date range (optional)"),
                "hourly": json_schema_boolean("Include hourly data (default false)"),
                "units": json_schema_string("m = Celsius (default), f = Fahrenheit, s = Kelvin"),
                "language": json_schema_string("Language code (default 'en')")
            }),
            vec!["location", "date"],
        )
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let result = match parse_args::<HistoricalArgs>(arguments) {
            Ok(args) => self.historical(args).await,
            Err(e) => Err(e),
        };
        Ok(respond(result))
    }
}

/// Locations one comparison accepts
const COMPARED_LOCATIONS: std::ops::RangeInclusive<usize> = 2..=10;

#[derive(Debug, Deserialize)]
struct CompareArgs {
    locations: Vec<String>,
    #[serde(default = "metric")]
    units: String,
    #[serde(default = "en")]
    language: String,
}

/// Location holding the highest (or lowest) reading seen so far
#[derive(Debug, Default)]
struct Extreme {
    best: Option<(String, f64)>,
}

impl Extreme {
    fn offer(&mut self, location: &str, value: Option<f64>, better: fn(f64, f64) -> bool) {
        let Some(value) = value else { return };
        if self.best.as_ref().map_or(true, |(_, best)| better(value, *best)) {
            self.best = Some((location.to_string(), value));
        }
    }

    fn to_json(&self, key: &str) -> Value {
        match &self.best {
            Some((location, value)) => json!({"location": location, key: value}),
            None => Value::Null,
        }
    }
}

/// Current weather side by side for several locations. Each lookup is stored
/// as its own current-weather record; the comparison itself is not.
pub struct CompareWeatherTool {
    current: CurrentWeatherTool,
}

impl CompareWeatherTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self {
            current: CurrentWeatherTool::new(ctx),
        }
    }

    async fn compare(&self, args: CompareArgs) -> SearchResult<Value> {
        if args.locations.len() < *COMPARED_LOCATIONS.start() {
            return Err(SearchError::InvalidArguments(
                "At least 2 locations required for comparison".to_string(),
            ));
        }
        if args.locations.len() > *COMPARED_LOCATIONS.end() {
            return Err(SearchError::InvalidArguments(
                "Maximum 10 locations allowed for comparison".to_string(),
            ));
        }

        let mut hottest = Extreme::default();
        let mut coldest = Extreme::default();
        let mut windiest = Extreme::default();
        let mut most_humid = Extreme::default();
        let mut entries = Vec::with_capacity(args.locations.len());

        for location in &args.locations {
            let lookup = CurrentWeatherArgs {
                location: location.clone(),
                units: args.units.clone(),
                language: args.language.clone(),
            };
            let record = match self.current.fetch(&lookup).await {
                Ok(record) => record,
                Err(e) => {
                    entries.push(json!({
                        "location": location,
                        "error": format!("[{}] {}", e.kind(), e)
                    }));
                    continue;
                }
            };

            let summary = current_summary(&record, &args.units);
            let current = record.payload.current.as_ref();
            let name = name_or_unknown(record.payload.location.as_ref(), "name");
            hottest.offer(name, reading(current, "temperature"), |a, b| a > b);
            coldest.offer(name, reading(current, "temperature"), |a, b| a < b);
            windiest.offer(name, reading(current, "wind_speed"), |a, b| a > b);
            most_humid.offer(name, reading(current, "humidity"), |a, b| a > b);

            let weather = &summary["current_weather"];
            entries.push(json!({
                "location": name,
                "country": summary["location"]["country"],
                "search_id": record.id(),
                "temperature": weather["temperature"],
                "description": weather["description"],
                "feels_like": weather["feels_like"],
                "humidity": weather["humidity"],
                "wind": weather["wind"],
                "pressure": weather["pressure"],
                "local_time": summary["location"]["local_time"]
            }));
        }

        Ok(json!({
            "comparison_timestamp": Utc::now().to_rfc3339(),
            "units": args.units,
            "language": args.language,
            "locations": entries,
            "summary": {
                "hottest": hottest.to_json("temperature"),
                "coldest": coldest.to_json("temperature"),
                "windiest": windiest.to_json("wind_speed"),
                "most_humid": most_humid.to_json("humidity")
            }
        }))
    }
}

#[async_trait::async_trait]
impl Tool for CompareWeatherTool {
    fn schema(&self) -> ToolSchema {
        schema(
            "compare_weather",
            "Compare current Weatherstack weather across 2 to 10 locations",
            json!({
                "locations": json_schema_array(json!({"type": "string"}), "Locations to compare"),
                "units": json_schema_string("m = Celsius (default), f = Fahrenheit, s = Kelvin"),
                "language": json_schema_string("Language code (default 'en')")
            }),
            vec!["locations"],
        )
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let result = match parse_args::<CompareArgs>(arguments) {
            Ok(args) => self.compare(args).await,
            Err(e) => Err(e),
        };
        Ok(respond(result))
    }
}

impl FilterSpec for ForecastConditionsFilter {
    const NAME: &'static str = "filter_forecast_by_conditions";
    const DESCRIPTION: &'static str =
        "Filter the periods of a stored forecast by temperature, precipitation chance and wind speed";

    fn properties() -> Value {
        json!({
            "min_temp": json_schema_number("Minimum temperature, inclusive"),
            "max_temp": json_schema_number("Maximum temperature, inclusive"),
            "max_precipitation_chance": json_schema_number("Maximum precipitation chance in percent"),
            "wind_speed_threshold": json_schema_string("Highest acceptable wind, e.g. '15 mph'")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::stub::StubProvider;
    use crate::tools::testing::{context, error_text, json_of};
    use wayfarer_core::SearchId;

    fn points() -> Value {
        json!({
            "properties": {
                "gridId": "TOP",
                "cwa": "TOP",
                "gridX": 32,
                "gridY": 81,
                "relativeLocation": {"properties": {"city": "Linn", "state": "KS"}}
            }
        })
    }

    #[tokio::test]
    async fn test_forecast_resolves_grid_then_fetches_periods() {
        let stub = StubProvider::new();
        stub.respond(Ok(points()));
        stub.respond(Ok(json!({
            "properties": {
                "updated": "2025-06-01T10:00:00Z",
                "periods": [{
                    "number": 1,
                    "name": "Tonight",
                    "isDaytime": false,
                    "temperature": 61,
                    "temperatureUnit": "F",
                    "probabilityOfPrecipitation": {"unitCode": "wmoUnit:percent", "value": 20},
                    "windSpeed": "5 to 10 mph",
                    "shortForecast": "Partly Cloudy"
                }]
            }
        })));
        let ctx = context(&stub);
        let tool = ForecastTool::new(ctx.clone());

        let result = json_of(
            &tool
                .execute(json!({"latitude": 39.7456, "longitude": -97.0892, "hourly": true}))
                .await
                .unwrap(),
        );
        let search_id = result["search_id"].as_str().unwrap().to_string();
        assert!(search_id.starts_with("forecast_hourly_39_7456_-97_0892_"));
        assert_eq!(result["location"]["city"], "Linn");
        assert_eq!(result["forecast_type"], "hourly");
        assert_eq!(result["periods"][0]["probability_of_precipitation"], 20);
        assert_eq!(result["periods"][0]["is_daytime"], false);

        let requests = stub.requests();
        assert_eq!(requests[0].path, "points/39.7456,-97.0892");
        assert_eq!(requests[1].path, "gridpoints/TOP/32,81/forecast/hourly");

        let record = ctx
            .store
            .get::<WeatherPayload>(&SearchId::new(search_id))
            .await
            .unwrap();
        assert_eq!(record.payload.periods()[0].short_forecast.as_deref(), Some("Partly Cloudy"));
        assert_eq!(record.payload.periods()[0].precipitation_chance(), Some(20.0));
    }

    #[tokio::test]
    async fn test_forecast_without_grid_is_provider_error() {
        let stub = StubProvider::new();
        stub.respond(Ok(json!({"properties": {"cwa": "TOP"}})));
        let ctx = context(&stub);
        let tool = ForecastTool::new(ctx.clone());

        let result = tool
            .execute(json!({"latitude": 0.0, "longitude": 0.0}))
            .await
            .unwrap();
        assert!(error_text(&result).contains("Invalid grid coordinates"));
        assert_eq!(stub.requests().len(), 1);
        assert!(ctx.store.list(Namespace::Weather).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_alerts() {
        let stub = StubProvider::new();
        stub.respond(Ok(json!({
            "features": [{
                "properties": {
                    "id": "urn:oid:1",
                    "event": "Tornado Warning",
                    "severity": "Extreme",
                    "areaDesc": "Riley, KS",
                    "messageType": "Alert"
                }
            }]
        })));
        let ctx = context(&stub);
        let tool = AlertsTool::new(ctx.clone());

        let result = json_of(
            &tool
                .execute(json!({"area": "KS", "severity": "Extreme"}))
                .await
                .unwrap(),
        );
        assert!(result["search_id"].as_str().unwrap().starts_with("alerts_ks_"));
        assert_eq!(result["total_alerts"], 1);
        assert_eq!(result["alerts"][0]["area_desc"], "Riley, KS");
        assert_eq!(result["alerts"][0]["message_type"], "Alert");

        let request = &stub.requests()[0];
        assert_eq!(request.path, "alerts/active");
        assert_eq!(request.get("area"), Some("KS"));
        assert_eq!(request.get("severity"), Some("Extreme"));
        assert_eq!(request.get("zone"), None);

        let stored = ctx.store.list(Namespace::Weather).await.unwrap();
        assert_eq!(stored[0].1.search_type.as_deref(), Some("alerts"));
        assert_eq!(stored[0].1.text("area"), Some("KS"));
    }

    #[tokio::test]
    async fn test_current_weather() {
        let stub = StubProvider::new();
        stub.respond(Ok(json!({
            "request": {"query": "London, United Kingdom", "unit": "f"},
            "location": {"name": "London", "country": "United Kingdom", "lat": "51.517", "lon": "-0.106"},
            "current": {
                "temperature": 59,
                "weather_descriptions": ["Partly cloudy"],
                "wind_speed": 8,
                "wind_dir": "WSW",
                "humidity": 72
            }
        })));
        let ctx = context(&stub);
        let tool = CurrentWeatherTool::new(ctx.clone());

        let summary = json_of(
            &tool
                .execute(json!({"location": "London", "units": "f"}))
                .await
                .unwrap(),
        );
        assert!(summary["search_id"].as_str().unwrap().starts_with("current_london_"));
        assert_eq!(summary["location"]["coordinates"], "51.517, -0.106");
        assert_eq!(summary["current_weather"]["temperature"], "59°F");
        assert_eq!(summary["current_weather"]["wind"], "8 mph WSW");
        assert_eq!(summary["current_weather"]["pressure"], "N/A mb");
        assert_eq!(summary["current_weather"]["description"], "Partly cloudy");
        assert_eq!(summary["search_parameters"]["location_query"], "London");

        let request = &stub.requests()[0];
        assert_eq!(request.path, "current");
        assert_eq!(request.get("query"), Some("London"));
        assert_eq!(request.get("units"), Some("f"));
    }

    #[tokio::test]
    async fn test_location_info_is_stored() {
        let stub = StubProvider::new();
        stub.respond(Ok(json!({
            "properties": {
                "cwa": "TOP",
                "gridX": 32,
                "gridY": 81,
                "forecast": "https://api.weather.gov/gridpoints/TOP/32,81/forecast",
                "observationStations": "https://api.weather.gov/gridpoints/TOP/32,81/stations",
                "timeZone": "America/Chicago",
                "relativeLocation": {"properties": {"city": "Linn", "state": "KS"}}
            }
        })));
        let ctx = context(&stub);
        let tool = LocationInfoTool::new(ctx.clone());

        let result = json_of(
            &tool
                .execute(json!({"latitude": 39.7456, "longitude": -97.0892}))
                .await
                .unwrap(),
        );
        let search_id = result["search_id"].as_str().unwrap().to_string();
        assert!(search_id.starts_with("location_39_7456_-97_0892_"));
        assert_eq!(result["grid"]["office"], "TOP");
        assert_eq!(result["location"]["state"], "KS");
        assert_eq!(result["time_zone"], "America/Chicago");
        assert_eq!(result["forecast_endpoints"]["forecast_hourly"], Value::Null);

        let record = ctx
            .store
            .get::<WeatherPayload>(&SearchId::new(search_id))
            .await
            .unwrap();
        assert_eq!(record.metadata.search_type.as_deref(), Some("location"));
        assert!(record.payload.extra.contains_key("observation_stations"));
    }

    #[tokio::test]
    async fn test_current_conditions_falls_through_to_next_station() {
        let stub = StubProvider::new();
        stub.respond(Ok(points()));
        stub.respond(Ok(json!({
            "features": [
                {"properties": {"stationIdentifier": "KMHK", "name": "Manhattan Regional Airport"}},
                {"properties": {"stationIdentifier": "KMYZ", "name": "Marysville Municipal Airport"}}
            ]
        })));
        stub.respond(Err(SearchError::provider("nws", "HTTP 404: no observations")));
        stub.respond(Ok(json!({
            "properties": {
                "timestamp": "2025-06-01T09:55:00+00:00",
                "textDescription": "Clear",
                "temperature": {"unitCode": "wmoUnit:degC", "value": 21.5},
                "relativeHumidity": {"unitCode": "wmoUnit:percent", "value": 64.2}
            }
        })));
        let ctx = context(&stub);
        let tool = CurrentConditionsTool::new(ctx.clone());

        let result = json_of(
            &tool
                .execute(json!({"latitude": 39.7456, "longitude": -97.0892}))
                .await
                .unwrap(),
        );
        assert!(result["search_id"]
            .as_str()
            .unwrap()
            .starts_with("current_39_7456_-97_0892_"));
        assert_eq!(result["station"]["id"], "KMYZ");
        assert_eq!(result["conditions"]["temperature"], json!({"value": 21.5, "unit": "degC"}));
        assert_eq!(result["conditions"]["wind_speed"], json!({"value": null, "unit": ""}));
        assert_eq!(result["conditions"]["text_description"], "Clear");

        let paths: Vec<String> = stub.requests().into_iter().map(|r| r.path).collect();
        assert_eq!(
            paths,
            vec![
                "points/39.7456,-97.0892",
                "gridpoints/TOP/32,81/stations",
                "stations/KMHK/observations/latest",
                "stations/KMYZ/observations/latest",
            ]
        );
        let stored = ctx.store.list(Namespace::Weather).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].1.text("station"), Some("KMYZ"));
    }

    #[tokio::test]
    async fn test_current_conditions_without_stations() {
        let stub = StubProvider::new();
        stub.respond(Ok(points()));
        stub.respond(Ok(json!({"features": []})));
        let ctx = context(&stub);
        let tool = CurrentConditionsTool::new(ctx.clone());

        let result = tool
            .execute(json!({"latitude": 39.7456, "longitude": -97.0892}))
            .await
            .unwrap();
        let text = error_text(&result);
        assert!(text.contains("[no_results]"));
        assert!(text.contains("No observation stations found"));
        assert!(ctx.store.list(Namespace::Weather).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_weatherstack_forecast() {
        let stub = StubProvider::new();
        stub.respond(Ok(json!({
            "request": {"type": "City", "query": "London, United Kingdom"},
            "location": {"name": "London", "country": "United Kingdom", "lat": "51.517", "lon": "-0.106"},
            "current": {"temperature": 13},
            "forecast": {
                "2025-06-03": {"mintemp": 11, "maxtemp": 19},
                "2025-06-02": {"mintemp": 10, "maxtemp": 18},
                "2025-06-04": {"mintemp": 12, "maxtemp": 21}
            }
        })));
        let ctx = context(&stub);
        let tool = DailyForecastTool::new(ctx.clone());

        let summary = json_of(
            &tool
                .execute(json!({"location": "London", "forecast_days": 3}))
                .await
                .unwrap(),
        );
        let search_id = summary["search_id"].as_str().unwrap().to_string();
        assert!(search_id.starts_with("forecast_london_3d_"));
        assert_eq!(summary["forecast_summary"]["total_days"], 3);
        assert_eq!(summary["forecast_summary"]["date_range"], "2025-06-02 to 2025-06-04");
        assert_eq!(summary["location"]["name"], "London");

        let request = &stub.requests()[0];
        assert_eq!(request.path, "forecast");
        assert_eq!(request.get("forecast_days"), Some("3"));
        assert_eq!(request.get("hourly"), Some("0"));

        let record = ctx
            .store
            .get::<WeatherPayload>(&SearchId::new(search_id))
            .await
            .unwrap();
        assert_eq!(record.payload.days("forecast").len(), 3);
        assert_eq!(record.payload.days("forecast")[0].0, "2025-06-02");
    }

    #[tokio::test]
    async fn test_weatherstack_forecast_day_bounds() {
        let stub = StubProvider::new();
        let tool = DailyForecastTool::new(context(&stub));

        let result = tool
            .execute(json!({"location": "London", "forecast_days": 15}))
            .await
            .unwrap();
        assert!(error_text(&result).contains("forecast_days must be between 1 and 14"));
        assert!(stub.requests().is_empty());
    }

    #[tokio::test]
    async fn test_historical_range() {
        let stub = StubProvider::new();
        stub.respond(Ok(json!({
            "location": {"name": "Paris", "country": "France"},
            "historical": {
                "2025-01-01": {"avgtemp": 4},
                "2025-01-02": {"avgtemp": 5}
            }
        })));
        let ctx = context(&stub);
        let tool = HistoricalWeatherTool::new(ctx.clone());

        let summary = json_of(
            &tool
                .execute(json!({"location": "Paris", "date": "2025-01-01", "end_date": "2025-01-02"}))
                .await
                .unwrap(),
        );
        assert!(summary["search_id"]
            .as_str()
            .unwrap()
            .starts_with("historical_paris_2025-01-01_to_2025-01-02_"));
        assert_eq!(summary["historical_summary"]["total_days"], 2);
        assert_eq!(summary["historical_summary"]["date_range"], "2025-01-01 to 2025-01-02");
        assert_eq!(summary["search_parameters"]["end_date"], "2025-01-02");

        let request = &stub.requests()[0];
        assert_eq!(request.path, "historical");
        assert_eq!(request.get("historical_date_start"), Some("2025-01-01"));
        assert_eq!(request.get("historical_date_end"), Some("2025-01-02"));
        assert_eq!(request.get("historical_date"), None);
    }

    #[tokio::test]
    async fn test_historical_rejects_bad_dates() {
        let stub = StubProvider::new();
        let tool = HistoricalWeatherTool::new(context(&stub));

        let result = tool
            .execute(json!({"location": "Paris", "date": "01/02/2025"}))
            .await
            .unwrap();
        assert!(error_text(&result).contains("[invalid_arguments]"));

        let result = tool
            .execute(json!({"location": "Paris", "date": "2025-01-05", "end_date": "2025-01-01"}))
            .await
            .unwrap();
        assert!(error_text(&result).contains("end_date must not be before date"));
        assert!(stub.requests().is_empty());
    }

    #[tokio::test]
    async fn test_compare_weather() {
        let stub = StubProvider::new();
        stub.respond(Ok(json!({
            "location": {"name": "Madrid", "country": "Spain"},
            "current": {"temperature": 31, "humidity": 20, "wind_speed": 9, "weather_descriptions": ["Sunny"]}
        })));
        stub.respond(Err(SearchError::provider("weatherstack", "API Error 615: request failed")));
        stub.respond(Ok(json!({
            "location": {"name": "Oslo", "country": "Norway"},
            "current": {"temperature": "12", "humidity": 81, "wind_speed": 22}
        })));
        let ctx = context(&stub);
        let tool = CompareWeatherTool::new(ctx.clone());

        let comparison = json_of(
            &tool
                .execute(json!({"locations": ["Madrid", "Atlantis", "Oslo"]}))
                .await
                .unwrap(),
        );
        let locations = comparison["locations"].as_array().unwrap();
        assert_eq!(locations.len(), 3);
        assert_eq!(locations[0]["temperature"], "31°C");
        assert!(locations[1]["error"].as_str().unwrap().starts_with("[provider_unavailable]"));
        assert_eq!(comparison["summary"]["hottest"], json!({"location": "Madrid", "temperature": 31.0}));
        assert_eq!(comparison["summary"]["coldest"], json!({"location": "Oslo", "temperature": 12.0}));
        assert_eq!(comparison["summary"]["windiest"]["location"], "Oslo");
        assert_eq!(comparison["summary"]["most_humid"]["humidity"], 81.0);

        assert_eq!(ctx.store.list(Namespace::Weather).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_compare_weather_location_count() {
        let stub = StubProvider::new();
        let tool = CompareWeatherTool::new(context(&stub));

        let result = tool.execute(json!({"locations": ["Madrid"]})).await.unwrap();
        assert!(error_text(&result).contains("At least 2 locations"));

        let many: Vec<String> = (0..11).map(|i| format!("City {}", i)).collect();
        let result = tool.execute(json!({"locations": many})).await.unwrap();
        assert!(error_text(&result).contains("Maximum 10 locations"));
        assert!(stub.requests().is_empty());
    }
}
