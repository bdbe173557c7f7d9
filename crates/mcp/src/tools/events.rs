// Event discovery over SerpAPI's Google Events engine

use anyhow::Result;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use wayfarer_core::filter::{EventDateFilter, EventTypeFilter, VenueFilter};
use wayfarer_core::payload::EventsPayload;
use wayfarer_core::{Namespace, SearchIdBuilder, SearchMetadata, SearchRecord, SearchResult};

use super::{
    build_payload, field, json_schema_array, json_schema_integer, json_schema_object,
    json_schema_string, list_field, parse_args, respond, FilterSpec, FilterTool, GetDetailsTool,
    ListSearchesTool, SearchDetailTool, Tool, ToolContext, ToolRegistry,
};
use crate::protocol::{CallToolResult, ToolSchema};
use crate::providers::ProviderRequest;

const SAMPLE_EVENTS: usize = 3;

pub fn register(registry: &mut ToolRegistry, ctx: &ToolContext) {
    registry.register(Arc::new(SearchEventsTool::new(ctx.clone())));
    registry.register(Arc::new(GetDetailsTool::new(
        "get_event_details",
        Namespace::Events,
        ctx.store.clone(),
    )));
    registry.register(Arc::new(FilterTool::<EventDateFilter>::new(ctx.engine.clone())));
    registry.register(Arc::new(FilterTool::<EventTypeFilter>::new(ctx.engine.clone())));
    registry.register(Arc::new(FilterTool::<VenueFilter>::new(ctx.engine.clone())));
    registry.register(Arc::new(ListSearchesTool::new(
        "list_event_searches",
        Namespace::Events,
        ctx.catalog.clone(),
    )));
    registry.register(Arc::new(SearchDetailTool::new(
        "get_event_search_detail",
        Namespace::Events,
        ctx.catalog.clone(),
    )));
}

fn en() -> String {
    "en".to_string()
}

fn us() -> String {
    "us".to_string()
}

#[derive(Debug, Deserialize)]
struct SearchEventsArgs {
    query: String,
    #[serde(default)]
    location: Option<String>,
    /// today, tomorrow, week, weekend, next_week, month, next_month
    #[serde(default)]
    date_filter: Option<String>,
    #[serde(default)]
    event_type: Option<String>,
    #[serde(default = "en")]
    language: String,
    #[serde(default = "us")]
    country: String,
    #[serde(default)]
    max_results: Option<usize>,
}

impl SearchEventsArgs {
    fn location(&self) -> Option<&str> {
        self.location.as_deref().filter(|l| !l.trim().is_empty())
    }

    fn date_filter(&self) -> Option<&str> {
        self.date_filter.as_deref().filter(|d| !d.is_empty())
    }

    fn event_type(&self) -> Option<&str> {
        self.event_type.as_deref().filter(|t| !t.is_empty())
    }

    fn provider_query(&self) -> String {
        match self.location() {
            Some(location) => format!("{} in {}", self.query, location),
            None => self.query.clone(),
        }
    }

    /// Google's `htichips` chip list, e.g. `date:weekend,event_type:Virtual-Event`
    fn chips(&self) -> Option<String> {
        let chips: Vec<String> = [
            self.date_filter().map(|d| format!("date:{}", d)),
            self.event_type().map(|t| format!("event_type:{}", t)),
        ]
        .into_iter()
        .flatten()
        .collect();
        (!chips.is_empty()).then(|| chips.join(","))
    }
}

pub struct SearchEventsTool {
    ctx: ToolContext,
}

impl SearchEventsTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    async fn search(&self, args: SearchEventsArgs) -> SearchResult<Value> {
        let request = ProviderRequest::new("search")
            .param("engine", "google_events")
            .param("q", args.provider_query())
            .param("hl", &args.language)
            .param("gl", &args.country)
            .optional("htichips", args.chips());
        let body = self.ctx.providers.serpapi.fetch(request).await?;

        let max = args.max_results.unwrap_or(self.ctx.limits.events);
        let mut fields = Map::new();
        fields.insert("search_parameters".into(), field(&body, "search_parameters"));
        fields.insert("search_information".into(), field(&body, "search_information"));
        fields.insert("events_results".into(), list_field(&body, "events_results", max));
        let payload: EventsPayload = build_payload("serpapi", fields)?;

        let search_id = SearchIdBuilder::new()
            .part(&args.query)
            .part(args.location().unwrap_or("global"))
            .optional(args.date_filter())
            .optional(args.event_type())
            .build();
        let metadata = SearchMetadata::new(search_id.clone())
            .param("query", args.query.as_str())
            .param("location", args.location())
            .param("date_filter", args.date_filter())
            .param("event_type", args.event_type())
            .param("language", args.language.as_str())
            .param("country", args.country.as_str())
            .param("total_results", payload.events_results.len());

        let record = SearchRecord::new(metadata, payload);
        self.ctx.store.put(&record).await?;

        let sample_events: Vec<Value> = record
            .payload
            .events_results
            .iter()
            .take(SAMPLE_EVENTS)
            .map(|event| {
                json!({
                    "title": event.title.as_deref().unwrap_or("N/A"),
                    "date": event.when().unwrap_or("N/A"),
                    "venue": event.venue_name().unwrap_or("N/A")
                })
            })
            .collect();

        Ok(json!({
            "search_id": search_id,
            "total_events": record.payload.events_results.len(),
            "query": args.query.as_str(),
            "location": args.location(),
            "filters_applied": {
                "date_filter": args.date_filter(),
                "event_type": args.event_type()
            },
            "sample_events": sample_events,
            "search_parameters": record.metadata
        }))
    }
}

#[async_trait::async_trait]
impl Tool for SearchEventsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "search_events".to_string(),
            description: "Search for events with Google Events and store the results".to_string(),
            input_schema: json_schema_object(
                json!({
                    "query": json_schema_string("What to look for, e.g. 'concerts' or 'art shows'"),
                    "location": json_schema_string("Where to look, e.g. 'Austin'; omitted means global"),
                    "date_filter": json_schema_string("today, tomorrow, week, weekend, next_week, month or next_month"),
                    "event_type": json_schema_string("Event type chip, e.g. 'Virtual-Event'"),
                    "language": json_schema_string("Language code (default 'en')"),
                    "country": json_schema_string("Country code (default 'us')"),
                    "max_results": json_schema_integer("Maximum events to store")
                }),
                vec!["query"],
            ),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let result = match parse_args::<SearchEventsArgs>(arguments) {
            Ok(args) => self.search(args).await,
            Err(e) => Err(e),
        };
        Ok(respond(result))
    }
}

impl FilterSpec for EventDateFilter {
    const NAME: &'static str = "filter_events_by_date";
    const DESCRIPTION: &'static str =
        "Filter stored events whose 'when' text contains the given date text; both criteria must match when both are given";

    fn properties() -> Value {
        json!({
            "date_range": json_schema_string("Date text to look for, e.g. 'Dec'"),
            "specific_date": json_schema_string("Exact date text, e.g. 'Dec 14'")
        })
    }
}

impl FilterSpec for EventTypeFilter {
    const NAME: &'static str = "filter_events_by_type";
    const DESCRIPTION: &'static str =
        "Filter stored events whose title or description mentions any of the keywords";

    fn properties() -> Value {
        json!({
            "event_types": json_schema_array(json!({"type": "string"}), "Keywords, e.g. ['jazz', 'festival']")
        })
    }

    fn required() -> Vec<&'static str> {
        vec!["event_types"]
    }
}

impl FilterSpec for VenueFilter {
    const NAME: &'static str = "filter_events_by_venue";
    const DESCRIPTION: &'static str =
        "Filter stored events whose venue name contains any of the given names";

    fn properties() -> Value {
        json!({
            "venue_names": json_schema_array(json!({"type": "string"}), "Venue names or fragments")
        })
    }

    fn required() -> Vec<&'static str> {
        vec!["venue_names"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::stub::StubProvider;
    use crate::tools::testing::{context, json_of};

    #[tokio::test]
    async fn test_search_events() {
        let stub = StubProvider::new();
        stub.respond(Ok(json!({
            "search_parameters": {"q": "jazz in Austin"},
            "events_results": [
                {"title": "Jazz Night", "date": {"when": "Fri, Dec 13, 8 PM"}, "venue": {"name": "Elephant Room"}},
                {"title": "Food Fair"},
                {"title": "Blues Brunch"},
                {"title": "Art Walk"}
            ]
        })));
        let ctx = context(&stub);
        let tool = SearchEventsTool::new(ctx.clone());

        let summary = json_of(
            &tool
                .execute(json!({"query": "jazz", "location": "Austin", "date_filter": "weekend"}))
                .await
                .unwrap(),
        );
        assert!(summary["search_id"]
            .as_str()
            .unwrap()
            .starts_with("jazz_austin_weekend_"));
        assert_eq!(summary["total_events"], 4);
        assert_eq!(summary["sample_events"].as_array().unwrap().len(), 3);
        assert_eq!(summary["sample_events"][0]["venue"], "Elephant Room");
        assert_eq!(summary["sample_events"][1]["date"], "N/A");
        assert_eq!(summary["filters_applied"]["event_type"], Value::Null);
        assert_eq!(summary["search_parameters"]["total_results"], 4);

        let request = &stub.requests()[0];
        assert_eq!(request.get("q"), Some("jazz in Austin"));
        assert_eq!(request.get("htichips"), Some("date:weekend"));
    }

    #[tokio::test]
    async fn test_global_search_without_chips() {
        let stub = StubProvider::new();
        stub.respond(Ok(json!({"events_results": null})));
        let tool = SearchEventsTool::new(context(&stub));

        let summary = json_of(&tool.execute(json!({"query": "art shows"})).await.unwrap());
        assert!(summary["search_id"]
            .as_str()
            .unwrap()
            .starts_with("art_shows_global_"));
        assert_eq!(summary["total_events"], 0);

        let request = &stub.requests()[0];
        assert_eq!(request.get("q"), Some("art shows"));
        assert_eq!(request.get("htichips"), None);
    }
}
