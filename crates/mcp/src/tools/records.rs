//! Tools every namespace shares: full-record retrieval, filtering, and the
//! catalog listing/detail digests.

use std::marker::PhantomData;

use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use wayfarer_core::filter::RecordFilter;
use wayfarer_core::{Catalog, FilterEngine, Namespace, ResultStore, SearchId};

use super::{json_schema_object, json_schema_string, parse_args, respond, respond_text, Tool};
use crate::protocol::{CallToolResult, ToolSchema};

#[derive(Debug, Deserialize)]
struct SearchIdArgs {
    search_id: String,
}

fn search_id_schema(namespace: Namespace) -> Value {
    json_schema_object(
        json!({
            "search_id": json_schema_string(&format!(
                "The search ID returned by a {} search",
                namespace.noun()
            ))
        }),
        vec!["search_id"],
    )
}

/// Returns a stored record as pretty-printed JSON
pub struct GetDetailsTool {
    name: &'static str,
    namespace: Namespace,
    store: ResultStore,
}

impl GetDetailsTool {
    pub fn new(name: &'static str, namespace: Namespace, store: ResultStore) -> Self {
        Self { name, namespace, store }
    }
}

#[async_trait::async_trait]
impl Tool for GetDetailsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name.to_string(),
            description: format!(
                "Get the full stored results of a {} search as JSON",
                self.namespace.noun()
            ),
            input_schema: search_id_schema(self.namespace),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let result = match parse_args::<SearchIdArgs>(arguments) {
            Ok(args) => self.store.get_any(self.namespace, &SearchId::new(args.search_id)).await,
            Err(e) => Err(e),
        };
        Ok(respond(result))
    }
}

/// Markdown digest of every stored search in a namespace
pub struct ListSearchesTool {
    name: &'static str,
    namespace: Namespace,
    catalog: Catalog,
}

impl ListSearchesTool {
    pub fn new(name: &'static str, namespace: Namespace, catalog: Catalog) -> Self {
        Self { name, namespace, catalog }
    }
}

#[async_trait::async_trait]
impl Tool for ListSearchesTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name.to_string(),
            description: format!("List all stored {} searches", self.namespace.noun()),
            input_schema: json_schema_object(json!({}), vec![]),
        }
    }

    async fn execute(&self, _arguments: Value) -> Result<CallToolResult> {
        Ok(respond_text(self.catalog.summarize(self.namespace).await))
    }
}

/// Bounded markdown rendering of one stored search
pub struct SearchDetailTool {
    name: &'static str,
    namespace: Namespace,
    catalog: Catalog,
}

impl SearchDetailTool {
    pub fn new(name: &'static str, namespace: Namespace, catalog: Catalog) -> Self {
        Self { name, namespace, catalog }
    }
}

#[async_trait::async_trait]
impl Tool for SearchDetailTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name.to_string(),
            description: format!(
                "Get a readable summary of one stored {} search",
                self.namespace.noun()
            ),
            input_schema: search_id_schema(self.namespace),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let result = match parse_args::<SearchIdArgs>(arguments) {
            Ok(args) => self.catalog.detail(self.namespace, &SearchId::new(args.search_id)).await,
            Err(e) => Err(e),
        };
        Ok(respond_text(result))
    }
}

/// Tool surface of a record filter
pub trait FilterSpec: RecordFilter + DeserializeOwned + 'static {
    const NAME: &'static str;
    const DESCRIPTION: &'static str;

    /// JSON schema properties of the filter parameters
    fn properties() -> Value;

    fn required() -> Vec<&'static str> {
        Vec::new()
    }
}

#[derive(Deserialize)]
struct FilterArgs<F> {
    search_id: String,
    #[serde(flatten)]
    filter: F,
}

/// Applies a [`FilterSpec`] to one stored record
pub struct FilterTool<F> {
    engine: FilterEngine,
    _filter: PhantomData<fn() -> F>,
}

impl<F: FilterSpec> FilterTool<F> {
    pub fn new(engine: FilterEngine) -> Self {
        Self {
            engine,
            _filter: PhantomData,
        }
    }
}

#[async_trait::async_trait]
impl<F: FilterSpec> Tool for FilterTool<F> {
    fn schema(&self) -> ToolSchema {
        let mut properties = json!({
            "search_id": json_schema_string("The search ID of the stored results to filter")
        });
        if let (Some(target), Value::Object(extra)) = (properties.as_object_mut(), F::properties()) {
            target.extend(extra);
        }
        let mut required = vec!["search_id"];
        required.extend(F::required());

        ToolSchema {
            name: F::NAME.to_string(),
            description: F::DESCRIPTION.to_string(),
            input_schema: json_schema_object(properties, required),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let result = match parse_args::<FilterArgs<F>>(arguments) {
            Ok(args) => self.engine.apply(&SearchId::new(args.search_id), args.filter).await,
            Err(e) => Err(e),
        };
        Ok(respond(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{error_text, json_of};
    use wayfarer_core::filter::FlightPriceFilter;
    use wayfarer_core::payload::FlightsPayload;
    use wayfarer_core::{SearchMetadata, SearchRecord};

    async fn fixture() -> ResultStore {
        let store = ResultStore::in_memory();
        let payload: FlightsPayload = serde_json::from_value(json!({
            "best_flights": [{"price": 120, "carbon": 7}, {"price": 450}],
            "other_flights": []
        }))
        .unwrap();
        let metadata = SearchMetadata::new(SearchId::new("lax_cdg"))
            .param("departure", "LAX")
            .param("arrival", "CDG");
        store.put(&SearchRecord::new(metadata, payload)).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_get_details_returns_full_record() {
        let tool = GetDetailsTool::new("get_flight_details", Namespace::Flights, fixture().await);
        let record = json_of(&tool.execute(json!({"search_id": "lax_cdg"})).await.unwrap());
        assert_eq!(record["search_metadata"]["departure"], "LAX");
        // Unknown provider fields survive
        assert_eq!(record["best_flights"][0]["carbon"], 7);

        let result = tool.execute(json!({"search_id": "missing"})).await.unwrap();
        assert!(error_text(&result).contains("No flight search found with ID: missing"));

        let result = tool.execute(json!({})).await.unwrap();
        assert!(error_text(&result).contains("invalid_arguments"));
    }

    #[tokio::test]
    async fn test_filter_tool() {
        let tool = FilterTool::<FlightPriceFilter>::new(FilterEngine::new(fixture().await));
        let schema = tool.schema();
        assert_eq!(schema.name, "filter_flights_by_price");
        assert!(schema.input_schema["properties"]["max_price"].is_object());
        assert_eq!(schema.input_schema["required"], json!(["search_id"]));

        let view = json_of(
            &tool
                .execute(json!({"search_id": "lax_cdg", "max_price": 200}))
                .await
                .unwrap(),
        );
        assert_eq!(view["total_filtered"], 1);
        assert_eq!(view["filters_applied"]["max_price"], 200.0);
        assert_eq!(view["filtered_best_flights"][0]["price"], 120);

        let result = tool.execute(json!({"search_id": "missing"})).await.unwrap();
        assert!(error_text(&result).contains("[not_found]"));
    }

    #[tokio::test]
    async fn test_catalog_tools() {
        let store = fixture().await;
        let list = ListSearchesTool::new("list_flight_searches", Namespace::Flights, Catalog::new(store.clone()));
        let text = list.execute(Value::Null).await.unwrap().joined_text();
        assert!(text.contains("## lax_cdg"));

        let detail = SearchDetailTool::new("get_flight_search_detail", Namespace::Flights, Catalog::new(store));
        let text = detail
            .execute(json!({"search_id": "missing"}))
            .await
            .unwrap()
            .joined_text();
        assert!(text.starts_with("# Flight Search Not Found: missing"));
    }
}
