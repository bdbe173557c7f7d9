pub mod events;
pub mod finance;
pub mod flights;
pub mod geocode;
pub mod hotels;
pub mod records;
mod registry;
pub mod weather;

pub use records::{FilterSpec, FilterTool, GetDetailsTool, ListSearchesTool, SearchDetailTool};
pub use registry::{
    json_schema_array, json_schema_boolean, json_schema_integer, json_schema_number,
    json_schema_object, json_schema_string, Tool, ToolRegistry,
};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use wayfarer_core::{Catalog, FilterEngine, NamespacedPayload, ResultStore, SearchError, SearchResult};

use crate::config::LimitsConfig;
use crate::protocol::CallToolResult;
use crate::providers::Providers;

/// Handles shared by every tool
#[derive(Clone)]
pub struct ToolContext {
    pub store: ResultStore,
    pub engine: FilterEngine,
    pub catalog: Catalog,
    pub providers: Providers,
    pub limits: LimitsConfig,
}

impl ToolContext {
    pub fn new(store: ResultStore, providers: Providers, limits: LimitsConfig) -> Self {
        Self {
            engine: FilterEngine::new(store.clone()),
            catalog: Catalog::new(store.clone()),
            store,
            providers,
            limits,
        }
    }
}

/// Register every namespace's tools
pub fn register_all(registry: &mut ToolRegistry, ctx: &ToolContext) {
    flights::register(registry, ctx);
    hotels::register(registry, ctx);
    events::register(registry, ctx);
    finance::register(registry, ctx);
    weather::register(registry, ctx);
    geocode::register(registry, ctx);
}

/// Decode tool arguments; absent arguments count as an empty object
pub(crate) fn parse_args<T: DeserializeOwned>(arguments: Value) -> SearchResult<T> {
    let arguments = match arguments {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };
    serde_json::from_value(arguments).map_err(|e| SearchError::InvalidArguments(e.to_string()))
}

/// Convert a store/filter/provider outcome into a tool result. Errors become
/// `isError` results naming the error kind.
pub(crate) fn respond<T: Serialize>(result: SearchResult<T>) -> CallToolResult {
    match result.and_then(|value| {
        serde_json::to_string_pretty(&value).map_err(|e| SearchError::Unexpected(e.to_string()))
    }) {
        Ok(text) => CallToolResult::text(text),
        Err(e) => failure(&e),
    }
}

pub(crate) fn respond_text(result: SearchResult<String>) -> CallToolResult {
    match result {
        Ok(text) => CallToolResult::text(text),
        Err(e) => failure(&e),
    }
}

fn failure(error: &SearchError) -> CallToolResult {
    if error.is_not_found() {
        tracing::debug!(error = %error, "Tool target not found");
    } else {
        tracing::warn!(kind = error.kind(), error = %error, "Tool call failed");
    }
    CallToolResult::error(format!("[{}] {}", error.kind(), error))
}

/// Build a typed payload from selected provider fields. Unknown fields are
/// kept verbatim.
pub(crate) fn build_payload<P: NamespacedPayload>(provider: &str, fields: Map<String, Value>) -> SearchResult<P> {
    serde_json::from_value(Value::Object(fields)).map_err(|e| {
        SearchError::Unexpected(format!("Unexpected {} response shape: {}", provider, e))
    })
}

/// A list field of a provider body, truncated; missing or non-list yields `[]`
pub(crate) fn list_field(body: &Value, key: &str, max: usize) -> Value {
    match body.get(key) {
        Some(Value::Array(items)) => Value::Array(items.iter().take(max).cloned().collect()),
        _ => Value::Array(Vec::new()),
    }
}

pub(crate) fn field(body: &Value, key: &str) -> Value {
    body.get(key).cloned().unwrap_or(Value::Null)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::providers::stub::StubProvider;
    use std::sync::Arc;

    pub fn context(stub: &Arc<StubProvider>) -> ToolContext {
        ToolContext::new(
            ResultStore::in_memory(),
            Providers::uniform(stub.clone()),
            LimitsConfig::default(),
        )
    }

    /// Text of a successful result as JSON
    pub fn json_of(result: &CallToolResult) -> Value {
        assert_ne!(result.is_error, Some(true), "{}", result.joined_text());
        serde_json::from_str(&result.joined_text()).unwrap()
    }

    pub fn error_text(result: &CallToolResult) -> String {
        assert_eq!(result.is_error, Some(true));
        result.joined_text()
    }
}
