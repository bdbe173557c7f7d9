//! Human-readable digests of stored searches.
//!
//! Rendering never raises for a missing or malformed record; only storage
//! failures propagate.

pub mod digests;
pub mod render;

pub use digests::Digest;
pub use render::Doc;

use crate::error::{SearchError, SearchResult};
use crate::ids::TIMESTAMP_FORMAT;
use crate::storage::ResultStore;
use crate::types::{Namespace, SearchId};

/// Search tools named in the empty-namespace hint
fn search_tools(namespace: Namespace) -> &'static str {
    match namespace {
        Namespace::Flights => "search_flights tool to search for flights",
        Namespace::Hotels => "search_hotels tool to search for hotels",
        Namespace::Events => "search_events tool to search for events",
        Namespace::Finance => {
            "lookup_stock, convert_currency, get_market_overview or get_historical_data tools to run a finance search"
        }
        Namespace::Weather => {
            "get_weather_forecast, get_weather_alerts, get_current_weather, get_current_conditions or get_weatherstack_forecast tools to fetch weather data"
        }
        Namespace::Geocode => {
            "geocode_location, reverse_geocode or batch_geocode tools to look up a location"
        }
    }
}

/// Lists and describes stored records as markdown
#[derive(Clone)]
pub struct Catalog {
    store: ResultStore,
}

impl Catalog {
    pub fn new(store: ResultStore) -> Self {
        Self { store }
    }

    /// Digest of every readable record in a namespace, newest first.
    pub async fn summarize(&self, namespace: Namespace) -> SearchResult<String> {
        let mut records = self.store.list_any(namespace).await?;
        if records.is_empty() {
            return Ok(format!(
                "No {} searches found.\n\nUse the {}.\n",
                namespace.noun(),
                search_tools(namespace)
            ));
        }
        records.sort_by(|a, b| b.metadata.search_timestamp.cmp(&a.metadata.search_timestamp));

        let mut doc = Doc::new();
        doc.heading(1, format!("{} Searches", namespace.title()))
            .blank()
            .line(format!("Total searches: {}", records.len()))
            .blank();
        for record in &records {
            doc.heading(2, record.id());
            record.payload.summary(&record.metadata, &mut doc);
            doc.field(
                "Search Time",
                record.metadata.search_timestamp.format(TIMESTAMP_FORMAT),
            )
            .blank()
            .rule();
        }

        tracing::debug!(namespace = %namespace, records = records.len(), "Summarized namespace");
        Ok(doc.finish())
    }

    /// Bounded rendering of one record.
    pub async fn detail(&self, namespace: Namespace, id: &SearchId) -> SearchResult<String> {
        let record = match self.store.get_any(namespace, id).await {
            Ok(record) => record,
            Err(SearchError::NotFound { .. }) => {
                return Ok(format!(
                    "# {} Search Not Found: {}\n\nNo {} search found with this ID.\n",
                    namespace.title(),
                    id,
                    namespace.noun()
                ));
            }
            Err(SearchError::Corrupt { reason, .. }) => {
                tracing::warn!(namespace = %namespace, search_id = %id, %reason, "Corrupted record");
                return Ok(format!(
                    "# Error\n\nCorrupted {} data for search ID: {}\n",
                    namespace.noun(),
                    id
                ));
            }
            Err(e) => return Err(e),
        };

        let mut doc = Doc::new();
        doc.heading(1, format!("{} Search: {}", namespace.title(), id))
            .blank();
        record.payload.detail(&record.metadata, &mut doc);
        doc.field(
            "Search Time",
            record.metadata.search_timestamp.format(TIMESTAMP_FORMAT),
        );
        Ok(doc.finish())
    }
}
