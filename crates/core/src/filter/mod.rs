//! Derived views over stored records.
//!
//! Filtering reads a record and returns a new transient view; the stored
//! record is never modified.

pub mod criteria;
pub mod predicates;

pub use criteria::NumericRange;
pub use predicates::*;

use serde::{Deserialize, Serialize};

use crate::error::SearchResult;
use crate::payload::GeocodePayload;
use crate::records::{NamespacedPayload, SearchRecord};
use crate::storage::ResultStore;
use crate::types::SearchId;

/// A check over one item of a record's list field
pub trait Predicate<T> {
    fn matches(&self, item: &T) -> bool;
}

/// A predicate bound to the list field(s) of one namespace's payload
pub trait RecordFilter: Serialize + Send + Sync {
    type Payload: NamespacedPayload;
    type Output: Serialize;

    /// Produce the filtered lists and the number of items they hold
    fn apply(&self, id: &SearchId, payload: &Self::Payload) -> SearchResult<(Self::Output, usize)>;
}

pub(crate) fn retain<T: Clone, P: Predicate<T> + ?Sized>(items: &[T], predicate: &P) -> Vec<T> {
    items
        .iter()
        .filter(|item| predicate.matches(item))
        .cloned()
        .collect()
}

/// Filter result: the filtered lists plus an echo of the filter parameters
#[derive(Debug, Clone, Serialize)]
pub struct FilteredView<F, R> {
    pub search_id: SearchId,
    pub filters_applied: F,
    #[serde(flatten)]
    pub results: R,
    pub total_filtered: usize,
}

fn default_max_results() -> usize {
    10
}

/// Substring search across every stored geocoding record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationQuery {
    pub query: String,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Predicate<GeocodePayload> for LocationQuery {
    fn matches(&self, payload: &GeocodePayload) -> bool {
        let needle = self.query.to_lowercase();
        payload
            .query
            .iter()
            .map(String::as_str)
            .chain(payload.display_names())
            .any(|text| text.to_lowercase().contains(&needle))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LocationMatches {
    pub query: String,
    pub matches_found: usize,
    pub results: Vec<SearchRecord<GeocodePayload>>,
}

/// Applies filters to records read from a [`ResultStore`]
#[derive(Clone)]
pub struct FilterEngine {
    store: ResultStore,
}

impl FilterEngine {
    pub fn new(store: ResultStore) -> Self {
        Self { store }
    }

    /// Filter one stored record. A missing record is `NotFound`, never an
    /// empty view.
    pub async fn apply<F: RecordFilter>(
        &self,
        id: &SearchId,
        filter: F,
    ) -> SearchResult<FilteredView<F, F::Output>> {
        let record = self.store.get::<F::Payload>(id).await?;
        let (results, total_filtered) = filter.apply(id, &record.payload)?;

        let namespace = <F::Payload as NamespacedPayload>::NAMESPACE;
        tracing::debug!(
            namespace = %namespace,
            search_id = %id,
            total_filtered,
            "Filtered record"
        );

        Ok(FilteredView {
            search_id: id.clone(),
            filters_applied: filter,
            results,
            total_filtered,
        })
    }

    /// Newest matching geocoding records first, at most `max_results`.
    pub async fn search_locations(&self, query: &LocationQuery) -> SearchResult<LocationMatches> {
        let mut matches: Vec<SearchRecord<GeocodePayload>> = self
            .store
            .list_records::<GeocodePayload>()
            .await?
            .into_iter()
            .filter(|record| query.matches(&record.payload))
            .collect();
        matches.sort_by(|a, b| b.metadata.search_timestamp.cmp(&a.metadata.search_timestamp));

        let matches_found = matches.len();
        matches.truncate(query.max_results);

        Ok(LocationMatches {
            query: query.query.clone(),
            matches_found,
            results: matches,
        })
    }
}
