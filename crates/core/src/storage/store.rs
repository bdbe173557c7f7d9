use bytes::Bytes;
use std::sync::Arc;

use super::backend::StorageBackend;
use super::memory::MemoryBackend;
use crate::error::{SearchError, SearchResult};
use crate::payload::Payload;
use crate::records::{NamespacedPayload, SearchMetadata, SearchRecord};
use crate::types::{Namespace, SearchId};

/// Persists and retrieves search records over an explicit backend handle.
///
/// Records are written once and never updated in place; readers treat them
/// as immutable.
#[derive(Clone)]
pub struct ResultStore {
    backend: Arc<dyn StorageBackend>,
}

impl ResultStore {
    pub fn new(backend: impl StorageBackend + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    pub fn from_backend(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    /// Serialize a record as pretty-printed JSON and store it under its id.
    pub async fn put<P: NamespacedPayload>(&self, record: &SearchRecord<P>) -> SearchResult<()> {
        let namespace = P::NAMESPACE;
        let id = record.id();
        let data = serde_json::to_vec_pretty(record)
            .map_err(|e| SearchError::Unexpected(format!("Failed to serialize record: {}", e)))?;

        let replaced = self.backend.write(namespace, id, Bytes::from(data)).await?;
        if replaced {
            tracing::warn!(
                namespace = %namespace,
                search_id = %id,
                "Replaced an existing record with the same identifier"
            );
        }
        tracing::info!(namespace = %namespace, search_id = %id, "Stored search results");
        Ok(())
    }

    pub async fn get<P: NamespacedPayload>(&self, id: &SearchId) -> SearchResult<SearchRecord<P>> {
        let namespace = P::NAMESPACE;
        let data = self.read_existing(namespace, id).await?;
        serde_json::from_slice(&data).map_err(|e| SearchError::corrupt(namespace, id, e))
    }

    /// Read a record whose namespace is only known at runtime.
    pub async fn get_any(
        &self,
        namespace: Namespace,
        id: &SearchId,
    ) -> SearchResult<SearchRecord<Payload>> {
        let data = self.read_existing(namespace, id).await?;
        Payload::decode(namespace, &data).map_err(|e| SearchError::corrupt(namespace, id, e))
    }

    /// Every readable record of a payload type, sorted by id.
    /// Corrupt entries are skipped with a warning.
    pub async fn list_records<P: NamespacedPayload>(&self) -> SearchResult<Vec<SearchRecord<P>>> {
        let namespace = P::NAMESPACE;
        let mut records = Vec::new();
        for id in self.sorted_keys(namespace).await? {
            match self.get::<P>(&id).await {
                Ok(record) => records.push(record),
                Err(e) => skip(namespace, &id, &e),
            }
        }
        Ok(records)
    }

    pub async fn list_any(&self, namespace: Namespace) -> SearchResult<Vec<SearchRecord<Payload>>> {
        let mut records = Vec::new();
        for id in self.sorted_keys(namespace).await? {
            match self.get_any(namespace, &id).await {
                Ok(record) => records.push(record),
                Err(e) => skip(namespace, &id, &e),
            }
        }
        Ok(records)
    }

    /// Ids and metadata of every readable record in a namespace.
    pub async fn list(&self, namespace: Namespace) -> SearchResult<Vec<(SearchId, SearchMetadata)>> {
        Ok(self
            .list_any(namespace)
            .await?
            .into_iter()
            .map(|record| (record.metadata.search_id.clone(), record.metadata))
            .collect())
    }

    async fn read_existing(&self, namespace: Namespace, id: &SearchId) -> SearchResult<Bytes> {
        tracing::debug!(namespace = %namespace, search_id = %id, "Reading record");
        self.backend
            .read(namespace, id)
            .await?
            .ok_or_else(|| SearchError::not_found(namespace, id))
    }

    async fn sorted_keys(&self, namespace: Namespace) -> SearchResult<Vec<SearchId>> {
        let mut keys = self.backend.keys(namespace).await?;
        keys.sort();
        Ok(keys)
    }
}

fn skip(namespace: Namespace, id: &SearchId, error: &SearchError) {
    tracing::warn!(
        namespace = %namespace,
        search_id = %id,
        error = %error,
        "Skipping unreadable record"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{EventResult, EventsPayload, FlightOffer, FlightsPayload};
    use crate::storage::{FilesystemBackend, RedbBackend};
    use chrono::TimeZone;
    use serde_json::json;
    use tempfile::TempDir;

    fn flight_record(id: &str) -> SearchRecord<FlightsPayload> {
        let metadata = SearchMetadata::new(SearchId::new(id))
            .with_timestamp(chrono::Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap())
            .param("departure", "LAX")
            .param("arrival", "CDG")
            .param("return_date", serde_json::Value::Null);
        let payload = FlightsPayload {
            best_flights: vec![FlightOffer {
                price: Some(120.into()),
                ..Default::default()
            }],
            ..Default::default()
        };
        SearchRecord::new(metadata, payload)
    }

    async fn round_trip(store: ResultStore) {
        let record = flight_record("lax_cdg_2025-06-01_20250102_030405");
        store.put(&record).await.unwrap();

        let loaded: SearchRecord<FlightsPayload> = store.get(record.id()).await.unwrap();
        assert_eq!(loaded, record);

        let any = store.get_any(Namespace::Flights, record.id()).await.unwrap();
        assert_eq!(any.payload.namespace(), Namespace::Flights);
        assert_eq!(any.metadata, record.metadata);
    }

    #[tokio::test]
    async fn test_round_trip_memory() {
        round_trip(ResultStore::in_memory()).await;
    }

    #[tokio::test]
    async fn test_round_trip_filesystem() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FilesystemBackend::new(temp_dir.path().to_path_buf()).unwrap();
        round_trip(ResultStore::new(backend)).await;

        let text = std::fs::read_to_string(
            temp_dir
                .path()
                .join("flights/lax_cdg_2025-06-01_20250102_030405.json"),
        )
        .unwrap();
        assert!(text.contains("\n  \"search_metadata\": {"));
        assert!(text.contains("\"best_flights\""));
    }

    #[tokio::test]
    async fn test_round_trip_redb() {
        let temp_dir = TempDir::new().unwrap();
        let backend = RedbBackend::new(temp_dir.path().join("store.redb")).unwrap();
        round_trip(ResultStore::new(backend)).await;
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let store = ResultStore::in_memory();
        let err = store
            .get::<FlightsPayload>(&SearchId::new("never_written"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "No flight search found with ID: never_written");
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let store = ResultStore::in_memory();
        let record = flight_record("shared_id");
        store.put(&record).await.unwrap();

        let err = store
            .get::<EventsPayload>(&SearchId::new("shared_id"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(store.list(Namespace::Events).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_empty_namespace() {
        let temp_dir = TempDir::new().unwrap();
        let store = ResultStore::new(FilesystemBackend::new(temp_dir.path().to_path_buf()).unwrap());
        assert!(store.list(Namespace::Hotels).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_skips_corrupt_records() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FilesystemBackend::new(temp_dir.path().to_path_buf()).unwrap();
        let store = ResultStore::new(backend.clone());

        let metadata = SearchMetadata::new(SearchId::new("jazz_global_20250102_030405"))
            .param("query", "jazz");
        let record = SearchRecord::new(
            metadata,
            EventsPayload {
                events_results: vec![EventResult {
                    title: Some("Jazz Night".to_string()),
                    ..Default::default()
                }],
                ..Default::default()
            },
        );
        store.put(&record).await.unwrap();
        backend
            .write(
                Namespace::Events,
                &SearchId::new("broken_20250102_030405"),
                Bytes::from("{ not json"),
            )
            .await
            .unwrap();

        let listed = store.list(Namespace::Events).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].0.as_str(), "jazz_global_20250102_030405");
        assert_eq!(listed[0].1.text("query"), Some("jazz"));

        let err = store
            .get::<EventsPayload>(&SearchId::new("broken_20250102_030405"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "corrupt");
    }

    #[tokio::test]
    async fn test_overwrite_same_identifier() {
        let store = ResultStore::in_memory();
        let mut record = flight_record("same_second");
        store.put(&record).await.unwrap();

        record.metadata = record.metadata.param("departure", "SFO");
        store.put(&record).await.unwrap();

        let loaded: SearchRecord<FlightsPayload> = store.get(record.id()).await.unwrap();
        assert_eq!(loaded.metadata.text("departure"), Some("SFO"));
        assert_eq!(store.list(Namespace::Flights).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stored_layout() {
        let store = ResultStore::in_memory();
        store.put(&flight_record("layout")).await.unwrap();
        let any = store
            .get_any(Namespace::Flights, &SearchId::new("layout"))
            .await
            .unwrap();
        let value = serde_json::to_value(&any).unwrap();
        assert_eq!(value["search_metadata"]["departure"], "LAX");
        assert_eq!(value["search_metadata"]["return_date"], json!(null));
        assert_eq!(value["best_flights"][0]["price"], 120);
        assert_eq!(value["other_flights"], json!([]));
    }
}
