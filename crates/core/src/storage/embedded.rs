use anyhow::{Context, Result};
use bytes::Bytes;
use redb::{Database, ReadableTable, TableDefinition};
use std::path::PathBuf;
use std::sync::Arc;

use super::backend::StorageBackend;
use crate::error::{SearchError, SearchResult};
use crate::types::{Namespace, SearchId};

const FLIGHTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("flights");
const HOTELS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("hotels");
const EVENTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("events");
const FINANCE_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("finance");
const WEATHER_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("weather_data");
const GEOCODE_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("geocoded_locations");

fn table_for(namespace: Namespace) -> TableDefinition<'static, &'static str, &'static [u8]> {
    match namespace {
        Namespace::Flights => FLIGHTS_TABLE,
        Namespace::Hotels => HOTELS_TABLE,
        Namespace::Events => EVENTS_TABLE,
        Namespace::Finance => FINANCE_TABLE,
        Namespace::Weather => WEATHER_TABLE,
        Namespace::Geocode => GEOCODE_TABLE,
    }
}

fn storage_error(e: anyhow::Error) -> SearchError {
    SearchError::storage(format!("{:#}", e))
}

/// One table per namespace in an embedded redb database
#[derive(Clone)]
pub struct RedbBackend {
    db: Arc<Database>,
}

impl RedbBackend {
    pub fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }

        let db = Database::create(&path).context("Failed to create redb database")?;

        // Create every table up front so read transactions never miss one
        let write_txn = db.begin_write().context("Failed to begin write transaction")?;
        for namespace in Namespace::ALL {
            write_txn
                .open_table(table_for(namespace))
                .with_context(|| format!("Failed to open {} table", namespace.storage_name()))?;
        }
        write_txn.commit().context("Failed to commit transaction")?;

        Ok(Self { db: Arc::new(db) })
    }

    fn insert(&self, namespace: Namespace, id: &SearchId, data: &[u8]) -> Result<bool> {
        let write_txn = self.db.begin_write().context("Failed to begin write")?;
        let replaced = {
            let mut table = write_txn
                .open_table(table_for(namespace))
                .context("Failed to open table")?;
            let previous = table
                .insert(id.as_str(), data)
                .context("Failed to insert record")?;
            previous.is_some()
        };
        write_txn.commit().context("Failed to commit")?;
        Ok(replaced)
    }

    fn fetch(&self, namespace: Namespace, id: &SearchId) -> Result<Option<Bytes>> {
        let read_txn = self.db.begin_read().context("Failed to begin read")?;
        let table = read_txn
            .open_table(table_for(namespace))
            .context("Failed to open table")?;

        let value = table.get(id.as_str()).context("Failed to get record")?;
        Ok(value.map(|guard| Bytes::copy_from_slice(guard.value())))
    }

    fn all_keys(&self, namespace: Namespace) -> Result<Vec<SearchId>> {
        let read_txn = self.db.begin_read().context("Failed to begin read")?;
        let table = read_txn
            .open_table(table_for(namespace))
            .context("Failed to open table")?;

        let mut keys = Vec::new();
        for item in table.iter().context("Failed to iterate records")? {
            let (key, _value) = item.context("Failed to read item")?;
            keys.push(SearchId::new(key.value()));
        }
        Ok(keys)
    }
}

#[async_trait::async_trait]
impl StorageBackend for RedbBackend {
    async fn write(&self, namespace: Namespace, id: &SearchId, data: Bytes) -> SearchResult<bool> {
        self.insert(namespace, id, &data).map_err(storage_error)
    }

    async fn read(&self, namespace: Namespace, id: &SearchId) -> SearchResult<Option<Bytes>> {
        self.fetch(namespace, id).map_err(storage_error)
    }

    async fn keys(&self, namespace: Namespace) -> SearchResult<Vec<SearchId>> {
        self.all_keys(namespace).map_err(storage_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_redb_backend() {
        let temp_dir = TempDir::new().unwrap();
        let backend = RedbBackend::new(temp_dir.path().join("wayfarer.redb")).unwrap();
        let id = SearchId::new("stock_googl_20250102_030405");

        assert!(!backend
            .write(Namespace::Finance, &id, Bytes::from("{}"))
            .await
            .unwrap());
        assert!(backend
            .write(Namespace::Finance, &id, Bytes::from("{\"b\":2}"))
            .await
            .unwrap());

        let data = backend.read(Namespace::Finance, &id).await.unwrap().unwrap();
        assert_eq!(data, Bytes::from("{\"b\":2}"));
        assert!(backend.read(Namespace::Events, &id).await.unwrap().is_none());

        assert_eq!(backend.keys(Namespace::Finance).await.unwrap(), vec![id]);
        assert!(backend.keys(Namespace::Geocode).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reopen_keeps_records() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("wayfarer.redb");
        let id = SearchId::new("paris_20250102_030405");

        {
            let backend = RedbBackend::new(path.clone()).unwrap();
            backend
                .write(Namespace::Geocode, &id, Bytes::from("{}"))
                .await
                .unwrap();
        }

        let backend = RedbBackend::new(path).unwrap();
        assert!(backend.read(Namespace::Geocode, &id).await.unwrap().is_some());
    }
}
