use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::backend::StorageBackend;
use crate::error::SearchResult;
use crate::types::{Namespace, SearchId};

/// Process-local backend, used by tests and ephemeral servers
#[derive(Clone, Default)]
pub struct MemoryBackend {
    records: Arc<RwLock<HashMap<(Namespace, SearchId), Bytes>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl StorageBackend for MemoryBackend {
    async fn write(&self, namespace: Namespace, id: &SearchId, data: Bytes) -> SearchResult<bool> {
        let mut records = self.records.write().await;
        Ok(records.insert((namespace, id.clone()), data).is_some())
    }

    async fn read(&self, namespace: Namespace, id: &SearchId) -> SearchResult<Option<Bytes>> {
        let records = self.records.read().await;
        Ok(records.get(&(namespace, id.clone())).cloned())
    }

    async fn keys(&self, namespace: Namespace) -> SearchResult<Vec<SearchId>> {
        let records = self.records.read().await;
        Ok(records
            .keys()
            .filter(|(ns, _)| *ns == namespace)
            .map(|(_, id)| id.clone())
            .collect())
    }
}
