use bytes::Bytes;

use crate::error::SearchResult;
use crate::types::{Namespace, SearchId};

/// Key-value medium under the [`ResultStore`](super::ResultStore).
///
/// Values are opaque serialized records; every namespace is an isolated
/// key space.
#[async_trait::async_trait]
pub trait StorageBackend: Send + Sync {
    /// Write a value atomically, returning whether an existing value was replaced
    async fn write(&self, namespace: Namespace, id: &SearchId, data: Bytes) -> SearchResult<bool>;

    /// Read a value, `None` if nothing is stored under the id
    async fn read(&self, namespace: Namespace, id: &SearchId) -> SearchResult<Option<Bytes>>;

    /// All ids stored in a namespace, in no particular order
    async fn keys(&self, namespace: Namespace) -> SearchResult<Vec<SearchId>>;
}
