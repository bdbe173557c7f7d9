use anyhow::{Context, Result};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use super::backend::StorageBackend;
use crate::error::{SearchError, SearchResult};
use crate::types::{Namespace, SearchId};

const RECORD_EXTENSION: &str = "json";

/// One `<id>.json` file per record under `<base>/<namespace>/`
#[derive(Clone)]
pub struct FilesystemBackend {
    base_path: PathBuf,
}

impl FilesystemBackend {
    pub fn new(base_path: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&base_path).context("Failed to create data directory")?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn namespace_dir(&self, namespace: Namespace) -> PathBuf {
        self.base_path.join(namespace.storage_name())
    }

    fn record_path(&self, namespace: Namespace, id: &SearchId) -> PathBuf {
        self.namespace_dir(namespace)
            .join(format!("{}.{}", id.as_str(), RECORD_EXTENSION))
    }

    async fn write_atomic(&self, namespace: Namespace, id: &SearchId, data: &[u8]) -> Result<bool> {
        let dir = self.namespace_dir(namespace);
        tokio::fs::create_dir_all(&dir)
            .await
            .context("Failed to create namespace directory")?;

        let path = self.record_path(namespace, id);
        let tmp_path = dir.join(format!(".{}.{}.tmp", id.as_str(), uuid::Uuid::new_v4()));

        let mut file = tokio::fs::File::create(&tmp_path)
            .await
            .context("Failed to create temporary record file")?;
        if let Err(e) = write_all_synced(&mut file, data).await {
            drop(file);
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e);
        }
        drop(file);

        let replaced = tokio::fs::try_exists(&path).await.unwrap_or(false);
        if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e).context("Failed to move record into place");
        }

        Ok(replaced)
    }
}

async fn write_all_synced(file: &mut tokio::fs::File, data: &[u8]) -> Result<()> {
    file.write_all(data).await.context("Failed to write record")?;
    file.sync_all().await.context("Failed to sync record")?;
    Ok(())
}

/// Reject ids that would escape the namespace directory or collide with
/// temporary files.
fn is_safe_key(id: &SearchId) -> bool {
    let key = id.as_str();
    !key.is_empty()
        && !key.starts_with('.')
        && !key.contains('/')
        && !key.contains('\\')
        && !key.contains("..")
        && !key.contains('\0')
}

#[async_trait::async_trait]
impl StorageBackend for FilesystemBackend {
    async fn write(&self, namespace: Namespace, id: &SearchId, data: Bytes) -> SearchResult<bool> {
        if !is_safe_key(id) {
            return Err(SearchError::InvalidArguments(format!(
                "Invalid search identifier: {}",
                id
            )));
        }

        self.write_atomic(namespace, id, &data)
            .await
            .map_err(|e| SearchError::storage(format!("{:#}", e)))
    }

    async fn read(&self, namespace: Namespace, id: &SearchId) -> SearchResult<Option<Bytes>> {
        // An id that cannot name a file cannot have been written.
        if !is_safe_key(id) {
            return Ok(None);
        }

        match tokio::fs::read(self.record_path(namespace, id)).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SearchError::storage(format!("Failed to read record: {}", e))),
        }
    }

    async fn keys(&self, namespace: Namespace) -> SearchResult<Vec<SearchId>> {
        let mut entries = match tokio::fs::read_dir(self.namespace_dir(namespace)).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(SearchError::storage(format!(
                    "Failed to list namespace directory: {}",
                    e
                )))
            }
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SearchError::storage(format!("Failed to read directory entry: {}", e)))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if stem.starts_with('.') {
                continue;
            }
            keys.push(SearchId::new(stem));
        }

        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_filesystem_backend() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FilesystemBackend::new(temp_dir.path().to_path_buf()).unwrap();
        let id = SearchId::new("paris_2025-06-15_2025-06-20_20250102_030405");

        let replaced = backend
            .write(Namespace::Hotels, &id, Bytes::from("{}"))
            .await
            .unwrap();
        assert!(!replaced);
        assert!(temp_dir
            .path()
            .join("hotels/paris_2025-06-15_2025-06-20_20250102_030405.json")
            .exists());

        let replaced = backend
            .write(Namespace::Hotels, &id, Bytes::from("{\"a\":1}"))
            .await
            .unwrap();
        assert!(replaced);

        let data = backend.read(Namespace::Hotels, &id).await.unwrap().unwrap();
        assert_eq!(data, Bytes::from("{\"a\":1}"));
        assert!(backend.read(Namespace::Flights, &id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_keys_skip_foreign_files() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FilesystemBackend::new(temp_dir.path().to_path_buf()).unwrap();
        assert!(backend.keys(Namespace::Weather).await.unwrap().is_empty());

        backend
            .write(Namespace::Weather, &SearchId::new("alerts_ks_20250102_030405"), Bytes::from("{}"))
            .await
            .unwrap();
        let dir = temp_dir.path().join("weather_data");
        std::fs::write(dir.join("notes.txt"), "x").unwrap();
        std::fs::write(dir.join(".half.json"), "x").unwrap();

        let keys = backend.keys(Namespace::Weather).await.unwrap();
        assert_eq!(keys, vec![SearchId::new("alerts_ks_20250102_030405")]);
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FilesystemBackend::new(temp_dir.path().join("data")).unwrap();

        for key in ["../escape", "a/b", "", ".hidden"] {
            let err = backend
                .write(Namespace::Flights, &SearchId::new(key), Bytes::from("{}"))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), "invalid_arguments");
        }
        assert!(backend
            .read(Namespace::Flights, &SearchId::new("../escape"))
            .await
            .unwrap()
            .is_none());
        assert!(!temp_dir.path().join("escape.json").exists());
    }
}
