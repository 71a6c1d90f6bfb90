//! Whole-collection JSON persistence.
//!
//! Every store keeps its records in memory and flushes the complete
//! collection on each write. Callers must hold their store's write gate
//! around `save` so flushes never interleave.

use std::io::ErrorKind;
use std::path::PathBuf;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::store::StoreError;

#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    path: Option<PathBuf>,
}

impl Snapshot {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// A snapshot that never touches disk.
    pub fn in_memory() -> Self {
        Self { path: None }
    }

    /// Reads the collection. A missing file is an empty collection; anything
    /// unreadable or unparsable is reported as unavailable.
    pub async fn load<T: DeserializeOwned>(&self) -> Result<Vec<T>, StoreError> {
        let Some(path) = &self.path else {
            return Ok(Vec::new());
        };

        let raw = match tokio::fs::read(path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "no snapshot on disk; starting empty");
                return Ok(Vec::new());
            }
            Err(err) => {
                return Err(StoreError::Unavailable(format!(
                    "failed to read {}: {err}",
                    path.display()
                )));
            }
        };

        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        serde_json::from_slice(&raw).map_err(|err| {
            StoreError::Unavailable(format!("corrupt snapshot {}: {err}", path.display()))
        })
    }

    pub async fn save<T: Serialize>(&self, items: &[T]) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let body = serde_json::to_vec_pretty(items)
            .map_err(|err| StoreError::Unavailable(format!("failed to encode snapshot: {err}")))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|err| {
                StoreError::Unavailable(format!("failed to create {}: {err}", parent.display()))
            })?;
        }

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &body).await.map_err(|err| {
            StoreError::Unavailable(format!("failed to write {}: {err}", tmp.display()))
        })?;
        tokio::fs::rename(&tmp, path).await.map_err(|err| {
            StoreError::Unavailable(format!("failed to replace {}: {err}", path.display()))
        })?;

        debug!(path = %path.display(), records = items.len(), "snapshot flushed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Snapshot;
    use crate::store::StoreError;

    #[tokio::test]
    async fn missing_file_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = Snapshot::at(dir.path().join("orders.json"));

        let items: Vec<u32> = snapshot.load().await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn saved_collection_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = Snapshot::at(dir.path().join("nested").join("items.json"));

        snapshot.save(&[1u32, 2, 3]).await.unwrap();
        let items: Vec<u32> = snapshot.load().await.unwrap();

        assert_eq!(items, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn corrupt_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let result = Snapshot::at(path).load::<u32>().await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }
}
