//! JSON snapshot persistence.
//!
//! The snapshot is a document mapping target URL to registration metadata
//! plus the bounded history array, pretty-printed so it survives hand
//! editing. A missing or malformed file falls back to an empty store.

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;

use super::{Store, TargetEntry};

/// Persistence error types.
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Load a store from the snapshot at `path`.
///
/// Never fails: absence or corruption of the backing file degrades to an
/// empty store, which is the documented in-memory fallback mode.
pub async fn load_store(path: &str) -> Store {
    if !Path::new(path).exists() {
        tracing::info!("No snapshot at {}, starting empty", path);
        return Store::new();
    }

    match read_snapshot(path).await {
        Ok(snapshot) => {
            let store = Store::from_snapshot(snapshot);
            tracing::info!("Loaded {} target(s) from {}", store.urls().len(), path);
            store
        }
        Err(e) => {
            tracing::warn!("Ignoring unreadable snapshot {}: {}", path, e);
            Store::new()
        }
    }
}

async fn read_snapshot(path: &str) -> Result<BTreeMap<String, TargetEntry>, PersistError> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Write the snapshot to `path`.
pub async fn save_snapshot(
    path: &str,
    snapshot: &BTreeMap<String, TargetEntry>,
) -> Result<(), PersistError> {
    let bytes = serde_json::to_vec_pretty(snapshot)?;
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::result_with_status;
    use crate::store::StatusText;

    #[tokio::test]
    async fn roundtrip_preserves_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        let path = path.to_str().unwrap();

        let store = Store::new();
        store.add_url("https://example.com/");
        store.record_result("https://example.com/", result_with_status(StatusText::Up));
        store.record_result("https://example.com/", result_with_status(StatusText::Down));

        save_snapshot(path, &store.snapshot()).await.unwrap();
        let restored = load_store(path).await;

        let history = restored.history("https://example.com/").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].status_text, StatusText::Down);
        // Saving the restored store reproduces the same bytes.
        let again = dir.path().join("again.json");
        save_snapshot(again.to_str().unwrap(), &restored.snapshot())
            .await
            .unwrap();
        assert_eq!(
            std::fs::read(path).unwrap(),
            std::fs::read(again).unwrap()
        );
    }

    #[tokio::test]
    async fn missing_file_starts_empty() {
        let store = load_store("/nonexistent/upwatch-snapshot.json").await;
        assert!(store.urls().is_empty());
    }

    #[tokio::test]
    async fn malformed_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let store = load_store(path.to_str().unwrap()).await;
        assert!(store.urls().is_empty());
    }
}
