//! Local JSON file store.
//!
//! Each document is one pretty-printed JSON file at
//! `<root>/<collection>/<document>.json`. Writes replace the file atomically
//! through a temporary sibling. Watchers are notified of writes made through
//! the same store instance.

use crate::config::DocumentPath;
use crate::error::StoreError;
use crate::store::{shallow_merge, DocumentStore, Snapshot, SnapshotReceiver, Watchers};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A [`DocumentStore`] backed by JSON files in a directory.
pub struct JsonFileStore {
    root: PathBuf,
    watchers: Mutex<Watchers>,
    writes: tokio::sync::Mutex<()>,
}

impl JsonFileStore {
    /// Open a store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            watchers: Mutex::new(Watchers::default()),
            writes: tokio::sync::Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File holding a document.
    pub fn file_path(&self, path: &DocumentPath) -> PathBuf {
        self.root
            .join(&path.collection)
            .join(format!("{}.json", path.document))
    }

    fn parse(path: &DocumentPath, contents: &str) -> Result<Map<String, Value>, StoreError> {
        match serde_json::from_str::<Value>(contents) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(StoreError::Corrupt(format!("{} is not a JSON object", path))),
            Err(err) => Err(StoreError::Corrupt(format!("{}: {}", path, err))),
        }
    }

    fn read_blocking(&self, path: &DocumentPath) -> Result<Option<Map<String, Value>>, StoreError> {
        match std::fs::read_to_string(self.file_path(path)) {
            Ok(contents) => Self::parse(path, &contents).map(Some),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn load(&self, path: &DocumentPath) -> Result<Option<Map<String, Value>>, StoreError> {
        match tokio::fs::read_to_string(self.file_path(path)).await {
            Ok(contents) => Self::parse(path, &contents).map(Some),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn persist(&self, path: &DocumentPath, document: &Map<String, Value>) -> Result<(), StoreError> {
        let file = self.file_path(path);
        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = serde_json::to_vec_pretty(document)?;
        let tmp = file.with_extension("json.tmp");
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, &file).await?;
        debug!(path = %path, file = %file.display(), "persisted document");
        Ok(())
    }

    fn publish(&self, path: &DocumentPath, document: Map<String, Value>) {
        self.watchers
            .lock()
            .notify(path, &Some(Value::Object(document)), 1);
    }
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    fn watch(&self, path: &DocumentPath) -> SnapshotReceiver {
        let mut watchers = self.watchers.lock();
        let current = match self.read_blocking(path) {
            Ok(document) => document.map(Value::Object),
            Err(err) => {
                warn!(path = %path, error = %err, "unreadable document, watching as absent");
                None
            }
        };
        watchers.register(path, current)
    }

    async fn read(&self, path: &DocumentPath) -> Result<Snapshot, StoreError> {
        Ok(self.load(path).await?.map(Value::Object))
    }

    async fn create_if_absent(
        &self,
        path: &DocumentPath,
        document: Value,
    ) -> Result<bool, StoreError> {
        let Value::Object(document) = document else {
            return Err(StoreError::Serialization(
                "document must be a JSON object".to_string(),
            ));
        };

        let _write = self.writes.lock().await;
        if tokio::fs::try_exists(self.file_path(path)).await? {
            return Ok(false);
        }
        self.persist(path, &document).await?;
        self.publish(path, document);
        Ok(true)
    }

    async fn merge(
        &self,
        path: &DocumentPath,
        sections: Map<String, Value>,
    ) -> Result<(), StoreError> {
        let _write = self.writes.lock().await;
        let mut document = self.load(path).await?.unwrap_or_default();
        shallow_merge(&mut document, sections);
        self.persist(path, &document).await?;
        self.publish(path, document);
        Ok(())
    }
}
