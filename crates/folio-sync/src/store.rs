//! The remote store collaborator contract.
//!
//! Any durable single-document store that can push the full document on
//! every change, create a document only when absent, and merge top-level
//! sections satisfies [`DocumentStore`]. Two implementations ship here:
//! [`crate::MemoryStore`] for tests and simulations, and
//! [`crate::JsonFileStore`] for local persistence.

use crate::config::DocumentPath;
use crate::error::StoreError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::mpsc;

/// One push delivery of a document's full state; `None` if it does not exist.
pub type Snapshot = Option<Value>;

/// Receiving end of a [`DocumentStore::watch`] stream.
pub type SnapshotReceiver = mpsc::UnboundedReceiver<Snapshot>;

/// Abstract document store.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Watch a document. The current state is delivered immediately, then
    /// every change. Deliveries may repeat.
    fn watch(&self, path: &DocumentPath) -> SnapshotReceiver;

    /// Read the current state once.
    async fn read(&self, path: &DocumentPath) -> Result<Snapshot, StoreError>;

    /// Write `document` only if nothing is stored yet. Returns whether it
    /// was written.
    async fn create_if_absent(
        &self,
        path: &DocumentPath,
        document: Value,
    ) -> Result<bool, StoreError>;

    /// Replace the given top-level sections, leaving the others untouched.
    /// Creates the document if it does not exist.
    async fn merge(&self, path: &DocumentPath, sections: Map<String, Value>)
        -> Result<(), StoreError>;
}

/// Shallow top-level merge.
pub fn shallow_merge(target: &mut Map<String, Value>, sections: Map<String, Value>) {
    for (key, value) in sections {
        target.insert(key, value);
    }
}

/// Per-document watcher registry shared by the bundled stores.
#[derive(Default)]
pub(crate) struct Watchers {
    senders: HashMap<DocumentPath, Vec<mpsc::UnboundedSender<Snapshot>>>,
}

impl Watchers {
    /// Register a watcher and hand it the current state.
    pub(crate) fn register(&mut self, path: &DocumentPath, current: Snapshot) -> SnapshotReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        // A fresh receiver cannot be closed yet.
        let _ = tx.send(current);
        self.senders.entry(path.clone()).or_default().push(tx);
        rx
    }

    /// Deliver a snapshot to every live watcher of `path`, `copies` times.
    pub(crate) fn notify(&mut self, path: &DocumentPath, snapshot: &Snapshot, copies: usize) {
        if let Some(senders) = self.senders.get_mut(path) {
            senders.retain(|tx| (0..copies).all(|_| tx.send(snapshot.clone()).is_ok()));
            if senders.is_empty() {
                self.senders.remove(path);
            }
        }
    }

    pub(crate) fn count(&self, path: &DocumentPath) -> usize {
        self.senders
            .get(path)
            .map(|senders| senders.iter().filter(|tx| !tx.is_closed()).count())
            .unwrap_or(0)
    }
}
