//! In-memory document store for testing and simulation.
//!
//! Besides the [`DocumentStore`] contract, a [`MemoryStore`] can delay
//! writes, hold them behind a gate, fail them on demand, echo snapshots
//! more than once, and records every write it was asked to perform.

use crate::config::DocumentPath;
use crate::error::StoreError;
use crate::store::{shallow_merge, DocumentStore, Snapshot, SnapshotReceiver, Watchers};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::watch;

/// Kind of write received by a [`MemoryStore`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteKind {
    Create,
    Merge,
}

/// A write as received, before latency, gating or failure injection.
#[derive(Clone, Debug, PartialEq)]
pub struct StoreWrite {
    pub kind: WriteKind,
    pub path: DocumentPath,
    pub payload: Value,
}

#[derive(Default)]
struct MemoryState {
    documents: HashMap<DocumentPath, Map<String, Value>>,
    watchers: Watchers,
    log: Vec<StoreWrite>,
}

impl MemoryState {
    fn snapshot(&self, path: &DocumentPath) -> Snapshot {
        self.documents.get(path).cloned().map(Value::Object)
    }
}

/// Knobs applied to every write.
#[derive(Clone, Debug)]
struct Faults {
    latency: Duration,
    failure: Option<StoreError>,
    echo_copies: usize,
}

impl Default for Faults {
    fn default() -> Self {
        Self {
            latency: Duration::ZERO,
            failure: None,
            echo_copies: 1,
        }
    }
}

/// In-memory store.
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    faults: RwLock<Faults>,
    gate: watch::Sender<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            state: Mutex::new(MemoryState::default()),
            faults: RwLock::new(Faults::default()),
            gate,
        }
    }

    /// Create a store already holding a document.
    pub fn with_document(path: &DocumentPath, document: Map<String, Value>) -> Self {
        let store = Self::new();
        store.state.lock().documents.insert(path.clone(), document);
        store
    }

    /// Delay every write by `latency` before it is applied.
    pub fn set_latency(&self, latency: Duration) {
        self.faults.write().latency = latency;
    }

    /// Fail every write with `error` until cleared with `None`.
    pub fn set_failure(&self, error: Option<StoreError>) {
        self.faults.write().failure = error;
    }

    /// Deliver each change `copies` times to every watcher.
    pub fn set_echo(&self, copies: usize) {
        self.faults.write().echo_copies = copies.max(1);
    }

    /// Hold writes until [`MemoryStore::release_writes`] is called.
    pub fn hold_writes(&self) {
        self.gate.send_replace(false);
    }

    pub fn release_writes(&self) {
        self.gate.send_replace(true);
    }

    /// Replace a document as another client would, notifying watchers.
    pub fn put_remote(&self, path: &DocumentPath, document: Value) {
        let copies = self.faults.read().echo_copies;
        let mut state = self.state.lock();
        let snapshot = match document {
            Value::Object(map) => {
                state.documents.insert(path.clone(), map);
                state.snapshot(path)
            }
            // Non-object payloads are delivered as-is without being stored.
            other => Some(other),
        };
        state.watchers.notify(path, &snapshot, copies);
    }

    /// Delete a document, notifying watchers.
    pub fn delete_remote(&self, path: &DocumentPath) {
        let copies = self.faults.read().echo_copies;
        let mut state = self.state.lock();
        state.documents.remove(path);
        state.watchers.notify(path, &None, copies);
    }

    /// Current stored document.
    pub fn document(&self, path: &DocumentPath) -> Snapshot {
        self.state.lock().snapshot(path)
    }

    /// Every write received so far.
    pub fn writes(&self) -> Vec<StoreWrite> {
        self.state.lock().log.clone()
    }

    /// Writes of one kind received so far.
    pub fn writes_of(&self, kind: WriteKind) -> Vec<StoreWrite> {
        self.state
            .lock()
            .log
            .iter()
            .filter(|write| write.kind == kind)
            .cloned()
            .collect()
    }

    /// Number of live watchers on a document.
    pub fn watcher_count(&self, path: &DocumentPath) -> usize {
        self.state.lock().watchers.count(path)
    }

    fn record(&self, kind: WriteKind, path: &DocumentPath, payload: Value) {
        self.state.lock().log.push(StoreWrite {
            kind,
            path: path.clone(),
            payload,
        });
    }

    /// Apply latency, wait for the gate and check for injected failures.
    async fn admit(&self) -> Result<usize, StoreError> {
        let latency = self.faults.read().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut gate = self.gate.subscribe();
        // The sender lives as long as the store.
        let _ = gate.wait_for(|open| *open).await;

        let faults = self.faults.read();
        match &faults.failure {
            Some(error) => Err(error.clone()),
            None => Ok(faults.echo_copies),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn watch(&self, path: &DocumentPath) -> SnapshotReceiver {
        let mut state = self.state.lock();
        let current = state.snapshot(path);
        state.watchers.register(path, current)
    }

    async fn read(&self, path: &DocumentPath) -> Result<Snapshot, StoreError> {
        Ok(self.document(path))
    }

    async fn create_if_absent(
        &self,
        path: &DocumentPath,
        document: Value,
    ) -> Result<bool, StoreError> {
        self.record(WriteKind::Create, path, document.clone());
        let copies = self.admit().await?;

        let Value::Object(document) = document else {
            return Err(StoreError::Serialization(
                "document must be a JSON object".to_string(),
            ));
        };

        let mut state = self.state.lock();
        if state.documents.contains_key(path) {
            return Ok(false);
        }
        state.documents.insert(path.clone(), document);
        let snapshot = state.snapshot(path);
        state.watchers.notify(path, &snapshot, copies);
        Ok(true)
    }

    async fn merge(
        &self,
        path: &DocumentPath,
        sections: Map<String, Value>,
    ) -> Result<(), StoreError> {
        self.record(WriteKind::Merge, path, Value::Object(sections.clone()));
        let copies = self.admit().await?;

        let mut state = self.state.lock();
        shallow_merge(state.documents.entry(path.clone()).or_default(), sections);
        let snapshot = state.snapshot(path);
        state.watchers.notify(path, &snapshot, copies);
        Ok(())
    }
}
