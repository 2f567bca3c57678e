//! Remote sync channel.
//!
//! Wraps a [`DocumentStore`] for one fixed document. This is the
//! serialization boundary on the way out: icon references are stripped
//! before anything is handed to the store. Store failures are logged here
//! and reported as a [`WriteOutcome`], never as an `Err`.

use crate::config::DocumentPath;
use crate::error::{StoreError, SyncError};
use crate::store::{DocumentStore, Snapshot};
use folio_core::{encode_document, strip_icons, strip_section_icons, PortfolioDocument, WirePatch};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Result of a remote write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The store applied the write.
    Applied,
    /// `create_if_absent` found an existing document and wrote nothing.
    AlreadyExists,
    /// The store rejected the write. Already logged.
    Failed(StoreError),
}

impl WriteOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, WriteOutcome::Failed(_))
    }
}

/// An active snapshot subscription.
///
/// Delivery stops on [`Subscription::unsubscribe`] or when dropped.
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    /// Stop delivering snapshots.
    pub fn unsubscribe(self) {
        self.task.abort();
    }

    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Channel to one document in a remote store.
pub struct RemoteChannel<S: DocumentStore> {
    store: Arc<S>,
    path: DocumentPath,
}

impl<S: DocumentStore> Clone for RemoteChannel<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            path: self.path.clone(),
        }
    }
}

impl<S: DocumentStore> RemoteChannel<S> {
    pub fn new(store: Arc<S>, path: DocumentPath) -> Self {
        Self { store, path }
    }

    pub fn path(&self) -> &DocumentPath {
        &self.path
    }

    /// Deliver every snapshot of the document to `on_snapshot`, starting
    /// with the current state. Must be called inside a tokio runtime.
    pub fn subscribe<F>(&self, on_snapshot: F) -> Result<Subscription, SyncError>
    where
        F: Fn(Snapshot) + Send + 'static,
    {
        let handle = tokio::runtime::Handle::try_current().map_err(|_| SyncError::NoRuntime)?;
        let mut snapshots = self.store.watch(&self.path);
        let path = self.path.clone();

        let task = handle.spawn(async move {
            while let Some(snapshot) = snapshots.recv().await {
                debug!(path = %path, exists = snapshot.is_some(), "snapshot received");
                on_snapshot(snapshot);
            }
            debug!(path = %path, "snapshot stream closed");
        });

        Ok(Subscription { task })
    }

    /// Read the document once.
    pub async fn fetch(&self) -> Result<Snapshot, StoreError> {
        self.store.read(&self.path).await
    }

    /// Write `document` if the store has none yet.
    pub async fn create_if_absent(&self, document: &PortfolioDocument) -> WriteOutcome {
        let mut payload = encode_document(document);
        strip_icons(&mut payload);

        match self.store.create_if_absent(&self.path, payload).await {
            Ok(true) => {
                info!(path = %self.path, "created document from defaults");
                WriteOutcome::Applied
            }
            Ok(false) => {
                debug!(path = %self.path, "document already exists, not created");
                WriteOutcome::AlreadyExists
            }
            Err(error) => {
                warn!(path = %self.path, %error, "failed to create document");
                WriteOutcome::Failed(error)
            }
        }
    }

    /// Merge the sections in `patch` into the remote document.
    pub async fn merge(&self, patch: WirePatch) -> WriteOutcome {
        if patch.is_empty() {
            return WriteOutcome::Applied;
        }
        let mut sections = patch.into_map();
        let stripped = strip_section_icons(&mut sections);
        if stripped > 0 {
            warn!(path = %self.path, stripped, "removed icon fields from outgoing payload");
        }

        let keys: Vec<String> = sections.keys().cloned().collect();
        match self.store.merge(&self.path, sections).await {
            Ok(()) => {
                debug!(path = %self.path, sections = ?keys, "merged sections");
                WriteOutcome::Applied
            }
            Err(error) => {
                warn!(path = %self.path, sections = ?keys, %error, "failed to save sections");
                WriteOutcome::Failed(error)
            }
        }
    }
}
