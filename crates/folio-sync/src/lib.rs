//! folio-sync - keep one portfolio document in sync with a remote store
//!
//! This crate provides a reactive cache for the portfolio document defined
//! in `folio-core`. The cache subscribes to remote snapshots, reconciles
//! each one against the default shape, and exposes an optimistic,
//! merge-style write to any number of local consumers.
//!
//! # Quick Start
//!
//! ```rust
//! use folio_sync::{DocumentCache, DocumentPath, MemoryStore, RemoteChannel};
//! use folio_core::{DetailsPatch, DocumentPatch};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store = Arc::new(MemoryStore::new());
//! let cache = DocumentCache::new(RemoteChannel::new(store, DocumentPath::default()));
//! cache.start().unwrap();
//! cache.wait_synced().await.unwrap();
//!
//! cache
//!     .update(DocumentPatch::new().details(DetailsPatch::new().name("Ada")))
//!     .unwrap();
//! assert_eq!(cache.current().details.name, "Ada");
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`store`] - the collaborator contract any backing store implements
//! - [`memory`] - in-memory store with fault injection
//! - [`file_store`] - JSON-file store for local persistence
//! - [`channel`] - remote sync channel bound to one document
//! - [`cache`] - the document cache consumers talk to
//! - [`events`] - cache lifecycle and write events
//! - [`config`] - document identity and cache configuration
//! - [`error`] - error types

pub mod cache;
pub mod channel;
pub mod config;
pub mod error;
pub mod events;
pub mod file_store;
pub mod memory;
pub mod store;

// Re-exports for convenience
pub use cache::{DocumentCache, ListenerHandle};
pub use channel::{RemoteChannel, Subscription, WriteOutcome};
pub use config::{CacheConfig, CacheConfigBuilder, DocumentPath};
pub use error::{Result, StoreError, SyncError};
pub use events::{CacheState, SyncEvent, WriteId};
pub use file_store::JsonFileStore;
pub use memory::{MemoryStore, StoreWrite, WriteKind};
pub use store::{DocumentStore, Snapshot, SnapshotReceiver};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::cache::DocumentCache;
    pub use crate::channel::RemoteChannel;
    pub use crate::config::{CacheConfig, DocumentPath};
    pub use crate::error::SyncError;
    pub use crate::events::{CacheState, SyncEvent};
    pub use crate::store::DocumentStore;
    pub use folio_core::{DetailsPatch, DocumentPatch, PortfolioDocument};
}
