//! Events emitted by the document cache.
//!
//! Events are for observation only (logging, tests, status indicators);
//! the cache never waits for anyone to read them.

use crate::error::StoreError;
use folio_core::Section;
use std::fmt;
use ulid::Ulid;

/// Identifies one `update` call and its remote write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WriteId(Ulid);

impl WriteId {
    pub(crate) fn new() -> Self {
        Self(Ulid::new())
    }
}

impl fmt::Display for WriteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a [`crate::DocumentCache`].
///
/// ```text
/// Uninitialized ──start──► Subscribing ──first snapshot──► Synced
///        │                      │                            │
///        └──────────────────────┴──────── shutdown ──────────┴──► Unsubscribed
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheState {
    Uninitialized,
    Subscribing,
    Synced,
    Unsubscribed,
}

/// Something that happened inside the cache.
#[derive(Clone, Debug)]
pub enum SyncEvent {
    /// The cache moved to a new lifecycle state.
    StateChanged(CacheState),
    /// A remote snapshot was reconciled into the cache.
    SnapshotApplied {
        /// Whether the remote document existed.
        exists: bool,
        /// Sections or fields that fell back to defaults.
        substitutions: usize,
    },
    /// The default document was written because none existed.
    DocumentCreated,
    /// Writing the default document failed.
    CreateFailed { error: StoreError },
    /// An optimistic update was applied locally and its write dispatched.
    WriteQueued {
        write_id: WriteId,
        sections: Vec<Section>,
    },
    /// The store accepted a write.
    WriteConfirmed { write_id: WriteId },
    /// The store rejected a write. The local value is kept.
    WriteFailed {
        write_id: WriteId,
        error: StoreError,
    },
}
