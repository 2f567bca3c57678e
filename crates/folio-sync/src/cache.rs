//! The reactive document cache.
//!
//! A [`DocumentCache`] owns the current reconciled document and is the only
//! writer of it. Consumers share one cache (it is a cheap handle) and get:
//!
//! - [`DocumentCache::current`] - the latest value, never blocks on I/O
//! - [`DocumentCache::subscribe`] - called now and on every change
//! - [`DocumentCache::update`] - optimistic local merge, remote merge later
//!
//! Snapshot application and listener fan-out are serialized by a reentrant
//! dispatch guard, so listeners see changes in order and may call back into
//! the cache from their callback.

use crate::channel::{RemoteChannel, Subscription, WriteOutcome};
use crate::config::CacheConfig;
use crate::error::{Result, SyncError};
use crate::events::{CacheState, SyncEvent, WriteId};
use crate::store::{DocumentStore, Snapshot};
use folio_core::{defaults, reconcile_verbose, DocumentPatch, PortfolioDocument, WirePatch};
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info};

type Listener = Arc<dyn Fn(&PortfolioDocument) + Send + Sync>;

/// Ordered listener registry.
#[derive(Default)]
struct Listeners {
    entries: Mutex<Vec<(u64, Listener)>>,
    next_id: AtomicU64,
}

impl Listeners {
    fn add(&self, listener: Listener) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries.lock().push((id, listener));
        id
    }

    fn remove(&self, id: u64) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    /// Copy of the registered listeners, in registration order.
    fn snapshot(&self) -> Vec<Listener> {
        self.entries
            .lock()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect()
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }

    fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// Registration of a cache listener.
///
/// Dropping the handle keeps the listener registered; call
/// [`ListenerHandle::unsubscribe`] to remove it.
pub struct ListenerHandle {
    id: u64,
    registry: Weak<Listeners>,
}

impl ListenerHandle {
    /// Remove the listener. Returns false if it was already gone.
    pub fn unsubscribe(self) -> bool {
        self.registry
            .upgrade()
            .map(|registry| registry.remove(self.id))
            .unwrap_or(false)
    }
}

struct Inner<S: DocumentStore> {
    channel: RemoteChannel<S>,
    config: CacheConfig,
    defaults: PortfolioDocument,
    current: RwLock<Arc<PortfolioDocument>>,
    listeners: Arc<Listeners>,
    state: watch::Sender<CacheState>,
    subscription: Mutex<Option<Subscription>>,
    runtime: OnceLock<Handle>,
    creation_requested: AtomicBool,
    dispatch: ReentrantMutex<()>,
    // Fan-out bookkeeping, only touched under `dispatch`.
    fanning_out: AtomicBool,
    republish: AtomicBool,
    events: broadcast::Sender<SyncEvent>,
}

impl<S: DocumentStore> Inner<S> {
    fn state(&self) -> CacheState {
        *self.state.borrow()
    }

    fn set_state(&self, state: CacheState) {
        self.state.send_replace(state);
        let _ = self.events.send(SyncEvent::StateChanged(state));
    }

    fn emit(&self, event: SyncEvent) {
        let _ = self.events.send(event);
    }

    fn runtime(&self) -> Result<Handle> {
        match self.runtime.get() {
            Some(handle) => Ok(handle.clone()),
            None => Handle::try_current().map_err(|_| SyncError::NoRuntime),
        }
    }

    /// Replace the cached value and notify every listener.
    ///
    /// A publish from inside a listener only replaces the value; the
    /// outermost fan-out then restarts with it, so no listener is left
    /// holding a superseded document.
    fn publish(&self, document: Arc<PortfolioDocument>) {
        *self.current.write() = document;
        if self.fanning_out.swap(true, Ordering::Relaxed) {
            self.republish.store(true, Ordering::Relaxed);
            return;
        }

        loop {
            self.republish.store(false, Ordering::Relaxed);
            let document = self.current.read().clone();
            for listener in self.listeners.snapshot() {
                listener(&*document);
                if self.republish.load(Ordering::Relaxed) {
                    break;
                }
            }
            if !self.republish.load(Ordering::Relaxed) {
                break;
            }
        }
        self.fanning_out.store(false, Ordering::Relaxed);
    }

    fn apply_snapshot(&self, snapshot: Snapshot) {
        let _dispatch = self.dispatch.lock();
        let state = self.state();
        if state == CacheState::Unsubscribed {
            return;
        }

        let exists = snapshot.as_ref().is_some_and(|raw| !raw.is_null());
        if !exists && self.config.create_if_absent {
            self.request_creation();
        }

        let reconciliation = reconcile_verbose(snapshot.as_ref(), &self.defaults);
        for issue in &reconciliation.issues {
            debug!(path = %self.channel.path(), %issue, "substituted default while reconciling snapshot");
        }
        let substitutions = reconciliation.issues.len();

        if state == CacheState::Subscribing {
            self.set_state(CacheState::Synced);
        }
        self.emit(SyncEvent::SnapshotApplied {
            exists,
            substitutions,
        });
        self.publish(Arc::new(reconciliation.document));
    }

    /// Write the default document, at most once per cache.
    fn request_creation(&self) {
        if self.creation_requested.swap(true, Ordering::SeqCst) {
            return;
        }
        let Ok(runtime) = self.runtime() else {
            return;
        };

        info!(path = %self.channel.path(), "no remote document, creating from defaults");
        let channel = self.channel.clone();
        let document = self.defaults.clone();
        let events = self.events.clone();
        runtime.spawn(async move {
            let event = match channel.create_if_absent(&document).await {
                WriteOutcome::Applied => Some(SyncEvent::DocumentCreated),
                WriteOutcome::AlreadyExists => None,
                WriteOutcome::Failed(error) => Some(SyncEvent::CreateFailed { error }),
            };
            if let Some(event) = event {
                let _ = events.send(event);
            }
        });
    }
}

/// Shared, reactive cache of the portfolio document.
///
/// Cloning yields another handle to the same cache.
pub struct DocumentCache<S: DocumentStore> {
    inner: Arc<Inner<S>>,
}

impl<S: DocumentStore> Clone for DocumentCache<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: DocumentStore> DocumentCache<S> {
    /// Create a cache over an existing channel. Nothing happens until
    /// [`DocumentCache::start`].
    pub fn new(channel: RemoteChannel<S>) -> Self {
        let config = CacheConfig {
            path: channel.path().clone(),
            ..CacheConfig::default()
        };
        Self::from_parts(channel, config)
    }

    /// Create a cache for `config.path` in `store`.
    pub fn with_config(store: Arc<S>, config: CacheConfig) -> Self {
        let channel = RemoteChannel::new(store, config.path.clone());
        Self::from_parts(channel, config)
    }

    fn from_parts(channel: RemoteChannel<S>, config: CacheConfig) -> Self {
        let defaults = defaults();
        let (state, _) = watch::channel(CacheState::Uninitialized);
        let (events, _) = broadcast::channel(config.event_capacity.max(1));

        Self {
            inner: Arc::new(Inner {
                channel,
                config,
                current: RwLock::new(Arc::new(defaults.clone())),
                defaults,
                listeners: Arc::new(Listeners::default()),
                state,
                subscription: Mutex::new(None),
                runtime: OnceLock::new(),
                creation_requested: AtomicBool::new(false),
                dispatch: ReentrantMutex::new(()),
                fanning_out: AtomicBool::new(false),
                republish: AtomicBool::new(false),
                events,
            }),
        }
    }

    /// Open the remote subscription. Must be called inside a tokio runtime.
    pub fn start(&self) -> Result<()> {
        let inner = &self.inner;
        let _dispatch = inner.dispatch.lock();
        match inner.state() {
            CacheState::Uninitialized => {}
            CacheState::Unsubscribed => return Err(SyncError::Closed),
            CacheState::Subscribing | CacheState::Synced => return Err(SyncError::AlreadyStarted),
        }

        let runtime = Handle::try_current().map_err(|_| SyncError::NoRuntime)?;
        let _ = inner.runtime.set(runtime);

        // Deliveries wait on the dispatch guard held here, so the first
        // snapshot always observes `Subscribing`.
        let weak = Arc::downgrade(inner);
        let subscription = inner.channel.subscribe(move |snapshot| {
            if let Some(inner) = weak.upgrade() {
                inner.apply_snapshot(snapshot);
            }
        })?;
        *inner.subscription.lock() = Some(subscription);
        inner.set_state(CacheState::Subscribing);

        debug!(path = %inner.channel.path(), "document cache started");
        Ok(())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CacheState {
        self.inner.state()
    }

    /// The latest reconciled document.
    pub fn current(&self) -> Arc<PortfolioDocument> {
        self.inner.current.read().clone()
    }

    /// Register a listener. It is called immediately with the current value
    /// and again after every change, in registration order.
    pub fn subscribe<F>(&self, listener: F) -> Result<ListenerHandle>
    where
        F: Fn(&PortfolioDocument) + Send + Sync + 'static,
    {
        let inner = &self.inner;
        let _dispatch = inner.dispatch.lock();
        if inner.state() == CacheState::Unsubscribed {
            return Err(SyncError::Closed);
        }

        let listener: Listener = Arc::new(listener);
        let id = inner.listeners.add(listener.clone());
        listener(&*self.current());

        Ok(ListenerHandle {
            id,
            registry: Arc::downgrade(&inner.listeners),
        })
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    /// Merge `patch` into the cached document and write it to the store.
    ///
    /// The local value changes and listeners are notified before this
    /// returns; the remote write runs in the background. A failed write is
    /// logged and reported as [`SyncEvent::WriteFailed`], and the local
    /// value is kept until the next snapshot replaces it.
    pub fn update(&self, patch: DocumentPatch) -> Result<WriteId> {
        let inner = &self.inner;
        let _dispatch = inner.dispatch.lock();
        if inner.state() == CacheState::Unsubscribed {
            return Err(SyncError::Closed);
        }
        let runtime = inner.runtime()?;

        let write_id = WriteId::new();
        let sections = patch.sections();
        if sections.is_empty() {
            return Ok(write_id);
        }

        let next = Arc::new(patch.apply(&self.current()));
        let payload = WirePatch::from_sections(&next, sections.iter().copied());
        inner.emit(SyncEvent::WriteQueued {
            write_id,
            sections,
        });
        inner.publish(next);

        let channel = inner.channel.clone();
        let events = inner.events.clone();
        runtime.spawn(async move {
            let event = match channel.merge(payload).await {
                WriteOutcome::Failed(error) => SyncEvent::WriteFailed { write_id, error },
                WriteOutcome::Applied | WriteOutcome::AlreadyExists => {
                    SyncEvent::WriteConfirmed { write_id }
                }
            };
            let _ = events.send(event);
        });

        Ok(write_id)
    }

    /// Subscribe to sync events.
    pub fn events(&self) -> broadcast::Receiver<SyncEvent> {
        self.inner.events.subscribe()
    }

    /// Wait until the first snapshot has been applied.
    ///
    /// Fails with [`SyncError::Closed`] if the cache shuts down first.
    pub async fn wait_synced(&self) -> Result<()> {
        let mut state = self.inner.state.subscribe();
        let synced = state
            .wait_for(|s| matches!(s, CacheState::Synced | CacheState::Unsubscribed))
            .await
            .map(|s| *s == CacheState::Synced)
            .unwrap_or(false);
        if synced {
            Ok(())
        } else {
            Err(SyncError::Closed)
        }
    }

    /// Stop receiving snapshots and drop all listeners. Terminal.
    ///
    /// Writes already in flight are not cancelled.
    pub fn shutdown(&self) {
        let inner = &self.inner;
        let _dispatch = inner.dispatch.lock();
        if inner.state() == CacheState::Unsubscribed {
            return;
        }
        if let Some(subscription) = inner.subscription.lock().take() {
            subscription.unsubscribe();
        }
        inner.set_state(CacheState::Unsubscribed);
        inner.listeners.clear();
        debug!(path = %inner.channel.path(), "document cache shut down");
    }

    /// The channel this cache syncs through.
    pub fn channel(&self) -> &RemoteChannel<S> {
        &self.inner.channel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DocumentPath;
    use crate::memory::MemoryStore;
    use folio_core::DetailsPatch;
    use serde_json::json;

    fn cache() -> (Arc<MemoryStore>, DocumentCache<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let channel = RemoteChannel::new(store.clone(), DocumentPath::default());
        (store, DocumentCache::new(channel))
    }

    #[test]
    fn test_initial_state() {
        let (_store, cache) = cache();
        assert_eq!(cache.state(), CacheState::Uninitialized);
        assert_eq!(*cache.current(), defaults());
        assert_eq!(cache.channel().path(), &DocumentPath::default());
    }

    #[test]
    fn test_start_outside_runtime() {
        let (_store, cache) = cache();
        assert_eq!(cache.start(), Err(SyncError::NoRuntime));
        assert_eq!(cache.state(), CacheState::Uninitialized);
    }

    #[test]
    fn test_update_outside_runtime() {
        let (_store, cache) = cache();
        let result = cache.update(DocumentPatch::new().projects(vec![json!(1)]));
        assert_eq!(result, Err(SyncError::NoRuntime));
        assert_eq!(*cache.current(), defaults());
    }

    #[tokio::test]
    async fn test_start_twice() {
        let (_store, cache) = cache();
        cache.start().unwrap();
        assert_eq!(cache.start(), Err(SyncError::AlreadyStarted));
    }

    #[tokio::test]
    async fn test_listener_called_on_registration() {
        let (_store, cache) = cache();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        cache
            .subscribe(move |doc| sink.lock().push(doc.details.name.clone()))
            .unwrap();
        assert_eq!(*seen.lock(), vec![String::new()]);
    }

    #[tokio::test]
    async fn test_listeners_notified_in_order() {
        let (_store, cache) = cache();
        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let order = order.clone();
            cache
                .subscribe(move |_| order.lock().push(tag))
                .unwrap();
        }
        order.lock().clear();

        cache
            .update(DocumentPatch::new().details(DetailsPatch::new().name("Ada")))
            .unwrap();
        assert_eq!(*order.lock(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_unsubscribed_listener_is_silent() {
        let (_store, cache) = cache();
        let calls = Arc::new(AtomicU64::new(0));
        let counter = calls.clone();
        let handle = cache
            .subscribe(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        assert!(handle.unsubscribe());

        cache
            .update(DocumentPatch::new().gallery(vec![json!({ "src": "a.png" })]))
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_listener_may_reenter() {
        let (_store, cache) = cache();
        let reentrant = cache.clone();
        let fired = Arc::new(AtomicBool::new(false));
        let once = fired.clone();

        cache
            .subscribe(move |doc| {
                if doc.details.name == "Ada" && !once.swap(true, Ordering::SeqCst) {
                    reentrant
                        .update(DocumentPatch::new().details(DetailsPatch::new().title("Analyst")))
                        .unwrap();
                }
            })
            .unwrap();

        cache
            .update(DocumentPatch::new().details(DetailsPatch::new().name("Ada")))
            .unwrap();
        assert_eq!(cache.current().details.title, "Analyst");
        assert_eq!(cache.current().details.name, "Ada");
    }

    #[tokio::test]
    async fn test_reentrant_update_reaches_later_listeners() {
        let (_store, cache) = cache();
        let reentrant = cache.clone();
        cache
            .subscribe(move |doc| {
                if doc.details.name == "Ada" && doc.details.title.is_empty() {
                    reentrant
                        .update(DocumentPatch::new().details(DetailsPatch::new().title("Analyst")))
                        .unwrap();
                }
            })
            .unwrap();

        let titles = Arc::new(Mutex::new(Vec::new()));
        let sink = titles.clone();
        cache
            .subscribe(move |doc| sink.lock().push(doc.details.title.clone()))
            .unwrap();

        cache
            .update(DocumentPatch::new().details(DetailsPatch::new().name("Ada")))
            .unwrap();

        let titles = titles.lock();
        assert_eq!(cache.current().details.title, "Analyst");
        assert_eq!(titles.last(), Some(&"Analyst".to_string()));
        // The superseded value never reaches the second listener.
        assert_eq!(titles.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_patch_is_noop() {
        let (store, cache) = cache();
        let mut events = cache.events();
        cache.update(DocumentPatch::new()).unwrap();
        assert!(events.try_recv().is_err());
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_is_terminal() {
        let (_store, cache) = cache();
        cache.start().unwrap();
        cache.shutdown();

        assert_eq!(cache.state(), CacheState::Unsubscribed);
        assert_eq!(cache.start(), Err(SyncError::Closed));
        assert!(matches!(cache.subscribe(|_| {}), Err(SyncError::Closed)));
        assert_eq!(
            cache.update(DocumentPatch::new().projects(vec![])),
            Err(SyncError::Closed)
        );
        assert_eq!(cache.wait_synced().await, Err(SyncError::Closed));
    }
}
