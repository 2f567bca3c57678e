//! Configuration for the document cache.

use std::fmt;

/// Collection holding portfolio documents.
pub const DEFAULT_COLLECTION: &str = "portfolios";
/// The single portfolio document.
pub const DEFAULT_DOCUMENT: &str = "user-data";

/// Identity of one document in a store.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DocumentPath {
    pub collection: String,
    pub document: String,
}

impl DocumentPath {
    pub fn new(collection: impl Into<String>, document: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            document: document.into(),
        }
    }
}

impl Default for DocumentPath {
    fn default() -> Self {
        Self::new(DEFAULT_COLLECTION, DEFAULT_DOCUMENT)
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.document)
    }
}

/// Configuration for a [`crate::DocumentCache`].
#[derive(Clone, Debug)]
pub struct CacheConfig {
    /// The document to keep in sync.
    pub path: DocumentPath,
    /// Write the default document when the store has none.
    pub create_if_absent: bool,
    /// Capacity of the sync event channel.
    pub event_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: DocumentPath::default(),
            create_if_absent: true,
            event_capacity: 100,
        }
    }
}

/// Builder for cache configuration.
pub struct CacheConfigBuilder {
    config: CacheConfig,
}

impl CacheConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: CacheConfig::default(),
        }
    }

    pub fn path(mut self, path: DocumentPath) -> Self {
        self.config.path = path;
        self
    }

    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.config.path.collection = collection.into();
        self
    }

    pub fn document(mut self, document: impl Into<String>) -> Self {
        self.config.path.document = document.into();
        self
    }

    pub fn create_if_absent(mut self, enabled: bool) -> Self {
        self.config.create_if_absent = enabled;
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity.max(1);
        self
    }

    pub fn build(self) -> CacheConfig {
        self.config
    }
}

impl Default for CacheConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
