use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;

use crate::{Document, Fields, Query, WriteBatch};

pub type Result<T> = std::result::Result<T, StoreError>;
pub type BoxedStore = Box<dyn DocumentStore>;

/// Errors surfaced by a document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The document doesn't exist.
    #[error("{collection}/{id} doesn't exist")]
    NotFound { collection: String, id: String },
    /// The store's access rules rejected the request for the current caller.
    #[error("access to {collection}/{id} was denied")]
    PermissionDenied { collection: String, id: String },
    /// A write batch exceeds the per-batch operation cap.
    #[error("write batch holds {size} operations, the cap is {cap}")]
    BatchTooLarge { size: usize, cap: usize },
    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// An unknown error occurred inside the store.
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }

    pub fn denied(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self::PermissionDenied {
            collection: collection.into(),
            id: id.into(),
        }
    }
}

/// Callback handed to [DocumentStore::watch], invoked with the full
/// matching snapshot every time the watched result set changes.
pub type SnapshotSink = Box<dyn Fn(Vec<Document>) + Send + Sync>;

/// Handle to an established live query. Detaching tears the query down on
/// the store side; dropping the handle detaches it as well.
pub struct WatchHandle {
    detach: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl WatchHandle {
    /// Wraps the store-side teardown of one live query.
    pub fn new(detach: impl FnOnce() + Send + 'static) -> Self {
        Self {
            detach: Mutex::new(Some(Box::new(detach))),
        }
    }

    /// Detaches the underlying live query. Detaching twice is a no-op.
    pub fn detach(&self) {
        if let Some(detach) = self.detach.lock().take() {
            detach()
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Represents a remote, eventually consistent document store.
///
/// The signed-in caller travels with every request implicitly. Access
/// policy is evaluated store-side and surfaces here as
/// [StoreError::PermissionDenied].
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Fetches a single document.
    async fn get(&self, collection: &str, id: &str) -> Result<Document>;

    /// Creates or replaces a single document.
    async fn set(&self, collection: &str, id: &str, fields: Fields) -> Result<()>;

    /// Deletes a single document. Deleting a document that doesn't exist
    /// succeeds.
    async fn delete(&self, collection: &str, id: &str) -> Result<()>;

    /// Atomically applies a batch of writes. Batches over
    /// [WriteBatch::MAX_OPS](crate::WriteBatch::MAX_OPS) operations are
    /// rejected with [StoreError::BatchTooLarge].
    async fn commit(&self, batch: WriteBatch) -> Result<()>;

    /// Establishes a live query. The sink receives the full matching
    /// snapshot once immediately, then again on every change, filtered and
    /// sorted per the query. Deliveries stop when the handle detaches.
    async fn watch(&self, query: Query, sink: SnapshotSink) -> Result<WatchHandle>;
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn watch_handles_detach_once() {
        let calls = Arc::new(AtomicUsize::new(0));

        let handle = {
            let calls = calls.clone();
            WatchHandle::new(move || {
                calls.fetch_add(1, Ordering::SeqCst);
            })
        };

        handle.detach();
        handle.detach();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn watch_handles_detach_on_drop() {
        let calls = Arc::new(AtomicUsize::new(0));

        {
            let calls = calls.clone();
            WatchHandle::new(move || {
                calls.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
