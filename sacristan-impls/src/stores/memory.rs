use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use crossbeam::atomic::AtomicCell;
use dashmap::DashMap;
use parking_lot::Mutex;

use sacristan_core::{
    Document, DocumentStore, FieldValue, Fields, Query, Result, SnapshotSink, StoreError,
    WatchHandle, WriteBatch, WriteOp,
};

type SharedSink = Arc<dyn Fn(Vec<Document>) + Send + Sync>;

/// An in-process document store with live query fan-out.
///
/// Backs tests and offline use. Fan-out happens synchronously on the
/// mutating call, so by the time a write returns, every affected watch has
/// received its new snapshot. Mutating calls racing on separate threads
/// can reach the same watch out of order; where delivery order matters,
/// writes must come from one task at a time.
#[derive(Default)]
pub struct MemoryStore {
    collections: DashMap<String, BTreeMap<String, Fields>>,
    watches: Arc<DashMap<u64, Watch>>,
    watch_ids: AtomicCell<u64>,
}

struct Watch {
    query: Query,
    sink: SharedSink,
    /// The snapshot most recently delivered, used to skip deliveries that
    /// would repeat it.
    last: Mutex<Vec<Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot_for(&self, query: &Query) -> Vec<Document> {
        let mut documents: Vec<Document> = self
            .collections
            .get(&query.collection)
            .map(|collection| {
                collection
                    .iter()
                    .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default();

        documents.retain(|document| query.matches(document));
        query.sort(&mut documents);

        documents
    }

    /// Recomputes and delivers snapshots for every watch on the collection.
    /// Sinks are invoked outside any map guard, since an observer may
    /// detach watches while this runs.
    fn fan_out(&self, collection: &str) {
        let deliveries: Vec<(SharedSink, Vec<Document>)> = self
            .watches
            .iter()
            .filter(|watch| watch.query.collection == collection)
            .filter_map(|watch| {
                let snapshot = self.snapshot_for(&watch.query);
                let mut last = watch.last.lock();

                if *last == snapshot {
                    return None;
                }

                *last = snapshot.clone();
                Some((watch.sink.clone(), snapshot))
            })
            .collect();

        for (sink, documents) in deliveries {
            (*sink)(documents)
        }
    }

    /// Replaces top-level server time sentinels with the store clock.
    fn resolve_server_times(fields: &mut Fields) {
        let now = FieldValue::from(Utc::now());

        for value in fields.values_mut() {
            if matches!(value, FieldValue::ServerTime) {
                *value = now.clone();
            }
        }
    }

    fn insert(&self, collection: &str, id: &str, mut fields: Fields) {
        Self::resolve_server_times(&mut fields);

        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
    }

    fn remove(&self, collection: &str, id: &str) -> bool {
        self.collections
            .get_mut(collection)
            .map(|mut collection| collection.remove(id).is_some())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Document> {
        self.collections
            .get(collection)
            .and_then(|collection| collection.get(id).cloned())
            .map(|fields| Document::new(id, fields))
            .ok_or_else(|| StoreError::not_found(collection, id))
    }

    async fn set(&self, collection: &str, id: &str, fields: Fields) -> Result<()> {
        self.insert(collection, id, fields);
        self.fan_out(collection);

        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        if self.remove(collection, id) {
            self.fan_out(collection);
        }

        Ok(())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        if batch.len() > WriteBatch::MAX_OPS {
            return Err(StoreError::BatchTooLarge {
                size: batch.len(),
                cap: WriteBatch::MAX_OPS,
            });
        }

        let mut touched = BTreeSet::new();

        for op in batch.into_ops() {
            match op {
                WriteOp::Set {
                    collection,
                    id,
                    fields,
                } => {
                    self.insert(&collection, &id, fields);
                    touched.insert(collection);
                }
                WriteOp::Delete { collection, id } => {
                    self.remove(&collection, &id);
                    touched.insert(collection);
                }
            }
        }

        for collection in touched {
            self.fan_out(&collection);
        }

        Ok(())
    }

    async fn watch(&self, query: Query, sink: SnapshotSink) -> Result<WatchHandle> {
        let id = self.watch_ids.fetch_add(1);
        let sink: SharedSink = Arc::from(sink);

        // The initial full snapshot goes out before the watch is live.
        let initial = self.snapshot_for(&query);
        (*sink)(initial.clone());

        self.watches.insert(
            id,
            Watch {
                query,
                sink,
                last: Mutex::new(initial),
            },
        );

        let watches = self.watches.clone();

        Ok(WatchHandle::new(move || {
            watches.remove(&id);
        }))
    }
}
