use std::sync::Arc;

use parking_lot::Mutex;

use crate::{Document, DocumentStore, FromDocument, Query, Result, WatchHandle};

/// Receives the materialized collection of a live view every time it
/// changes.
pub trait CollectionObserver<T>: Send + Sync {
    fn on_update(&self, records: Vec<T>);
}

impl<T, F> CollectionObserver<T> for F
where
    F: Fn(Vec<T>) + Send + Sync,
{
    fn on_update(&self, records: Vec<T>) {
        self(records)
    }
}

/// Adapts a channel into an observer, so a consumer can drain snapshots at
/// its own pace. A disconnected receiver silently discards the delivery.
pub fn channel_observer<T: Send + 'static>(
    sender: crossbeam::channel::Sender<Vec<T>>,
) -> impl CollectionObserver<T> + 'static {
    move |records: Vec<T>| {
        let _ = sender.send(records);
    }
}

/// A live, decoded view over one query.
///
/// Deliveries to the observer are serialized, and cancellation acts as a
/// barrier: once [cancel](Subscription::cancel) returns, the observer is
/// never invoked again, including for a snapshot that was in flight when
/// the cancellation happened. Dropping the subscription cancels it.
///
/// The observer must not cancel its own subscription from inside a
/// delivery; that would deadlock on the delivery lock.
pub struct Subscription {
    gate: Arc<Mutex<bool>>,
    handle: WatchHandle,
}

impl Subscription {
    /// Establishes the live query and starts streaming decoded snapshots
    /// to the observer.
    pub async fn start<S, T, O>(store: &S, query: Query, observer: O) -> Result<Subscription>
    where
        S: DocumentStore + ?Sized,
        T: FromDocument + Send + 'static,
        O: CollectionObserver<T> + 'static,
    {
        let gate: Arc<Mutex<bool>> = Default::default();

        let deliver = {
            let gate = gate.clone();

            move |documents: Vec<Document>| {
                // Held across the observer call, so deliveries serialize
                // and cancellation can act as a barrier.
                let cancelled = gate.lock();

                if *cancelled {
                    return;
                }

                let records = documents.iter().map(T::from_document).collect();
                observer.on_update(records);
            }
        };

        let handle = store.watch(query, Box::new(deliver)).await?;

        Ok(Self { gate, handle })
    }

    /// Stops the view and suppresses anything still in flight. Idempotent.
    pub fn cancel(&self) {
        *self.gate.lock() = true;
        self.handle.detach();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
