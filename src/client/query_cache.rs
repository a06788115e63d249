use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::{AbortHandle, Abortable};
use log::debug;
use tokio::sync::Mutex;

use crate::error::Error;

#[derive(Debug)]
struct Slot<V> {
    value: Option<V>,
    /// Bumped on every write so a late rollback cannot clobber a newer value.
    version: u64,
    in_flight: Option<(u64, AbortHandle)>,
}

impl<V> Default for Slot<V> {
    fn default() -> Self {
        Self {
            value: None,
            version: 0,
            in_flight: None,
        }
    }
}

impl<V> Slot<V> {
    fn write(&mut self, value: Option<V>) {
        self.value = value;
        self.version += 1;
    }

    fn cancel(&mut self) {
        if let Some((_, handle)) = self.in_flight.take() {
            handle.abort();
        }
    }
}

/// Cached query results keyed by `K`.
///
/// At most one fetch is in flight per key: starting a new fetch or a
/// mutation aborts the previous one, and a fetch that finishes after being
/// superseded leaves the cache alone.
#[derive(Debug)]
pub struct QueryCache<K, V> {
    slots: Arc<Mutex<HashMap<K, Slot<V>>>>,
    seq: Arc<AtomicU64>,
}

impl<K, V> Clone for QueryCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
            seq: self.seq.clone(),
        }
    }
}

impl<K, V> Default for QueryCache<K, V> {
    fn default() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            seq: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl<K, V> QueryCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        self.slots.lock().await.get(key).and_then(|s| s.value.clone())
    }

    pub async fn set(&self, key: K, value: V) {
        self.slots.lock().await.entry(key).or_default().write(Some(value));
    }

    /// Drops the cached value and aborts any fetch for `key`.
    pub async fn invalidate(&self, key: &K) {
        if let Some(mut slot) = self.slots.lock().await.remove(key) {
            slot.cancel();
        }
    }

    pub async fn is_fetching(&self, key: &K) -> bool {
        self.slots.lock().await.get(key).map_or(false, |s| s.in_flight.is_some())
    }

    /// Runs `load` and caches its result. Returns `Ok(None)` when the fetch
    /// was aborted or superseded before it finished.
    pub async fn fetch<F>(&self, key: K, load: F) -> Result<Option<V>, Error>
    where
        F: Future<Output = Result<V, Error>>,
    {
        let id = self.seq.fetch_add(1, Ordering::SeqCst);
        let (handle, registration) = AbortHandle::new_pair();
        {
            let mut slots = self.slots.lock().await;
            let slot = slots.entry(key.clone()).or_default();
            slot.cancel();
            slot.in_flight = Some((id, handle));
        }
        let result = Abortable::new(load, registration).await;
        let mut slots = self.slots.lock().await;
        let current = slots.get_mut(&key).filter(|s| matches!(s.in_flight, Some((running, _)) if running == id));
        let Some(slot) = current else {
            debug!("fetch {} superseded", id);
            return Ok(None);
        };
        slot.in_flight = None;
        match result {
            Ok(Ok(value)) => {
                slot.write(Some(value.clone()));
                Ok(Some(value))
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Ok(None),
        }
    }

    /// Applies `optimistic` right away, then awaits `request`.
    ///
    /// On success the optimistic value stays, or the value the request
    /// returned replaces it. On failure the previous value is restored
    /// (unless something else wrote the key meanwhile) and the error is
    /// returned.
    pub async fn mutate<F>(&self, key: K, optimistic: V, request: F) -> Result<V, Error>
    where
        F: Future<Output = Result<Option<V>, Error>>,
    {
        self.mutate_with(key, |_| Ok((optimistic, request))).await
    }

    /// Like [`mutate`](Self::mutate), but `plan` sees the cached value and
    /// picks the optimistic value and the request under the same lock that
    /// writes it, so overlapping mutations each start from the latest value.
    pub async fn mutate_with<P, F>(&self, key: K, plan: P) -> Result<V, Error>
    where
        P: FnOnce(Option<&V>) -> Result<(V, F), Error>,
        F: Future<Output = Result<Option<V>, Error>>,
    {
        let (optimistic, request, snapshot, version) = {
            let mut slots = self.slots.lock().await;
            let slot = slots.entry(key.clone()).or_default();
            let (optimistic, request) = plan(slot.value.as_ref())?;
            slot.cancel();
            let snapshot = slot.value.clone();
            slot.write(Some(optimistic.clone()));
            (optimistic, request, snapshot, slot.version)
        };
        let result = request.await;
        let mut slots = self.slots.lock().await;
        let slot = slots.entry(key).or_default();
        match result {
            Ok(Some(confirmed)) => {
                if slot.version == version {
                    slot.write(Some(confirmed.clone()));
                }
                Ok(confirmed)
            }
            Ok(None) => Ok(optimistic),
            Err(e) => {
                if slot.version == version {
                    slot.write(snapshot);
                }
                Err(e)
            }
        }
    }
}
