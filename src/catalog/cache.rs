use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};
use tokio::time::Instant;
use tracing::debug;

use crate::error::{PortalError, PortalResult};

type SharedLoad<T> = Arc<OnceCell<Result<T, Arc<PortalError>>>>;

/// A cached value with the moment it was stored and how long it stays fresh
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub stored_at: Instant,
    pub ttl: Duration,
}

impl<T> CacheEntry<T> {
    pub fn is_fresh(&self, now: Instant) -> bool {
        now.duration_since(self.stored_at) < self.ttl
    }
}

/// TTL cache keyed by query, with in-flight request deduplication.
///
/// Concurrent loads for the same key share one loader call. Failed loads
/// are handed to every waiter but never stored. A load that started before
/// an invalidation is never stored either.
#[derive(Debug)]
pub struct QueryCache<T> {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry<T>>>,
    in_flight: Mutex<HashMap<String, (SharedLoad<T>, u64)>>,
    /// Bumped by every invalidation, only while `entries` is locked
    generation: AtomicU64,
}

impl<T> QueryCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh cached value for `key`, if any
    pub async fn get(&self, key: &str) -> Option<T> {
        let entries = self.entries.lock().await;
        entries
            .get(key)
            .filter(|entry| entry.is_fresh(Instant::now()))
            .map(|entry| entry.value.clone())
    }

    /// Cached value while fresh, otherwise the result of `loader`.
    ///
    /// `force` skips the cached value and any load already in flight.
    pub async fn get_or_load<F, Fut>(&self, key: &str, force: bool, loader: F) -> PortalResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = PortalResult<T>>,
    {
        if !force {
            if let Some(value) = self.get(key).await {
                debug!("Cache hit for {}", key);
                return Ok(value);
            }
        }

        let (cell, started) = {
            let mut in_flight = self.in_flight.lock().await;
            match in_flight.get(key) {
                Some((cell, started)) if !force => {
                    debug!("Joining in-flight load for {}", key);
                    (cell.clone(), *started)
                }
                _ => {
                    let cell: SharedLoad<T> = Arc::new(OnceCell::new());
                    let started = self.generation.load(Ordering::SeqCst);
                    in_flight.insert(key.to_string(), (cell.clone(), started));
                    (cell, started)
                }
            }
        };

        let result = cell
            .get_or_init(|| async { loader().await.map_err(Arc::new) })
            .await
            .clone();

        self.finish(key, &cell, started, &result).await;
        result.map_err(PortalError::Shared)
    }

    /// Retire the in-flight slot; whoever removes it stores the value
    async fn finish(
        &self,
        key: &str,
        cell: &SharedLoad<T>,
        started: u64,
        result: &Result<T, Arc<PortalError>>,
    ) {
        let retired = {
            let mut in_flight = self.in_flight.lock().await;
            match in_flight.get(key) {
                Some((current, _)) if Arc::ptr_eq(current, cell) => {
                    in_flight.remove(key);
                    true
                }
                _ => false,
            }
        };

        if !retired {
            return;
        }

        if let Ok(value) = result {
            if self.ttl.is_zero() {
                return;
            }
            let mut entries = self.entries.lock().await;
            if self.generation.load(Ordering::SeqCst) != started {
                debug!("Dropping load for {} started before invalidation", key);
                return;
            }
            entries.insert(
                key.to_string(),
                CacheEntry {
                    value: value.clone(),
                    stored_at: Instant::now(),
                    ttl: self.ttl,
                },
            );
            debug!("Cached {} for {:?}", key, self.ttl);
        }
    }

    /// Drop every cached entry. Loads already in flight still answer their
    /// callers but are not stored, and later callers start a fresh load.
    pub async fn invalidate(&self) {
        {
            let mut entries = self.entries.lock().await;
            self.generation.fetch_add(1, Ordering::SeqCst);
            entries.clear();
        }
        self.in_flight.lock().await.clear();
    }

    pub async fn invalidate_key(&self, key: &str) {
        {
            let mut entries = self.entries.lock().await;
            self.generation.fetch_add(1, Ordering::SeqCst);
            entries.remove(key);
        }
        self.in_flight.lock().await.remove(key);
    }
}
