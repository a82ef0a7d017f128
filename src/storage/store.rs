use crate::core::{CacheValue, QueryKey};
use chrono::{DateTime, Utc};
use log::debug;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, broadcast, mpsc};

const EVENT_CAPACITY: usize = 256;

/// Cached value plus freshness metadata
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub value: CacheValue,
    pub updated_at: DateTime<Utc>,
    pub stale: bool,
}

impl CacheEntry {
    fn fresh(value: CacheValue) -> Self {
        Self {
            value,
            updated_at: Utc::now(),
            stale: false,
        }
    }

    /// Stale when explicitly invalidated or older than `stale_time`
    pub fn is_stale(&self, stale_time: Option<Duration>) -> bool {
        if self.stale {
            return true;
        }
        match stale_time {
            Some(limit) => {
                let age = Utc::now().signed_duration_since(self.updated_at);
                age.to_std().map(|age| age >= limit).unwrap_or(false)
            }
            None => false,
        }
    }
}

/// Change notification published to subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    Updated(QueryKey),
    Invalidated(QueryKey),
    Removed(QueryKey),
}

impl CacheEvent {
    pub fn key(&self) -> &QueryKey {
        match self {
            CacheEvent::Updated(key) | CacheEvent::Invalidated(key) | CacheEvent::Removed(key) => {
                key
            }
        }
    }
}

/// What `invalidate` did with the key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalidation {
    /// Nothing cached and nobody listening
    Absent,
    /// Marked stale; refetched on the next access with a subscriber
    MarkedStale,
    /// A subscriber is active, background refetch queued
    RefetchScheduled,
}

struct RefetchQueue {
    scheduled: HashSet<QueryKey>,
    sender: mpsc::UnboundedSender<QueryKey>,
}

/// Keyed in-memory query cache.
///
/// Constructed explicitly and shared through `Arc`; there is no process-wide
/// instance. No operation fails: callers own key correctness.
pub struct CacheStore {
    entries: RwLock<HashMap<QueryKey, CacheEntry>>,
    subscribers: RwLock<HashMap<QueryKey, Arc<AtomicUsize>>>,
    refetch: Mutex<RefetchQueue>,
    refetch_receiver: Mutex<Option<mpsc::UnboundedReceiver<QueryKey>>>,
    events: broadcast::Sender<CacheEvent>,
    stale_time: Option<Duration>,
}

impl CacheStore {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            entries: RwLock::new(HashMap::new()),
            subscribers: RwLock::new(HashMap::new()),
            refetch: Mutex::new(RefetchQueue {
                scheduled: HashSet::new(),
                sender,
            }),
            refetch_receiver: Mutex::new(Some(receiver)),
            events,
            stale_time: None,
        }
    }

    /// Entries older than `stale_time` are treated as stale on access
    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = Some(stale_time);
        self
    }

    pub fn stale_time(&self) -> Option<Duration> {
        self.stale_time
    }

    /// Read a value. A stale entry read while a subscriber is active gets a
    /// background refetch queued.
    pub async fn get(&self, key: &QueryKey) -> Option<CacheValue> {
        let (value, stale) = {
            let entries = self.entries.read().await;
            let entry = entries.get(key)?;
            (entry.value.clone(), entry.is_stale(self.stale_time))
        };

        if stale && self.subscriber_count(key).await > 0 {
            self.schedule_refetch(key).await;
        }
        Some(value)
    }

    /// Read a value without any refetch side effect
    pub async fn peek(&self, key: &QueryKey) -> Option<CacheValue> {
        let entries = self.entries.read().await;
        entries.get(key).map(|entry| entry.value.clone())
    }

    pub async fn entry(&self, key: &QueryKey) -> Option<CacheEntry> {
        let entries = self.entries.read().await;
        entries.get(key).cloned()
    }

    pub async fn contains(&self, key: &QueryKey) -> bool {
        self.entries.read().await.contains_key(key)
    }

    /// Store a fresh value; any pending refetch for the key is satisfied
    pub async fn set(&self, key: QueryKey, value: CacheValue) {
        {
            let mut entries = self.entries.write().await;
            entries.insert(key.clone(), CacheEntry::fresh(value));
        }
        self.complete_refetch(&key).await;
        let _ = self.events.send(CacheEvent::Updated(key));
    }

    /// Store the result of a background refetch. A key invalidated again
    /// while the fetch was out stays stale and keeps its queued refetch.
    pub(crate) async fn set_fetched(&self, key: QueryKey, value: CacheValue) {
        let requeued = self.is_refetch_scheduled(&key).await;
        {
            let mut entries = self.entries.write().await;
            let mut entry = CacheEntry::fresh(value);
            entry.stale = requeued;
            entries.insert(key.clone(), entry);
        }
        let _ = self.events.send(CacheEvent::Updated(key));
    }

    /// Read-modify-write under a single lock.
    ///
    /// `update` receives the current value and returns the replacement:
    /// `Some(value)` stores it, `None` leaves the key untouched. Returns the
    /// entry that was present before the call.
    pub async fn replace_with<F>(&self, key: &QueryKey, update: F) -> Option<CacheEntry>
    where
        F: FnOnce(Option<&CacheValue>) -> Option<CacheValue>,
    {
        let (previous, changed) = {
            let mut entries = self.entries.write().await;
            let previous = entries.get(key).cloned();
            match update(previous.as_ref().map(|entry| &entry.value)) {
                Some(next) => {
                    let stale = previous.as_ref().map(|entry| entry.stale).unwrap_or(false);
                    let mut entry = CacheEntry::fresh(next);
                    entry.stale = stale;
                    entries.insert(key.clone(), entry);
                    (previous, true)
                }
                None => (previous, false),
            }
        };

        if changed {
            let _ = self.events.send(CacheEvent::Updated(key.clone()));
        }
        previous
    }

    /// Put back an entry recorded earlier, keeping its `updated_at`. A key
    /// invalidated in the meantime stays stale.
    pub(crate) async fn restore_entry(&self, key: &QueryKey, mut entry: CacheEntry) {
        {
            let mut entries = self.entries.write().await;
            if entries.get(key).is_some_and(|current| current.stale) {
                entry.stale = true;
            }
            entries.insert(key.clone(), entry);
        }
        let _ = self.events.send(CacheEvent::Updated(key.clone()));
    }

    pub async fn remove(&self, key: &QueryKey) -> Option<CacheValue> {
        let removed = {
            let mut entries = self.entries.write().await;
            entries.remove(key).map(|entry| entry.value)
        };
        if removed.is_some() {
            let _ = self.events.send(CacheEvent::Removed(key.clone()));
        }
        removed
    }

    /// Mark a key stale. With an active subscriber the refetch is queued
    /// right away; otherwise it waits for the next subscribed access.
    pub async fn invalidate(&self, key: &QueryKey) -> Invalidation {
        let present = {
            let mut entries = self.entries.write().await;
            match entries.get_mut(key) {
                Some(entry) => {
                    entry.stale = true;
                    true
                }
                None => false,
            }
        };

        let _ = self.events.send(CacheEvent::Invalidated(key.clone()));

        if self.subscriber_count(key).await > 0 {
            self.schedule_refetch(key).await;
            debug!("invalidated '{}', refetch scheduled", key);
            Invalidation::RefetchScheduled
        } else if present {
            debug!("invalidated '{}'", key);
            Invalidation::MarkedStale
        } else {
            Invalidation::Absent
        }
    }

    pub async fn is_stale(&self, key: &QueryKey) -> bool {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .map(|entry| entry.is_stale(self.stale_time))
            .unwrap_or(false)
    }

    /// Register interest in a key; the count drops when the handle is dropped
    pub async fn subscribe(&self, key: QueryKey) -> CacheSubscription {
        let counter = {
            let mut subscribers = self.subscribers.write().await;
            subscribers
                .entry(key.clone())
                .or_insert_with(|| Arc::new(AtomicUsize::new(0)))
                .clone()
        };
        counter.fetch_add(1, Ordering::SeqCst);
        CacheSubscription {
            key,
            counter,
            events: self.events.subscribe(),
        }
    }

    pub async fn subscriber_count(&self, key: &QueryKey) -> usize {
        let subscribers = self.subscribers.read().await;
        subscribers
            .get(key)
            .map(|counter| counter.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    pub async fn is_refetch_scheduled(&self, key: &QueryKey) -> bool {
        self.refetch.lock().await.scheduled.contains(key)
    }

    pub async fn scheduled_refetches(&self) -> Vec<QueryKey> {
        let queue = self.refetch.lock().await;
        let mut keys: Vec<QueryKey> = queue.scheduled.iter().cloned().collect();
        keys.sort();
        keys
    }

    /// Hand the refetch queue to a worker. Only the first caller gets it.
    pub async fn take_refetch_receiver(&self) -> Option<mpsc::UnboundedReceiver<QueryKey>> {
        self.refetch_receiver.lock().await.take()
    }

    /// Drop a key from the scheduled set after a refetch attempt
    pub async fn complete_refetch(&self, key: &QueryKey) {
        self.refetch.lock().await.scheduled.remove(key);
    }

    pub async fn keys(&self) -> Vec<QueryKey> {
        let entries = self.entries.read().await;
        let mut keys: Vec<QueryKey> = entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// All cached values ordered by key
    pub async fn dump(&self) -> Vec<(QueryKey, CacheValue)> {
        let entries = self.entries.read().await;
        let mut all: Vec<(QueryKey, CacheValue)> = entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    async fn schedule_refetch(&self, key: &QueryKey) {
        let mut queue = self.refetch.lock().await;
        if queue.scheduled.insert(key.clone()) {
            let _ = queue.sender.send(key.clone());
        }
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Active interest in one cache key.
pub struct CacheSubscription {
    key: QueryKey,
    counter: Arc<AtomicUsize>,
    events: broadcast::Receiver<CacheEvent>,
}

impl CacheSubscription {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Wait for the next event concerning this key. Returns `None` once the
    /// store is gone.
    pub async fn next_event(&mut self) -> Option<CacheEvent> {
        loop {
            match self.events.recv().await {
                Ok(event) if event.key() == &self.key => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("subscription '{}' lagged by {} events", self.key, skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for CacheSubscription {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}
