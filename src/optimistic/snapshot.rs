use crate::core::{CacheValue, MutationId, QueryKey};
use crate::storage::{CacheEntry, CacheStore};
use chrono::{DateTime, Utc};

/// Entries of the keys a mutation patched, as they were right before the
/// patch: value plus `updated_at` and the stale bit.
///
/// Belongs to exactly one mutation. It is not `Clone` and `restore` takes it
/// by value, so a snapshot is applied at most once and never outlives the
/// mutation that took it.
#[derive(Debug)]
pub struct Snapshot {
    mutation: MutationId,
    entries: Vec<(QueryKey, Option<CacheEntry>)>,
    taken_at: DateTime<Utc>,
}

impl Snapshot {
    pub(crate) fn new(mutation: MutationId) -> Self {
        Self {
            mutation,
            entries: Vec::new(),
            taken_at: Utc::now(),
        }
    }

    /// Remember the prior value of a key; later records for the same key
    /// are ignored so the oldest value wins.
    pub(crate) fn record(&mut self, key: QueryKey, previous: Option<CacheEntry>) {
        if self.entries.iter().any(|(existing, _)| existing == &key) {
            return;
        }
        self.entries.push((key, previous));
    }

    pub fn mutation(&self) -> MutationId {
        self.mutation
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    pub fn keys(&self) -> impl Iterator<Item = &QueryKey> {
        self.entries.iter().map(|(key, _)| key)
    }

    /// Prior value of `key`: `None` when the key was not patched,
    /// `Some(None)` when it was absent from the cache.
    pub fn previous(&self, key: &QueryKey) -> Option<Option<&CacheValue>> {
        self.previous_entry(key)
            .map(|entry| entry.map(|entry| &entry.value))
    }

    /// Like `previous`, with the freshness metadata
    pub fn previous_entry(&self, key: &QueryKey) -> Option<Option<&CacheEntry>> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, entry)| entry.as_ref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Put every recorded entry back verbatim; keys that were absent are
    /// removed again. Returns the restored keys.
    pub async fn restore(self, store: &CacheStore) -> Vec<QueryKey> {
        let mut restored = Vec::with_capacity(self.entries.len());
        for (key, previous) in self.entries {
            match previous {
                Some(entry) => store.restore_entry(&key, entry).await,
                None => {
                    store.remove(&key).await;
                }
            }
            restored.push(key);
        }
        restored
    }
}
