use super::{Patch, Snapshot};
use crate::core::{CacheValue, MutationId, QueryKey};
use crate::storage::CacheStore;
use log::debug;

/// Applies provisional values to the store and records what they replaced.
///
/// Each key is read and written under one store lock, so readers see either
/// the old value or the provisional one, never a mix.
pub struct PatchEngine<'a> {
    store: &'a CacheStore,
}

impl<'a> PatchEngine<'a> {
    pub fn new(store: &'a CacheStore) -> Self {
        Self { store }
    }

    /// Apply `patches` in order on behalf of mutation `marker`.
    ///
    /// Only keys whose value actually changed end up in the snapshot.
    pub async fn begin(&self, marker: MutationId, patches: &[(QueryKey, Patch)]) -> Snapshot {
        let mut snapshot = Snapshot::new(marker);
        for (key, patch) in patches {
            let mut changed = false;
            let previous = self
                .store
                .replace_with(key, |current| {
                    let next = patch.apply(current, marker);
                    changed = next.is_some();
                    next
                })
                .await;

            if changed {
                snapshot.record(key.clone(), previous);
            } else {
                debug!("{}: patch left '{}' unchanged", marker, key);
            }
        }
        snapshot
    }

    /// Closure form: `compute` maps the current value to the provisional
    /// one, `None` leaves the key untouched.
    pub async fn begin_with<F>(&self, marker: MutationId, key: &QueryKey, compute: F) -> Snapshot
    where
        F: FnOnce(Option<&CacheValue>) -> Option<CacheValue>,
    {
        let mut snapshot = Snapshot::new(marker);
        let mut changed = false;
        let previous = self
            .store
            .replace_with(key, |current| {
                let next = compute(current);
                changed = next.is_some();
                next
            })
            .await;

        if changed {
            snapshot.record(key.clone(), previous);
        }
        snapshot
    }
}
