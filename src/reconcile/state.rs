// ============================================================================
// Mutation Lifecycle
// ============================================================================
//
// Every mutation instance moves through:
//
//   Pending ──commit──>   Committed
//      │
//      └──rollback──> RolledBack
//
// Both outcomes are terminal and drop the snapshot.
//
// ============================================================================

use super::{DependencyMap, merge::reconcile_value};
use crate::core::{CacheError, CacheItem, MutationId, QueryKey, Result};
use crate::mutations::{MutationKind, MutationScope};
use crate::optimistic::{MergeRule, Patch, PatchEngine, Snapshot};
use crate::storage::{CacheStore, Invalidation};
use log::debug;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
    /// Provisional values applied, network call outstanding
    Pending,

    /// Server accepted the mutation and its result is merged
    Committed,

    /// Server rejected the mutation and the snapshot is restored
    RolledBack,
}

impl MutationState {
    pub fn is_pending(&self) -> bool {
        matches!(self, MutationState::Pending)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MutationState::Committed | MutationState::RolledBack)
    }
}

impl std::fmt::Display for MutationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MutationState::Pending => write!(f, "PENDING"),
            MutationState::Committed => write!(f, "COMMITTED"),
            MutationState::RolledBack => write!(f, "ROLLED_BACK"),
        }
    }
}

/// What settling a mutation did to the cache
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub mutation: MutationId,
    pub state: MutationState,
    /// Keys merged (commit) or restored (rollback)
    pub reconciled: Vec<QueryKey>,
    /// Dependent keys invalidated after a commit
    pub invalidated: Vec<(QueryKey, Invalidation)>,
}

impl Settlement {
    pub fn is_committed(&self) -> bool {
        self.state == MutationState::Committed
    }

    /// Whether `key` was invalidated with a background refetch queued
    pub fn refetch_scheduled(&self, key: &QueryKey) -> bool {
        self.invalidated
            .iter()
            .any(|(invalidated, outcome)| invalidated == key && *outcome == Invalidation::RefetchScheduled)
    }
}

/// One in-flight mutation and the snapshot that can undo it.
#[derive(Debug)]
pub struct PendingMutation {
    id: MutationId,
    kind: MutationKind,
    scope: MutationScope,
    targets: Vec<(QueryKey, MergeRule)>,
    snapshot: Option<Snapshot>,
    state: MutationState,
    started: Instant,
}

impl PendingMutation {
    /// Apply `patches` to the store and start tracking the mutation
    pub async fn begin(
        store: &CacheStore,
        kind: MutationKind,
        scope: MutationScope,
        patches: &[(QueryKey, Patch)],
    ) -> Self {
        let id = MutationId::new();
        let snapshot = PatchEngine::new(store).begin(id, patches).await;
        let targets = patches
            .iter()
            .map(|(key, patch)| (key.clone(), patch.merge_rule()))
            .collect();
        debug!("{} {} pending, {} keys patched", id, kind, snapshot.len());
        Self::new(kind, scope, snapshot, targets)
    }

    /// Track a mutation whose patches were already applied
    pub fn new(
        kind: MutationKind,
        scope: MutationScope,
        snapshot: Snapshot,
        targets: Vec<(QueryKey, MergeRule)>,
    ) -> Self {
        Self {
            id: snapshot.mutation(),
            kind,
            scope,
            targets,
            snapshot: Some(snapshot),
            state: MutationState::Pending,
            started: Instant::now(),
        }
    }

    pub fn id(&self) -> MutationId {
        self.id
    }

    pub fn kind(&self) -> MutationKind {
        self.kind
    }

    pub fn scope(&self) -> &MutationScope {
        &self.scope
    }

    pub fn state(&self) -> MutationState {
        self.state
    }

    /// The rollback snapshot; gone once the mutation settles
    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub fn duration(&self) -> Duration {
        self.started.elapsed()
    }

    /// Merge the authoritative result and invalidate dependent keys.
    ///
    /// A missing placeholder (e.g. replaced by a concurrent refetch) is not
    /// an error: the authoritative item is merged in instead.
    ///
    /// # Errors
    /// Returns error if the mutation already settled
    pub async fn commit(
        &mut self,
        store: &CacheStore,
        dependencies: &DependencyMap,
        authoritative: Option<CacheItem>,
    ) -> Result<Settlement> {
        self.ensure_pending("commit")?;
        self.snapshot = None;

        let marker = self.id;
        let mut reconciled = Vec::new();
        for (key, rule) in &self.targets {
            let mut changed = false;
            store
                .replace_with(key, |current| {
                    let next = reconcile_value(current, marker, rule, authoritative.as_ref());
                    changed = next.is_some();
                    next
                })
                .await;
            if changed && !reconciled.contains(key) {
                reconciled.push(key.clone());
            }
        }

        let mut invalidated = Vec::new();
        for key in dependencies.keys_for(self.kind, &self.scope) {
            let outcome = store.invalidate(&key).await;
            invalidated.push((key, outcome));
        }

        self.state = MutationState::Committed;
        debug!(
            "{} {} committed in {:?}, {} keys invalidated",
            self.id,
            self.kind,
            self.duration(),
            invalidated.len()
        );

        Ok(Settlement {
            mutation: self.id,
            state: self.state,
            reconciled,
            invalidated,
        })
    }

    /// Restore every patched key from the snapshot.
    ///
    /// # Errors
    /// Returns error if the mutation already settled
    pub async fn rollback(&mut self, store: &CacheStore) -> Result<Settlement> {
        self.ensure_pending("rollback")?;

        let reconciled = match self.snapshot.take() {
            Some(snapshot) => snapshot.restore(store).await,
            None => Vec::new(),
        };

        self.state = MutationState::RolledBack;
        debug!("{} {} rolled back, {} keys restored", self.id, self.kind, reconciled.len());

        Ok(Settlement {
            mutation: self.id,
            state: self.state,
            reconciled,
            invalidated: Vec::new(),
        })
    }

    /// Give up on a mutation whose outcome will never be observed.
    ///
    /// Marks it rolled back and hands out the snapshot for the caller to
    /// restore; `None` once the mutation has settled.
    pub fn abandon(&mut self) -> Option<Snapshot> {
        if !self.state.is_pending() {
            return None;
        }
        self.state = MutationState::RolledBack;
        debug!("{} {} abandoned while pending", self.id, self.kind);
        self.snapshot.take()
    }

    fn ensure_pending(&self, action: &str) -> Result<()> {
        if !self.state.is_pending() {
            return Err(CacheError::InvalidTransition(format!(
                "Cannot {}: mutation {} is already {}",
                action, self.id, self.state
            )));
        }
        Ok(())
    }
}
