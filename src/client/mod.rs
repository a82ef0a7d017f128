pub mod config;

pub use config::ClientConfig;

use crate::core::{CacheError, CacheValue, QueryKey, Result};
use crate::domain;
use crate::executor::{HttpTransport, MutationExecutor, Transport};
use crate::mutations::Mutation;
use crate::reconcile::{DependencyMap, PendingMutation, Settlement};
use crate::storage::{CacheStore, QueryFetcher, RefetchWorker};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{Instrument, Level, event, info_span};

/// Result of a committed mutation
#[derive(Debug, Clone, PartialEq)]
pub struct MutationOutcome {
    pub settlement: Settlement,
    /// Raw `data` of the server response
    pub data: Value,
}

/// Entry point tying the cache, the backend and the dependency map together.
///
/// Create one per application and share it; cloning the store handle is
/// how other components observe the same cache.
pub struct QueryClient {
    store: Arc<CacheStore>,
    executor: MutationExecutor,
    dependencies: DependencyMap,
}

impl QueryClient {
    /// Connect to a REST backend over HTTP
    pub fn connect(config: ClientConfig) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(&config)?);
        let mut store = CacheStore::new();
        if let Some(stale_time) = config.stale_time {
            store = store.with_stale_time(stale_time);
        }
        Ok(Self::with_transport(Arc::new(store), transport))
    }

    /// Build on an existing store and any transport
    pub fn with_transport(store: Arc<CacheStore>, transport: Arc<dyn Transport>) -> Self {
        Self {
            store,
            executor: MutationExecutor::new(transport),
            dependencies: DependencyMap::standard(),
        }
    }

    pub fn with_dependencies(mut self, dependencies: DependencyMap) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    pub fn dependencies(&self) -> &DependencyMap {
        &self.dependencies
    }

    /// Fetcher reading queries through this client's transport
    pub fn fetcher(&self) -> Arc<dyn QueryFetcher> {
        Arc::new(TransportFetcher {
            transport: self.executor.transport().clone(),
        })
    }

    /// Start the background refetch worker for this client's store
    pub async fn spawn_refetch_worker(&self) -> Result<RefetchWorker> {
        RefetchWorker::spawn(self.store.clone(), self.fetcher()).await
    }

    /// Load a query from the backend and cache it
    pub async fn fetch_query(&self, key: &QueryKey) -> Result<CacheValue> {
        let value = self.fetcher().fetch(key).await?;
        self.store.set(key.clone(), value.clone()).await;
        Ok(value)
    }

    /// Cached value when fresh, otherwise a fetch
    pub async fn get_or_fetch(&self, key: &QueryKey) -> Result<CacheValue> {
        if !self.store.is_stale(key).await {
            if let Some(value) = self.store.peek(key).await {
                return Ok(value);
            }
        }
        self.fetch_query(key).await
    }

    /// Run a mutation with optimistic cache effects.
    ///
    /// Provisional values are visible as soon as this is polled the first
    /// time. On success the server result is merged and dependent queries
    /// invalidated; on failure every patched key is restored and the error
    /// returned once. Never retried. Dropping the future before it settles
    /// restores the snapshot in the background.
    pub async fn mutate<M>(&self, mutation: &M) -> Result<MutationOutcome>
    where
        M: Mutation + ?Sized,
    {
        let kind = mutation.kind();
        let patches = mutation.optimistic_patches();
        let mut in_flight = InFlight {
            store: self.store.clone(),
            pending: PendingMutation::begin(&self.store, kind, mutation.scope(), &patches).await,
        };
        let pending = &mut in_flight.pending;

        let span = info_span!("cache.mutation", mutation = %pending.id(), kind = %kind);
        let request = mutation.request();

        async {
            match self.executor.execute(&request).await {
                Ok(envelope) => {
                    let authoritative = match mutation.authoritative(&envelope.data) {
                        Ok(item) => item,
                        Err(err) => {
                            event!(Level::WARN, error = %err, "authoritative payload not usable, relying on refetch");
                            None
                        }
                    };
                    let data = envelope.data;
                    pending
                        .commit(&self.store, &self.dependencies, authoritative)
                        .await
                        .map(|settlement| {
                            event!(Level::DEBUG, keys = settlement.reconciled.len(), "mutation committed");
                            MutationOutcome { settlement, data }
                        })
                }
                Err(err) => pending.rollback(&self.store).await.and_then(|_| {
                    event!(Level::ERROR, error = %err, "mutation rolled back");
                    Err(CacheError::Mutation(err))
                }),
            }
        }
        .instrument(span)
        .await
    }
}

/// Rolls back a mutation whose `mutate` future was dropped before it
/// settled, e.g. by a timeout around the network call.
struct InFlight {
    store: Arc<CacheStore>,
    pending: PendingMutation,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let Some(snapshot) = self.pending.abandon() else {
            return;
        };
        let id = self.pending.id();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let store = self.store.clone();
                event!(Level::WARN, mutation = %id, "mutation dropped in flight, restoring snapshot");
                handle.spawn(async move {
                    snapshot.restore(&store).await;
                });
            }
            Err(_) => {
                event!(Level::ERROR, mutation = %id, "mutation dropped outside a runtime, snapshot lost");
            }
        }
    }
}

/// Reads queries through a `Transport` and normalizes them
struct TransportFetcher {
    transport: Arc<dyn Transport>,
}

#[async_trait]
impl QueryFetcher for TransportFetcher {
    async fn fetch(&self, key: &QueryKey) -> Result<CacheValue> {
        let path = key
            .path()
            .ok_or_else(|| CacheError::UnknownQuery(key.to_string()))?;
        let envelope = self.transport.fetch(&path).await?;
        domain::normalize_value(key.entity(), &envelope.data)
    }
}
