use super::CacheStore;
use crate::core::{CacheError, CacheValue, QueryKey, Result};
use async_trait::async_trait;
use log::{debug, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Loads the authoritative value of a query from the backend.
#[async_trait]
pub trait QueryFetcher: Send + Sync {
    async fn fetch(&self, key: &QueryKey) -> Result<CacheValue>;
}

/// Background task draining the store's refetch queue.
///
/// Keys whose subscribers all went away before the task got to them are
/// skipped; a failed fetch leaves the stale value in place.
pub struct RefetchWorker {
    refetched: Arc<AtomicU64>,
    stop_tx: Option<oneshot::Sender<()>>,
    join_handle: Option<JoinHandle<()>>,
}

impl RefetchWorker {
    pub async fn spawn(store: Arc<CacheStore>, fetcher: Arc<dyn QueryFetcher>) -> Result<Self> {
        let mut receiver = store.take_refetch_receiver().await.ok_or_else(|| {
            CacheError::Config("a refetch worker is already attached to this store".to_string())
        })?;

        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let refetched = Arc::new(AtomicU64::new(0));
        let counter = refetched.clone();

        let join_handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    next = receiver.recv() => {
                        let Some(key) = next else { break };
                        refetch_one(&store, fetcher.as_ref(), &key, &counter).await;
                    }
                }
            }
        });

        Ok(Self {
            refetched,
            stop_tx: Some(stop_tx),
            join_handle: Some(join_handle),
        })
    }

    /// Number of successful refetches so far
    pub fn refetched(&self) -> u64 {
        self.refetched.load(Ordering::SeqCst)
    }

    /// Signals the worker to stop and waits for it to finish.
    pub async fn stop(mut self) -> Result<()> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }

        if let Some(join_handle) = self.join_handle.take() {
            join_handle
                .await
                .map_err(|err| CacheError::Config(format!("refetch worker join: {}", err)))?;
        }
        Ok(())
    }
}

impl Drop for RefetchWorker {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(join_handle) = self.join_handle.take() {
            join_handle.abort();
        }
    }
}

async fn refetch_one(
    store: &CacheStore,
    fetcher: &dyn QueryFetcher,
    key: &QueryKey,
    counter: &AtomicU64,
) {
    if store.subscriber_count(key).await == 0 {
        debug!("skipping refetch of '{}': no subscribers", key);
        store.complete_refetch(key).await;
        return;
    }

    // Free the slot before fetching: an invalidation arriving while the
    // request is out must queue another round, not fold into this one.
    store.complete_refetch(key).await;

    match fetcher.fetch(key).await {
        Ok(value) => {
            store.set_fetched(key.clone(), value).await;
            counter.fetch_add(1, Ordering::SeqCst);
            debug!("refetched '{}'", key);
        }
        Err(err) => warn!("refetch of '{}' failed: {}", key, err),
    }
}
