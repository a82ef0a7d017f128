//! Shared helpers for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use querysync::{
    ApiEnvelope, CacheItem, CacheStore, CacheValue, MutationError, MutationRequest, QueryClient,
    QueryKey, Transport,
};
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

type Reply = Result<ApiEnvelope, MutationError>;

/// In-process backend answering from a script.
///
/// Mutation replies are consumed in order; fetch replies are keyed by path
/// and reused. With `hold()` every mutation parks until `release()` so a
/// test can inspect the cache while the request is in flight.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    fetches: Mutex<HashMap<String, Reply>>,
    requests: Mutex<Vec<MutationRequest>>,
    held: Mutex<bool>,
    arrived: Notify,
    release: Notify,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, data: Value) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(ApiEnvelope::ok(data)));
    }

    pub fn fail(&self, err: MutationError) {
        self.replies.lock().unwrap().push_back(Err(err));
    }

    pub fn serve(&self, path: &str, data: Value) {
        self.fetches
            .lock()
            .unwrap()
            .insert(path.to_string(), Ok(ApiEnvelope::ok(data)));
    }

    pub fn hold(&self) {
        *self.held.lock().unwrap() = true;
    }

    /// Wait until a held mutation reached the transport
    pub async fn arrived(&self) {
        self.arrived.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }

    pub fn requests(&self) -> Vec<MutationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &MutationRequest) -> Result<ApiEnvelope, MutationError> {
        self.requests.lock().unwrap().push(request.clone());

        let held = *self.held.lock().unwrap();
        if held {
            self.arrived.notify_one();
            self.release.notified().await;
        }

        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(MutationError::Network("no scripted reply".into())))
    }

    async fn fetch(&self, path: &str) -> Result<ApiEnvelope, MutationError> {
        self.fetches
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .unwrap_or_else(|| Err(MutationError::from_status(404, format!("{} not found", path))))
    }
}

pub fn client_with(transport: Arc<ScriptedTransport>) -> QueryClient {
    QueryClient::with_transport(Arc::new(CacheStore::new()), transport)
}

pub fn comment(id: &str, content: &str, upvotes: i64) -> CacheItem {
    CacheItem::new(
        id,
        json!({
            "id": id,
            "content": content,
            "project_id": "p1",
            "upvotes": upvotes,
            "downvotes": 0,
        }),
    )
}

pub fn project(id: &str, comment_count: i64) -> CacheItem {
    CacheItem::new(
        id,
        json!({ "id": id, "title": "Trip to Lisbon", "comment_count": comment_count }),
    )
}

/// Seed the comments list and the project record of project `p1`
pub async fn seed(store: &CacheStore, comments: Vec<CacheItem>) {
    let count = comments.len() as i64;
    store
        .set(QueryKey::comments("p1"), CacheValue::list(comments))
        .await;
    store
        .set(QueryKey::project("p1"), CacheValue::record(project("p1", count)))
        .await;
}
