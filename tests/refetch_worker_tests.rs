/// Background refetch tests
///
/// Invalidation after a committed mutation should reload subscribed queries
/// through the client's transport.
/// Run with: cargo test --test refetch_worker_tests
mod common;

use common::{ScriptedTransport, client_with, comment, seed};
use querysync::{CacheEvent, CacheError, CreateComment, Invalidation, QueryKey};
use serde_json::json;
use std::time::Duration;

async fn wait_until<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn test_invalidated_queries_are_refetched() {
    let transport = ScriptedTransport::new();
    transport.reply(json!({ "id": "c2", "content": "new", "project_id": "p1" }));
    transport.serve(
        "/projects/p1/comments",
        json!([
            { "id": "c2", "content": "new", "project_id": "p1", "upvotes": 0 },
            { "id": "c1", "content": "first", "project_id": "p1", "upvotes": 4 }
        ]),
    );
    transport.serve(
        "/projects/p1",
        json!({ "id": "p1", "title": "Trip to Lisbon", "comment_count": 2 }),
    );
    let client = client_with(transport);
    seed(client.store(), vec![comment("c1", "first", 0)]).await;

    let _comments_watch = client.store().subscribe(QueryKey::comments("p1")).await;
    let _project_watch = client.store().subscribe(QueryKey::project("p1")).await;
    let worker = client.spawn_refetch_worker().await.unwrap();

    let outcome = client
        .mutate(&CreateComment::new("p1", "new"))
        .await
        .unwrap();
    assert!(outcome.settlement.refetch_scheduled(&QueryKey::comments("p1")));

    let worker_ref = &worker;
    wait_until(move || async move { worker_ref.refetched() >= 2 }).await;

    let comments = client.store().peek(&QueryKey::comments("p1")).await.unwrap();
    assert_eq!(comments.ids(), vec!["c2", "c1"]);
    assert_eq!(comments.find("c1").unwrap().field_i64("upvotes"), Some(4));
    assert!(!client.store().is_stale(&QueryKey::comments("p1")).await);
    assert!(client.store().scheduled_refetches().await.is_empty());

    worker.stop().await.unwrap();
}

#[tokio::test]
async fn test_unsubscribed_queries_are_only_marked_stale() {
    let transport = ScriptedTransport::new();
    transport.reply(json!({ "id": "c2", "content": "new" }));
    let client = client_with(transport);
    seed(client.store(), vec![comment("c1", "first", 0)]).await;
    let worker = client.spawn_refetch_worker().await.unwrap();

    let outcome = client
        .mutate(&CreateComment::new("p1", "new"))
        .await
        .unwrap();

    assert!(outcome.settlement.invalidated.iter().all(|(_, state)| {
        matches!(state, Invalidation::MarkedStale | Invalidation::Absent)
    }));
    assert!(client.store().is_stale(&QueryKey::project("p1")).await);
    assert!(client.store().scheduled_refetches().await.is_empty());
    assert_eq!(worker.refetched(), 0);

    // A subscriber reading the stale key triggers the refetch
    let _watch = client.store().subscribe(QueryKey::project("p1")).await;
    client.store().get(&QueryKey::project("p1")).await.unwrap();
    assert!(client.store().is_refetch_scheduled(&QueryKey::project("p1")).await);
}

#[tokio::test]
async fn test_subscription_sees_mutation_lifecycle() {
    let transport = ScriptedTransport::new();
    transport.reply(json!({ "id": "c2", "content": "new" }));
    let client = client_with(transport);
    seed(client.store(), vec![]).await;
    let key = QueryKey::comments("p1");
    let mut subscription = client.store().subscribe(key.clone()).await;

    client
        .mutate(&CreateComment::new("p1", "new"))
        .await
        .unwrap();

    // provisional insert, authoritative merge, then invalidation
    assert_eq!(
        subscription.next_event().await,
        Some(CacheEvent::Updated(key.clone()))
    );
    assert_eq!(
        subscription.next_event().await,
        Some(CacheEvent::Updated(key.clone()))
    );
    assert_eq!(
        subscription.next_event().await,
        Some(CacheEvent::Invalidated(key.clone()))
    );
}

#[tokio::test]
async fn test_second_worker_is_refused() {
    let client = client_with(ScriptedTransport::new());
    let _worker = client.spawn_refetch_worker().await.unwrap();

    assert!(matches!(
        client.spawn_refetch_worker().await,
        Err(CacheError::Config(_))
    ));
}
