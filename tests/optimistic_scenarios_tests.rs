/// Optimistic mutation lifecycle tests
///
/// Drives full mutations through `QueryClient` against a scripted backend.
/// Run with: cargo test --test optimistic_scenarios_tests
mod common;

use common::{ScriptedTransport, client_with, comment, seed};
use querysync::{
    CacheError, CacheValue, CreateComment, DeleteComment, DependencyMap, Invalidation, Mutation,
    MutationError, MutationState, PendingMutation, QueryKey, TEMP_ID_PREFIX, VoteComment,
    VoteDirection,
};
use serde_json::{Value, json};
use std::time::Duration;

async fn upvotes(client: &querysync::QueryClient, id: &str) -> Option<i64> {
    client
        .store()
        .peek(&QueryKey::comments("p1"))
        .await?
        .find(id)?
        .field_i64("upvotes")
}

async fn comment_count(client: &querysync::QueryClient) -> Option<i64> {
    client
        .store()
        .peek(&QueryKey::project("p1"))
        .await?
        .as_record()?
        .field_i64("comment_count")
}

#[tokio::test]
async fn test_create_comment_replaces_placeholder_with_server_item() {
    let transport = ScriptedTransport::new();
    transport.reply(json!({ "id": "c1", "content": "hello", "project_id": "p1" }));
    let client = client_with(transport.clone());
    seed(client.store(), vec![]).await;

    let outcome = client
        .mutate(&CreateComment::new("p1", "hello"))
        .await
        .unwrap();

    assert!(outcome.settlement.is_committed());
    let comments = client.store().peek(&QueryKey::comments("p1")).await.unwrap();
    assert_eq!(comments.ids(), vec!["c1"]);
    let item = comments.find("c1").unwrap();
    assert_eq!(item.field("content"), Some(&json!("hello")));
    assert!(!item.is_provisional());
    assert_eq!(comment_count(&client).await, Some(1));

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].path, "/comments");
    assert_eq!(
        requests[0].payload,
        Some(json!({ "content": "hello", "project_id": "p1" }))
    );
}

#[tokio::test]
async fn test_failed_create_restores_previous_list() {
    let transport = ScriptedTransport::new();
    transport.fail(MutationError::Network("connection reset by peer".into()));
    let client = client_with(transport);
    seed(client.store(), vec![comment("c1", "first", 0)]).await;
    let before = client.store().dump().await;

    let err = client
        .mutate(&CreateComment::new("p1", "world"))
        .await
        .unwrap_err();

    assert_eq!(
        err.as_mutation(),
        Some(&MutationError::Network("connection reset by peer".into()))
    );
    assert_eq!(client.store().dump().await, before);
    let comments = client.store().peek(&QueryKey::comments("p1")).await.unwrap();
    assert_eq!(comments.ids(), vec!["c1"]);
    assert!(!comments.has_provisional());
}

#[tokio::test]
async fn test_failed_vote_reverts_counter() {
    let transport = ScriptedTransport::new();
    transport.fail(MutationError::from_status(500, "vote service unavailable"));
    transport.hold();
    let client = client_with(transport.clone());
    seed(client.store(), vec![comment("c1", "first", 0)]).await;

    let vote = VoteComment::new("p1", "c1", VoteDirection::Up);
    let (result, in_flight) = tokio::join!(client.mutate(&vote), async {
        transport.arrived().await;
        let observed = upvotes(&client, "c1").await;
        transport.release();
        observed
    });

    assert_eq!(in_flight, Some(1));
    assert!(result.is_err());
    assert_eq!(upvotes(&client, "c1").await, Some(0));
}

#[tokio::test]
async fn test_delete_comment_schedules_parent_refetch() {
    let transport = ScriptedTransport::new();
    transport.reply(Value::Null);
    let client = client_with(transport);
    seed(
        client.store(),
        vec![comment("c1", "first", 0), comment("c2", "second", 3)],
    )
    .await;
    let project_key = QueryKey::project("p1");
    let _watch = client.store().subscribe(project_key.clone()).await;

    let outcome = client.mutate(&DeleteComment::new("p1", "c1")).await.unwrap();

    let comments = client.store().peek(&QueryKey::comments("p1")).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments.ids(), vec!["c2"]);
    assert_eq!(comment_count(&client).await, Some(1));

    assert!(outcome.settlement.refetch_scheduled(&project_key));
    assert!(client.store().is_refetch_scheduled(&project_key).await);
    assert!(outcome.settlement.invalidated.contains(&(
        QueryKey::comments("p1"),
        Invalidation::MarkedStale
    )));
}

#[tokio::test]
async fn test_provisional_item_visible_while_request_in_flight() {
    let transport = ScriptedTransport::new();
    transport.reply(json!({ "id": "c9", "content": "draft", "project_id": "p1" }));
    transport.hold();
    let client = client_with(transport.clone());
    seed(client.store(), vec![comment("c1", "first", 0)]).await;

    let create = CreateComment::new("p1", "draft");
    let (outcome, observed) = tokio::join!(client.mutate(&create), async {
        transport.arrived().await;
        let comments = client.store().peek(&QueryKey::comments("p1")).await;
        let count = comment_count(&client).await;
        transport.release();
        (comments, count)
    });

    let (comments, count) = observed;
    let comments = comments.unwrap();
    assert_eq!(comments.len(), 2);
    let head = comments.items().next().unwrap();
    assert!(head.is_placeholder());
    assert!(head.id.starts_with(TEMP_ID_PREFIX));
    assert_eq!(head.field("content"), Some(&json!("draft")));
    assert_eq!(count, Some(2));

    outcome.unwrap();
    let comments = client.store().peek(&QueryKey::comments("p1")).await.unwrap();
    assert_eq!(comments.ids(), vec!["c9", "c1"]);
}

#[tokio::test]
async fn test_dropped_mutation_restores_snapshot() {
    let transport = ScriptedTransport::new();
    transport.reply(json!({ "id": "c2", "content": "late", "project_id": "p1" }));
    transport.hold();
    let client = client_with(transport);
    seed(client.store(), vec![comment("c1", "first", 0)]).await;
    let before = client.store().dump().await;

    let create = CreateComment::new("p1", "late");
    let result = tokio::time::timeout(Duration::from_millis(50), client.mutate(&create)).await;
    assert!(result.is_err());

    // the restore runs on a spawned task
    for _ in 0..100 {
        if client.store().dump().await == before {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(client.store().dump().await, before);
    for (key, value) in client.store().dump().await {
        assert!(!value.has_provisional(), "provisional state left in {}", key);
    }
}

#[tokio::test]
async fn test_no_provisional_state_after_settlement() {
    let transport = ScriptedTransport::new();
    transport.reply(json!({ "comment": { "id": "c2", "content": "ok" } }));
    transport.fail(MutationError::from_status(422, "content is required"));
    let client = client_with(transport);
    seed(client.store(), vec![comment("c1", "first", 0)]).await;

    client
        .mutate(&CreateComment::new("p1", "ok").author("u1"))
        .await
        .unwrap();
    client
        .mutate(&CreateComment::new("p1", "").author("u1"))
        .await
        .unwrap_err();

    for (key, value) in client.store().dump().await {
        assert!(!value.has_provisional(), "provisional state left in {}", key);
    }
    let mine = client
        .store()
        .peek(&QueryKey::user_comments("u1"))
        .await
        .unwrap();
    assert_eq!(mine.ids(), vec!["c2"]);
}

#[tokio::test]
async fn test_error_message_surfaced_verbatim() {
    let transport = ScriptedTransport::new();
    transport.fail(MutationError::from_status(422, "Comment too long"));
    let client = client_with(transport);
    seed(client.store(), vec![]).await;

    let err = client
        .mutate(&CreateComment::new("p1", "x".repeat(5000)))
        .await
        .unwrap_err();

    match &err {
        CacheError::Mutation(MutationError::Validation { status, message }) => {
            assert_eq!(*status, 422);
            assert_eq!(message, "Comment too long");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(err.to_string(), "Validation error (422): Comment too long");
}

#[tokio::test]
async fn test_refetch_during_flight_does_not_duplicate() {
    let transport = ScriptedTransport::new();
    transport.reply(json!({ "id": "c2", "content": "late", "project_id": "p1" }));
    transport.hold();
    let client = client_with(transport.clone());
    seed(client.store(), vec![comment("c1", "first", 0)]).await;

    let create = CreateComment::new("p1", "late");
    let (outcome, _) = tokio::join!(client.mutate(&create), async {
        transport.arrived().await;
        // A refetch lands first and already contains the new comment
        client
            .store()
            .set(
                QueryKey::comments("p1"),
                CacheValue::list(vec![comment("c2", "late", 0), comment("c1", "first", 0)]),
            )
            .await;
        transport.release();
    });

    outcome.unwrap();
    let comments = client.store().peek(&QueryKey::comments("p1")).await.unwrap();
    assert_eq!(comments.ids(), vec!["c2", "c1"]);
    assert!(!comments.has_provisional());
}

#[tokio::test]
async fn test_overlapping_mutations_last_writer_wins_on_rollback() {
    let transport = ScriptedTransport::new();
    let client = client_with(transport);
    let store = client.store();
    seed(store, vec![comment("c1", "first", 0)]).await;

    let vote = VoteComment::new("p1", "c1", VoteDirection::Up);
    let mut first =
        PendingMutation::begin(store, vote.kind(), vote.scope(), &vote.optimistic_patches()).await;
    let mut second =
        PendingMutation::begin(store, vote.kind(), vote.scope(), &vote.optimistic_patches()).await;
    assert_eq!(upvotes(&client, "c1").await, Some(2));

    // Restoring the first snapshot also discards the second provisional vote
    let settlement = first.rollback(store).await.unwrap();
    assert_eq!(settlement.state, MutationState::RolledBack);
    assert_eq!(upvotes(&client, "c1").await, Some(0));

    second
        .commit(store, &DependencyMap::standard(), Some(comment("c1", "first", 1)))
        .await
        .unwrap();
    assert_eq!(second.state(), MutationState::Committed);
    assert_eq!(upvotes(&client, "c1").await, Some(1));

    assert!(matches!(
        first.rollback(store).await,
        Err(CacheError::InvalidTransition(_))
    ));
}

#[tokio::test]
async fn test_mutation_without_cached_queries() {
    let transport = ScriptedTransport::new();
    transport.reply(json!({ "id": "c1", "content": "hello" }));
    let client = client_with(transport);

    let outcome = client
        .mutate(&CreateComment::new("p1", "hello"))
        .await
        .unwrap();

    assert_eq!(outcome.data["id"], json!("c1"));
    let comments = client.store().peek(&QueryKey::comments("p1")).await.unwrap();
    assert_eq!(comments.ids(), vec!["c1"]);
    assert!(client.store().peek(&QueryKey::project("p1")).await.is_none());
}
