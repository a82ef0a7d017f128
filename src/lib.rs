// ============================================================================
// querysync Library
// ============================================================================

pub mod client;
pub mod core;
pub mod domain;
pub mod executor;
pub mod mutations;
pub mod optimistic;
pub mod reconcile;
pub mod storage;

// Re-export main types for convenience
pub use client::{ClientConfig, MutationOutcome, QueryClient};
pub use core::{
    CacheError, CacheItem, CacheValue, EntityKind, MutationError, MutationId, QueryKey, Result,
    TEMP_ID_PREFIX,
};
pub use executor::{ApiEnvelope, HttpTransport, MutationRequest, Transport};
pub use mutations::{
    CreateChainPost, CreateComment, DeleteChainPost, DeleteComment, Mutation, MutationKind,
    MutationScope, VoteChainPost, VoteComment, VoteDirection,
};
pub use optimistic::{FieldEdit, Patch, PatchEngine, Snapshot};
pub use reconcile::{DependencyMap, MutationState, PendingMutation, Settlement};
pub use storage::{CacheEvent, CacheStore, CacheSubscription, Invalidation, RefetchWorker};
