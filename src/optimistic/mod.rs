// ============================================================================
// Optimistic Patch Engine
// ============================================================================
//
// Writes the predicted post-mutation state into the cache before the
// backend answers, remembering the replaced values for rollback.
//
// ============================================================================

pub mod engine;
pub mod patch;
pub mod snapshot;

pub use engine::PatchEngine;
pub use patch::{FieldEdit, MergeRule, Patch};
pub use snapshot::Snapshot;
