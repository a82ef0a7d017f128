// ============================================================================
// Reconciliation Controller
// ============================================================================
//
// Settles a pending mutation: merge the server's answer (commit) or restore
// the snapshot (rollback), then invalidate the dependent queries.
//
// ============================================================================

pub mod dependency;
mod merge;
pub mod state;

pub use dependency::{DependencyMap, resolve_key};
pub use state::{MutationState, PendingMutation, Settlement};
