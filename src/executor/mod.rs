// ============================================================================
// Mutation Executor
// ============================================================================
//
// One network call per mutation, outcome returned as-is. The cache is never
// touched here; reconciliation decides what the outcome means for it.
//
// ============================================================================

pub mod envelope;
pub mod executor;
pub mod transport;

pub use envelope::{ApiEnvelope, Pagination};
pub use executor::MutationExecutor;
pub use transport::{HttpTransport, MutationRequest, Transport};
