use super::{ApiEnvelope, MutationRequest, Transport};
use crate::core::MutationError;
use log::debug;
use std::sync::Arc;

/// Issues mutation requests and resolves them to the authoritative `data`.
///
/// Never touches the cache: outcomes are handed back to reconciliation.
#[derive(Clone)]
pub struct MutationExecutor {
    transport: Arc<dyn Transport>,
}

impl MutationExecutor {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Perform the request once. Failures surface immediately, no retry.
    pub async fn execute(&self, request: &MutationRequest) -> Result<ApiEnvelope, MutationError> {
        let result = self.transport.send(request).await;
        match &result {
            Ok(_) => debug!("{} {} succeeded", request.method, request.path),
            Err(err) => debug!("{} {} failed: {}", request.method, request.path, err),
        }
        result
    }
}
