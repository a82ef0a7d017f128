use thiserror::Error;

/// Failure reported by the backend collaborator for a single request.
///
/// Every variant triggers a rollback when it ends a mutation; the message is
/// kept verbatim so the caller can surface it to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MutationError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Validation error ({status}): {message}")]
    Validation { status: u16, message: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Decode error: {0}")]
    Decode(String),
}

impl MutationError {
    /// Map a non-2xx HTTP status and its `{ message }` body onto a failure kind.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            409 => MutationError::Conflict(message),
            400..=499 => MutationError::Validation { status, message },
            _ => MutationError::Server { status, message },
        }
    }

    /// Human readable reason, without the variant prefix
    pub fn message(&self) -> &str {
        match self {
            MutationError::Network(message)
            | MutationError::Conflict(message)
            | MutationError::Decode(message) => message,
            MutationError::Validation { message, .. } | MutationError::Server { message, .. } => {
                message
            }
        }
    }

    /// HTTP status when the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            MutationError::Validation { status, .. } | MutationError::Server { status, .. } => {
                Some(*status)
            }
            MutationError::Conflict(_) => Some(409),
            MutationError::Network(_) | MutationError::Decode(_) => None,
        }
    }
}

impl From<reqwest::Error> for MutationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            MutationError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            MutationError::from_status(status.as_u16(), err.to_string())
        } else {
            MutationError::Network(err.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error(transparent)]
    Mutation(#[from] MutationError),

    #[error("Cannot normalize {entity} payload: {message}")]
    Normalize {
        entity: &'static str,
        message: String,
    },

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Query '{0}' has no backend path")]
    UnknownQuery(String),
}

impl CacheError {
    pub(crate) fn normalize(entity: &'static str, message: impl Into<String>) -> Self {
        CacheError::Normalize {
            entity,
            message: message.into(),
        }
    }

    /// The backend failure behind this error, if any
    pub fn as_mutation(&self) -> Option<&MutationError> {
        match self {
            CacheError::Mutation(err) => Some(err),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
