use thiserror::Error;

/// Errors from repository operations (used by trait definitions in relaybot-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,
}

/// Errors from the generative backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Request(String),

    #[error("rate limited")]
    RateLimited,

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("backend returned no candidate text")]
    EmptyResponse,

    #[error("backend call timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Errors from the chat transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport request failed: {0}")]
    Request(String),

    #[error("transport api error {code}: {description}")]
    Api { code: i64, description: String },

    #[error("deserialization error: {0}")]
    Deserialization(String),
}
