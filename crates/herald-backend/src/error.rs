use herald_bridge::feed::Lifecycle;

/// Errors reported by repositories and change channels.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    /// The store could not be reached or did not answer. Retryable.
    #[error("data store unavailable: {0}")]
    Unavailable(String),
    /// A uniqueness constraint rejected the write.
    #[error("conflicting record: {0}")]
    Conflict(String),
    /// The addressed record does not exist.
    #[error("record not found: {0}")]
    NotFound(String),
    /// The store refused the request.
    #[error("request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
    /// The store answered with data that could not be understood.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for RepositoryError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            Self::Decode(error.without_url().to_string())
        } else {
            Self::Unavailable(error.without_url().to_string())
        }
    }
}

/// Errors of the engine lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The requested lifecycle transition is not allowed from the current
    /// state.
    #[error("cannot move engine from {from:?} to {to:?}")]
    InvalidTransition { from: Lifecycle, to: Lifecycle },
    /// A change subscription could not be acquired during start.
    #[error("failed to subscribe to `{table}` changes: {source}")]
    Subscribe {
        table: String,
        #[source]
        source: RepositoryError,
    },
    /// The engine event loop is gone.
    #[error("engine is not running")]
    Closed,
}
