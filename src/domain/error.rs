use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Circuit open for {dependency}: retry after {retry_after_secs}s")]
    CircuitOpen {
        dependency: String,
        retry_after_secs: u64,
    },

    #[error("Market data unavailable for '{query}': {cause}")]
    MarketDataUnavailable {
        query: String,
        #[source]
        cause: Box<DomainError>,
    },

    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Machine-readable error category for callers that render fallbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    CircuitOpen,
    MarketDataUnavailable,
    RateLimitExceeded,
    Upstream,
    InvalidConfiguration,
    InvalidInput,
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::CircuitOpen { .. } => ErrorKind::CircuitOpen,
            DomainError::MarketDataUnavailable { .. } => ErrorKind::MarketDataUnavailable,
            DomainError::RateLimitExceeded(_) => ErrorKind::RateLimitExceeded,
            DomainError::Upstream(_) => ErrorKind::Upstream,
            DomainError::InvalidConfiguration(_) => ErrorKind::InvalidConfiguration,
            DomainError::InvalidInput(_) => ErrorKind::InvalidInput,
        }
    }

    /// True when the data is unavailable because the dependency is known-bad,
    /// as opposed to a single failed call.
    pub fn is_circuit_open(&self) -> bool {
        match self {
            DomainError::CircuitOpen { .. } => true,
            DomainError::MarketDataUnavailable { cause, .. } => cause.is_circuit_open(),
            _ => false,
        }
    }
}
