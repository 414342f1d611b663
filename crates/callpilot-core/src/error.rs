//! Error taxonomy for the swarm orchestrator.
//!
//! Only request-level problems surface as [`SwarmError`]. Anything that goes
//! wrong while negotiating with a single provider is a [`NegotiationError`],
//! which is rendered into that provider's outcome and never escapes the batch.

/// Request-level and collaborator errors.
#[derive(Debug, thiserror::Error)]
pub enum SwarmError {
    #[error("invalid time window: {0}")]
    InvalidTimeWindow(String),

    #[error("unsupported service: {service}")]
    UnsupportedService { service: String },

    #[error("invalid preferences: {0}")]
    InvalidPreferences(String),

    #[error("provider directory error: {0}")]
    Directory(String),

    #[error("calendar error: {0}")]
    Calendar(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for request-level swarm operations.
pub type Result<T> = std::result::Result<T, SwarmError>;

/// Causes that turn a single provider's negotiation into an `error` outcome.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NegotiationError {
    #[error("malformed provider record: {0}")]
    MalformedProvider(String),

    #[error("provider unreachable: {0}")]
    Unreachable(String),

    #[error("negotiation timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    #[error("negotiation panicked: {0}")]
    Panicked(String),

    #[error("negotiation cancelled before start")]
    Cancelled,
}

/// Result type for per-provider operations.
pub type NegotiationResult<T> = std::result::Result<T, NegotiationError>;
