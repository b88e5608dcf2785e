//! Broker error types.

use allotment::QuoteError;

/// Errors from account snapshot providers and price sources.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("unknown account: {0}")]
    UnknownAccount(String),

    #[error("provider unreachable: {0}")]
    Unreachable(String),

    #[error("malformed snapshot: {0}")]
    Snapshot(String),

    #[error(transparent)]
    Quote(#[from] QuoteError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
