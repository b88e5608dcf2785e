//! Error types for the rebalancer.

use std::path::PathBuf;

use allotment::{QuoteError, WeightingError};
use allotment_broker::BrokerError;

/// All errors that can occur during rebalancer operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("weighting file error: {0}")]
    Document(String),

    #[error("failed to read weighting file {path}: {source}")]
    DocumentRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Weighting(#[from] WeightingError),

    #[error("weighting entries skipped: {0}")]
    EntriesSkipped(usize),

    #[error("accounts not planned: {0}")]
    AccountsFailed(usize),

    #[error("broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("quote error: {0}")]
    Quote(#[from] QuoteError),

    #[error("aborted: {0}")]
    Aborted(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Process exit status for this error: bad weightings 2, user abort 0,
    /// everything else 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Weighting(_) | Error::EntriesSkipped(_) => 2,
            Error::Aborted(_) => 0,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
