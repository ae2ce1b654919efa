//! Data source abstraction for fetching account snapshots and the tradable whitelist.

use crate::domain::{Address, PositionSnapshot, Whitelist};
use crate::error::EngineError;
use async_trait::async_trait;
use std::fmt;

pub mod hyperliquid;
pub mod mock;
pub mod whitelist;

pub use hyperliquid::HyperliquidDataSource;
pub use mock::MockDataSource;
pub use whitelist::{RemotePairlist, StaticWhitelist};

/// Source of point-in-time position snapshots.
///
/// Implementations must handle retry/backoff and rate limiting themselves.
#[async_trait]
pub trait SnapshotFetcher: Send + Sync + fmt::Debug {
    /// Fetch the complete position set of `address`.
    ///
    /// # Returns
    /// * `Ok(Some(snapshot))` - a fresh observation
    /// * `Ok(None)` - nothing new; the caller keeps its retained snapshot
    /// * `Err(_)` - the fetch failed and the cycle must be abandoned
    async fn fetch_snapshot(
        &self,
        address: &Address,
    ) -> Result<Option<PositionSnapshot>, DataSourceError>;
}

/// Source of the set of coins the local account may enter.
#[async_trait]
pub trait WhitelistProvider: Send + Sync + fmt::Debug {
    async fn fetch_whitelist(&self) -> Result<Whitelist, DataSourceError>;
}

/// Error type for data source operations.
#[derive(Debug, Clone)]
pub enum DataSourceError {
    /// Network error (e.g., connection timeout, DNS failure)
    NetworkError(String),
    /// HTTP error (e.g., 429 rate limit, 5xx server error)
    HttpError { status: u16, message: String },
    /// Parsing error (invalid JSON or malformed response)
    ParseError(String),
    /// Rate limit exceeded (caller should implement backoff)
    RateLimited,
    /// Response parsed but violates snapshot invariants
    InvalidSnapshot(EngineError),
    /// Other error
    Other(String),
}

impl fmt::Display for DataSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSourceError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            DataSourceError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            DataSourceError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            DataSourceError::RateLimited => write!(f, "Rate limited"),
            DataSourceError::InvalidSnapshot(err) => write!(f, "Invalid snapshot: {}", err),
            DataSourceError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for DataSourceError {}

impl From<EngineError> for DataSourceError {
    fn from(err: EngineError) -> Self {
        DataSourceError::InvalidSnapshot(err)
    }
}
