use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::datasource::DataSourceError;
use crate::domain::{Address, Coin, Decimal, TimeMs};

/// Conditions that invalidate one observation or one cycle.
///
/// All of them are recoverable: the cycle is skipped and the retained
/// snapshots stay authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("invalid account state for {account}: account value {value} is not positive")]
    InvalidAccountState { account: Address, value: Decimal },

    #[error("out-of-order snapshot for {account}: {current} is older than retained {previous}")]
    OutOfOrderSnapshot {
        account: Address,
        previous: TimeMs,
        current: TimeMs,
    },

    #[error("ambiguous position for {account}: {coin} appears more than once")]
    AmbiguousPosition { account: Address, coin: Coin },

    #[error("malformed position {coin}: {reason}")]
    MalformedPosition { coin: Coin, reason: String },

    #[error("no snapshot available for {account}")]
    NoSnapshot { account: Address },
}

/// Why a polling cycle was abandoned.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("snapshot fetch failed: {0}")]
    Fetch(DataSourceError),
    #[error("whitelist fetch failed: {0}")]
    Whitelist(DataSourceError),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Not ready: {0}")]
    NotReady(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::NotReady(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
