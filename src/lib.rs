pub mod api;
pub mod config;
pub mod datasource;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;
pub mod persistence;

pub use config::Config;
pub use datasource::{
    DataSourceError, HyperliquidDataSource, MockDataSource, SnapshotFetcher, WhitelistProvider,
};
pub use domain::{
    Address, ChangeEvent, ChangeKind, Coin, Decimal, DecisionKind, DecisionReason, Direction,
    Position, PositionSnapshot, ReconcileNotice, ReconciliationDecision, TimeMs, Whitelist,
};
pub use engine::{CopyMode, EngineConfig, IntentAction, TradeIntent};
pub use error::{AppError, CycleError, EngineError};
pub use orchestration::{CopyState, CycleOutcome, Observation, Orchestrator};
