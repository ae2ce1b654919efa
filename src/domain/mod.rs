//! Domain types for the position copy engine.
//!
//! This module provides:
//! - Lossless numeric handling via Decimal wrapper
//! - Domain primitives: TimeMs, Address, Coin, Direction
//! - Position snapshots with one-entry-per-coin validation
//! - Change events, scaled targets and reconciliation decisions
//! - The tradable-coin whitelist

pub mod change;
pub mod decimal;
pub mod decision;
pub mod primitives;
pub mod snapshot;
pub mod whitelist;

pub use change::{ChangeEvent, ChangeKind};
pub use decimal::Decimal;
pub use decision::{
    DecisionKind, DecisionReason, ReconcileNotice, ReconciliationDecision, ScaledTarget,
};
pub use primitives::{Address, AddressParseError, Coin, Direction, TimeMs};
pub use snapshot::{Position, PositionSnapshot};
pub use whitelist::Whitelist;
