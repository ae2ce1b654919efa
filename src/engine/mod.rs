//! Pure computation engine for the copy pipeline.
//!
//! Every function here is deterministic in its inputs and performs no I/O:
//! change detection, scaling, reconciliation, sizing and intent emission.

use serde::Serialize;

use crate::domain::{Decimal, Direction};

pub mod change_detector;
pub mod reconciler;
pub mod scale;
pub mod signals;
pub mod sizing;

pub use change_detector::detect_changes;
pub use reconciler::{reconcile, Reconciliation};
pub use scale::{compute_targets, copyable_positions, ScalePlan, SkipReason, SkippedPosition};
pub use signals::{Emission, IntentAction, SignalEmitter, TradeIntent};

/// Which tracked directions are copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CopyMode {
    LongOnly,
    LongShort,
}

impl CopyMode {
    pub fn permits(&self, direction: Direction) -> bool {
        match self {
            CopyMode::LongOnly => direction == Direction::Long,
            CopyMode::LongShort => true,
        }
    }
}

/// Decision thresholds, stored as fractions (0.005 = 0.5%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Thresholds {
    /// Minimum share of tracked equity a position or a size change must
    /// represent to count.
    pub change: Decimal,
    /// Tolerance band between target and actual local notional.
    pub adjustment: Decimal,
}

impl Thresholds {
    /// Build from percent values as they appear in configuration.
    pub fn from_percent(change_pct: Decimal, adjustment_pct: Decimal) -> Self {
        Self {
            change: change_pct.percent_to_fraction(),
            adjustment: adjustment_pct.percent_to_fraction(),
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::from_percent(Decimal::new(rust_decimal::Decimal::new(5, 1)), Decimal::from(10))
    }
}

/// Margin sizing knobs handed to the trading runtime with each intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizingConfig {
    /// Effective leverage assumed for every copied position.
    pub leverage: Decimal,
    pub max_leverage: Decimal,
    /// Use the tracked position's leverage instead of `leverage`.
    pub copy_leverage: bool,
    pub min_stake: Decimal,
    /// Margin shaved off each buy so the exchange does not reject it for
    /// insufficient balance.
    pub dust: Decimal,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            leverage: Decimal::from(6),
            max_leverage: Decimal::from(50),
            copy_leverage: false,
            min_stake: Decimal::from(10),
            dust: Decimal::new(rust_decimal::Decimal::new(51, 2)),
        }
    }
}

/// Everything the pure pipeline needs besides its data inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineConfig {
    pub thresholds: Thresholds,
    pub mode: CopyMode,
    pub sizing: SizingConfig,
    pub max_open_trades: usize,
    /// Increase/decrease intents are withheld for this long after one is emitted.
    pub adjustment_cooldown_ms: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            mode: CopyMode::LongOnly,
            sizing: SizingConfig::default(),
            max_open_trades: 10,
            adjustment_cooldown_ms: 120_000,
        }
    }
}
