//! Typed transitions of the tracked account between two snapshots.

use serde::{Deserialize, Serialize};

use crate::domain::{Coin, Decimal, TimeMs};

/// Kind of transition observed for one coin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    OpenedLong,
    OpenedShort,
    Closed,
    Increased,
    Decreased,
    /// Direction reversed between observations. Informational only.
    Flipped,
    /// Same size, different entry price or leverage. Informational only.
    Modified,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::OpenedLong => "opened_long",
            ChangeKind::OpenedShort => "opened_short",
            ChangeKind::Closed => "closed",
            ChangeKind::Increased => "increased",
            ChangeKind::Decreased => "decreased",
            ChangeKind::Flipped => "flipped",
            ChangeKind::Modified => "modified",
        }
    }

    /// Whether this kind may drive a trading decision.
    pub fn is_actionable(&self) -> bool {
        !matches!(self, ChangeKind::Flipped | ChangeKind::Modified)
    }

    pub fn is_opened(&self) -> bool {
        matches!(self, ChangeKind::OpenedLong | ChangeKind::OpenedShort)
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One coin's transition between two consecutive tracked snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub coin: Coin,
    pub kind: ChangeKind,
    pub old_size: Option<Decimal>,
    pub new_size: Decimal,
    pub old_notional: Option<Decimal>,
    pub new_notional: Decimal,
    pub timestamp: TimeMs,
}
