//! Scaled targets and per-coin reconciliation outcomes.

use serde::{Deserialize, Serialize};

use crate::domain::{Coin, Decimal, Direction};

/// Desired local exposure for one significant tracked position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaledTarget {
    pub coin: Coin,
    pub direction: Direction,
    /// Always non-negative; direction carries the sign.
    pub target_local_notional: Decimal,
    /// Tracked position leverage, used when leverage copying is on.
    pub tracked_leverage: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    Enter,
    Exit,
    Increase,
    Decrease,
    NoAction,
    ForceExitWrongDirection,
}

impl DecisionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionKind::Enter => "enter",
            DecisionKind::Exit => "exit",
            DecisionKind::Increase => "increase",
            DecisionKind::Decrease => "decrease",
            DecisionKind::NoAction => "no_action",
            DecisionKind::ForceExitWrongDirection => "force_exit_wrong_direction",
        }
    }
}

impl std::fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the matcher reached a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// Tracked account opened the position this cycle.
    TrackedOpened,
    /// Target exists but no local position and no open event this cycle.
    MissedEntry,
    /// Tracked account closed the position this cycle.
    TrackedClosed,
    /// Tracked position still exists but fell under the significance threshold.
    BelowSignificance,
    /// Local position with no tracked counterpart and no close event this cycle.
    MissedExit,
    TrackedIncreased,
    TrackedDecreased,
    /// Local size drifted outside the tolerance band without a tracked change.
    Drift,
    WithinTolerance,
    /// Local direction is not copied under the current mode.
    DirectionNotCopied,
    /// Local direction disagrees with the tracked account's direction.
    DirectionMismatch,
}

impl DecisionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionReason::TrackedOpened => "tracked_opened",
            DecisionReason::MissedEntry => "missed_entry",
            DecisionReason::TrackedClosed => "tracked_closed",
            DecisionReason::BelowSignificance => "below_significance",
            DecisionReason::MissedExit => "missed_exit",
            DecisionReason::TrackedIncreased => "tracked_increased",
            DecisionReason::TrackedDecreased => "tracked_decreased",
            DecisionReason::Drift => "drift",
            DecisionReason::WithinTolerance => "within_tolerance",
            DecisionReason::DirectionNotCopied => "direction_not_copied",
            DecisionReason::DirectionMismatch => "direction_mismatch",
        }
    }
}

impl std::fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One coin's reconciliation outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationDecision {
    pub coin: Coin,
    pub kind: DecisionKind,
    /// Signed target-notional delta: positive buys exposure, negative sheds it.
    pub magnitude: Decimal,
    pub reason: DecisionReason,
    /// Direction of the local position this decision acts on (or will open).
    pub direction: Direction,
    pub target_notional: Option<Decimal>,
    pub actual_notional: Option<Decimal>,
    /// (actual - target) / target, when both sides exist.
    pub diff_pct: Option<Decimal>,
}

/// Visibility-only outcomes that do not produce a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReconcileNotice {
    /// Target exists but the coin is not tradable right now.
    MissingNotTradable {
        coin: Coin,
        target_notional: Decimal,
    },
    /// Entry withheld because the open-trade limit is reached.
    EntryDeferred {
        coin: Coin,
        target_notional: Decimal,
    },
    /// Increase/decrease withheld during the post-adjustment cooldown.
    AdjustmentSuppressed {
        coin: Coin,
        kind: DecisionKind,
        remaining_ms: i64,
    },
}

impl ReconcileNotice {
    pub fn coin(&self) -> &Coin {
        match self {
            ReconcileNotice::MissingNotTradable { coin, .. }
            | ReconcileNotice::EntryDeferred { coin, .. }
            | ReconcileNotice::AdjustmentSuppressed { coin, .. } => coin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_names_match_serde() {
        for reason in [
            DecisionReason::TrackedOpened,
            DecisionReason::BelowSignificance,
            DecisionReason::DirectionNotCopied,
        ] {
            let json = serde_json::to_string(&reason).unwrap();
            assert_eq!(json, format!("\"{}\"", reason));
        }
        assert_eq!(
            DecisionKind::ForceExitWrongDirection.to_string(),
            "force_exit_wrong_direction"
        );
    }

    #[test]
    fn test_notice_is_tagged() {
        let notice = ReconcileNotice::MissingNotTradable {
            coin: Coin::new("WLFI"),
            target_notional: Decimal::from(761),
        };
        let json = serde_json::to_value(&notice).unwrap();
        assert_eq!(json["type"], "missing_not_tradable");
        assert_eq!(json["coin"], "WLFI");
        assert_eq!(notice.coin(), &Coin::new("WLFI"));
    }
}
