//! Matches local holdings against the scaled target set.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::domain::{
    ChangeEvent, ChangeKind, Coin, DecisionKind, DecisionReason, Position, PositionSnapshot,
    ReconcileNotice, ReconciliationDecision, ScaledTarget, Whitelist,
};
use crate::engine::{EngineConfig, ScalePlan, SkipReason};

/// Output of one reconciliation pass: at most one decision per coin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub decisions: Vec<ReconciliationDecision>,
    pub notices: Vec<ReconcileNotice>,
}

impl Reconciliation {
    pub fn decision(&self, coin: &Coin) -> Option<&ReconciliationDecision> {
        self.decisions.iter().find(|d| &d.coin == coin)
    }

    /// Decisions that require a trade, i.e. everything except `no_action`.
    pub fn actionable(&self) -> impl Iterator<Item = &ReconciliationDecision> {
        self.decisions
            .iter()
            .filter(|d| d.kind != DecisionKind::NoAction)
    }
}

/// Reconcile local positions against `plan`, coin by coin in symbol order.
///
/// Wrong-direction local positions are force-exited before any other rule
/// and regardless of thresholds. `changes` only colours the reason attached
/// to a decision; it never changes which decision is taken.
pub fn reconcile(
    plan: &ScalePlan,
    local: &PositionSnapshot,
    whitelist: &Whitelist,
    changes: &[ChangeEvent],
    config: &EngineConfig,
) -> Reconciliation {
    let coins: BTreeSet<&Coin> = plan.targets.keys().chain(local.coins()).collect();
    let mut out = Reconciliation::default();

    for coin in coins {
        let event = changes
            .iter()
            .find(|e| &e.coin == coin && e.kind.is_actionable())
            .map(|e| e.kind);

        match (plan.target(coin), local.get(coin)) {
            (target, Some(actual)) => {
                if let Some(decision) = wrong_direction(plan, coin, target, actual, config) {
                    out.decisions.push(decision);
                } else if let Some(target) = target {
                    out.decisions.push(matched(target, actual, event, config));
                } else {
                    out.decisions.push(unmatched_local(plan, coin, actual, event));
                }
            }
            (Some(target), None) => {
                if whitelist.contains(coin) {
                    let reason = if event.is_some_and(|k| k.is_opened()) {
                        DecisionReason::TrackedOpened
                    } else {
                        DecisionReason::MissedEntry
                    };
                    out.decisions.push(ReconciliationDecision {
                        coin: coin.clone(),
                        kind: DecisionKind::Enter,
                        magnitude: target.target_local_notional,
                        reason,
                        direction: target.direction,
                        target_notional: Some(target.target_local_notional),
                        actual_notional: None,
                        diff_pct: None,
                    });
                } else {
                    out.notices.push(ReconcileNotice::MissingNotTradable {
                        coin: coin.clone(),
                        target_notional: target.target_local_notional,
                    });
                }
            }
            (None, None) => {}
        }
    }

    out
}

fn wrong_direction(
    plan: &ScalePlan,
    coin: &Coin,
    target: Option<&ScaledTarget>,
    actual: &Position,
    config: &EngineConfig,
) -> Option<ReconciliationDecision> {
    let direction = actual.direction();
    let reason = if !config.mode.permits(direction) {
        DecisionReason::DirectionNotCopied
    } else if plan
        .tracked_direction(coin)
        .is_some_and(|tracked| tracked != direction)
    {
        DecisionReason::DirectionMismatch
    } else {
        return None;
    };

    Some(ReconciliationDecision {
        coin: coin.clone(),
        kind: DecisionKind::ForceExitWrongDirection,
        magnitude: -actual.notional(),
        reason,
        direction,
        target_notional: target.map(|t| t.target_local_notional),
        actual_notional: Some(actual.notional()),
        diff_pct: None,
    })
}

fn matched(
    target: &ScaledTarget,
    actual: &Position,
    event: Option<ChangeKind>,
    config: &EngineConfig,
) -> ReconciliationDecision {
    let target_notional = target.target_local_notional;
    let actual_notional = actual.notional();
    let delta = target_notional - actual_notional;
    let diff_pct = (actual_notional - target_notional).checked_div(target_notional);

    let within_band = diff_pct.is_some_and(|diff| diff.abs() <= config.thresholds.adjustment);
    let (kind, reason) = if within_band {
        (DecisionKind::NoAction, DecisionReason::WithinTolerance)
    } else if delta.is_positive() {
        let reason = match event {
            Some(ChangeKind::Increased) => DecisionReason::TrackedIncreased,
            _ => DecisionReason::Drift,
        };
        (DecisionKind::Increase, reason)
    } else {
        let reason = match event {
            Some(ChangeKind::Decreased) => DecisionReason::TrackedDecreased,
            _ => DecisionReason::Drift,
        };
        (DecisionKind::Decrease, reason)
    };

    ReconciliationDecision {
        coin: target.coin.clone(),
        kind,
        magnitude: delta,
        reason,
        direction: target.direction,
        target_notional: Some(target_notional),
        actual_notional: Some(actual_notional),
        diff_pct,
    }
}

fn unmatched_local(
    plan: &ScalePlan,
    coin: &Coin,
    actual: &Position,
    event: Option<ChangeKind>,
) -> ReconciliationDecision {
    let reason = if event == Some(ChangeKind::Closed) {
        DecisionReason::TrackedClosed
    } else if plan.skip_reason(coin) == Some(SkipReason::BelowSignificance) {
        DecisionReason::BelowSignificance
    } else {
        DecisionReason::MissedExit
    };

    ReconciliationDecision {
        coin: coin.clone(),
        kind: DecisionKind::Exit,
        magnitude: -actual.notional(),
        reason,
        direction: actual.direction(),
        target_notional: None,
        actual_notional: Some(actual.notional()),
        diff_pct: None,
    }
}
