//! Turns reconciliation decisions into trade intents for the trading runtime.

use serde::Serialize;

use crate::domain::{
    Coin, DecisionKind, DecisionReason, Decimal, Direction, PositionSnapshot, ReconcileNotice,
    ReconciliationDecision, TimeMs,
};
use crate::engine::{sizing, EngineConfig, Reconciliation, ScalePlan, SizingConfig};

/// What the runtime should do for one coin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentAction {
    EnterLong,
    EnterShort,
    Exit,
    ForceExit,
    Increase,
    Decrease,
}

impl IntentAction {
    /// Lower runs first. Forced exits always precede ordinary exits, and
    /// anything that frees margin precedes anything that consumes it.
    pub fn priority(&self) -> u8 {
        match self {
            IntentAction::ForceExit => 0,
            IntentAction::Exit => 1,
            IntentAction::Decrease => 2,
            IntentAction::Increase => 3,
            IntentAction::EnterLong | IntentAction::EnterShort => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IntentAction::EnterLong => "enter_long",
            IntentAction::EnterShort => "enter_short",
            IntentAction::Exit => "exit",
            IntentAction::ForceExit => "force_exit",
            IntentAction::Increase => "increase",
            IntentAction::Decrease => "decrease",
        }
    }

    pub fn is_adjustment(&self) -> bool {
        matches!(self, IntentAction::Increase | IntentAction::Decrease)
    }

    pub fn decision_kind(&self) -> DecisionKind {
        match self {
            IntentAction::EnterLong | IntentAction::EnterShort => DecisionKind::Enter,
            IntentAction::Exit => DecisionKind::Exit,
            IntentAction::ForceExit => DecisionKind::ForceExitWrongDirection,
            IntentAction::Increase => DecisionKind::Increase,
            IntentAction::Decrease => DecisionKind::Decrease,
        }
    }

    fn from_decision(decision: &ReconciliationDecision) -> Option<Self> {
        match decision.kind {
            DecisionKind::Enter => Some(match decision.direction {
                Direction::Long => IntentAction::EnterLong,
                Direction::Short => IntentAction::EnterShort,
            }),
            DecisionKind::Exit => Some(IntentAction::Exit),
            DecisionKind::ForceExitWrongDirection => Some(IntentAction::ForceExit),
            DecisionKind::Increase => Some(IntentAction::Increase),
            DecisionKind::Decrease => Some(IntentAction::Decrease),
            DecisionKind::NoAction => None,
        }
    }
}

impl std::fmt::Display for IntentAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One instruction for the trading runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TradeIntent {
    /// Stable across redeliveries of the same cycle; the runtime drops repeats.
    pub key: String,
    pub coin: Coin,
    pub action: IntentAction,
    pub priority: u8,
    /// Signed notional change, positive adds exposure.
    pub notional_delta: Decimal,
    /// Signed margin, in quote currency.
    pub stake: Decimal,
    pub leverage: Decimal,
    pub reason: DecisionReason,
}

impl TradeIntent {
    pub fn intent_key(coin: &Coin, action: IntentAction, cycle_ts: TimeMs) -> String {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(coin.as_str());
        hasher.update(action.as_str());
        hasher.update(cycle_ts.as_ms().to_le_bytes());
        let hash = hasher.finalize();
        format!("intent:{}", hex::encode(&hash[..16]))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Emission {
    /// Sorted by priority, then coin.
    pub intents: Vec<TradeIntent>,
    pub notices: Vec<ReconcileNotice>,
}

#[derive(Debug, Clone)]
pub struct SignalEmitter {
    sizing: SizingConfig,
    max_open_trades: usize,
}

impl SignalEmitter {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            sizing: config.sizing,
            max_open_trades: config.max_open_trades,
        }
    }

    /// Emit at most one intent per coin.
    ///
    /// Entries only take the slots left under `max_open_trades` once this
    /// cycle's exits are counted; larger targets win and the rest are
    /// reported as deferred.
    pub fn emit(
        &self,
        reconciliation: &Reconciliation,
        plan: &ScalePlan,
        local: &PositionSnapshot,
        cycle_ts: TimeMs,
    ) -> Emission {
        let mut emission = Emission::default();

        let exits = reconciliation
            .decisions
            .iter()
            .filter(|d| {
                matches!(
                    d.kind,
                    DecisionKind::Exit | DecisionKind::ForceExitWrongDirection
                )
            })
            .count();
        let mut free_slots = self
            .max_open_trades
            .saturating_sub(local.len().saturating_sub(exits));

        let mut entries: Vec<&ReconciliationDecision> = reconciliation
            .decisions
            .iter()
            .filter(|d| d.kind == DecisionKind::Enter)
            .collect();
        entries.sort_by(|a, b| b.magnitude.cmp(&a.magnitude).then_with(|| a.coin.cmp(&b.coin)));

        for entry in entries {
            if free_slots == 0 {
                emission.notices.push(ReconcileNotice::EntryDeferred {
                    coin: entry.coin.clone(),
                    target_notional: entry.magnitude,
                });
                continue;
            }
            free_slots -= 1;
            emission.intents.extend(self.intent(entry, plan, local, cycle_ts));
        }

        for decision in reconciliation
            .decisions
            .iter()
            .filter(|d| d.kind != DecisionKind::Enter)
        {
            emission
                .intents
                .extend(self.intent(decision, plan, local, cycle_ts));
        }

        emission
            .intents
            .sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.coin.cmp(&b.coin)));
        emission
    }

    fn intent(
        &self,
        decision: &ReconciliationDecision,
        plan: &ScalePlan,
        local: &PositionSnapshot,
        cycle_ts: TimeMs,
    ) -> Option<TradeIntent> {
        let action = IntentAction::from_decision(decision)?;

        let (leverage, stake) = match action {
            IntentAction::EnterLong | IntentAction::EnterShort => {
                let tracked = plan.target(&decision.coin).map(|t| t.tracked_leverage);
                let leverage = sizing::select_leverage(tracked, &self.sizing);
                (
                    leverage,
                    sizing::entry_stake(decision.magnitude, leverage, &self.sizing),
                )
            }
            _ => {
                let leverage = local
                    .get(&decision.coin)
                    .map(|p| p.leverage)
                    .unwrap_or(self.sizing.leverage);
                (
                    leverage,
                    sizing::adjustment_stake(decision.magnitude, leverage, &self.sizing),
                )
            }
        };

        Some(TradeIntent {
            key: TradeIntent::intent_key(&decision.coin, action, cycle_ts),
            coin: decision.coin.clone(),
            action,
            priority: action.priority(),
            notional_delta: decision.magnitude,
            stake,
            leverage,
            reason: decision.reason,
        })
    }
}
