//! One polling cycle as a pure state transition.
//!
//! `step` owns no I/O and no clock: everything it needs arrives in the
//! previous `CopyState` and the new `Observation`, and everything it decides
//! leaves in the returned state and `CycleOutcome`. On error the caller keeps
//! the previous state, so a bad observation never corrupts what is retained.

use serde::Serialize;

use crate::domain::{Address, ChangeEvent, PositionSnapshot, ReconcileNotice, TimeMs, Whitelist};
use crate::engine::{
    compute_targets, detect_changes, reconcile, EngineConfig, Reconciliation, ScalePlan,
    SignalEmitter, TradeIntent,
};
use crate::error::EngineError;

/// Everything retained between cycles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopyState {
    pub tracked_account: Address,
    pub local_account: Address,
    /// Last accepted tracked snapshot.
    pub tracked: Option<PositionSnapshot>,
    /// Last accepted local snapshot.
    pub local: Option<PositionSnapshot>,
    /// Increase/decrease intents are withheld while the cycle time is before this.
    pub cooldown_until: Option<TimeMs>,
    pub cycles: u64,
}

impl CopyState {
    pub fn new(tracked_account: Address, local_account: Address) -> Self {
        Self {
            tracked_account,
            local_account,
            tracked: None,
            local: None,
            cooldown_until: None,
            cycles: 0,
        }
    }

    /// Seed the tracked side, e.g. from persisted history after a restart.
    pub fn with_tracked(mut self, snapshot: PositionSnapshot) -> Self {
        self.tracked = Some(snapshot);
        self
    }
}

/// Fresh data for one cycle. `None` means the fetcher had nothing new and the
/// retained snapshot is reused.
#[derive(Debug, Clone)]
pub struct Observation {
    pub tracked: Option<PositionSnapshot>,
    pub local: Option<PositionSnapshot>,
    pub whitelist: Whitelist,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleOutcome {
    /// Latest observation time of the two snapshots used.
    pub timestamp: TimeMs,
    /// Whether a new tracked snapshot was diffed this cycle.
    pub tracked_refreshed: bool,
    pub changes: Vec<ChangeEvent>,
    pub plan: ScalePlan,
    pub reconciliation: Reconciliation,
    pub intents: Vec<TradeIntent>,
    /// Reconciliation, capacity and cooldown notices.
    pub notices: Vec<ReconcileNotice>,
}

/// Advance the copy state by one observation.
pub fn step(
    state: &CopyState,
    observation: Observation,
    config: &EngineConfig,
) -> Result<(CopyState, CycleOutcome), EngineError> {
    let tracked_refreshed = observation.tracked.is_some();
    let tracked = accept(
        &state.tracked_account,
        state.tracked.as_ref(),
        observation.tracked,
    )?;
    let local = accept(&state.local_account, state.local.as_ref(), observation.local)?;

    let plan = compute_targets(&tracked, &local, config)?;

    let changes = if tracked_refreshed {
        detect_changes(state.tracked.as_ref(), &tracked, &config.thresholds)
    } else {
        Vec::new()
    };

    let cycle_ts = tracked.timestamp.max(local.timestamp);
    let reconciliation = reconcile(&plan, &local, &observation.whitelist, &changes, config);
    let emission = SignalEmitter::new(config).emit(&reconciliation, &plan, &local, cycle_ts);

    let mut notices = reconciliation.notices.clone();
    notices.extend(emission.notices);

    let cooling_until = state.cooldown_until.filter(|until| cycle_ts < *until);
    let mut intents = Vec::with_capacity(emission.intents.len());
    for intent in emission.intents {
        match cooling_until {
            Some(until) if intent.action.is_adjustment() => {
                notices.push(ReconcileNotice::AdjustmentSuppressed {
                    coin: intent.coin,
                    kind: intent.action.decision_kind(),
                    remaining_ms: until.as_ms() - cycle_ts.as_ms(),
                });
            }
            _ => intents.push(intent),
        }
    }

    let cooldown_until = if intents.iter().any(|i| i.action.is_adjustment()) {
        Some(cycle_ts.plus_ms(config.adjustment_cooldown_ms))
    } else {
        cooling_until
    };

    let next = CopyState {
        tracked_account: state.tracked_account.clone(),
        local_account: state.local_account.clone(),
        tracked: Some(tracked),
        local: Some(local),
        cooldown_until,
        cycles: state.cycles + 1,
    };

    let outcome = CycleOutcome {
        timestamp: cycle_ts,
        tracked_refreshed,
        changes,
        plan,
        reconciliation,
        intents,
        notices,
    };

    Ok((next, outcome))
}

/// Pick the snapshot to use for one account: the fresh one if it does not
/// go back in time, else the retained one.
fn accept(
    account: &Address,
    retained: Option<&PositionSnapshot>,
    fresh: Option<PositionSnapshot>,
) -> Result<PositionSnapshot, EngineError> {
    match (retained, fresh) {
        (Some(previous), Some(current)) if current.timestamp < previous.timestamp => {
            Err(EngineError::OutOfOrderSnapshot {
                account: account.clone(),
                previous: previous.timestamp,
                current: current.timestamp,
            })
        }
        (_, Some(current)) => Ok(current),
        (Some(previous), None) => Ok(previous.clone()),
        (None, None) => Err(EngineError::NoSnapshot {
            account: account.clone(),
        }),
    }
}
