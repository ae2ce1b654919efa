//! Async polling loop around the pure cycle step.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join;
use serde::Serialize;
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, warn};

use crate::datasource::{SnapshotFetcher, WhitelistProvider};
use crate::domain::{DecisionKind, PositionSnapshot, ReconcileNotice, TimeMs};
use crate::engine::EngineConfig;
use crate::error::CycleError;
use crate::orchestration::cycle::{self, CopyState, CycleOutcome, Observation};
use crate::persistence::HistorySink;

/// What the status API reports about the loop.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusBoard {
    pub cycles_ok: u64,
    pub cycles_failed: u64,
    pub last_cycle_at: Option<TimeMs>,
    pub last_outcome: Option<CycleOutcome>,
    pub last_error: Option<String>,
    /// Tracked snapshot the last successful cycle used.
    pub tracked: Option<PositionSnapshot>,
}

impl StatusBoard {
    /// Ready once at least one cycle has completed.
    pub fn is_ready(&self) -> bool {
        self.last_outcome.is_some()
    }
}

pub type SharedStatus = Arc<RwLock<StatusBoard>>;

/// Owns the copy state and sequences cycles; never runs two at once.
#[derive(Debug)]
pub struct Orchestrator {
    fetcher: Arc<dyn SnapshotFetcher>,
    whitelist: Arc<dyn WhitelistProvider>,
    sink: Arc<dyn HistorySink>,
    config: EngineConfig,
    state: CopyState,
    status: SharedStatus,
}

impl Orchestrator {
    pub fn new(
        fetcher: Arc<dyn SnapshotFetcher>,
        whitelist: Arc<dyn WhitelistProvider>,
        sink: Arc<dyn HistorySink>,
        config: EngineConfig,
        state: CopyState,
    ) -> Self {
        Self {
            fetcher,
            whitelist,
            sink,
            config,
            state,
            status: Arc::new(RwLock::new(StatusBoard::default())),
        }
    }

    /// Handle shared with the status API.
    pub fn status(&self) -> SharedStatus {
        self.status.clone()
    }

    pub fn state(&self) -> &CopyState {
        &self.state
    }

    /// Run one fetch → diff → scale → reconcile → emit cycle.
    ///
    /// Any failure abandons the whole cycle and leaves the retained state
    /// untouched. Persistence failures are logged but do not undo the cycle.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome, CycleError> {
        match self.try_cycle().await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                warn!(error = %err, "Cycle abandoned, keeping previous snapshots");
                let mut status = self.status.write().await;
                status.cycles_failed += 1;
                status.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    async fn try_cycle(&mut self) -> Result<CycleOutcome, CycleError> {
        let (tracked, local) = join(
            self.fetcher.fetch_snapshot(&self.state.tracked_account),
            self.fetcher.fetch_snapshot(&self.state.local_account),
        )
        .await;
        let tracked = tracked.map_err(CycleError::Fetch)?;
        let local = local.map_err(CycleError::Fetch)?;
        if tracked.is_none() {
            debug!("No new tracked snapshot, reusing retained one");
        }

        let whitelist = self
            .whitelist
            .fetch_whitelist()
            .await
            .map_err(CycleError::Whitelist)?;
        debug!(coins = ?whitelist.coin_count(), "Whitelist fetched");

        let observation = Observation {
            tracked,
            local,
            whitelist,
        };
        let (next, outcome) = cycle::step(&self.state, observation, &self.config)?;
        log_outcome(&outcome);

        // `step` always retains both snapshots on success.
        if let Some(tracked) = next.tracked.as_ref() {
            if let Err(err) = self.sink.record_cycle(&outcome, tracked) {
                warn!(error = %err, "Failed to persist cycle history");
            }
        }

        {
            let mut status = self.status.write().await;
            status.cycles_ok += 1;
            status.last_cycle_at = Some(outcome.timestamp);
            status.last_outcome = Some(outcome.clone());
            status.last_error = None;
            status.tracked = next.tracked.clone();
        }

        self.state = next;
        Ok(outcome)
    }

    /// Tick every `period` until `shutdown` flips to true or its sender is dropped.
    pub async fn run(mut self, period: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(period_secs = period.as_secs(), "Copy loop started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // Errors are already logged and counted.
                    let _ = self.run_cycle().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!(cycles = self.state.cycles, "Copy loop stopped");
    }
}

fn log_outcome(outcome: &CycleOutcome) {
    info!(
        scale_factor = %outcome.plan.scale_factor,
        tracked_value = %outcome.plan.tracked_account_value,
        local_value = %outcome.plan.local_account_value,
        changes = outcome.changes.len(),
        intents = outcome.intents.len(),
        "Cycle complete"
    );

    for change in &outcome.changes {
        info!(
            coin = %change.coin,
            kind = %change.kind,
            old_size = ?change.old_size.map(|s| s.to_string()),
            new_size = %change.new_size,
            "Tracked position change"
        );
    }

    for decision in &outcome.reconciliation.decisions {
        if decision.kind == DecisionKind::NoAction {
            debug!(
                coin = %decision.coin,
                diff_pct = ?decision.diff_pct.map(|d| d.to_percent().round_dp(2).to_string()),
                "Within tolerance"
            );
        }
    }

    for intent in &outcome.intents {
        info!(
            coin = %intent.coin,
            action = %intent.action,
            notional_delta = %intent.notional_delta,
            stake = %intent.stake,
            leverage = %intent.leverage,
            reason = %intent.reason,
            "Trade intent"
        );
    }

    for notice in &outcome.notices {
        match notice {
            ReconcileNotice::MissingNotTradable {
                coin,
                target_notional,
            } => warn!(coin = %coin, target = %target_notional, "Target not tradable, not entering"),
            ReconcileNotice::EntryDeferred {
                coin,
                target_notional,
            } => warn!(coin = %coin, target = %target_notional, "Open trade limit reached, entry deferred"),
            ReconcileNotice::AdjustmentSuppressed {
                coin,
                kind,
                remaining_ms,
            } => warn!(coin = %coin, kind = %kind, remaining_ms, "Adjustment suppressed by cooldown"),
        }
    }
}
