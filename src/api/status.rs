use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::AppState;
use crate::domain::{ChangeEvent, Decimal, ReconcileNotice, ReconciliationDecision, ScaledTarget};
use crate::engine::{SkippedPosition, TradeIntent};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub tracked_address: String,
    pub local_address: String,
    pub cycles_ok: u64,
    pub cycles_failed: u64,
    pub last_cycle_at: Option<i64>,
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_cycle: Option<CycleReport>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub timestamp: i64,
    pub tracked_refreshed: bool,
    pub scale_factor: Decimal,
    pub tracked_account_value: Decimal,
    pub local_account_value: Decimal,
    pub targets: Vec<ScaledTarget>,
    pub skipped: Vec<SkippedPosition>,
    pub changes: Vec<ChangeEvent>,
    pub decisions: Vec<ReconciliationDecision>,
    pub intents: Vec<TradeIntent>,
    pub notices: Vec<ReconcileNotice>,
}

pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let board = state.status.read().await;

    let last_cycle = board.last_outcome.as_ref().map(|outcome| CycleReport {
        timestamp: outcome.timestamp.as_ms(),
        tracked_refreshed: outcome.tracked_refreshed,
        scale_factor: outcome.plan.scale_factor,
        tracked_account_value: outcome.plan.tracked_account_value,
        local_account_value: outcome.plan.local_account_value,
        targets: outcome.plan.targets.values().cloned().collect(),
        skipped: outcome.plan.skipped.clone(),
        changes: outcome.changes.clone(),
        decisions: outcome.reconciliation.decisions.clone(),
        intents: outcome.intents.clone(),
        notices: outcome.notices.clone(),
    });

    Json(StatusResponse {
        tracked_address: state.config.tracked_address.to_string(),
        local_address: state.config.local_address.to_string(),
        cycles_ok: board.cycles_ok,
        cycles_failed: board.cycles_failed,
        last_cycle_at: board.last_cycle_at.map(|t| t.as_ms()),
        last_error: board.last_error.clone(),
        last_cycle,
    })
}
