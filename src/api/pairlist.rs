use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::AppState;
use crate::domain::PositionSnapshot;
use crate::engine::{copyable_positions, EngineConfig};
use crate::error::AppError;

/// Body shape the trading runtime's remote pairlist handler polls.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct PairlistResponse {
    pub pairs: Vec<String>,
    pub refresh_period: u64,
}

pub async fn get_pairlist(State(state): State<AppState>) -> Result<Json<PairlistResponse>, AppError> {
    let board = state.status.read().await;
    let tracked = board
        .tracked
        .as_ref()
        .ok_or_else(|| AppError::NotReady("no tracked snapshot yet".into()))?;

    Ok(Json(PairlistResponse {
        pairs: pairs_for(
            tracked,
            &state.config.engine_config(),
            &state.config.pair_suffix,
            state.config.max_pairs,
        ),
        refresh_period: state.config.poll_interval.as_secs(),
    }))
}

/// Pair names for the tracked coins the engine would copy, largest notional
/// first, ties by coin. Shorts in long-only mode and positions below the
/// change threshold are left out.
pub fn pairs_for(
    snapshot: &PositionSnapshot,
    config: &EngineConfig,
    suffix: &str,
    max_pairs: usize,
) -> Vec<String> {
    let mut positions: Vec<_> = copyable_positions(snapshot, config).collect();
    positions.sort_by(|a, b| {
        b.notional()
            .cmp(&a.notional())
            .then_with(|| a.coin.cmp(&b.coin))
    });
    positions
        .into_iter()
        .take(max_pairs)
        .map(|p| p.coin.to_pair(suffix))
        .collect()
}
