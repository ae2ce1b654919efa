use axum::extract::State;
use axum::Json;

use crate::api::AppState;
use crate::error::AppError;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Ready once the copy loop has completed a cycle.
pub async fn ready(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    if !state.status.read().await.is_ready() {
        return Err(AppError::NotReady("no copy cycle has completed yet".into()));
    }
    Ok(Json(serde_json::json!({"status": "ready"})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::domain::{Address, Decimal, PositionSnapshot, TimeMs, Whitelist};
    use crate::engine::EngineConfig;
    use crate::orchestration::{step, CopyState, Observation, StatusBoard};
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    fn state(board: StatusBoard) -> AppState {
        let mut env = HashMap::new();
        env.insert(
            "TRACKED_ADDRESS".to_string(),
            "0x95b8b411653328db32f59b143c6d45f8501e2b35".to_string(),
        );
        env.insert(
            "LOCAL_ADDRESS".to_string(),
            "0x0000000000000000000000000000000000000001".to_string(),
        );
        AppState::new(
            Arc::new(RwLock::new(board)),
            Config::from_env_map(env).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_health_returns_ok() {
        let Json(body) = health().await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_ready_before_first_cycle() {
        let result = ready(State(state(StatusBoard::default()))).await;
        assert!(matches!(result, Err(AppError::NotReady(_))));
    }

    #[tokio::test]
    async fn test_ready_after_cycle() {
        let tracked = Address::new("0xaaa".into());
        let local = Address::new("0xbbb".into());
        let observation = Observation {
            tracked: Some(PositionSnapshot::empty(tracked.clone(), Decimal::from(100), TimeMs::new(1))),
            local: Some(PositionSnapshot::empty(local.clone(), Decimal::from(10), TimeMs::new(1))),
            whitelist: Whitelist::All,
        };
        let (_, outcome) = step(
            &CopyState::new(tracked, local),
            observation,
            &EngineConfig::default(),
        )
        .unwrap();
        let board = StatusBoard {
            last_outcome: Some(outcome),
            ..StatusBoard::default()
        };
        let Json(body) = ready(State(state(board))).await.unwrap();
        assert_eq!(body["status"], "ready");
    }
}
