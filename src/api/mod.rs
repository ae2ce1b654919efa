pub mod health;
pub mod pairlist;
pub mod status;

use crate::config::Config;
use crate::orchestration::SharedStatus;
use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub status: SharedStatus,
    pub config: Config,
}

impl AppState {
    pub fn new(status: SharedStatus, config: Config) -> Self {
        Self { status, config }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/status", get(status::get_status))
        .route("/v1/pairlist", get(pairlist::get_pairlist))
        .layer(cors)
        .with_state(state)
}
