//! Axum router wiring.
//!
//! - `POST /rpc/{service}/{method}`: unary calls
//! - `GET /rpc/Admin/Logging`, `GET /rpc/Admin/Statistics`: WS push streams
//! - `/healthz`, `/readyz`, `/metrics`: ops

use axum::{
    routing::{get, post},
    Router,
};

use crate::{app_state::AppState, ops, transport};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/rpc/Admin/Logging", get(transport::ws::logging_upgrade))
        .route("/rpc/Admin/Statistics", get(transport::ws::statistics_upgrade))
        .route("/rpc/:service/:method", post(transport::rpc::unary))
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .route("/metrics", get(ops::metrics))
        .with_state(state)
}
