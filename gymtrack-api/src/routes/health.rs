/// Health check endpoint
///
/// Public endpoint for load balancers and orchestration probes. Reports
/// overall status plus database connectivity.
use axum::{extract::State, Json};
use serde::Serialize;

use crate::app::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status: "healthy" or "degraded"
    pub status: String,

    /// Crate version
    pub version: String,

    /// Database status: "connected" or "disconnected"
    pub database: String,
}

/// GET /health
///
/// Always returns 200; a failing dependency is reported in the body so
/// probes can distinguish "down" from "degraded".
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database_ok = gymtrack_shared::db::pool::health_check(&state.db)
        .await
        .is_ok();

    let response = HealthResponse {
        status: if database_ok { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if database_ok {
            "connected"
        } else {
            "disconnected"
        }
        .to_string(),
    };

    Json(response)
}
