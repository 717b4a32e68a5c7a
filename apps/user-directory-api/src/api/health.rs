//! Readiness endpoint

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use axum_helpers::{HealthCheckFuture, run_health_checks};
use serde_json::Value;

use crate::state::AppState;

/// `GET /ready`: 200 when MongoDB answers a ping, 503 otherwise
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ready", get(readiness_check))
        .with_state(state)
}

async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let checks: Vec<(&str, HealthCheckFuture)> = vec![(
        "mongodb",
        Box::pin(async {
            let status = database::mongodb::check_health(&state.mongo_client).await;
            tracing::debug!(response_time_ms = status.response_time_ms, "MongoDB ping");

            if status.healthy {
                Ok(())
            } else {
                Err(status.message.unwrap_or_default())
            }
        }) as HealthCheckFuture,
    )];

    run_health_checks(checks).await
}
