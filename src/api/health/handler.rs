// Health handler

use axum::{extract::State, http::StatusCode};
use serde_json::json;
use tracing::{debug, instrument};

use crate::config::state::AppState;
use crate::utils::response_handler::HandlerResponse;

/// Reports whether the database pool is live. Answers 503 once the pool is gone,
/// which is the case while the process is shutting down.
#[instrument(skip(state))]
pub async fn health_handler(State(state): State<AppState>) -> HandlerResponse {
    let connected: bool = state.database.is_connected().await;
    debug!(connected, "Health endpoint called");

    let status_code: StatusCode = if connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    HandlerResponse::new(status_code)
        .data(json!({
            "version": env!("CARGO_PKG_VERSION"),
            "environment": state.environment.environment.as_ref(),
            "database": if connected { "connected" } else { "disconnected" },
        }))
}
