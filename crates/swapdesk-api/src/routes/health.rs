//! Health check endpoint

use axum::{extract::State, Json};

use crate::dto::HealthResponse;
use crate::server::chain_label;
use crate::AppState;

/// GET /health - Chain mode, selected account and intent availability
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        chain: chain_label(&state),
        account: state.account().address(),
        intent_enabled: !state.config().completion.api_key.trim().is_empty(),
        ..HealthResponse::default()
    })
}
