//! Handoff consumption

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};
use swapdesk_core::{Operation, PendingOperation};

use crate::dto::PendingResponse;
use crate::AppState;

/// GET /pending/:operation - Load the waiting operation into its form.
///
/// Consumes the handoff only when it targets `operation`.
pub async fn load_pending(
    State(state): State<AppState>,
    Path(operation): Path<Operation>,
) -> Response {
    let handoff = state.handoff();
    match operation {
        Operation::Swap => {
            let loaded = state.swap().load_pending(handoff).await;
            respond(loaded, state.swap().form().await)
        }
        Operation::Deposit => {
            let loaded = state.deposit().load_pending(handoff).await;
            respond(loaded, state.deposit().form().await)
        }
        Operation::Redeem => {
            let loaded = state.redeem().load_pending(handoff).await;
            respond(loaded, state.redeem().form().await)
        }
    }
}

fn respond<F: serde::Serialize>(loaded: Option<PendingOperation>, form: F) -> Response {
    Json(PendingResponse { loaded, form }).into_response()
}
