//! Ether wrapping routes

use axum::{extract::State, routing::post, Json, Router};

use crate::dto::{protocol_error, AmountRequest, ApiResult, TxResponse};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/wrap", post(wrap))
        .route("/unwrap", post(unwrap))
}

async fn wrap(
    State(state): State<AppState>,
    Json(request): Json<AmountRequest>,
) -> ApiResult<TxResponse> {
    let receipt = amm::weth::wrap(state.amm(), &request.amount)
        .await
        .map_err(protocol_error)?;
    Ok(Json(receipt.into()))
}

async fn unwrap(
    State(state): State<AppState>,
    Json(request): Json<AmountRequest>,
) -> ApiResult<TxResponse> {
    let receipt = amm::weth::unwrap(state.amm(), &request.amount)
        .await
        .map_err(protocol_error)?;
    Ok(Json(receipt.into()))
}
