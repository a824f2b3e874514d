//! Swap routes

use amm::{SwapForm, SwapQuote};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use crate::dto::{protocol_error, ApiResult, ApproveResponse, FormResponse, TxResponse};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_form))
        .route("/preview", post(preview))
        .route("/switch", post(switch_tokens))
        .route("/approve", post(approve))
        .route("/execute", post(execute))
}

async fn get_form(State(state): State<AppState>) -> Json<SwapForm> {
    Json(state.swap().form().await)
}

/// POST /swap/preview - Store the form and quote it
async fn preview(
    State(state): State<AppState>,
    Json(form): Json<SwapForm>,
) -> ApiResult<FormResponse<SwapForm, SwapQuote>> {
    let (form, action) = state.swap().preview_with(form).await.map_err(protocol_error)?;
    Ok(Json(FormResponse { form, action }))
}

/// POST /swap/switch - Swap input and output tokens
async fn switch_tokens(State(state): State<AppState>) -> Json<SwapForm> {
    Json(state.swap().switch_tokens().await)
}

async fn approve(State(state): State<AppState>) -> ApiResult<ApproveResponse> {
    let receipt = state.swap().approve().await.map_err(protocol_error)?;
    Ok(Json(ApproveResponse {
        tx: receipt.map(Into::into),
    }))
}

async fn execute(State(state): State<AppState>) -> ApiResult<TxResponse> {
    let receipt = state.swap().execute().await.map_err(protocol_error)?;
    Ok(Json(receipt.into()))
}
