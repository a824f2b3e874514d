//! Add-liquidity routes

use amm::{DepositForm, DepositQuote};
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
        .route("/approve", post(approve))
        .route("/execute", post(execute))
}

async fn get_form(State(state): State<AppState>) -> Json<DepositForm> {
    Json(state.deposit().form().await)
}

async fn preview(
    State(state): State<AppState>,
    Json(form): Json<DepositForm>,
) -> ApiResult<FormResponse<DepositForm, DepositQuote>> {
    let (form, action) = state.deposit().preview_with(form).await.map_err(protocol_error)?;
    Ok(Json(FormResponse { form, action }))
}

/// POST /deposit/approve - Approve the next token lacking allowance
async fn approve(State(state): State<AppState>) -> ApiResult<ApproveResponse> {
    let receipt = state.deposit().approve().await.map_err(protocol_error)?;
    Ok(Json(ApproveResponse {
        tx: receipt.map(Into::into),
    }))
}

async fn execute(State(state): State<AppState>) -> ApiResult<TxResponse> {
    let receipt = state.deposit().execute().await.map_err(protocol_error)?;
    Ok(Json(receipt.into()))
}
