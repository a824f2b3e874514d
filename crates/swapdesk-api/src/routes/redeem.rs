//! Remove-liquidity routes

use amm::{RedeemForm, RedeemQuote};
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
        .route("/max", post(max))
        .route("/approve", post(approve))
        .route("/execute", post(execute))
}

async fn get_form(State(state): State<AppState>) -> Json<RedeemForm> {
    Json(state.redeem().form().await)
}

async fn preview(
    State(state): State<AppState>,
    Json(form): Json<RedeemForm>,
) -> ApiResult<FormResponse<RedeemForm, RedeemQuote>> {
    let (form, action) = state.redeem().preview_with(form).await.map_err(protocol_error)?;
    Ok(Json(FormResponse { form, action }))
}

/// POST /redeem/max - Select the whole LP position and quote it
async fn max(State(state): State<AppState>) -> ApiResult<FormResponse<RedeemForm, RedeemQuote>> {
    let redeem = state.redeem();
    let form = redeem.set_max().await;
    let (form, action) = redeem.preview_with(form).await.map_err(protocol_error)?;
    Ok(Json(FormResponse { form, action }))
}

/// POST /redeem/approve - Approve the LP token for the router
async fn approve(State(state): State<AppState>) -> ApiResult<ApproveResponse> {
    let receipt = state.redeem().approve().await.map_err(protocol_error)?;
    Ok(Json(ApproveResponse {
        tx: receipt.map(Into::into),
    }))
}

async fn execute(State(state): State<AppState>) -> ApiResult<TxResponse> {
    let receipt = state.redeem().execute().await.map_err(protocol_error)?;
    Ok(Json(receipt.into()))
}
