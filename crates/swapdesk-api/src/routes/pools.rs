//! Pool directory and token registry routes

use amm::{fetch_pool, list_pools, select_pool};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use swapdesk_core::units::{from_base_units, DEFAULT_DECIMALS};
use swapdesk_core::{PendingOperation, ProtocolError};

use crate::dto::{protocol_error, ApiResult, PoolsResponse, SelectPoolRequest, TokensResponse};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_pools))
        .route("/select", post(select))
}

/// GET /pools - Every pool the factory knows, with live reserves
async fn get_pools(State(state): State<AppState>) -> ApiResult<PoolsResponse> {
    let pools = list_pools(state.gateway()).await.map_err(protocol_error)?;
    let count = pools.len();
    Ok(Json(PoolsResponse { pools, count }))
}

/// POST /pools/select - Hand a pool to the swap, deposit or redeem form
async fn select(
    State(state): State<AppState>,
    Json(request): Json<SelectPoolRequest>,
) -> ApiResult<PendingOperation> {
    let pool = fetch_pool(state.gateway(), request.pool)
        .await
        .map_err(|e| protocol_error(ProtocolError::from(e)))?;
    let pending = select_pool(&pool, request.operation);
    state.handoff().post(pending.clone()).await;
    tracing::info!("Selected {} for {}", pool.pair_name, request.operation);
    Ok(Json(pending))
}

/// GET /tokens - Registry tokens, with wallet balances when an account is connected
pub async fn get_tokens(State(state): State<AppState>) -> Json<TokensResponse> {
    let registry = state.registry().await;
    let owner = state.account().address();
    let mut tokens = Vec::with_capacity(registry.len());

    for token in registry.tokens() {
        let Some(owner) = owner else {
            tokens.push(token.clone());
            continue;
        };
        match state.gateway().token(token.address).balance_of(owner).await {
            Ok(balance) => tokens
                .push(token.clone().with_balance(from_base_units(balance, DEFAULT_DECIMALS))),
            Err(e) => {
                tracing::warn!("Balance of {} unavailable: {}", token.symbol, e);
                tokens.push(token.clone());
            }
        }
    }
    Json(TokensResponse { tokens })
}
