//! Wallet account routes

use axum::{extract::State, Json};
use swapdesk_core::parse_address;

use crate::dto::{protocol_error, AccountResponse, ApiResult, SetAccountRequest};
use crate::AppState;

/// GET /account - Connected account and its change counter
pub async fn get_account(State(state): State<AppState>) -> Json<AccountResponse> {
    let snapshot = state.account().current();
    Json(AccountResponse {
        address: snapshot.address,
        epoch: snapshot.epoch,
    })
}

/// PUT /account - Switch or disconnect the account; RPC sessions only accept their signer
pub async fn set_account(
    State(state): State<AppState>,
    Json(request): Json<SetAccountRequest>,
) -> ApiResult<AccountResponse> {
    let address = match request.address.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(value) => Some(parse_address(value).map_err(protocol_error)?),
    };
    let snapshot = state.account().try_set(address).map_err(protocol_error)?;
    Ok(Json(AccountResponse {
        address: snapshot.address,
        epoch: snapshot.epoch,
    }))
}
