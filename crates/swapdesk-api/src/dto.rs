//! Data Transfer Objects for API requests and responses

use alloy_primitives::Address;
use amm::{Action, Notification, Pool};
use axum::{http::StatusCode, Json};
use evm_gateway::{short_hash, TxReceipt};
use intent::{IntentError, ResolvedIntent};
use serde::{Deserialize, Serialize};
use swapdesk_core::{Operation, PendingOperation, ProtocolError, Token};

/// Handler result: JSON body or an error status with an [`ApiError`]
pub type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// "simulated" or the RPC URL
    pub chain: String,
    pub account: Option<Address>,
    pub intent_enabled: bool,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            chain: String::new(),
            account: None,
            intent_enabled: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolsResponse {
    pub pools: Vec<Pool>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectPoolRequest {
    pub pool: Address,
    pub operation: Operation,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokensResponse {
    pub tokens: Vec<Token>,
}

/// Form state and the action it currently allows
#[derive(Debug, Clone, Serialize)]
pub struct FormResponse<F, Q> {
    pub form: F,
    pub action: Action<Q>,
}

/// Result of `GET /pending/{operation}`
#[derive(Debug, Clone, Serialize)]
pub struct PendingResponse<F> {
    /// The handed-off operation, if one was waiting
    pub loaded: Option<PendingOperation>,
    pub form: F,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxResponse {
    pub tx_hash: String,
    pub short_hash: String,
    pub block_number: Option<u64>,
}

impl From<TxReceipt> for TxResponse {
    fn from(receipt: TxReceipt) -> Self {
        Self {
            tx_hash: receipt.tx_hash.to_string(),
            short_hash: short_hash(&receipt.tx_hash),
            block_number: receipt.block_number,
        }
    }
}

/// Approval result; `tx` is absent when nothing needed approving
#[derive(Debug, Clone, Serialize)]
pub struct ApproveResponse {
    pub tx: Option<TxResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntentResponse {
    pub intent: ResolvedIntent,
    pub pending: PendingOperation,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResponse {
    pub address: Option<Address>,
    pub epoch: u64,
}

/// `address: null` disconnects
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetAccountRequest {
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationsResponse {
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmountRequest {
    pub amount: String,
}

/// Generic API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("not_found", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("bad_request", message)
    }
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Map a protocol error onto its HTTP status and error body
pub fn protocol_error(err: ProtocolError) -> (StatusCode, Json<ApiError>) {
    (
        status(err.status_code()),
        Json(ApiError::new(err.error_code(), err.to_string())),
    )
}

pub fn intent_error(err: IntentError) -> (StatusCode, Json<ApiError>) {
    (
        status(err.status_code()),
        Json(ApiError::new(err.error_code(), err.to_string())),
    )
}
