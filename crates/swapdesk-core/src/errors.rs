//! Error types for Swapdesk

use thiserror::Error;

/// Core errors that can occur in Swapdesk
#[derive(Debug, Error)]
pub enum Error {
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Chain RPC and contract call errors
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("RPC endpoint unreachable at {url}")]
    Unreachable { url: String },

    #[error("Call {method} failed: {message}")]
    CallFailed { method: &'static str, message: String },

    #[error("Transaction {tx_hash} reverted")]
    Reverted { tx_hash: String },

    #[error("Confirmation failed for {tx_hash}: {message}")]
    ConfirmationFailed { tx_hash: String, message: String },

    #[error("No signer configured")]
    NoSigner,
}

/// Errors raised while quoting, approving or executing AMM operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("No liquidity in pool")]
    NoLiquidity,

    #[error("Pool has no LP supply")]
    NoSupply,

    #[error("Slippage {bps} bps out of range (0..10000)")]
    InvalidSlippage { bps: u32 },

    #[error("Insufficient {token} balance: need {required}, have {available}")]
    InsufficientBalance {
        token: String,
        required: String,
        available: String,
    },

    #[error("Could not resolve request: {reason}")]
    UnresolvedIntent { reason: String },

    #[error("Contract call failed: {message}")]
    ContractCallFailed { message: String },

    #[error("Response superseded by newer input")]
    StaleResponse,

    #[error("No wallet account connected")]
    NoAccount,

    #[error("Pool not found for {pair}")]
    PoolNotFound { pair: String },
}

impl ProtocolError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn unresolved(reason: impl Into<String>) -> Self {
        Self::UnresolvedIntent {
            reason: reason.into(),
        }
    }

    /// Get an HTTP-friendly error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "invalid_input",
            Self::NoLiquidity => "no_liquidity",
            Self::NoSupply => "no_supply",
            Self::InvalidSlippage { .. } => "invalid_slippage",
            Self::InsufficientBalance { .. } => "insufficient_balance",
            Self::UnresolvedIntent { .. } => "unresolved_intent",
            Self::ContractCallFailed { .. } => "contract_call_failed",
            Self::StaleResponse => "stale_response",
            Self::NoAccount => "no_account",
            Self::PoolNotFound { .. } => "pool_not_found",
        }
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput { .. } | Self::InvalidSlippage { .. } => 400,
            Self::UnresolvedIntent { .. } => 422,
            Self::NoLiquidity | Self::NoSupply | Self::InsufficientBalance { .. } => 422,
            Self::NoAccount => 401,
            Self::PoolNotFound { .. } => 404,
            Self::StaleResponse => 409,
            Self::ContractCallFailed { .. } => 502,
        }
    }

    /// Stale responses are dropped silently, never shown to the user
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::StaleResponse)
    }

    /// Validation failures that disable the action instead of failing it
    pub fn disables_action(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput { .. }
                | Self::NoLiquidity
                | Self::NoSupply
                | Self::InvalidSlippage { .. }
                | Self::InsufficientBalance { .. }
                | Self::NoAccount
                | Self::PoolNotFound { .. }
        )
    }
}

impl From<GatewayError> for ProtocolError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::NoSigner => Self::NoAccount,
            other => Self::ContractCallFailed {
                message: other.to_string(),
            },
        }
    }
}

/// Result type alias for Swapdesk operations
pub type Result<T> = std::result::Result<T, Error>;
