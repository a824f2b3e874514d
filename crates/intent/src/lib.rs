//! Natural-language intent resolver
//!
//! Turns free text such as "swap 10 WETH for TEST" into one of the three
//! structured operations. Extraction is delegated to an external chat
//! completion service constrained by a JSON schema; symbols are then resolved
//! against the token registry and the result is validated per operation.
//!
//! The completion call is a single best-effort attempt. Nothing here retries.

pub mod completion;
pub mod prompt;
pub mod resolver;
pub mod schema;

use swapdesk_core::ProtocolError;
use thiserror::Error;

pub use completion::{ChatCompletionClient, ChatMessage, CompletionService};
pub use prompt::build_prompt;
pub use resolver::{IntentResolver, ResolvedIntent, ResolvedToken};
pub use schema::{parse_completion, response_schema, ExtractedIntent, ExtractedToken};

/// Errors raised while resolving a natural-language request
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntentError {
    #[error("Completion service is not configured (missing API key)")]
    NotConfigured,

    #[error("Completion service request failed: {0}")]
    Service(String),

    #[error("Completion service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Completion response does not match the expected schema: {0}")]
    Schema(String),

    #[error("{0}")]
    Unresolved(String),
}

impl IntentError {
    pub fn unresolved(reason: impl Into<String>) -> Self {
        Self::Unresolved(reason.into())
    }

    /// Get an HTTP-friendly error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotConfigured => "completion_not_configured",
            Self::Service(_) | Self::Status { .. } => "completion_failed",
            Self::Schema(_) => "completion_schema",
            Self::Unresolved(_) => "unresolved_intent",
        }
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotConfigured => 503,
            Self::Service(_) | Self::Status { .. } => 502,
            Self::Schema(_) | Self::Unresolved(_) => 422,
        }
    }
}

impl From<IntentError> for ProtocolError {
    fn from(err: IntentError) -> Self {
        match err {
            IntentError::Unresolved(reason) => ProtocolError::UnresolvedIntent { reason },
            other => ProtocolError::UnresolvedIntent {
                reason: other.to_string(),
            },
        }
    }
}
