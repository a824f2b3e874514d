//! Structured output expected from the completion service

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use swapdesk_core::Operation;

use crate::IntentError;

/// Raw extraction, before symbols are resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractedIntent {
    pub operation: Operation,
    pub tokens: Vec<ExtractedToken>,
    /// Slippage tolerance in percent, when the user gave one
    #[serde(default)]
    pub slippage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractedToken {
    pub symbol: String,
    #[serde(default)]
    pub amount: Option<f64>,
}

/// JSON schema sent with the request (strict structured-output mode)
pub fn response_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["operation", "tokens", "slippage"],
        "properties": {
            "operation": {
                "type": "string",
                "enum": ["swap", "deposit", "redeem"],
                "description": "The operation to perform"
            },
            "tokens": {
                "type": "array",
                "description": "Tokens mentioned in the request, in the order mentioned",
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["symbol", "amount"],
                    "properties": {
                        "symbol": {
                            "type": "string",
                            "description": "The token symbol mentioned in the request"
                        },
                        "amount": {
                            "type": ["number", "null"],
                            "description": "Amount of the token; for redeem, the fraction of the position (0.5 = 50%)"
                        }
                    }
                }
            },
            "slippage": {
                "type": ["number", "null"],
                "description": "Slippage tolerance in percent if specified"
            }
        }
    })
}

/// Parse the completion text, tolerating a markdown code fence around it
pub fn parse_completion(text: &str) -> Result<ExtractedIntent, IntentError> {
    let body = strip_fence(text.trim());
    serde_json::from_str(body).map_err(|e| IntentError::Schema(e.to_string()))
}

fn strip_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // drop the info string ("json") up to the first newline
    let rest = match rest.find('\n') {
        Some(i) => &rest[i + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}
