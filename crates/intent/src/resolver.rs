//! Symbol resolution and per-operation validation

use std::sync::Arc;

use alloy_primitives::Address;
use serde::Serialize;
use swapdesk_core::units::{normalize, DEFAULT_DECIMALS};
use swapdesk_core::{Operation, PendingOperation, Token, TokenRegistry, BPS_DENOMINATOR};
use tracing::{info, warn};

use crate::completion::CompletionService;
use crate::prompt::build_prompt;
use crate::schema::{parse_completion, ExtractedToken};
use crate::IntentError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedToken {
    pub symbol: String,
    pub address: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
}

impl ResolvedToken {
    fn token(&self) -> Token {
        Token::new(self.address, self.symbol.clone())
    }

    fn amount_string(&self) -> Result<Option<String>, IntentError> {
        self.amount
            .map(|a| {
                normalize(&a.to_string(), DEFAULT_DECIMALS).map_err(|_| {
                    IntentError::unresolved(format!("{} amount {} is not usable", self.symbol, a))
                })
            })
            .transpose()
    }
}

/// A validated request, ready to hand to an orchestrator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedIntent {
    pub operation: Operation,
    pub tokens: Vec<ResolvedToken>,
    /// Slippage tolerance in percent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slippage: Option<f64>,
}

impl ResolvedIntent {
    pub fn slippage_bps(&self) -> Option<u32> {
        self.slippage.map(|pct| (pct * 100.0).round() as u32)
    }

    /// For redeem, the fraction of the position in basis points
    pub fn percentage_bps(&self) -> Option<u32> {
        match self.operation {
            Operation::Redeem => self
                .tokens
                .first()
                .and_then(|t| t.amount)
                .map(|f| (f * BPS_DENOMINATOR as f64).round() as u32),
            _ => None,
        }
    }

    /// The handoff record for the target screen
    pub fn to_pending(&self) -> Result<PendingOperation, IntentError> {
        let [first, second] = self.tokens.as_slice() else {
            return Err(IntentError::unresolved(format!(
                "{} requires exactly 2 tokens, got {}",
                self.operation,
                self.tokens.len()
            )));
        };
        let mut pending = PendingOperation::new(self.operation, first.token(), second.token());
        pending.slippage_bps = self.slippage_bps();
        match self.operation {
            Operation::Swap => pending.amount0 = first.amount_string()?,
            Operation::Deposit => {
                pending.amount0 = first.amount_string()?;
                pending.amount1 = second.amount_string()?;
            }
            Operation::Redeem => pending.percentage_bps = self.percentage_bps(),
        }
        Ok(pending)
    }

    /// One-line description for the user
    pub fn summary(&self) -> String {
        let [a, b] = self.tokens.as_slice() else {
            return format!("Unresolved {} request", self.operation);
        };
        let amount = |t: &ResolvedToken| t.amount.map(|x| x.to_string()).unwrap_or_default();
        match self.operation {
            Operation::Swap => format!("Will swap {} {} for {}", amount(a), a.symbol, b.symbol),
            Operation::Deposit => format!(
                "Will deposit {} {} and {} {}",
                amount(a),
                a.symbol,
                amount(b),
                b.symbol
            ),
            Operation::Redeem => match a.amount {
                Some(f) => format!("Will redeem {}% of {}-{} pool", f * 100.0, a.symbol, b.symbol),
                None => format!("Will redeem from {}-{} pool", a.symbol, b.symbol),
            },
        }
    }
}

#[derive(Clone)]
pub struct IntentResolver {
    service: Arc<dyn CompletionService>,
}

impl IntentResolver {
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        Self { service }
    }

    /// Resolve free text into a validated operation.
    ///
    /// One completion call; failures carry the raw reason.
    pub async fn resolve(
        &self,
        text: &str,
        registry: &TokenRegistry,
    ) -> Result<ResolvedIntent, IntentError> {
        if text.trim().is_empty() {
            return Err(IntentError::unresolved("Request is empty"));
        }

        let reply = self
            .service
            .complete(&build_prompt(text, registry))
            .await
            .map_err(|e| {
                warn!("Completion failed for {:?}: {}", text, e);
                e
            })?;
        let extracted = parse_completion(&reply)?;

        let tokens = extracted
            .tokens
            .iter()
            .map(|t| resolve_token(t, registry))
            .collect::<Result<Vec<_>, _>>()?;
        let intent = ResolvedIntent {
            operation: extracted.operation,
            tokens,
            slippage: extracted.slippage,
        };
        validate(&intent)?;

        info!("Resolved {:?} as {}", text, intent.summary());
        Ok(intent)
    }
}

fn resolve_token(
    extracted: &ExtractedToken,
    registry: &TokenRegistry,
) -> Result<ResolvedToken, IntentError> {
    let symbol = extracted.symbol.trim();
    let found = registry.find_symbol(symbol).or_else(|| {
        if symbol.eq_ignore_ascii_case("eth") {
            registry.weth()
        } else {
            None
        }
    });
    let token = found
        .ok_or_else(|| IntentError::unresolved(format!("Unknown token symbol {}", symbol)))?;
    if token.address.is_zero() {
        return Err(IntentError::unresolved(format!(
            "Token {} has no address",
            token.symbol
        )));
    }
    Ok(ResolvedToken {
        symbol: token.symbol.clone(),
        address: token.address,
        amount: extracted.amount,
    })
}

fn validate(intent: &ResolvedIntent) -> Result<(), IntentError> {
    let op = intent.operation;
    if intent.tokens.len() != 2 {
        return Err(IntentError::unresolved(format!(
            "{} requires exactly 2 tokens, got {}",
            op,
            intent.tokens.len()
        )));
    }
    if intent.tokens[0].address == intent.tokens[1].address {
        return Err(IntentError::unresolved(format!(
            "{} needs two different tokens",
            op
        )));
    }

    for token in &intent.tokens {
        if let Some(amount) = token.amount {
            if !amount.is_finite() || amount <= 0.0 {
                return Err(IntentError::unresolved(format!(
                    "{} amount must be greater than 0",
                    token.symbol
                )));
            }
        }
    }

    match op {
        Operation::Swap if intent.tokens[0].amount.is_none() => {
            return Err(IntentError::unresolved("Swap amount not specified"));
        }
        Operation::Deposit if intent.tokens.iter().any(|t| t.amount.is_none()) => {
            return Err(IntentError::unresolved(
                "Deposit amounts not specified for both tokens",
            ));
        }
        Operation::Redeem => {
            if let Some(fraction) = intent.tokens[0].amount {
                if fraction > 1.0 {
                    return Err(IntentError::unresolved(format!(
                        "Redeem share {} is outside (0, 1]",
                        fraction
                    )));
                }
                if intent.percentage_bps() == Some(0) {
                    return Err(IntentError::unresolved(format!(
                        "Redeem share {} is below 0.01% of the position",
                        fraction
                    )));
                }
            }
        }
        _ => {}
    }

    if let Some(pct) = intent.slippage {
        if !pct.is_finite() || !(0.0..100.0).contains(&pct) {
            return Err(IntentError::unresolved(format!(
                "Slippage {}% out of range",
                pct
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::completion::ChatMessage;

    /// Replays a fixed reply and records the prompts it was given
    struct ScriptedCompletion {
        reply: Result<String, IntentError>,
        prompts: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedCompletion {
        fn replying(json: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(json.to_string()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn failing(err: IntentError) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(err),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CompletionService for ScriptedCompletion {
        async fn complete(&self, messages: &[ChatMessage]) -> Result<String, IntentError> {
            self.prompts.lock().unwrap().push(messages.to_vec());
            self.reply.clone()
        }
    }

    fn weth() -> Address {
        Address::repeat_byte(0x0a)
    }

    fn test_token() -> Address {
        Address::repeat_byte(0x0b)
    }

    fn registry() -> TokenRegistry {
        TokenRegistry::new(vec![
            Token::new(weth(), "WETH"),
            Token::new(test_token(), "TEST"),
        ])
    }

    async fn resolve(json: &str, text: &str) -> Result<ResolvedIntent, IntentError> {
        IntentResolver::new(ScriptedCompletion::replying(json))
            .resolve(text, &registry())
            .await
    }

    #[tokio::test]
    async fn test_swap_request() {
        let intent = resolve(
            r#"{"operation":"swap","tokens":[{"symbol":"WETH","amount":10},{"symbol":"TEST","amount":null}],"slippage":null}"#,
            "swap 10 WETH for TEST",
        )
        .await
        .unwrap();

        assert_eq!(intent.operation, Operation::Swap);
        assert_eq!(
            intent.tokens,
            vec![
                ResolvedToken {
                    symbol: "WETH".into(),
                    address: weth(),
                    amount: Some(10.0)
                },
                ResolvedToken {
                    symbol: "TEST".into(),
                    address: test_token(),
                    amount: None
                },
            ]
        );

        let pending = intent.to_pending().unwrap();
        assert_eq!(pending.operation, Operation::Swap);
        assert_eq!(pending.token0.address, weth());
        assert_eq!(pending.amount0.as_deref(), Some("10"));
        assert_eq!(intent.summary(), "Will swap 10 WETH for TEST");
    }

    #[tokio::test]
    async fn test_redeem_percentage() {
        let intent = resolve(
            r#"{"operation":"redeem","tokens":[{"symbol":"weth","amount":0.5},{"symbol":"test","amount":null}],"slippage":null}"#,
            "redeem 50% of WETH-TEST position",
        )
        .await
        .unwrap();

        assert_eq!(intent.operation, Operation::Redeem);
        assert_eq!(intent.tokens[0].symbol, "WETH");
        assert_eq!(intent.tokens[1].symbol, "TEST");
        assert!((intent.tokens[0].amount.unwrap() - 0.5).abs() < 1e-9);
        assert_eq!(intent.to_pending().unwrap().percentage_bps, Some(5_000));
    }

    #[tokio::test]
    async fn test_unknown_symbol_fails() {
        let err = resolve(
            r#"{"operation":"swap","tokens":[{"symbol":"FOO","amount":5},{"symbol":"TEST","amount":null}],"slippage":null}"#,
            "swap 5 FOO for TEST",
        )
        .await
        .unwrap_err();
        assert_eq!(err, IntentError::unresolved("Unknown token symbol FOO"));
        assert_eq!(err.error_code(), "unresolved_intent");
    }

    #[tokio::test]
    async fn test_eth_maps_to_weth() {
        let intent = resolve(
            r#"{"operation":"swap","tokens":[{"symbol":"TEST","amount":100},{"symbol":"eth","amount":null}],"slippage":1}"#,
            "swap 100 test for eth with 1% slippage",
        )
        .await
        .unwrap();
        assert_eq!(intent.tokens[1].symbol, "WETH");
        assert_eq!(intent.tokens[1].address, weth());
        assert_eq!(intent.to_pending().unwrap().slippage_bps, Some(100));
    }

    #[tokio::test]
    async fn test_validation_names_missing_piece() {
        let cases = [
            (
                r#"{"operation":"swap","tokens":[{"symbol":"WETH","amount":null},{"symbol":"TEST","amount":null}],"slippage":null}"#,
                "Swap amount not specified",
            ),
            (
                r#"{"operation":"deposit","tokens":[{"symbol":"WETH","amount":5},{"symbol":"TEST","amount":null}],"slippage":null}"#,
                "Deposit amounts not specified for both tokens",
            ),
            (
                r#"{"operation":"swap","tokens":[{"symbol":"WETH","amount":1}],"slippage":null}"#,
                "swap requires exactly 2 tokens, got 1",
            ),
            (
                r#"{"operation":"redeem","tokens":[{"symbol":"WETH","amount":50},{"symbol":"TEST","amount":null}],"slippage":null}"#,
                "Redeem share 50 is outside (0, 1]",
            ),
            (
                r#"{"operation":"redeem","tokens":[{"symbol":"WETH","amount":0.00004},{"symbol":"TEST","amount":null}],"slippage":null}"#,
                "Redeem share 0.00004 is below 0.01% of the position",
            ),
        ];
        for (json, reason) in cases {
            let err = resolve(json, "some request").await.unwrap_err();
            assert_eq!(err, IntentError::unresolved(reason), "{}", json);
        }
    }

    #[tokio::test]
    async fn test_deposit_carries_both_amounts() {
        let intent = resolve(
            r#"{"operation":"deposit","tokens":[{"symbol":"WETH","amount":5},{"symbol":"TEST","amount":20.25}],"slippage":null}"#,
            "deposit 5 WETH and 20.25 TEST",
        )
        .await
        .unwrap();
        let pending = intent.to_pending().unwrap();
        assert_eq!(pending.amount0.as_deref(), Some("5"));
        assert_eq!(pending.amount1.as_deref(), Some("20.25"));
        assert_eq!(pending.percentage_bps, None);
    }

    #[tokio::test]
    async fn test_service_failure_is_single_attempt() {
        let service = ScriptedCompletion::failing(IntentError::Service("timed out".into()));
        let resolver = IntentResolver::new(service.clone());

        let err = resolver
            .resolve("swap 1 WETH for TEST", &registry())
            .await
            .unwrap_err();
        assert_eq!(err, IntentError::Service("timed out".into()));
        assert_eq!(service.calls(), 1);

        let err = resolver.resolve("   ", &registry()).await.unwrap_err();
        assert_eq!(err, IntentError::unresolved("Request is empty"));
        assert_eq!(service.calls(), 1);
    }
}
