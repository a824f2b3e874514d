//! API route handlers

pub mod account;
pub mod deposit;
pub mod health;
pub mod intent;
pub mod notifications;
pub mod pending;
pub mod pools;
pub mod redeem;
pub mod swap;
pub mod weth;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

/// Create the API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/tokens", get(pools::get_tokens))
        .route(
            "/account",
            get(account::get_account).put(account::set_account),
        )
        .route("/intent", post(intent::resolve_intent))
        .route("/pending/:operation", get(pending::load_pending))
        .route(
            "/notifications",
            get(notifications::list).delete(notifications::clear),
        )
        .nest("/pools", pools::router())
        .nest("/swap", swap::router())
        .nest("/deposit", deposit::router())
        .nest("/redeem", redeem::router())
        .nest("/weth", weth::router())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use alloy_primitives::{Address, U256};
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use evm_gateway::{AccountState, SimulatedChain};
    use ::intent::{ChatMessage, CompletionService, IntentError};
    use serde_json::{json, Value};
    use swapdesk_core::{AppConfig, Token, TokenRegistry};
    use tower::ServiceExt;

    use super::*;

    struct ScriptedCompletion(String);

    #[async_trait]
    impl CompletionService for ScriptedCompletion {
        async fn complete(&self, _messages: &[ChatMessage]) -> Result<String, IntentError> {
            Ok(self.0.clone())
        }
    }

    fn eth(n: u64) -> U256 {
        U256::from(n) * U256::from(10u64).pow(U256::from(18u64))
    }

    struct Harness {
        app: Router,
        chain: SimulatedChain,
        weth: Token,
        test: Token,
        pair: Address,
    }

    const USER: Address = Address::repeat_byte(0xaa);

    async fn harness(reply: &str) -> Harness {
        harness_with(reply, AccountState::new(Some(USER))).await
    }

    async fn harness_with(reply: &str, account: AccountState) -> Harness {
        let user = USER;
        let chain = SimulatedChain::new(user).follow_account(account.clone());
        let weth = chain.weth_address();
        let test = chain.deploy_token("TEST").await;
        let pair = chain
            .seed_pool(weth, test, eth(10), eth(20), user)
            .await
            .unwrap();
        chain.mint(weth, user, eth(5)).await.unwrap();
        chain.mint(test, user, eth(50)).await.unwrap();

        let mut config = AppConfig::default();
        config.chain.simulated = true;

        let weth = Token::new(weth, "WETH");
        let test = Token::new(test, "TEST");
        let state = AppState::new(
            config,
            Arc::new(chain.clone()),
            account,
            TokenRegistry::new(vec![weth.clone(), test.clone()]),
            Arc::new(ScriptedCompletion(reply.to_string())),
        );

        Harness {
            app: create_router(state),
            chain,
            weth,
            test,
            pair,
        }
    }

    impl Harness {
        async fn call(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
            let body = match body {
                Some(value) => Body::from(value.to_string()),
                None => Body::empty(),
            };
            let request = Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(body)
                .unwrap();
            let response = self.app.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let value = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, value)
        }

        fn swap_form(&self, amount: &str) -> Value {
            json!({
                "token_in": self.weth,
                "token_out": self.test,
                "amount_in": amount,
            })
        }
    }

    const SWAP_REPLY: &str = r#"{"operation":"swap","tokens":[{"symbol":"eth","amount":1},{"symbol":"TEST","amount":null}],"slippage":null}"#;

    #[tokio::test]
    async fn test_health_and_pools() {
        let h = harness(SWAP_REPLY).await;

        let (status, body) = h.call("GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["chain"], "simulated");
        assert_eq!(body["account"], json!(USER));
        assert_eq!(body["intent_enabled"], false);

        let (status, body) = h.call("GET", "/pools", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);

        let (_, body) = h.call("GET", "/tokens", None).await;
        assert_eq!(body["tokens"][1]["symbol"], "TEST");
        assert_eq!(body["tokens"][1]["balance"], "50");
    }

    #[tokio::test]
    async fn test_swap_flow() {
        let h = harness(SWAP_REPLY).await;

        let (status, body) = h.call("POST", "/swap/preview", Some(h.swap_form("1"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["action"]["action"], "approve");
        assert_eq!(body["action"]["token"]["symbol"], "WETH");

        let (status, body) = h.call("POST", "/swap/approve", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["tx"]["tx_hash"].is_string());

        let (_, body) = h.call("POST", "/swap/preview", Some(h.swap_form("1"))).await;
        assert_eq!(body["action"]["action"], "execute");

        let (status, _) = h.call("POST", "/swap/execute", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            h.chain.balance(h.weth.address, Address::repeat_byte(0xaa)).await,
            eth(4)
        );

        let (_, body) = h.call("GET", "/swap", None).await;
        assert!(body["amount_in"].is_null());

        let (_, body) = h.call("GET", "/notifications", None).await;
        assert_eq!(body["notifications"].as_array().unwrap().len(), 2);
        let (status, _) = h.call("DELETE", "/notifications", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_disabled_preview_is_not_an_error() {
        let h = harness(SWAP_REPLY).await;

        let (status, body) = h
            .call("POST", "/swap/preview", Some(json!({ "token_in": h.weth })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["action"]["action"], "disabled");
        assert_eq!(body["action"]["reason"], "Select both tokens");
    }

    #[tokio::test]
    async fn test_execute_failure_maps_to_error_body() {
        let h = harness(SWAP_REPLY).await;
        h.call("POST", "/swap/preview", Some(h.swap_form("1"))).await;
        h.call("POST", "/swap/approve", None).await;
        h.chain.fail_next_transaction("user rejected").await;

        let (status, body) = h.call("POST", "/swap/execute", None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["code"], "contract_call_failed");

        let (_, body) = h.call("GET", "/swap", None).await;
        assert_eq!(body["amount_in"], "1");
    }

    #[tokio::test]
    async fn test_intent_hands_off_to_swap_form() {
        let h = harness(SWAP_REPLY).await;

        let (status, body) = h
            .call("POST", "/intent", Some(json!({ "text": "swap 1 eth for test" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pending"]["operation"], "swap");
        assert_eq!(body["pending"]["amount0"], "1");

        // Wrong form leaves the handoff in place
        let (_, body) = h.call("GET", "/pending/deposit", None).await;
        assert!(body["loaded"].is_null());

        let (_, body) = h.call("GET", "/pending/swap", None).await;
        assert_eq!(body["loaded"]["operation"], "swap");
        assert_eq!(body["form"]["amount_in"], "1");
        assert_eq!(body["form"]["token_out"]["symbol"], "TEST");

        let (_, body) = h.call("GET", "/pending/swap", None).await;
        assert!(body["loaded"].is_null());
    }

    #[tokio::test]
    async fn test_unresolved_intent() {
        let h = harness(
            r#"{"operation":"swap","tokens":[{"symbol":"FOO","amount":1},{"symbol":"TEST","amount":null}],"slippage":null}"#,
        )
        .await;

        let (status, body) = h
            .call("POST", "/intent", Some(json!({ "text": "swap 1 foo for test" })))
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["message"], "Unknown token symbol FOO");

        let (_, body) = h.call("GET", "/notifications", None).await;
        assert_eq!(body["notifications"][0]["level"], "error");
    }

    #[tokio::test]
    async fn test_select_pool_for_redeem() {
        let h = harness(SWAP_REPLY).await;

        let (status, body) = h
            .call(
                "POST",
                "/pools/select",
                Some(json!({ "pool": h.pair, "operation": "redeem" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["operation"], "redeem");

        let (_, body) = h.call("GET", "/pending/redeem", None).await;
        assert!(body["form"]["token_a"].is_object());

        let (status, body) = h.call("POST", "/redeem/max", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["form"]["percentage_bps"], 10000);
        assert_eq!(body["action"]["action"], "approve");
    }

    #[tokio::test]
    async fn test_account_switch() {
        let h = harness(SWAP_REPLY).await;

        let (_, body) = h
            .call("PUT", "/account", Some(json!({ "address": null })))
            .await;
        assert!(body["address"].is_null());
        assert_eq!(body["epoch"], 1);

        let (_, body) = h.call("POST", "/swap/preview", Some(h.swap_form("1"))).await;
        assert_eq!(body["action"]["reason"], "No wallet account connected");

        let (status, body) = h
            .call("PUT", "/account", Some(json!({ "address": "not-an-address" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_input");
    }

    #[tokio::test]
    async fn test_bound_account_rejects_other_address() {
        let h = harness_with(SWAP_REPLY, AccountState::bound_to(Some(USER))).await;
        let other = Address::repeat_byte(0xbb);

        let (status, body) = h
            .call("PUT", "/account", Some(json!({ "address": other })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_input");

        let (_, body) = h.call("GET", "/account", None).await;
        assert_eq!(body["address"], json!(USER));
        assert_eq!(body["epoch"], 0);

        let (status, body) = h
            .call("PUT", "/account", Some(json!({ "address": null })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["epoch"], 1);

        let (status, body) = h
            .call("PUT", "/account", Some(json!({ "address": USER })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["address"], json!(USER));
    }

    #[tokio::test]
    async fn test_wrap_without_ether_fails() {
        let h = harness(SWAP_REPLY).await;

        let (status, body) = h
            .call("POST", "/weth/wrap", Some(json!({ "amount": "1" })))
            .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["code"], "contract_call_failed");

        h.chain.fund_ether(Address::repeat_byte(0xaa), eth(2)).await;
        let (status, _) = h
            .call("POST", "/weth/wrap", Some(json!({ "amount": "1" })))
            .await;
        assert_eq!(status, StatusCode::OK);
    }
}
