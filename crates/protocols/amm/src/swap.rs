//! Swap orchestrator
//!
//! Exact-input swap through the router along the direct path
//! `[token_in, token_out]`. The preview and the on-chain minimum both use the
//! fee-aware output, so the `amountOutMin` check is against the same number
//! the user was shown.

use serde::{Deserialize, Serialize};
use swapdesk_core::units::{from_base_units, parse_positive, DEFAULT_DECIMALS};
use swapdesk_core::{Handoff, Operation, PendingOperation, ProtocolError, Token};
use tokio::sync::RwLock;
use tracing::{debug, info};

use evm_gateway::{SwapParams, TxReceipt};

use crate::approval::Approvals;
use crate::calculator::{apply_slippage, get_amount_out, price_impact_bps};
use crate::context::{deadline, executable, filled, settle, AmmContext};
use crate::fetch::require_pool;
use crate::freshness::{RequestTracker, Ticket};
use crate::state::{Action, SwapQuote};

/// User input for a swap
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapForm {
    #[serde(default)]
    pub token_in: Option<Token>,
    #[serde(default)]
    pub token_out: Option<Token>,
    /// Decimal amount of `token_in`
    #[serde(default)]
    pub amount_in: Option<String>,
    #[serde(default)]
    pub slippage_bps: Option<u32>,
}

pub struct SwapOrchestrator {
    ctx: AmmContext,
    form: RwLock<SwapForm>,
    approvals: Approvals,
    requests: RequestTracker,
}

impl SwapOrchestrator {
    pub fn new(ctx: AmmContext) -> Self {
        Self {
            approvals: Approvals::new(ctx.gateway.clone()),
            requests: RequestTracker::new(ctx.account.clone()),
            form: RwLock::new(SwapForm::default()),
            ctx,
        }
    }

    pub async fn form(&self) -> SwapForm {
        self.form.read().await.clone()
    }

    /// Replace the form; outstanding previews become stale
    pub async fn update(&self, form: SwapForm) {
        *self.form.write().await = form;
        self.requests.invalidate();
    }

    /// Swap input and output tokens, clearing the amount
    pub async fn switch_tokens(&self) -> SwapForm {
        let mut guard = self.form.write().await;
        let form = &mut *guard;
        std::mem::swap(&mut form.token_in, &mut form.token_out);
        form.amount_in = None;
        self.requests.invalidate();
        form.clone()
    }

    /// Pre-fill the form from a handed-off swap, consuming it
    pub async fn load_pending(&self, handoff: &Handoff) -> Option<PendingOperation> {
        let pending = handoff.take_for(Operation::Swap).await?;
        self.update(SwapForm {
            token_in: Some(pending.token0.clone()),
            token_out: Some(pending.token1.clone()),
            amount_in: pending.amount0.clone(),
            slippage_bps: pending.slippage_bps,
        })
        .await;
        debug!("Swap form loaded from handoff");
        Some(pending)
    }

    /// Quote the current form and report the next available action
    pub async fn preview(&self) -> Result<Action<SwapQuote>, ProtocolError> {
        let (ticket, form) = {
            let form = self.form.read().await;
            (self.requests.issue(), form.clone())
        };
        self.quote_for(ticket, &form).await
    }

    /// Store `form` and quote exactly that input, returning it with the action
    pub async fn preview_with(
        &self,
        form: SwapForm,
    ) -> Result<(SwapForm, Action<SwapQuote>), ProtocolError> {
        let ticket = {
            let mut current = self.form.write().await;
            *current = form.clone();
            self.requests.issue()
        };
        let action = self.quote_for(ticket, &form).await?;
        Ok((form, action))
    }

    async fn quote_for(
        &self,
        ticket: Ticket,
        form: &SwapForm,
    ) -> Result<Action<SwapQuote>, ProtocolError> {
        let action = settle(self.quote(form).await)?;
        self.requests.check(&ticket)?;
        Ok(action)
    }

    /// Approve the input token if the current form needs it
    pub async fn approve(&self) -> Result<Option<TxReceipt>, ProtocolError> {
        let form = self.form().await;
        let action = self.quote(&form).await;
        self.ctx.approve_for(&self.approvals, action).await
    }

    /// Submit the swap and wait for one confirmation.
    ///
    /// On success the amount is cleared; on failure the form is untouched.
    pub async fn execute(&self) -> Result<TxReceipt, ProtocolError> {
        let ticket = self.requests.issue();
        let result = self.try_execute().await;
        match &result {
            Ok(_) if self.requests.is_current(&ticket) => {
                self.form.write().await.amount_in = None;
            }
            Ok(_) => debug!("Swap form changed while submitting; keeping new input"),
            Err(e) => self.ctx.report_failure("Swap", e),
        }
        result
    }

    async fn try_execute(&self) -> Result<TxReceipt, ProtocolError> {
        let form = self.form().await;
        let quote = executable(settle(self.quote(&form).await)?)?;
        let owner = self.ctx.account.require()?;

        let label = format!(
            "Swap of {} {} for {}",
            from_base_units(quote.amount_in, DEFAULT_DECIMALS),
            quote.token_in.symbol,
            quote.token_out.symbol
        );
        let params = SwapParams {
            amount_in: quote.amount_in,
            amount_out_min: quote.amount_out_min,
            path: vec![quote.token_in.address, quote.token_out.address],
            to: owner,
            deadline: deadline(),
        };
        info!(
            "Submitting swap: {} (min out {})",
            label,
            from_base_units(quote.amount_out_min, DEFAULT_DECIMALS)
        );

        let submitted = self
            .ctx
            .gateway
            .router()
            .swap_exact_tokens_for_tokens(params)
            .await;
        self.ctx.submit(&label, submitted).await
    }

    async fn quote(&self, form: &SwapForm) -> Result<Action<SwapQuote>, ProtocolError> {
        let (token_in, token_out) = match (&form.token_in, &form.token_out) {
            (Some(a), Some(b)) => (a.clone(), b.clone()),
            _ => return Ok(Action::disabled("Select both tokens")),
        };
        if token_in == token_out {
            return Ok(Action::disabled("Select two different tokens"));
        }
        let Some(amount) = filled(&form.amount_in) else {
            return Ok(Action::disabled("Enter an amount"));
        };
        let amount_in = parse_positive(amount, DEFAULT_DECIMALS)?;
        let owner = self.ctx.account.require()?;
        let slippage_bps = self.ctx.slippage(form.slippage_bps);

        let gateway = self.ctx.gateway.as_ref();
        let pool = require_pool(gateway, &token_in, &token_out).await?;
        let (reserve_in, reserve_out) = pool.reserves_for(token_in.address, token_out.address)?;
        let amount_out = get_amount_out(amount_in, reserve_in, reserve_out)?;
        let amount_out_min = apply_slippage(amount_out, slippage_bps)?;

        self.ctx.ensure_balance(&token_in, owner, amount_in).await?;

        let quote = SwapQuote {
            pool: pool.address,
            price_impact_bps: price_impact_bps(amount_in, amount_out, reserve_in, reserve_out),
            token_in: token_in.clone(),
            token_out,
            amount_in,
            amount_out,
            amount_out_min,
            slippage_bps,
        };

        if self.approvals.check(token_in.address, owner, amount_in).await? {
            Ok(Action::Execute { quote })
        } else {
            Ok(Action::Approve {
                token: token_in,
                quote,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::get_amount_out;
    use crate::notify::Level;
    use crate::testing::{eth, fixture};
    use alloy_primitives::{Address, U256};
    use std::sync::Arc;
    use std::time::Duration;

    fn form(f: &crate::testing::Fixture, amount: &str) -> SwapForm {
        SwapForm {
            token_in: Some(f.weth.clone()),
            token_out: Some(f.test.clone()),
            amount_in: Some(amount.to_string()),
            slippage_bps: None,
        }
    }

    #[tokio::test]
    async fn test_missing_input_disables() {
        let f = fixture().await;
        let swap = SwapOrchestrator::new(f.ctx.clone());

        assert_eq!(
            swap.preview().await.unwrap(),
            Action::disabled("Select both tokens")
        );

        swap.update(form(&f, "")).await;
        assert_eq!(swap.preview().await.unwrap(), Action::disabled("Enter an amount"));

        swap.update(form(&f, "0")).await;
        assert!(matches!(swap.preview().await.unwrap(), Action::Disabled { .. }));

        swap.update(form(&f, "1.2.3")).await;
        assert!(matches!(swap.preview().await.unwrap(), Action::Disabled { .. }));
    }

    #[tokio::test]
    async fn test_no_account_disables() {
        let f = fixture().await;
        f.ctx.account.set(None);
        let swap = SwapOrchestrator::new(f.ctx.clone());
        swap.update(form(&f, "1")).await;

        assert_eq!(
            swap.preview().await.unwrap(),
            Action::disabled("No wallet account connected")
        );
    }

    #[tokio::test]
    async fn test_approve_then_swap() {
        let f = fixture().await;
        let swap = SwapOrchestrator::new(f.ctx.clone());
        swap.update(form(&f, "1")).await;

        let action = swap.preview().await.unwrap();
        let Action::Approve { token, quote } = action else {
            panic!("expected approve, got {:?}", action);
        };
        assert_eq!(token, f.weth);
        let expected = get_amount_out(eth(1), eth(10), eth(20)).unwrap();
        assert_eq!(quote.amount_out, expected);
        assert_eq!(quote.amount_out_min, expected * U256::from(9950u64) / U256::from(10_000u64));
        assert!(quote.price_impact_bps > 0);

        // executing before approval is refused without touching the form
        assert!(swap.execute().await.is_err());
        assert_eq!(swap.form().await.amount_in.as_deref(), Some("1"));

        assert!(swap.approve().await.unwrap().is_some());
        assert!(swap.preview().await.unwrap().is_ready());
        assert!(swap.approve().await.unwrap().is_none());

        swap.execute().await.unwrap();
        assert_eq!(f.chain.balance(f.test.address, f.user).await, eth(50) + expected);
        assert_eq!(f.chain.balance(f.weth.address, f.user).await, eth(4));
        assert_eq!(swap.form().await.amount_in, None);
        assert_eq!(f.last_level(), Some(Level::Success));
    }

    #[tokio::test]
    async fn test_failed_submission_keeps_form() {
        let f = fixture().await;
        let swap = SwapOrchestrator::new(f.ctx.clone());
        swap.update(form(&f, "1")).await;
        swap.approve().await.unwrap();

        f.chain.fail_next_transaction("user rejected").await;
        let err = swap.execute().await.unwrap_err();
        assert_eq!(err.error_code(), "contract_call_failed");
        assert_eq!(swap.form().await, form(&f, "1"));
        assert_eq!(f.last_level(), Some(Level::Error));
        assert_eq!(f.chain.balance(f.weth.address, f.user).await, eth(5));
    }

    #[tokio::test]
    async fn test_insufficient_balance_and_bad_slippage() {
        let f = fixture().await;
        let swap = SwapOrchestrator::new(f.ctx.clone());

        swap.update(form(&f, "6")).await;
        let action = swap.preview().await.unwrap();
        assert!(
            matches!(&action, Action::Disabled { reason } if reason.contains("Insufficient WETH")),
            "{:?}",
            action
        );

        let mut bad = form(&f, "1");
        bad.slippage_bps = Some(10_000);
        swap.update(bad).await;
        assert_eq!(
            swap.preview().await.unwrap(),
            Action::disabled("Slippage 10000 bps out of range (0..10000)")
        );
    }

    #[tokio::test]
    async fn test_switch_and_handoff() {
        let f = fixture().await;
        let swap = SwapOrchestrator::new(f.ctx.clone());
        swap.update(form(&f, "1")).await;

        let switched = swap.switch_tokens().await;
        assert_eq!(switched.token_in, Some(f.test.clone()));
        assert_eq!(switched.token_out, Some(f.weth.clone()));
        assert_eq!(switched.amount_in, None);

        let handoff = Handoff::new();
        let mut pending = PendingOperation::new(Operation::Swap, f.weth.clone(), f.test.clone());
        pending.amount0 = Some("2.5".into());
        handoff.post(pending).await;

        assert!(swap.load_pending(&handoff).await.is_some());
        assert!(swap.load_pending(&handoff).await.is_none());
        assert_eq!(swap.form().await, form(&f, "2.5"));
    }

    #[tokio::test]
    async fn test_superseded_preview_is_dropped() {
        let f = fixture().await;
        let swap = Arc::new(SwapOrchestrator::new(f.ctx.clone()));
        swap.update(form(&f, "1")).await;
        f.chain.delay_reads(Some(Duration::from_millis(100))).await;

        let slow = tokio::spawn({
            let swap = swap.clone();
            async move { swap.preview().await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        swap.update(form(&f, "2")).await;
        assert_eq!(slow.await.unwrap(), Err(ProtocolError::StaleResponse));

        let slow = tokio::spawn({
            let swap = swap.clone();
            async move { swap.preview().await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        f.ctx.account.set(Some(Address::repeat_byte(0xbb)));
        assert_eq!(slow.await.unwrap(), Err(ProtocolError::StaleResponse));

        assert!(f.log.entries().is_empty());
    }

    #[tokio::test]
    async fn test_preview_with_returns_the_quoted_form() {
        let f = fixture().await;
        let swap = Arc::new(SwapOrchestrator::new(f.ctx.clone()));
        f.chain.delay_reads(Some(Duration::from_millis(30))).await;

        let first = tokio::spawn({
            let swap = swap.clone();
            let input = form(&f, "1");
            async move { swap.preview_with(input).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        let (quoted, action) = swap.preview_with(form(&f, "2")).await.unwrap();
        assert_eq!(quoted, form(&f, "2"));
        assert_eq!(action.quote().map(|q| q.amount_in), Some(eth(2)));
        assert_eq!(first.await.unwrap(), Err(ProtocolError::StaleResponse));
        assert_eq!(swap.form().await, form(&f, "2"));
    }

    #[tokio::test]
    async fn test_switched_account_signs_its_own_swap() {
        let f = fixture().await;
        let bob = Address::repeat_byte(0xbb);
        f.chain.mint(f.weth.address, bob, eth(2)).await.unwrap();
        let swap = SwapOrchestrator::new(f.ctx.clone());

        f.ctx.account.set(Some(bob));
        swap.update(form(&f, "1")).await;
        assert!(swap.approve().await.unwrap().is_some());
        assert!(swap.preview().await.unwrap().is_ready());

        swap.execute().await.unwrap();
        assert_eq!(f.chain.balance(f.weth.address, bob).await, eth(1));
        assert_eq!(f.chain.balance(f.weth.address, f.user).await, eth(5));
    }

    #[tokio::test]
    async fn test_failed_quote_during_approve_is_reported() {
        let f = fixture().await;
        let swap = SwapOrchestrator::new(f.ctx.clone());
        swap.update(form(&f, "1")).await;
        f.chain.fail_reads(f.pair).await;

        let err = swap.approve().await.unwrap_err();
        assert_eq!(err.error_code(), "contract_call_failed");
        assert_eq!(f.last_level(), Some(Level::Error));
    }
}
