//! Remove-liquidity orchestrator
//!
//! The amount to burn comes either from an explicit LP amount or from a
//! percentage of the wallet's LP balance. An explicit amount wins when both
//! are set.

use serde::{Deserialize, Serialize};
use swapdesk_core::units::{from_base_units, parse_positive, DEFAULT_DECIMALS};
use swapdesk_core::{Handoff, Operation, PendingOperation, ProtocolError, Token, BPS_DENOMINATOR};
use tokio::sync::RwLock;
use tracing::{debug, info};

use evm_gateway::{RemoveLiquidityParams, TxReceipt};

use crate::approval::Approvals;
use crate::calculator::{apply_slippage, percentage_of, quote_redeem_shares, share_bps};
use crate::context::{deadline, executable, filled, settle, AmmContext};
use crate::fetch::require_pool;
use crate::freshness::{RequestTracker, Ticket};
use crate::state::{Action, RedeemQuote};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemForm {
    #[serde(default)]
    pub token_a: Option<Token>,
    #[serde(default)]
    pub token_b: Option<Token>,
    /// Share of the LP balance, 1..=10000
    #[serde(default)]
    pub percentage_bps: Option<u32>,
    /// Decimal LP amount; overrides `percentage_bps`
    #[serde(default)]
    pub lp_amount: Option<String>,
    #[serde(default)]
    pub slippage_bps: Option<u32>,
}

pub struct RedeemOrchestrator {
    ctx: AmmContext,
    form: RwLock<RedeemForm>,
    approvals: Approvals,
    requests: RequestTracker,
}

impl RedeemOrchestrator {
    pub fn new(ctx: AmmContext) -> Self {
        Self {
            approvals: Approvals::new(ctx.gateway.clone()),
            requests: RequestTracker::new(ctx.account.clone()),
            form: RwLock::new(RedeemForm::default()),
            ctx,
        }
    }

    pub async fn form(&self) -> RedeemForm {
        self.form.read().await.clone()
    }

    pub async fn update(&self, form: RedeemForm) {
        *self.form.write().await = form;
        self.requests.invalidate();
    }

    /// Redeem the whole position
    pub async fn set_max(&self) -> RedeemForm {
        let mut form = self.form.write().await;
        form.percentage_bps = Some(BPS_DENOMINATOR);
        form.lp_amount = None;
        self.requests.invalidate();
        form.clone()
    }

    pub async fn load_pending(&self, handoff: &Handoff) -> Option<PendingOperation> {
        let pending = handoff.take_for(Operation::Redeem).await?;
        self.update(RedeemForm {
            token_a: Some(pending.token0.clone()),
            token_b: Some(pending.token1.clone()),
            percentage_bps: pending.percentage_bps,
            lp_amount: None,
            slippage_bps: pending.slippage_bps,
        })
        .await;
        debug!("Redeem form loaded from handoff");
        Some(pending)
    }

    pub async fn preview(&self) -> Result<Action<RedeemQuote>, ProtocolError> {
        let (ticket, form) = {
            let form = self.form.read().await;
            (self.requests.issue(), form.clone())
        };
        self.quote_for(ticket, &form).await
    }

    /// Store `form` and quote exactly that input, returning it with the action
    pub async fn preview_with(
        &self,
        form: RedeemForm,
    ) -> Result<(RedeemForm, Action<RedeemQuote>), ProtocolError> {
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
        form: &RedeemForm,
    ) -> Result<Action<RedeemQuote>, ProtocolError> {
        let action = settle(self.quote(form).await)?;
        self.requests.check(&ticket)?;
        Ok(action)
    }

    /// Approve the router to spend the pool's LP token
    pub async fn approve(&self) -> Result<Option<TxReceipt>, ProtocolError> {
        let form = self.form().await;
        let action = self.quote(&form).await;
        self.ctx.approve_for(&self.approvals, action).await
    }

    pub async fn execute(&self) -> Result<TxReceipt, ProtocolError> {
        let ticket = self.requests.issue();
        let result = self.try_execute().await;
        match &result {
            Ok(_) if self.requests.is_current(&ticket) => {
                let mut form = self.form.write().await;
                form.percentage_bps = None;
                form.lp_amount = None;
            }
            Ok(_) => debug!("Redeem form changed while submitting; keeping new input"),
            Err(e) => self.ctx.report_failure("Redeem", e),
        }
        result
    }

    async fn try_execute(&self) -> Result<TxReceipt, ProtocolError> {
        let form = self.form().await;
        let quote = executable(settle(self.quote(&form).await)?)?;
        let owner = self.ctx.account.require()?;

        let label = format!(
            "Redeem of {} LP for {} {} and {} {}",
            from_base_units(quote.liquidity, DEFAULT_DECIMALS),
            from_base_units(quote.amount_a, DEFAULT_DECIMALS),
            quote.token_a.symbol,
            from_base_units(quote.amount_b, DEFAULT_DECIMALS),
            quote.token_b.symbol
        );
        let params = RemoveLiquidityParams {
            token_a: quote.token_a.address,
            token_b: quote.token_b.address,
            liquidity: quote.liquidity,
            amount_a_min: quote.amount_a_min,
            amount_b_min: quote.amount_b_min,
            to: owner,
            deadline: deadline(),
        };
        info!("Submitting redeem: {}", label);

        let submitted = self.ctx.gateway.router().remove_liquidity(params).await;
        self.ctx.submit(&label, submitted).await
    }

    async fn quote(&self, form: &RedeemForm) -> Result<Action<RedeemQuote>, ProtocolError> {
        let (token_a, token_b) = match (&form.token_a, &form.token_b) {
            (Some(a), Some(b)) => (a.clone(), b.clone()),
            _ => return Ok(Action::disabled("Select both tokens")),
        };
        if token_a == token_b {
            return Ok(Action::disabled("Select two different tokens"));
        }
        let lp_amount = filled(&form.lp_amount);
        if lp_amount.is_none() && form.percentage_bps.is_none() {
            return Ok(Action::disabled("Enter a percentage or LP amount"));
        }
        let owner = self.ctx.account.require()?;
        let slippage_bps = self.ctx.slippage(form.slippage_bps);

        let gateway = self.ctx.gateway.as_ref();
        let pool = require_pool(gateway, &token_a, &token_b).await?;
        let lp = gateway.token(pool.address);
        let pair_name = format!("{}/{}", token_a.symbol, token_b.symbol);
        let lp_balance = lp.balance_of(owner).await?;
        if lp_balance.is_zero() {
            return Ok(Action::disabled(format!(
                "No liquidity position in {}",
                pair_name
            )));
        }

        let lp_token = Token::new(pool.address, format!("{} LP", pair_name));
        let (liquidity, percentage_bps) = match (lp_amount, form.percentage_bps) {
            (Some(amount), _) => {
                let liquidity = parse_positive(amount, DEFAULT_DECIMALS)?;
                if liquidity > lp_balance {
                    return Err(ProtocolError::InsufficientBalance {
                        token: lp_token.symbol,
                        required: from_base_units(liquidity, DEFAULT_DECIMALS),
                        available: from_base_units(lp_balance, DEFAULT_DECIMALS),
                    });
                }
                (liquidity, share_bps(liquidity, lp_balance))
            }
            (None, Some(bps)) => (percentage_of(lp_balance, bps)?, bps),
            (None, None) => return Ok(Action::disabled("Enter a percentage or LP amount")),
        };
        if liquidity.is_zero() {
            return Err(ProtocolError::invalid_input("LP amount rounds to zero"));
        }

        let total_supply = lp.total_supply().await?;
        let (reserve_a, reserve_b) = pool.reserves_for(token_a.address, token_b.address)?;
        let (amount_a, amount_b) =
            quote_redeem_shares(liquidity, total_supply, reserve_a, reserve_b)?;

        let quote = RedeemQuote {
            pool: pool.address,
            token_a,
            token_b,
            liquidity,
            lp_balance,
            percentage_bps,
            amount_a,
            amount_b,
            amount_a_min: apply_slippage(amount_a, slippage_bps)?,
            amount_b_min: apply_slippage(amount_b, slippage_bps)?,
            slippage_bps,
        };

        if self.approvals.check(pool.address, owner, liquidity).await? {
            Ok(Action::Execute { quote })
        } else {
            Ok(Action::Approve {
                token: lp_token,
                quote,
            })
        }
    }
}
