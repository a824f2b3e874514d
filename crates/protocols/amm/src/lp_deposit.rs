//! Add-liquidity orchestrator
//!
//! For an existing pool the second amount follows the reserve ratio and the
//! user only enters the first. When the factory has no pair, or the pair has
//! no reserves, the deposit creates the pool and both amounts are the user's.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use swapdesk_core::units::{from_base_units, parse_positive, DEFAULT_DECIMALS};
use swapdesk_core::{Handoff, Operation, PendingOperation, ProtocolError, Token};
use tokio::sync::RwLock;
use tracing::{debug, info};

use evm_gateway::{AddLiquidityParams, TxReceipt};

use crate::approval::Approvals;
use crate::calculator::{
    apply_slippage, expected_liquidity, pool_share_bps, quote_deposit, DepositMode,
};
use crate::context::{deadline, executable, filled, settle, AmmContext};
use crate::fetch::find_pool;
use crate::freshness::{RequestTracker, Ticket};
use crate::state::{Action, DepositQuote};

/// User input for a deposit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositForm {
    #[serde(default)]
    pub token_a: Option<Token>,
    #[serde(default)]
    pub token_b: Option<Token>,
    #[serde(default)]
    pub amount_a: Option<String>,
    /// Only read when the deposit creates the pool
    #[serde(default)]
    pub amount_b: Option<String>,
    #[serde(default)]
    pub slippage_bps: Option<u32>,
}

pub struct DepositOrchestrator {
    ctx: AmmContext,
    form: RwLock<DepositForm>,
    approvals: Approvals,
    requests: RequestTracker,
}

impl DepositOrchestrator {
    pub fn new(ctx: AmmContext) -> Self {
        Self {
            approvals: Approvals::new(ctx.gateway.clone()),
            requests: RequestTracker::new(ctx.account.clone()),
            form: RwLock::new(DepositForm::default()),
            ctx,
        }
    }

    pub async fn form(&self) -> DepositForm {
        self.form.read().await.clone()
    }

    pub async fn update(&self, form: DepositForm) {
        *self.form.write().await = form;
        self.requests.invalidate();
    }

    /// Pre-fill the form from a handed-off deposit, consuming it
    pub async fn load_pending(&self, handoff: &Handoff) -> Option<PendingOperation> {
        let pending = handoff.take_for(Operation::Deposit).await?;
        self.update(DepositForm {
            token_a: Some(pending.token0.clone()),
            token_b: Some(pending.token1.clone()),
            amount_a: pending.amount0.clone(),
            amount_b: pending.amount1.clone(),
            slippage_bps: pending.slippage_bps,
        })
        .await;
        debug!("Deposit form loaded from handoff");
        Some(pending)
    }

    pub async fn preview(&self) -> Result<Action<DepositQuote>, ProtocolError> {
        let (ticket, form) = {
            let form = self.form.read().await;
            (self.requests.issue(), form.clone())
        };
        self.quote_for(ticket, &form).await
    }

    /// Store `form` and quote exactly that input, returning it with the action
    pub async fn preview_with(
        &self,
        form: DepositForm,
    ) -> Result<(DepositForm, Action<DepositQuote>), ProtocolError> {
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
        form: &DepositForm,
    ) -> Result<Action<DepositQuote>, ProtocolError> {
        let action = settle(self.quote(form).await)?;
        self.requests.check(&ticket)?;
        Ok(action)
    }

    /// Approve whichever token still lacks allowance, first token first
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
                form.amount_a = None;
                form.amount_b = None;
            }
            Ok(_) => debug!("Deposit form changed while submitting; keeping new input"),
            Err(e) => self.ctx.report_failure("Deposit", e),
        }
        result
    }

    async fn try_execute(&self) -> Result<TxReceipt, ProtocolError> {
        let form = self.form().await;
        let quote = executable(settle(self.quote(&form).await)?)?;
        let owner = self.ctx.account.require()?;

        let label = format!(
            "Deposit of {} {} and {} {}",
            from_base_units(quote.amount_a, DEFAULT_DECIMALS),
            quote.token_a.symbol,
            from_base_units(quote.amount_b, DEFAULT_DECIMALS),
            quote.token_b.symbol
        );
        let params = AddLiquidityParams {
            token_a: quote.token_a.address,
            token_b: quote.token_b.address,
            amount_a_desired: quote.amount_a,
            amount_b_desired: quote.amount_b,
            amount_a_min: quote.amount_a_min,
            amount_b_min: quote.amount_b_min,
            to: owner,
            deadline: deadline(),
        };
        info!(
            "Submitting deposit: {}{}",
            label,
            if quote.new_pool { " (new pool)" } else { "" }
        );

        let submitted = self.ctx.gateway.router().add_liquidity(params).await;
        self.ctx.submit(&label, submitted).await
    }

    async fn quote(&self, form: &DepositForm) -> Result<Action<DepositQuote>, ProtocolError> {
        let (token_a, token_b) = match (&form.token_a, &form.token_b) {
            (Some(a), Some(b)) => (a.clone(), b.clone()),
            _ => return Ok(Action::disabled("Select both tokens")),
        };
        if token_a == token_b {
            return Ok(Action::disabled("Select two different tokens"));
        }
        let Some(amount) = filled(&form.amount_a) else {
            return Ok(Action::disabled("Enter an amount"));
        };
        let amount_a = parse_positive(amount, DEFAULT_DECIMALS)?;
        let owner = self.ctx.account.require()?;
        let slippage_bps = self.ctx.slippage(form.slippage_bps);

        let gateway = self.ctx.gateway.as_ref();
        let pool = find_pool(gateway, token_a.address, token_b.address)
            .await?
            .filter(|p| p.has_liquidity());

        let (mode, total_supply, pool_address) = match &pool {
            Some(pool) => {
                let (reserve_a, reserve_b) = pool.reserves_for(token_a.address, token_b.address)?;
                let supply = gateway.token(pool.address).total_supply().await?;
                (
                    DepositMode::Existing {
                        reserve_a,
                        reserve_b,
                    },
                    supply,
                    Some(pool.address),
                )
            }
            None => (DepositMode::NewPool, U256::ZERO, None),
        };

        let amount_b = match mode {
            DepositMode::NewPool => match filled(&form.amount_b) {
                Some(b) => Some(parse_positive(b, DEFAULT_DECIMALS)?),
                None => return Ok(Action::disabled("Enter both amounts for a new pool")),
            },
            DepositMode::Existing { .. } => None,
        };
        let (amount_a, amount_b) = quote_deposit(mode, amount_a, amount_b)?;

        self.ctx.ensure_balance(&token_a, owner, amount_a).await?;
        self.ctx.ensure_balance(&token_b, owner, amount_b).await?;

        let reserve_a = match mode {
            DepositMode::Existing { reserve_a, .. } => reserve_a,
            DepositMode::NewPool => U256::ZERO,
        };
        let quote = DepositQuote {
            pool: pool_address,
            new_pool: pool_address.is_none(),
            amount_a_min: apply_slippage(amount_a, slippage_bps)?,
            amount_b_min: apply_slippage(amount_b, slippage_bps)?,
            expected_liquidity: expected_liquidity(mode, amount_a, amount_b, total_supply)?,
            pool_share_bps: pool_share_bps(amount_a, reserve_a),
            token_a: token_a.clone(),
            token_b: token_b.clone(),
            amount_a,
            amount_b,
            slippage_bps,
        };

        for (token, amount) in [(token_a, amount_a), (token_b, amount_b)] {
            if !self.approvals.check(token.address, owner, amount).await? {
                return Ok(Action::Approve { token, quote });
            }
        }
        Ok(Action::Execute { quote })
    }
}
