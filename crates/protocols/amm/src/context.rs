//! Shared orchestrator plumbing

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use alloy_primitives::{Address, U256};
use evm_gateway::{AccountState, ContractGateway, PendingTx, TxReceipt};
use swapdesk_core::units::{from_base_units, DEFAULT_DECIMALS};
use swapdesk_core::{GatewayError, ProtocolError, Token};

use crate::approval::Approvals;
use crate::constants::{slippage, tx};
use crate::notify::{Notification, Notifier};
use crate::state::Action;

/// Everything an orchestrator needs from the outside
#[derive(Clone)]
pub struct AmmContext {
    pub gateway: Arc<dyn ContractGateway>,
    pub account: AccountState,
    pub notifier: Arc<dyn Notifier>,
    pub default_slippage_bps: u32,
}

impl AmmContext {
    pub fn new(
        gateway: Arc<dyn ContractGateway>,
        account: AccountState,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            gateway,
            account,
            notifier,
            default_slippage_bps: slippage::DEFAULT_BPS,
        }
    }

    pub fn with_default_slippage(mut self, bps: u32) -> Self {
        self.default_slippage_bps = bps;
        self
    }

    pub fn slippage(&self, requested: Option<u32>) -> u32 {
        requested.unwrap_or(self.default_slippage_bps)
    }

    /// Wait for a submitted transaction and report it as `label`
    pub(crate) async fn submit(
        &self,
        label: &str,
        submitted: Result<PendingTx, GatewayError>,
    ) -> Result<TxReceipt, ProtocolError> {
        let pending = submitted?;
        let receipt = pending.confirm().await?;
        self.notifier
            .notify(Notification::success(format!("{} confirmed", label)).with_tx(receipt.tx_hash));
        Ok(receipt)
    }

    /// Approve the router for `token` and report the outcome
    pub(crate) async fn approve(
        &self,
        approvals: &Approvals,
        token: &Token,
        owner: Address,
    ) -> Result<TxReceipt, ProtocolError> {
        match approvals.approve(token.address, owner).await {
            Ok(receipt) => {
                self.notifier.notify(
                    Notification::success(format!("{} approved", token.symbol))
                        .with_tx(receipt.tx_hash),
                );
                Ok(receipt)
            }
            Err(e) => {
                let err = ProtocolError::from(e);
                self.report_failure(&format!("Approving {}", token.symbol), &err);
                Err(err)
            }
        }
    }

    /// Approve the token an `Approve` action names; nothing to do otherwise.
    ///
    /// Failures before submission are reported the same way as failed
    /// approvals.
    pub(crate) async fn approve_for<Q>(
        &self,
        approvals: &Approvals,
        action: Result<Action<Q>, ProtocolError>,
    ) -> Result<Option<TxReceipt>, ProtocolError> {
        let token = match settle(action) {
            Ok(Action::Approve { token, .. }) => token,
            Ok(_) => return Ok(None),
            Err(e) => {
                self.report_failure("Approval", &e);
                return Err(e);
            }
        };
        let owner = self.account.require().inspect_err(|e| {
            self.report_failure(&format!("Approving {}", token.symbol), e);
        })?;
        self.approve(approvals, &token, owner).await.map(Some)
    }

    /// Fail with `InsufficientBalance` when `owner` holds less than `required`
    pub(crate) async fn ensure_balance(
        &self,
        token: &Token,
        owner: Address,
        required: U256,
    ) -> Result<(), ProtocolError> {
        let available = self.gateway.token(token.address).balance_of(owner).await?;
        if available < required {
            return Err(ProtocolError::InsufficientBalance {
                token: token.symbol.clone(),
                required: from_base_units(required, DEFAULT_DECIMALS),
                available: from_base_units(available, DEFAULT_DECIMALS),
            });
        }
        Ok(())
    }

    /// Surface a failed operation; stale results stay silent
    pub(crate) fn report_failure(&self, label: &str, err: &ProtocolError) {
        if !err.is_silent() {
            self.notifier
                .notify(Notification::error(format!("{} failed: {}", label, err)));
        }
    }
}

/// Unix time 20 minutes from now
pub fn deadline() -> U256 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    U256::from(now + tx::DEADLINE_SECS)
}

/// Turn validation failures into a disabled action
pub(crate) fn settle<Q>(result: Result<Action<Q>, ProtocolError>) -> Result<Action<Q>, ProtocolError> {
    match result {
        Err(e) if e.disables_action() => Ok(Action::disabled(e.to_string())),
        other => other,
    }
}

/// The quote of an executable action, or why it cannot execute
pub(crate) fn executable<Q>(action: Action<Q>) -> Result<Q, ProtocolError> {
    match action {
        Action::Execute { quote } => Ok(quote),
        Action::Approve { token, .. } => Err(ProtocolError::invalid_input(format!(
            "{} must be approved first",
            token.symbol
        ))),
        Action::Disabled { reason } => Err(ProtocolError::invalid_input(reason)),
    }
}

/// Non-empty trimmed text field
pub(crate) fn filled(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
