//! Allowance tracking
//!
//! One tracker per `(token, owner, spender)` triple.
//!
//! ```text
//! Unknown -> Checking -> Sufficient
//!                     -> Insufficient -> ApprovalPending -> Checking -> ...
//! ```
//!
//! A confirmed approval always re-reads the allowance from chain rather than
//! assuming the approved amount took effect.

use std::collections::HashMap;
use std::sync::Arc;

use alloy_primitives::{Address, U256};
use evm_gateway::{ContractGateway, PendingTx, TokenContract, TxReceipt};
use serde::Serialize;
use swapdesk_core::GatewayError;
use tokio::sync::Mutex;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Unknown,
    Checking,
    Sufficient,
    Insufficient,
    ApprovalPending,
}

/// Amount to approve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalAmount {
    Exact(U256),
    /// `2^256 - 1`, never decremented by the token
    Unlimited,
}

impl ApprovalAmount {
    pub fn value(&self) -> U256 {
        match self {
            Self::Exact(v) => *v,
            Self::Unlimited => U256::MAX,
        }
    }
}

pub struct ApprovalTracker {
    token: Arc<dyn TokenContract>,
    owner: Address,
    spender: Address,
    status: ApprovalStatus,
    allowance: Option<U256>,
    required: U256,
}

impl ApprovalTracker {
    pub fn new(token: Arc<dyn TokenContract>, owner: Address, spender: Address) -> Self {
        Self {
            token,
            owner,
            spender,
            status: ApprovalStatus::Unknown,
            allowance: None,
            required: U256::ZERO,
        }
    }

    pub fn status(&self) -> ApprovalStatus {
        self.status
    }

    /// Last allowance read from chain
    pub fn allowance(&self) -> Option<U256> {
        self.allowance
    }

    pub fn token(&self) -> Address {
        self.token.address()
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn spender(&self) -> Address {
        self.spender
    }

    /// Read the allowance and classify it against `required`
    ///
    /// An approval still awaiting confirmation stays `ApprovalPending` until
    /// the allowance it grants is visible.
    pub async fn check(&mut self, required: U256) -> Result<ApprovalStatus, GatewayError> {
        let awaiting = self.status == ApprovalStatus::ApprovalPending;
        self.required = required;
        self.status = ApprovalStatus::Checking;

        match self.token.allowance(self.owner, self.spender).await {
            Ok(allowance) => {
                self.allowance = Some(allowance);
                self.status = if allowance >= required {
                    ApprovalStatus::Sufficient
                } else if awaiting {
                    ApprovalStatus::ApprovalPending
                } else {
                    ApprovalStatus::Insufficient
                };
                debug!(
                    "Allowance of {} for {}: {} (need {}) -> {:?}",
                    self.token.address(),
                    self.spender,
                    allowance,
                    required,
                    self.status
                );
                Ok(self.status)
            }
            Err(e) => {
                self.status = if awaiting {
                    ApprovalStatus::ApprovalPending
                } else {
                    ApprovalStatus::Unknown
                };
                self.allowance = None;
                Err(e)
            }
        }
    }

    /// Whether the last known allowance covers `amount`
    pub fn is_sufficient(&self, amount: U256) -> bool {
        match self.status {
            ApprovalStatus::Sufficient | ApprovalStatus::Insufficient => {
                self.allowance.is_some_and(|allowance| allowance >= amount)
            }
            _ => false,
        }
    }

    /// Submit an approval for the spender.
    ///
    /// Allowed in any state; approving an already sufficient allowance only
    /// costs gas.
    pub async fn approve(&mut self, amount: ApprovalAmount) -> Result<PendingTx, GatewayError> {
        let previous = self.status;
        match self.token.approve(self.spender, amount.value()).await {
            Ok(pending) => {
                self.status = ApprovalStatus::ApprovalPending;
                info!(
                    "Approval of {} for {} submitted: {}",
                    self.token.address(),
                    self.spender,
                    pending.tx_hash()
                );
                Ok(pending)
            }
            Err(e) => {
                self.status = previous;
                Err(e)
            }
        }
    }

    /// Wait for a submitted approval, then re-read the allowance
    pub async fn confirm(&mut self, pending: PendingTx) -> Result<TxReceipt, GatewayError> {
        let confirmed = pending.confirm().await;
        self.finish(confirmed).await
    }

    /// Record how a submitted approval ended, re-reading the allowance when
    /// it confirmed
    pub async fn finish(
        &mut self,
        confirmed: Result<TxReceipt, GatewayError>,
    ) -> Result<TxReceipt, GatewayError> {
        match confirmed {
            Ok(receipt) => {
                self.status = ApprovalStatus::Checking;
                self.check(self.required).await?;
                Ok(receipt)
            }
            Err(e) => {
                self.status = ApprovalStatus::Insufficient;
                Err(e)
            }
        }
    }

    pub async fn approve_and_confirm(
        &mut self,
        amount: ApprovalAmount,
    ) -> Result<TxReceipt, GatewayError> {
        let pending = self.approve(amount).await?;
        self.confirm(pending).await
    }
}

/// Trackers for every token an orchestrator spends, re-created whenever the
/// owner changes
pub struct Approvals {
    gateway: Arc<dyn ContractGateway>,
    trackers: Mutex<HashMap<Address, ApprovalTracker>>,
}

impl Approvals {
    pub fn new(gateway: Arc<dyn ContractGateway>) -> Self {
        Self {
            gateway,
            trackers: Mutex::new(HashMap::new()),
        }
    }

    fn tracker<'a>(
        &self,
        trackers: &'a mut HashMap<Address, ApprovalTracker>,
        token: Address,
        owner: Address,
    ) -> &'a mut ApprovalTracker {
        let spender = self.gateway.router_address();
        let tracker = trackers
            .entry(token)
            .or_insert_with(|| ApprovalTracker::new(self.gateway.token(token), owner, spender));
        if tracker.owner() != owner || tracker.spender() != spender {
            *tracker = ApprovalTracker::new(self.gateway.token(token), owner, spender);
        }
        tracker
    }

    /// Check `owner`'s allowance of `token` for the router against `amount`
    pub async fn check(
        &self,
        token: Address,
        owner: Address,
        amount: U256,
    ) -> Result<bool, GatewayError> {
        let mut trackers = self.trackers.lock().await;
        let tracker = self.tracker(&mut trackers, token, owner);
        tracker.check(amount).await?;
        Ok(tracker.is_sufficient(amount))
    }

    /// Approve the router for an unlimited amount of `token` and wait for it.
    ///
    /// The trackers are only locked to submit and to record the outcome, so
    /// checks keep answering while the approval is pending.
    pub async fn approve(&self, token: Address, owner: Address) -> Result<TxReceipt, GatewayError> {
        let pending = {
            let mut trackers = self.trackers.lock().await;
            self.tracker(&mut trackers, token, owner)
                .approve(ApprovalAmount::Unlimited)
                .await?
        };
        let confirmed = pending.confirm().await;

        let mut trackers = self.trackers.lock().await;
        self.tracker(&mut trackers, token, owner)
            .finish(confirmed)
            .await
    }

    pub async fn status(&self, token: Address) -> ApprovalStatus {
        self.trackers
            .lock()
            .await
            .get(&token)
            .map(|t| t.status())
            .unwrap_or(ApprovalStatus::Unknown)
    }
}
