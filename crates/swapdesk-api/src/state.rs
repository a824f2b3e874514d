//! Application state shared across API handlers

use std::sync::Arc;

use amm::{
    AmmContext, DepositOrchestrator, NotificationLog, RedeemOrchestrator, SwapOrchestrator,
};
use evm_gateway::{AccountState, ContractGateway};
use intent::{CompletionService, IntentResolver};
use swapdesk_core::{AppConfig, Handoff, TokenRegistry};
use tokio::sync::RwLock;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    gateway: Arc<dyn ContractGateway>,
    account: AccountState,
    handoff: Handoff,
    registry: RwLock<TokenRegistry>,
    resolver: IntentResolver,
    notifications: Arc<NotificationLog>,
    amm: AmmContext,
    swap: SwapOrchestrator,
    deposit: DepositOrchestrator,
    redeem: RedeemOrchestrator,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        gateway: Arc<dyn ContractGateway>,
        account: AccountState,
        registry: TokenRegistry,
        completion: Arc<dyn CompletionService>,
    ) -> Self {
        let notifications = Arc::new(NotificationLog::default());
        let amm = AmmContext::new(gateway.clone(), account.clone(), notifications.clone())
            .with_default_slippage(config.default_slippage_bps);

        Self {
            inner: Arc::new(AppStateInner {
                swap: SwapOrchestrator::new(amm.clone()),
                deposit: DepositOrchestrator::new(amm.clone()),
                redeem: RedeemOrchestrator::new(amm.clone()),
                resolver: IntentResolver::new(completion),
                registry: RwLock::new(registry),
                handoff: Handoff::new(),
                config,
                gateway,
                account,
                notifications,
                amm,
            }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn gateway(&self) -> &dyn ContractGateway {
        self.inner.gateway.as_ref()
    }

    pub fn account(&self) -> &AccountState {
        &self.inner.account
    }

    pub fn handoff(&self) -> &Handoff {
        &self.inner.handoff
    }

    pub fn resolver(&self) -> &IntentResolver {
        &self.inner.resolver
    }

    pub fn notifications(&self) -> &NotificationLog {
        &self.inner.notifications
    }

    pub fn amm(&self) -> &AmmContext {
        &self.inner.amm
    }

    pub fn swap(&self) -> &SwapOrchestrator {
        &self.inner.swap
    }

    pub fn deposit(&self) -> &DepositOrchestrator {
        &self.inner.deposit
    }

    pub fn redeem(&self) -> &RedeemOrchestrator {
        &self.inner.redeem
    }

    pub async fn registry(&self) -> TokenRegistry {
        self.inner.registry.read().await.clone()
    }

    pub async fn set_registry(&self, registry: TokenRegistry) {
        *self.inner.registry.write().await = registry;
    }
}
