//! Fixtures shared by the orchestrator tests

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use evm_gateway::{AccountState, SimulatedChain};
use swapdesk_core::Token;

use crate::context::AmmContext;
use crate::notify::{Level, NotificationLog};

pub fn eth(n: u64) -> U256 {
    U256::from(n) * U256::from(10u64).pow(U256::from(18u64))
}

pub struct Fixture {
    pub chain: SimulatedChain,
    pub ctx: AmmContext,
    pub log: Arc<NotificationLog>,
    pub user: Address,
    pub weth: Token,
    pub test: Token,
    pub pair: Address,
}

impl Fixture {
    pub fn last_level(&self) -> Option<Level> {
        self.log.entries().last().map(|n| n.level)
    }
}

/// WETH/TEST pool at 10:20 whose LP tokens belong to the user, who also holds
/// 5 WETH and 50 TEST. The chain signs as whichever account is selected.
pub async fn fixture() -> Fixture {
    let user = Address::repeat_byte(0xaa);
    let account = AccountState::new(Some(user));
    let chain = SimulatedChain::new(user).follow_account(account.clone());
    let weth = chain.weth_address();
    let test = chain.deploy_token("TEST").await;
    let pair = chain
        .seed_pool(weth, test, eth(10), eth(20), user)
        .await
        .expect("seed pool");
    chain.mint(weth, user, eth(5)).await.expect("mint weth");
    chain.mint(test, user, eth(50)).await.expect("mint test");

    let log = Arc::new(NotificationLog::default());
    let ctx = AmmContext::new(Arc::new(chain.clone()), account, log.clone());

    Fixture {
        chain,
        ctx,
        log,
        user,
        weth: Token::new(weth, "WETH"),
        test: Token::new(test, "TEST"),
        pair,
    }
}
