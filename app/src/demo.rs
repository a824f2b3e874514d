//! Seeded in-memory chain for local runs without a node

use alloy_primitives::{address, Address, U256};
use evm_gateway::SimulatedChain;
use swapdesk_core::{units::to_base_units, ContractAddresses, GatewayError};

/// First default account of a local development node
pub const DEMO_ACCOUNT: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

fn units(amount: &str) -> Result<U256, GatewayError> {
    to_base_units(amount, 18).map_err(|e| GatewayError::CallFailed {
        method: "seed",
        message: e.to_string(),
    })
}

/// WETH plus two test tokens, a WETH/TEST and a TEST/TEST2 pool, and a
/// funded demo account
pub async fn seeded_chain() -> Result<(SimulatedChain, ContractAddresses), GatewayError> {
    let chain = SimulatedChain::new(DEMO_ACCOUNT);
    let weth = chain.weth_address();
    let test = chain.deploy_token("TEST").await;
    let test2 = chain.deploy_token("TEST2").await;

    chain.fund_ether(DEMO_ACCOUNT, units("100")?).await;
    chain.mint(weth, DEMO_ACCOUNT, units("10")?).await?;
    chain.mint(test, DEMO_ACCOUNT, units("1000")?).await?;
    chain.mint(test2, DEMO_ACCOUNT, units("1000")?).await?;

    chain
        .seed_pool(weth, test, units("50")?, units("100000")?, DEMO_ACCOUNT)
        .await?;
    chain
        .seed_pool(test, test2, units("5000")?, units("2500")?, DEMO_ACCOUNT)
        .await?;

    let mut contracts = chain.contracts();
    contracts.tokens = vec![test, test2];
    Ok((chain, contracts))
}
