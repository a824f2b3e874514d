//! evm-gateway: Typed access to the AMM contracts
//!
//! One trait per contract role (ERC20 token, WETH, pair, factory, router),
//! a JSON-RPC backend built on alloy, an in-memory simulated chain, and the
//! process-wide wallet account.

pub mod account;
pub mod rpc;
pub mod sim;

use std::sync::Arc;

use alloy_primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use swapdesk_core::GatewayError;

pub use account::{AccountSnapshot, AccountState, AccountSubscription};
pub use rpc::RpcGateway;
pub use sim::SimulatedChain;

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Receipt of a confirmed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
}

/// A submitted transaction that can be awaited to one confirmation
#[async_trait]
pub trait PendingTransaction: Send {
    fn tx_hash(&self) -> TxHash;

    /// Wait for inclusion; a reverted transaction is an error
    async fn confirm(self: Box<Self>) -> Result<TxReceipt>;
}

pub type PendingTx = Box<dyn PendingTransaction>;

/// Pair reserves in the pair's own token0/token1 order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reserves {
    pub reserve0: U256,
    pub reserve1: U256,
}

/// Arguments to `swapExactTokensForTokens`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapParams {
    pub amount_in: U256,
    pub amount_out_min: U256,
    pub path: Vec<Address>,
    pub to: Address,
    pub deadline: U256,
}

/// Arguments to `addLiquidity`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddLiquidityParams {
    pub token_a: Address,
    pub token_b: Address,
    pub amount_a_desired: U256,
    pub amount_b_desired: U256,
    pub amount_a_min: U256,
    pub amount_b_min: U256,
    pub to: Address,
    pub deadline: U256,
}

/// Arguments to `removeLiquidity`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveLiquidityParams {
    pub token_a: Address,
    pub token_b: Address,
    pub liquidity: U256,
    pub amount_a_min: U256,
    pub amount_b_min: U256,
    pub to: Address,
    pub deadline: U256,
}

/// ERC20 capability set, shared by plain tokens, WETH and LP tokens
#[async_trait]
pub trait TokenContract: Send + Sync {
    fn address(&self) -> Address;
    async fn symbol(&self) -> Result<String>;
    async fn decimals(&self) -> Result<u8>;
    async fn total_supply(&self) -> Result<U256>;
    async fn balance_of(&self, owner: Address) -> Result<U256>;
    async fn allowance(&self, owner: Address, spender: Address) -> Result<U256>;
    async fn approve(&self, spender: Address, amount: U256) -> Result<PendingTx>;
    async fn transfer(&self, to: Address, amount: U256) -> Result<PendingTx>;
}

/// Wrapped ether
#[async_trait]
pub trait WethContract: TokenContract {
    /// Wrap `value` wei of ether
    async fn deposit(&self, value: U256) -> Result<PendingTx>;
    /// Unwrap `amount` WETH back into ether
    async fn withdraw(&self, amount: U256) -> Result<PendingTx>;
}

/// Constant-product pair; also the LP token
#[async_trait]
pub trait PairContract: TokenContract {
    async fn token0(&self) -> Result<Address>;
    async fn token1(&self) -> Result<Address>;
    async fn get_reserves(&self) -> Result<Reserves>;
}

#[async_trait]
pub trait FactoryContract: Send + Sync {
    fn address(&self) -> Address;
    async fn all_pairs_length(&self) -> Result<u64>;
    async fn all_pairs(&self, index: u64) -> Result<Address>;
    /// Pair for two tokens in either order; zero address when none exists
    async fn get_pair(&self, token_a: Address, token_b: Address) -> Result<Address>;
}

#[async_trait]
pub trait RouterContract: Send + Sync {
    fn address(&self) -> Address;
    async fn get_amounts_out(&self, amount_in: U256, path: &[Address]) -> Result<Vec<U256>>;
    async fn add_liquidity(&self, params: AddLiquidityParams) -> Result<PendingTx>;
    async fn remove_liquidity(&self, params: RemoveLiquidityParams) -> Result<PendingTx>;
    async fn swap_exact_tokens_for_tokens(&self, params: SwapParams) -> Result<PendingTx>;
}

/// Factory for typed contract handles
pub trait ContractGateway: Send + Sync {
    fn token(&self, address: Address) -> Arc<dyn TokenContract>;
    fn weth(&self) -> Arc<dyn WethContract>;
    fn pair(&self, address: Address) -> Arc<dyn PairContract>;
    fn factory(&self) -> Arc<dyn FactoryContract>;
    fn router(&self) -> Arc<dyn RouterContract>;

    fn router_address(&self) -> Address {
        self.router().address()
    }
}

/// Short display form of a transaction hash (`0x1234…abcd`)
pub fn short_hash(hash: &TxHash) -> String {
    let full = hash.to_string();
    if full.len() <= 12 {
        return full;
    }
    format!("{}…{}", &full[..6], &full[full.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_hash() {
        let hash = TxHash::repeat_byte(0xab);
        assert_eq!(short_hash(&hash), "0xabab…abab");
    }
}
