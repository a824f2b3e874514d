//! Pool Directory
//!
//! Enumerates pairs known to the factory and reads each pair's tokens,
//! symbols and reserves. Also resolves token symbols for the registry.

use alloy_primitives::{Address, U256};
use evm_gateway::ContractGateway;
use futures::stream::{self, StreamExt};
use swapdesk_core::{GatewayError, Operation, PendingOperation, ProtocolError, Token, TokenRegistry};
use tracing::{debug, warn};

use crate::constants::directory;
use crate::state::Pool;

/// Read a single pair
pub async fn fetch_pool(
    gateway: &dyn ContractGateway,
    address: Address,
) -> Result<Pool, GatewayError> {
    let pair = gateway.pair(address);
    let (token0, token1, reserves) =
        tokio::try_join!(pair.token0(), pair.token1(), pair.get_reserves())?;

    let (t0, t1) = (gateway.token(token0), gateway.token(token1));
    let (token0_symbol, token1_symbol) = tokio::try_join!(t0.symbol(), t1.symbol())?;

    Ok(Pool {
        address,
        token0,
        token1,
        pair_name: format!("{}/{}", token0_symbol, token1_symbol),
        token0_symbol,
        token1_symbol,
        reserve0: reserves.reserve0,
        reserve1: reserves.reserve1,
    })
}

async fn fetch_pool_at(gateway: &dyn ContractGateway, index: u64) -> Result<Pool, GatewayError> {
    let address = gateway.factory().all_pairs(index).await?;
    fetch_pool(gateway, address).await
}

/// List every pool the factory knows about.
///
/// Failing to read the pair count fails the listing. A pair that cannot be
/// read is logged and left out. Results keep factory index order.
pub async fn list_pools(gateway: &dyn ContractGateway) -> Result<Vec<Pool>, ProtocolError> {
    let count = gateway.factory().all_pairs_length().await?;
    debug!("Factory reports {} pairs", count);

    let pools: Vec<Pool> = stream::iter(0..count)
        .map(|index| async move { (index, fetch_pool_at(gateway, index).await) })
        .buffered(directory::FETCH_CONCURRENCY)
        .filter_map(|(index, result)| async move {
            match result {
                Ok(pool) => Some(pool),
                Err(e) => {
                    warn!("Skipping pair #{}: {}", index, e);
                    None
                }
            }
        })
        .collect()
        .await;

    debug!("Listed {}/{} pools", pools.len(), count);
    Ok(pools)
}

/// Pool for a token pair in either order; `None` when the factory has none
pub async fn find_pool(
    gateway: &dyn ContractGateway,
    token_a: Address,
    token_b: Address,
) -> Result<Option<Pool>, ProtocolError> {
    let address = gateway.factory().get_pair(token_a, token_b).await?;
    if address.is_zero() {
        return Ok(None);
    }
    Ok(Some(fetch_pool(gateway, address).await?))
}

/// Pool for a token pair, or `PoolNotFound`
pub async fn require_pool(
    gateway: &dyn ContractGateway,
    token_a: &Token,
    token_b: &Token,
) -> Result<Pool, ProtocolError> {
    find_pool(gateway, token_a.address, token_b.address)
        .await?
        .ok_or_else(|| ProtocolError::PoolNotFound {
            pair: format!("{}/{}", token_a.symbol, token_b.symbol),
        })
}

/// Wallet balance of `token`
pub async fn token_balance(
    gateway: &dyn ContractGateway,
    token: Address,
    owner: Address,
) -> Result<U256, ProtocolError> {
    Ok(gateway.token(token).balance_of(owner).await?)
}

/// Build a registry from on-chain symbols; unreadable tokens are dropped
pub async fn load_token_registry(
    gateway: &dyn ContractGateway,
    addresses: &[Address],
) -> TokenRegistry {
    let tokens: Vec<Token> = stream::iter(addresses.iter().copied())
        .map(|address| async move { (address, gateway.token(address).symbol().await) })
        .buffered(directory::FETCH_CONCURRENCY)
        .filter_map(|(address, result)| async move {
            match result {
                Ok(symbol) => Some(Token::new(address, symbol)),
                Err(e) => {
                    warn!("Dropping token {} from registry: {}", address, e);
                    None
                }
            }
        })
        .collect()
        .await;
    TokenRegistry::new(tokens)
}

/// Hand a selected pool to the screen for `operation`
pub fn select_pool(pool: &Pool, operation: Operation) -> PendingOperation {
    let (token0, token1) = pool.tokens();
    let mut pending = PendingOperation::new(operation, token0, token1);
    pending.pool = Some(pool.address);
    pending
}
