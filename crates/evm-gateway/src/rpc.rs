//! JSON-RPC backend
//!
//! Contract bindings are generated with alloy's `sol!` macro. Reads go through
//! a bounded timeout; writes are signed by the configured key and return a
//! handle that waits for one confirmation.

use std::fmt::Display;
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use alloy::network::Ethereum;
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use alloy::transports::http::reqwest::Url;
use async_trait::async_trait;
use swapdesk_core::{ChainConfig, ContractAddresses, GatewayError};
use tracing::debug;

use crate::{
    AddLiquidityParams, ContractGateway, FactoryContract, PairContract, PendingTransaction,
    PendingTx, RemoveLiquidityParams, Reserves, Result, RouterContract, SwapParams,
    TokenContract, TxReceipt, WethContract,
};

/// Upper bound on a single read call
const READ_TIMEOUT: Duration = Duration::from_secs(30);

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function totalSupply() external view returns (uint256);
        function balanceOf(address owner) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function transfer(address to, uint256 amount) external returns (bool);
    }

    #[sol(rpc)]
    interface IWETH9 {
        function deposit() external payable;
        function withdraw(uint256 wad) external;
    }

    #[sol(rpc)]
    interface IUniswapV2Pair {
        function token0() external view returns (address);
        function token1() external view returns (address);
        function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast);
    }

    #[sol(rpc)]
    interface IUniswapV2Factory {
        function allPairsLength() external view returns (uint256);
        function allPairs(uint256 index) external view returns (address);
        function getPair(address tokenA, address tokenB) external view returns (address);
    }

    #[sol(rpc)]
    interface IUniswapV2Router02 {
        function getAmountsOut(uint256 amountIn, address[] path) external view returns (uint256[] amounts);
        function addLiquidity(
            address tokenA,
            address tokenB,
            uint256 amountADesired,
            uint256 amountBDesired,
            uint256 amountAMin,
            uint256 amountBMin,
            address to,
            uint256 deadline
        ) external returns (uint256 amountA, uint256 amountB, uint256 liquidity);
        function removeLiquidity(
            address tokenA,
            address tokenB,
            uint256 liquidity,
            uint256 amountAMin,
            uint256 amountBMin,
            address to,
            uint256 deadline
        ) external returns (uint256 amountA, uint256 amountB);
        function swapExactTokensForTokens(
            uint256 amountIn,
            uint256 amountOutMin,
            address[] path,
            address to,
            uint256 deadline
        ) external returns (uint256[] amounts);
    }
}

fn call_failed<E: Display>(method: &'static str) -> impl FnOnce(E) -> GatewayError {
    move |e| GatewayError::CallFailed {
        method,
        message: e.to_string(),
    }
}

/// Run a read call with the standard timeout
async fn timed<T, E, F>(method: &'static str, call: F) -> Result<T>
where
    E: Display,
    F: IntoFuture<Output = std::result::Result<T, E>>,
{
    match tokio::time::timeout(READ_TIMEOUT, call.into_future()).await {
        Ok(result) => result.map_err(call_failed(method)),
        Err(_) => Err(GatewayError::CallFailed {
            method,
            message: format!("timed out after {}s", READ_TIMEOUT.as_secs()),
        }),
    }
}

/// Gateway to a live chain over HTTP JSON-RPC
#[derive(Clone)]
pub struct RpcGateway {
    provider: DynProvider,
    contracts: ContractAddresses,
    signer: Option<Address>,
    confirmation_timeout: Option<Duration>,
}

impl RpcGateway {
    pub fn connect(chain: &ChainConfig, contracts: &ContractAddresses) -> Result<Self> {
        let url: Url = chain
            .rpc_url
            .parse()
            .map_err(|_| GatewayError::Unreachable {
                url: chain.rpc_url.clone(),
            })?;

        let (provider, signer) = match chain.private_key.as_deref() {
            Some(key) => {
                let wallet: PrivateKeySigner =
                    key.trim().parse().map_err(call_failed("load_signer"))?;
                let address = wallet.address();
                let provider = ProviderBuilder::new()
                    .wallet(wallet)
                    .connect_http(url)
                    .erased();
                (provider, Some(address))
            }
            None => (ProviderBuilder::new().connect_http(url).erased(), None),
        };

        debug!(
            "RPC gateway for {} (signer: {})",
            chain.rpc_url,
            signer.map(|a| a.to_string()).unwrap_or_else(|| "none".into())
        );

        Ok(Self {
            provider,
            contracts: contracts.clone(),
            signer,
            confirmation_timeout: chain.confirmation_timeout_secs.map(Duration::from_secs),
        })
    }

    /// Address of the configured signing key
    pub fn signer(&self) -> Option<Address> {
        self.signer
    }

    /// Chain id reported by the node; doubles as a reachability check
    pub async fn chain_id(&self) -> Result<u64> {
        timed("eth_chainId", self.provider.get_chain_id()).await
    }

    fn contract(&self, address: Address) -> RpcContract {
        RpcContract {
            gateway: self.clone(),
            address,
        }
    }

    fn require_signer(&self) -> Result<()> {
        match self.signer {
            Some(_) => Ok(()),
            None => Err(GatewayError::NoSigner),
        }
    }

    fn pending(&self, inner: PendingTransactionBuilder<Ethereum>) -> PendingTx {
        Box::new(RpcPendingTx {
            inner,
            timeout: self.confirmation_timeout,
        })
    }
}

impl ContractGateway for RpcGateway {
    fn token(&self, address: Address) -> Arc<dyn TokenContract> {
        Arc::new(self.contract(address))
    }

    fn weth(&self) -> Arc<dyn WethContract> {
        Arc::new(self.contract(self.contracts.weth))
    }

    fn pair(&self, address: Address) -> Arc<dyn PairContract> {
        Arc::new(self.contract(address))
    }

    fn factory(&self) -> Arc<dyn FactoryContract> {
        Arc::new(self.contract(self.contracts.factory))
    }

    fn router(&self) -> Arc<dyn RouterContract> {
        Arc::new(self.contract(self.contracts.router))
    }
}

struct RpcPendingTx {
    inner: PendingTransactionBuilder<Ethereum>,
    timeout: Option<Duration>,
}

#[async_trait]
impl PendingTransaction for RpcPendingTx {
    fn tx_hash(&self) -> TxHash {
        *self.inner.tx_hash()
    }

    async fn confirm(self: Box<Self>) -> Result<TxReceipt> {
        let RpcPendingTx { inner, timeout } = *self;
        let tx_hash = *inner.tx_hash();
        let receipt = inner
            .with_required_confirmations(1)
            .with_timeout(timeout)
            .get_receipt()
            .await
            .map_err(|e| GatewayError::ConfirmationFailed {
                tx_hash: tx_hash.to_string(),
                message: e.to_string(),
            })?;

        if !receipt.status() {
            return Err(GatewayError::Reverted {
                tx_hash: tx_hash.to_string(),
            });
        }

        Ok(TxReceipt {
            tx_hash,
            block_number: receipt.block_number,
        })
    }
}

/// One deployed contract; the traits it satisfies depend on the address
struct RpcContract {
    gateway: RpcGateway,
    address: Address,
}

impl RpcContract {
    fn erc20(&self) -> IERC20::IERC20Instance<DynProvider> {
        IERC20::new(self.address, self.gateway.provider.clone())
    }

    fn pair(&self) -> IUniswapV2Pair::IUniswapV2PairInstance<DynProvider> {
        IUniswapV2Pair::new(self.address, self.gateway.provider.clone())
    }

    fn factory(&self) -> IUniswapV2Factory::IUniswapV2FactoryInstance<DynProvider> {
        IUniswapV2Factory::new(self.address, self.gateway.provider.clone())
    }

    fn router(&self) -> IUniswapV2Router02::IUniswapV2Router02Instance<DynProvider> {
        IUniswapV2Router02::new(self.address, self.gateway.provider.clone())
    }
}

#[async_trait]
impl TokenContract for RpcContract {
    fn address(&self) -> Address {
        self.address
    }

    async fn symbol(&self) -> Result<String> {
        let token = self.erc20();
        timed("symbol", token.symbol().call()).await
    }

    async fn decimals(&self) -> Result<u8> {
        let token = self.erc20();
        timed("decimals", token.decimals().call()).await
    }

    async fn total_supply(&self) -> Result<U256> {
        let token = self.erc20();
        timed("totalSupply", token.totalSupply().call()).await
    }

    async fn balance_of(&self, owner: Address) -> Result<U256> {
        let token = self.erc20();
        timed("balanceOf", token.balanceOf(owner).call()).await
    }

    async fn allowance(&self, owner: Address, spender: Address) -> Result<U256> {
        let token = self.erc20();
        timed("allowance", token.allowance(owner, spender).call()).await
    }

    async fn approve(&self, spender: Address, amount: U256) -> Result<PendingTx> {
        self.gateway.require_signer()?;
        let pending = self
            .erc20()
            .approve(spender, amount)
            .send()
            .await
            .map_err(call_failed("approve"))?;
        debug!("approve {} for {} sent: {}", self.address, spender, pending.tx_hash());
        Ok(self.gateway.pending(pending))
    }

    async fn transfer(&self, to: Address, amount: U256) -> Result<PendingTx> {
        self.gateway.require_signer()?;
        let pending = self
            .erc20()
            .transfer(to, amount)
            .send()
            .await
            .map_err(call_failed("transfer"))?;
        Ok(self.gateway.pending(pending))
    }
}

#[async_trait]
impl WethContract for RpcContract {
    async fn deposit(&self, value: U256) -> Result<PendingTx> {
        self.gateway.require_signer()?;
        let pending = IWETH9::new(self.address, self.gateway.provider.clone())
            .deposit()
            .value(value)
            .send()
            .await
            .map_err(call_failed("deposit"))?;
        Ok(self.gateway.pending(pending))
    }

    async fn withdraw(&self, amount: U256) -> Result<PendingTx> {
        self.gateway.require_signer()?;
        let pending = IWETH9::new(self.address, self.gateway.provider.clone())
            .withdraw(amount)
            .send()
            .await
            .map_err(call_failed("withdraw"))?;
        Ok(self.gateway.pending(pending))
    }
}

#[async_trait]
impl PairContract for RpcContract {
    async fn token0(&self) -> Result<Address> {
        let pair = self.pair();
        timed("token0", pair.token0().call()).await
    }

    async fn token1(&self) -> Result<Address> {
        let pair = self.pair();
        timed("token1", pair.token1().call()).await
    }

    async fn get_reserves(&self) -> Result<Reserves> {
        let pair = self.pair();
        let reserves = timed("getReserves", pair.getReserves().call()).await?;
        Ok(Reserves {
            reserve0: U256::from(reserves.reserve0),
            reserve1: U256::from(reserves.reserve1),
        })
    }
}

#[async_trait]
impl FactoryContract for RpcContract {
    fn address(&self) -> Address {
        self.address
    }

    async fn all_pairs_length(&self) -> Result<u64> {
        let factory = self.factory();
        let length = timed("allPairsLength", factory.allPairsLength().call()).await?;
        u64::try_from(length).map_err(call_failed("allPairsLength"))
    }

    async fn all_pairs(&self, index: u64) -> Result<Address> {
        let factory = self.factory();
        timed("allPairs", factory.allPairs(U256::from(index)).call()).await
    }

    async fn get_pair(&self, token_a: Address, token_b: Address) -> Result<Address> {
        let factory = self.factory();
        timed("getPair", factory.getPair(token_a, token_b).call()).await
    }
}

#[async_trait]
impl RouterContract for RpcContract {
    fn address(&self) -> Address {
        self.address
    }

    async fn get_amounts_out(&self, amount_in: U256, path: &[Address]) -> Result<Vec<U256>> {
        let router = self.router();
        timed(
            "getAmountsOut",
            router.getAmountsOut(amount_in, path.to_vec()).call(),
        )
        .await
    }

    async fn add_liquidity(&self, params: AddLiquidityParams) -> Result<PendingTx> {
        self.gateway.require_signer()?;
        let pending = self
            .router()
            .addLiquidity(
                params.token_a,
                params.token_b,
                params.amount_a_desired,
                params.amount_b_desired,
                params.amount_a_min,
                params.amount_b_min,
                params.to,
                params.deadline,
            )
            .send()
            .await
            .map_err(call_failed("addLiquidity"))?;
        Ok(self.gateway.pending(pending))
    }

    async fn remove_liquidity(&self, params: RemoveLiquidityParams) -> Result<PendingTx> {
        self.gateway.require_signer()?;
        let pending = self
            .router()
            .removeLiquidity(
                params.token_a,
                params.token_b,
                params.liquidity,
                params.amount_a_min,
                params.amount_b_min,
                params.to,
                params.deadline,
            )
            .send()
            .await
            .map_err(call_failed("removeLiquidity"))?;
        Ok(self.gateway.pending(pending))
    }

    async fn swap_exact_tokens_for_tokens(&self, params: SwapParams) -> Result<PendingTx> {
        self.gateway.require_signer()?;
        let pending = self
            .router()
            .swapExactTokensForTokens(
                params.amount_in,
                params.amount_out_min,
                params.path,
                params.to,
                params.deadline,
            )
            .send()
            .await
            .map_err(call_failed("swapExactTokensForTokens"))?;
        Ok(self.gateway.pending(pending))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_read_only() {
        let chain = ChainConfig::default();
        let gateway = RpcGateway::connect(&chain, &ContractAddresses::default()).unwrap();
        assert!(gateway.signer().is_none());
        assert!(matches!(gateway.require_signer(), Err(GatewayError::NoSigner)));
    }

    #[test]
    fn test_connect_with_signer() {
        let chain = ChainConfig {
            // well-known first dev account of anvil/hardhat
            private_key: Some(
                "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80".into(),
            ),
            ..ChainConfig::default()
        };
        let gateway = RpcGateway::connect(&chain, &ContractAddresses::default()).unwrap();
        assert_eq!(
            gateway.signer().map(|a| a.to_string().to_lowercase()),
            Some("0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".to_string())
        );
    }

    #[test]
    fn test_bad_url_is_unreachable() {
        let chain = ChainConfig {
            rpc_url: "not a url".into(),
            ..ChainConfig::default()
        };
        let err = RpcGateway::connect(&chain, &ContractAddresses::default()).err();
        assert!(matches!(err, Some(GatewayError::Unreachable { .. })));
    }
}
