//! In-memory chain
//!
//! Uniswap V2 semantics over plain maps: ERC20 balances and allowances, WETH,
//! a factory with pair enumeration, pairs whose reserves track their token
//! balances, and a router with the 0.3% fee. Transactions apply when sent; one
//! that would revert leaves the state untouched and reports `Reverted` when
//! confirmed. Used for tests and for running the service without a node.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use alloy_primitives::{keccak256, Address, TxHash, U256};
use async_trait::async_trait;
use num_bigint::BigUint;
use swapdesk_core::{ContractAddresses, GatewayError};
use tokio::sync::Mutex;
use tracing::debug;

use crate::{
    AccountState, AddLiquidityParams, ContractGateway, FactoryContract, PairContract,
    PendingTransaction, PendingTx, RemoveLiquidityParams, Reserves, Result, RouterContract,
    SwapParams, TokenContract, TxReceipt, WethContract,
};

/// LP tokens locked forever on first mint
const MINIMUM_LIQUIDITY: u64 = 1000;

type Revert = String;

fn revert<T>(reason: &str) -> std::result::Result<T, Revert> {
    Err(reason.to_string())
}

fn mul(a: U256, b: U256) -> std::result::Result<U256, Revert> {
    a.checked_mul(b).ok_or_else(|| "math overflow".to_string())
}

fn isqrt(value: U256) -> U256 {
    let root = BigUint::from_bytes_be(&value.to_be_bytes::<32>()).sqrt();
    U256::from_be_slice(&root.to_bytes_be())
}

fn now() -> U256 {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    U256::from(secs)
}

#[derive(Debug, Clone, Default)]
struct Erc20 {
    symbol: String,
    total_supply: U256,
    balances: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
}

impl Erc20 {
    fn named(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            ..Self::default()
        }
    }

    fn balance(&self, owner: Address) -> U256 {
        self.balances.get(&owner).copied().unwrap_or_default()
    }

    fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.allowances
            .get(&(owner, spender))
            .copied()
            .unwrap_or_default()
    }

    fn debit(&mut self, from: Address, amount: U256) -> std::result::Result<(), Revert> {
        let balance = self.balance(from);
        if balance < amount {
            return revert("ERC20: transfer amount exceeds balance");
        }
        self.balances.insert(from, balance - amount);
        Ok(())
    }

    fn credit(&mut self, to: Address, amount: U256) {
        let balance = self.balance(to);
        self.balances.insert(to, balance + amount);
    }

    fn spend_allowance(
        &mut self,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> std::result::Result<(), Revert> {
        let allowed = self.allowance(owner, spender);
        if allowed == U256::MAX {
            return Ok(());
        }
        if allowed < amount {
            return revert("ERC20: insufficient allowance");
        }
        self.allowances.insert((owner, spender), allowed - amount);
        Ok(())
    }

    fn mint(&mut self, to: Address, amount: U256) {
        self.total_supply += amount;
        self.credit(to, amount);
    }

    fn burn(&mut self, from: Address, amount: U256) -> std::result::Result<(), Revert> {
        self.debit(from, amount)?;
        self.total_supply -= amount;
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct PairState {
    token0: Address,
    token1: Address,
    reserve0: U256,
    reserve1: U256,
}

#[derive(Debug, Clone)]
struct ChainState {
    sender: Address,
    ether: HashMap<Address, U256>,
    tokens: HashMap<Address, Erc20>,
    pairs: HashMap<Address, PairState>,
    pair_index: HashMap<(Address, Address), Address>,
    all_pairs: Vec<Address>,
    failing: HashSet<Address>,
    fail_next_send: Option<String>,
    read_delay: Option<Duration>,
    confirmation_delay: Option<Duration>,
    calls: HashMap<&'static str, usize>,
    nonce: u64,
    block: u64,
}

fn sort_tokens(a: Address, b: Address) -> (Address, Address) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

impl ChainState {
    fn new(sender: Address) -> Self {
        Self {
            sender,
            ether: HashMap::new(),
            tokens: HashMap::new(),
            pairs: HashMap::new(),
            pair_index: HashMap::new(),
            all_pairs: Vec::new(),
            failing: HashSet::new(),
            fail_next_send: None,
            read_delay: None,
            confirmation_delay: None,
            calls: HashMap::new(),
            nonce: 0,
            block: 1,
        }
    }

    fn next_address(&mut self) -> Address {
        self.nonce += 1;
        let word = keccak256(format!("swapdesk-sim-contract-{}", self.nonce));
        Address::from_slice(&word[12..])
    }

    fn next_tx_hash(&mut self) -> TxHash {
        self.nonce += 1;
        keccak256(format!("swapdesk-sim-tx-{}", self.nonce))
    }

    fn deploy(&mut self, symbol: &str) -> Address {
        let address = self.next_address();
        self.tokens.insert(address, Erc20::named(symbol));
        address
    }

    fn token(&self, address: Address) -> std::result::Result<&Erc20, Revert> {
        self.tokens
            .get(&address)
            .ok_or_else(|| format!("no contract at {}", address))
    }

    fn token_mut(&mut self, address: Address) -> std::result::Result<&mut Erc20, Revert> {
        self.tokens
            .get_mut(&address)
            .ok_or_else(|| format!("no contract at {}", address))
    }

    fn pair(&self, address: Address) -> std::result::Result<&PairState, Revert> {
        self.pairs
            .get(&address)
            .ok_or_else(|| format!("no pair at {}", address))
    }

    fn transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> std::result::Result<(), Revert> {
        let erc20 = self.token_mut(token)?;
        erc20.debit(from, amount)?;
        erc20.credit(to, amount);
        Ok(())
    }

    fn transfer_from(
        &mut self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> std::result::Result<(), Revert> {
        self.token_mut(token)?.spend_allowance(from, spender, amount)?;
        self.transfer(token, from, to, amount)
    }

    fn pair_for(&self, a: Address, b: Address) -> Option<Address> {
        self.pair_index.get(&sort_tokens(a, b)).copied()
    }

    fn create_pair(&mut self, a: Address, b: Address) -> std::result::Result<Address, Revert> {
        if a == b {
            return revert("UniswapV2: IDENTICAL_ADDRESSES");
        }
        if a.is_zero() || b.is_zero() {
            return revert("UniswapV2: ZERO_ADDRESS");
        }
        if self.pair_for(a, b).is_some() {
            return revert("UniswapV2: PAIR_EXISTS");
        }
        let (token0, token1) = sort_tokens(a, b);
        let address = self.deploy("UNI-V2");
        self.pairs.insert(
            address,
            PairState {
                token0,
                token1,
                reserve0: U256::ZERO,
                reserve1: U256::ZERO,
            },
        );
        self.pair_index.insert((token0, token1), address);
        self.all_pairs.push(address);
        Ok(address)
    }

    fn sync(&mut self, pair: Address) -> std::result::Result<(), Revert> {
        let (token0, token1) = {
            let p = self.pair(pair)?;
            (p.token0, p.token1)
        };
        let balance0 = self.token(token0)?.balance(pair);
        let balance1 = self.token(token1)?.balance(pair);
        if let Some(p) = self.pairs.get_mut(&pair) {
            p.reserve0 = balance0;
            p.reserve1 = balance1;
        }
        Ok(())
    }

    /// Reserves of the pair for `a`/`b`, in that order
    fn reserves(&self, a: Address, b: Address) -> std::result::Result<(U256, U256), Revert> {
        let pair = self
            .pair_for(a, b)
            .ok_or_else(|| "UniswapV2Library: PAIR_NOT_FOUND".to_string())?;
        let p = self.pair(pair)?;
        Ok(if p.token0 == a {
            (p.reserve0, p.reserve1)
        } else {
            (p.reserve1, p.reserve0)
        })
    }

    fn amounts_out(
        &self,
        amount_in: U256,
        path: &[Address],
    ) -> std::result::Result<Vec<U256>, Revert> {
        if path.len() < 2 {
            return revert("UniswapV2Library: INVALID_PATH");
        }
        let mut amounts = vec![amount_in];
        for hop in path.windows(2) {
            let (reserve_in, reserve_out) = self.reserves(hop[0], hop[1])?;
            let last = amounts[amounts.len() - 1];
            amounts.push(amount_out(last, reserve_in, reserve_out)?);
        }
        Ok(amounts)
    }

    fn mint_liquidity(&mut self, pair: Address, to: Address) -> std::result::Result<U256, Revert> {
        let p = self.pair(pair)?.clone();
        let amount0 = self.token(p.token0)?.balance(pair) - p.reserve0;
        let amount1 = self.token(p.token1)?.balance(pair) - p.reserve1;
        let total_supply = self.token(pair)?.total_supply;

        let liquidity = if total_supply.is_zero() {
            let root = isqrt(mul(amount0, amount1)?);
            let minimum = U256::from(MINIMUM_LIQUIDITY);
            if root <= minimum {
                return revert("UniswapV2: INSUFFICIENT_LIQUIDITY_MINTED");
            }
            self.token_mut(pair)?.mint(Address::ZERO, minimum);
            root - minimum
        } else {
            let by0 = mul(amount0, total_supply)? / p.reserve0;
            let by1 = mul(amount1, total_supply)? / p.reserve1;
            by0.min(by1)
        };

        if liquidity.is_zero() {
            return revert("UniswapV2: INSUFFICIENT_LIQUIDITY_MINTED");
        }
        self.token_mut(pair)?.mint(to, liquidity);
        self.sync(pair)?;
        Ok(liquidity)
    }

    fn burn_liquidity(
        &mut self,
        pair: Address,
        to: Address,
    ) -> std::result::Result<(U256, U256), Revert> {
        let p = self.pair(pair)?.clone();
        let lp = self.token(pair)?;
        let liquidity = lp.balance(pair);
        let total_supply = lp.total_supply;
        let balance0 = self.token(p.token0)?.balance(pair);
        let balance1 = self.token(p.token1)?.balance(pair);

        let amount0 = mul(liquidity, balance0)? / total_supply;
        let amount1 = mul(liquidity, balance1)? / total_supply;
        if amount0.is_zero() || amount1.is_zero() {
            return revert("UniswapV2: INSUFFICIENT_LIQUIDITY_BURNED");
        }

        self.token_mut(pair)?.burn(pair, liquidity)?;
        self.transfer(p.token0, pair, to, amount0)?;
        self.transfer(p.token1, pair, to, amount1)?;
        self.sync(pair)?;
        Ok((amount0, amount1))
    }

    fn add_liquidity(
        &mut self,
        router: Address,
        params: &AddLiquidityParams,
    ) -> std::result::Result<(), Revert> {
        check_deadline(params.deadline)?;
        let pair = match self.pair_for(params.token_a, params.token_b) {
            Some(pair) => pair,
            None => self.create_pair(params.token_a, params.token_b)?,
        };

        let (reserve_a, reserve_b) = self.reserves(params.token_a, params.token_b)?;
        let (amount_a, amount_b) = if reserve_a.is_zero() && reserve_b.is_zero() {
            (params.amount_a_desired, params.amount_b_desired)
        } else {
            let b_optimal = quote(params.amount_a_desired, reserve_a, reserve_b)?;
            if b_optimal <= params.amount_b_desired {
                if b_optimal < params.amount_b_min {
                    return revert("UniswapV2Router: INSUFFICIENT_B_AMOUNT");
                }
                (params.amount_a_desired, b_optimal)
            } else {
                let a_optimal = quote(params.amount_b_desired, reserve_b, reserve_a)?;
                if a_optimal < params.amount_a_min {
                    return revert("UniswapV2Router: INSUFFICIENT_A_AMOUNT");
                }
                (a_optimal, params.amount_b_desired)
            }
        };

        let sender = self.sender;
        self.transfer_from(params.token_a, router, sender, pair, amount_a)?;
        self.transfer_from(params.token_b, router, sender, pair, amount_b)?;
        self.mint_liquidity(pair, params.to)?;
        Ok(())
    }

    fn remove_liquidity(
        &mut self,
        router: Address,
        params: &RemoveLiquidityParams,
    ) -> std::result::Result<(), Revert> {
        check_deadline(params.deadline)?;
        let pair = self
            .pair_for(params.token_a, params.token_b)
            .ok_or_else(|| "UniswapV2Library: PAIR_NOT_FOUND".to_string())?;

        let sender = self.sender;
        self.transfer_from(pair, router, sender, pair, params.liquidity)?;
        let (amount0, amount1) = self.burn_liquidity(pair, params.to)?;
        let (amount_a, amount_b) = if self.pair(pair)?.token0 == params.token_a {
            (amount0, amount1)
        } else {
            (amount1, amount0)
        };
        if amount_a < params.amount_a_min {
            return revert("UniswapV2Router: INSUFFICIENT_A_AMOUNT");
        }
        if amount_b < params.amount_b_min {
            return revert("UniswapV2Router: INSUFFICIENT_B_AMOUNT");
        }
        Ok(())
    }

    fn swap(&mut self, router: Address, params: &SwapParams) -> std::result::Result<(), Revert> {
        check_deadline(params.deadline)?;
        let amounts = self.amounts_out(params.amount_in, &params.path)?;
        if amounts[amounts.len() - 1] < params.amount_out_min {
            return revert("UniswapV2Router: INSUFFICIENT_OUTPUT_AMOUNT");
        }

        let sender = self.sender;
        let first_pair = self
            .pair_for(params.path[0], params.path[1])
            .ok_or_else(|| "UniswapV2Library: PAIR_NOT_FOUND".to_string())?;
        self.transfer_from(params.path[0], router, sender, first_pair, params.amount_in)?;

        let hops = params.path.len() - 1;
        for i in 0..hops {
            let (input, output) = (params.path[i], params.path[i + 1]);
            let pair = self
                .pair_for(input, output)
                .ok_or_else(|| "UniswapV2Library: PAIR_NOT_FOUND".to_string())?;
            let to = if i + 1 < hops {
                self.pair_for(output, params.path[i + 2])
                    .ok_or_else(|| "UniswapV2Library: PAIR_NOT_FOUND".to_string())?
            } else {
                params.to
            };
            self.transfer(output, pair, to, amounts[i + 1])?;
            self.sync(pair)?;
        }
        Ok(())
    }
}

fn check_deadline(deadline: U256) -> std::result::Result<(), Revert> {
    if deadline < now() {
        return revert("UniswapV2Router: EXPIRED");
    }
    Ok(())
}

fn quote(amount_a: U256, reserve_a: U256, reserve_b: U256) -> std::result::Result<U256, Revert> {
    if amount_a.is_zero() {
        return revert("UniswapV2Library: INSUFFICIENT_AMOUNT");
    }
    Ok(mul(amount_a, reserve_b)? / reserve_a)
}

fn amount_out(
    amount_in: U256,
    reserve_in: U256,
    reserve_out: U256,
) -> std::result::Result<U256, Revert> {
    if amount_in.is_zero() {
        return revert("UniswapV2Library: INSUFFICIENT_INPUT_AMOUNT");
    }
    if reserve_in.is_zero() || reserve_out.is_zero() {
        return revert("UniswapV2Library: INSUFFICIENT_LIQUIDITY");
    }
    let with_fee = mul(amount_in, U256::from(997u64))?;
    let numerator = mul(with_fee, reserve_out)?;
    let denominator = mul(reserve_in, U256::from(1000u64))? + with_fee;
    Ok(numerator / denominator)
}

/// Handle to the simulated chain; clones share state
#[derive(Clone)]
pub struct SimulatedChain {
    state: Arc<Mutex<ChainState>>,
    weth: Address,
    factory: Address,
    router: Address,
    account: Option<AccountState>,
}

impl SimulatedChain {
    /// Fresh chain with WETH, a factory and a router deployed; `sender` signs
    /// every transaction.
    pub fn new(sender: Address) -> Self {
        let mut state = ChainState::new(sender);
        let weth = state.deploy("WETH");
        let factory = state.next_address();
        let router = state.next_address();
        Self {
            state: Arc::new(Mutex::new(state)),
            weth,
            factory,
            router,
            account: None,
        }
    }

    /// Sign every transaction as the currently selected account, falling back
    /// to the last sender while none is selected
    pub fn follow_account(mut self, account: AccountState) -> Self {
        self.account = Some(account);
        self
    }

    pub fn weth_address(&self) -> Address {
        self.weth
    }

    pub fn factory_address(&self) -> Address {
        self.factory
    }

    pub fn router_address(&self) -> Address {
        self.router
    }

    /// Addresses in the shape of the deployment configuration
    pub fn contracts(&self) -> ContractAddresses {
        ContractAddresses {
            weth: self.weth,
            factory: self.factory,
            router: self.router,
            tokens: Vec::new(),
        }
    }

    pub async fn sender(&self) -> Address {
        self.state.lock().await.sender
    }

    pub async fn deploy_token(&self, symbol: &str) -> Address {
        self.state.lock().await.deploy(symbol)
    }

    pub async fn mint(&self, token: Address, to: Address, amount: U256) -> Result<()> {
        let mut state = self.state.lock().await;
        state
            .token_mut(token)
            .map(|erc20| erc20.mint(to, amount))
            .map_err(|message| GatewayError::CallFailed {
                method: "mint",
                message,
            })
    }

    pub async fn fund_ether(&self, to: Address, amount: U256) {
        let mut state = self.state.lock().await;
        *state.ether.entry(to).or_default() += amount;
    }

    pub async fn ether_balance(&self, owner: Address) -> U256 {
        self.state
            .lock()
            .await
            .ether
            .get(&owner)
            .copied()
            .unwrap_or_default()
    }

    /// Create a pair holding the given reserves, with the LP tokens going to
    /// `provider`
    pub async fn seed_pool(
        &self,
        token_a: Address,
        token_b: Address,
        amount_a: U256,
        amount_b: U256,
        provider: Address,
    ) -> Result<Address> {
        let mut state = self.state.lock().await;
        let seeded = (|| -> std::result::Result<Address, Revert> {
            let pair = match state.pair_for(token_a, token_b) {
                Some(pair) => pair,
                None => state.create_pair(token_a, token_b)?,
            };
            state.token_mut(token_a)?.mint(pair, amount_a);
            state.token_mut(token_b)?.mint(pair, amount_b);
            state.mint_liquidity(pair, provider)?;
            Ok(pair)
        })();
        seeded.map_err(|message| GatewayError::CallFailed {
            method: "seed_pool",
            message,
        })
    }

    /// Make every read against `contract` fail
    pub async fn fail_reads(&self, contract: Address) {
        self.state.lock().await.failing.insert(contract);
    }

    /// Reject the next submitted transaction before it reaches the chain
    pub async fn fail_next_transaction(&self, reason: &str) {
        self.state.lock().await.fail_next_send = Some(reason.to_string());
    }

    /// Hold every read for `delay` after it has been served
    pub async fn delay_reads(&self, delay: Option<Duration>) {
        self.state.lock().await.read_delay = delay;
    }

    /// Hold every confirmation wait for `delay`
    pub async fn delay_confirmations(&self, delay: Option<Duration>) {
        self.state.lock().await.confirmation_delay = delay;
    }

    /// Number of calls made to a contract method (`"allowance"`, `"approve"`, ...)
    pub async fn call_count(&self, method: &str) -> usize {
        self.state
            .lock()
            .await
            .calls
            .get(method)
            .copied()
            .unwrap_or_default()
    }

    pub async fn balance(&self, token: Address, owner: Address) -> U256 {
        let state = self.state.lock().await;
        state
            .token(token)
            .map(|erc20| erc20.balance(owner))
            .unwrap_or_default()
    }

    pub async fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
        let state = self.state.lock().await;
        state
            .token(token)
            .map(|erc20| erc20.allowance(owner, spender))
            .unwrap_or_default()
    }

    fn handle(&self, address: Address) -> SimContract {
        SimContract {
            chain: self.clone(),
            address,
        }
    }
}

impl ContractGateway for SimulatedChain {
    fn token(&self, address: Address) -> Arc<dyn TokenContract> {
        Arc::new(self.handle(address))
    }

    fn weth(&self) -> Arc<dyn WethContract> {
        Arc::new(self.handle(self.weth))
    }

    fn pair(&self, address: Address) -> Arc<dyn PairContract> {
        Arc::new(self.handle(address))
    }

    fn factory(&self) -> Arc<dyn FactoryContract> {
        Arc::new(self.handle(self.factory))
    }

    fn router(&self) -> Arc<dyn RouterContract> {
        Arc::new(self.handle(self.router))
    }
}

struct SimPendingTx {
    tx_hash: TxHash,
    outcome: Result<TxReceipt>,
    delay: Option<Duration>,
}

#[async_trait]
impl PendingTransaction for SimPendingTx {
    fn tx_hash(&self) -> TxHash {
        self.tx_hash
    }

    async fn confirm(self: Box<Self>) -> Result<TxReceipt> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome
    }
}

struct SimContract {
    chain: SimulatedChain,
    address: Address,
}

impl SimContract {
    async fn read<T, F>(&self, method: &'static str, f: F) -> Result<T>
    where
        F: FnOnce(&ChainState, Address) -> std::result::Result<T, Revert>,
    {
        let (result, delay) = {
            let mut state = self.chain.state.lock().await;
            *state.calls.entry(method).or_default() += 1;
            let result = if state.failing.contains(&self.address) {
                Err("execution reverted".to_string())
            } else {
                f(&*state, self.address)
            };
            (result, state.read_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result.map_err(|message| GatewayError::CallFailed { method, message })
    }

    async fn send<F>(&self, method: &'static str, f: F) -> Result<PendingTx>
    where
        F: FnOnce(&mut ChainState, Address) -> std::result::Result<(), Revert>,
    {
        let mut state = self.chain.state.lock().await;
        if let Some(selected) = self.chain.account.as_ref().and_then(AccountState::address) {
            state.sender = selected;
        }
        *state.calls.entry(method).or_default() += 1;
        if let Some(message) = state.fail_next_send.take() {
            return Err(GatewayError::CallFailed { method, message });
        }

        let tx_hash = state.next_tx_hash();
        let snapshot = state.clone();
        let outcome = match f(&mut *state, self.address) {
            Ok(()) => {
                state.block += 1;
                Ok(TxReceipt {
                    tx_hash,
                    block_number: Some(state.block),
                })
            }
            Err(reason) => {
                debug!("Simulated {} reverted: {}", method, reason);
                *state = snapshot;
                Err(GatewayError::Reverted {
                    tx_hash: tx_hash.to_string(),
                })
            }
        };

        Ok(Box::new(SimPendingTx {
            tx_hash,
            outcome,
            delay: state.confirmation_delay,
        }))
    }
}

#[async_trait]
impl TokenContract for SimContract {
    fn address(&self) -> Address {
        self.address
    }

    async fn symbol(&self) -> Result<String> {
        self.read("symbol", |s, at| Ok(s.token(at)?.symbol.clone()))
            .await
    }

    async fn decimals(&self) -> Result<u8> {
        self.read("decimals", |s, at| s.token(at).map(|_| 18)).await
    }

    async fn total_supply(&self) -> Result<U256> {
        self.read("totalSupply", |s, at| Ok(s.token(at)?.total_supply))
            .await
    }

    async fn balance_of(&self, owner: Address) -> Result<U256> {
        self.read("balanceOf", |s, at| Ok(s.token(at)?.balance(owner)))
            .await
    }

    async fn allowance(&self, owner: Address, spender: Address) -> Result<U256> {
        self.read("allowance", |s, at| {
            Ok(s.token(at)?.allowance(owner, spender))
        })
        .await
    }

    async fn approve(&self, spender: Address, amount: U256) -> Result<PendingTx> {
        self.send("approve", |s, at| {
            let owner = s.sender;
            s.token_mut(at)?.allowances.insert((owner, spender), amount);
            Ok(())
        })
        .await
    }

    async fn transfer(&self, to: Address, amount: U256) -> Result<PendingTx> {
        self.send("transfer", |s, at| {
            let from = s.sender;
            s.transfer(at, from, to, amount)
        })
        .await
    }
}

#[async_trait]
impl WethContract for SimContract {
    async fn deposit(&self, value: U256) -> Result<PendingTx> {
        self.send("deposit", |s, at| {
            let sender = s.sender;
            let ether = s.ether.get(&sender).copied().unwrap_or_default();
            if ether < value {
                return revert("insufficient ether");
            }
            s.ether.insert(sender, ether - value);
            s.token_mut(at)?.mint(sender, value);
            Ok(())
        })
        .await
    }

    async fn withdraw(&self, amount: U256) -> Result<PendingTx> {
        self.send("withdraw", |s, at| {
            let sender = s.sender;
            s.token_mut(at)?.burn(sender, amount)?;
            *s.ether.entry(sender).or_default() += amount;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl PairContract for SimContract {
    async fn token0(&self) -> Result<Address> {
        self.read("token0", |s, at| Ok(s.pair(at)?.token0)).await
    }

    async fn token1(&self) -> Result<Address> {
        self.read("token1", |s, at| Ok(s.pair(at)?.token1)).await
    }

    async fn get_reserves(&self) -> Result<Reserves> {
        self.read("getReserves", |s, at| {
            let p = s.pair(at)?;
            Ok(Reserves {
                reserve0: p.reserve0,
                reserve1: p.reserve1,
            })
        })
        .await
    }
}

#[async_trait]
impl FactoryContract for SimContract {
    fn address(&self) -> Address {
        self.address
    }

    async fn all_pairs_length(&self) -> Result<u64> {
        self.read("allPairsLength", |s, _| Ok(s.all_pairs.len() as u64))
            .await
    }

    async fn all_pairs(&self, index: u64) -> Result<Address> {
        self.read("allPairs", |s, _| {
            usize::try_from(index)
                .ok()
                .and_then(|i| s.all_pairs.get(i).copied())
                .ok_or_else(|| "index out of range".to_string())
        })
        .await
    }

    async fn get_pair(&self, token_a: Address, token_b: Address) -> Result<Address> {
        self.read("getPair", |s, _| {
            Ok(s.pair_for(token_a, token_b).unwrap_or(Address::ZERO))
        })
        .await
    }
}

#[async_trait]
impl RouterContract for SimContract {
    fn address(&self) -> Address {
        self.address
    }

    async fn get_amounts_out(&self, amount_in: U256, path: &[Address]) -> Result<Vec<U256>> {
        self.read("getAmountsOut", |s, _| s.amounts_out(amount_in, path))
            .await
    }

    async fn add_liquidity(&self, params: AddLiquidityParams) -> Result<PendingTx> {
        self.send("addLiquidity", |s, router| s.add_liquidity(router, &params))
            .await
    }

    async fn remove_liquidity(&self, params: RemoveLiquidityParams) -> Result<PendingTx> {
        self.send("removeLiquidity", |s, router| {
            s.remove_liquidity(router, &params)
        })
        .await
    }

    async fn swap_exact_tokens_for_tokens(&self, params: SwapParams) -> Result<PendingTx> {
        self.send("swapExactTokensForTokens", |s, router| {
            s.swap(router, &params)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eth(n: u64) -> U256 {
        U256::from(n) * U256::from(10u64).pow(U256::from(18u64))
    }

    fn deadline() -> U256 {
        now() + U256::from(1200u64)
    }

    async fn setup() -> (SimulatedChain, Address, Address, Address) {
        let user = Address::repeat_byte(0xaa);
        let chain = SimulatedChain::new(user);
        let weth = chain.weth_address();
        let test = chain.deploy_token("TEST").await;
        let pair = chain
            .seed_pool(weth, test, eth(10), eth(20), Address::repeat_byte(0x11))
            .await
            .unwrap();
        (chain, weth, test, pair)
    }

    #[tokio::test]
    async fn test_seeded_pool_reads() {
        let (chain, weth, test, pair) = setup().await;

        let factory = chain.factory();
        assert_eq!(factory.all_pairs_length().await.unwrap(), 1);
        assert_eq!(factory.all_pairs(0).await.unwrap(), pair);
        assert_eq!(factory.get_pair(test, weth).await.unwrap(), pair);
        assert!(factory.get_pair(weth, weth).await.unwrap().is_zero());

        let p = chain.pair(pair);
        let (t0, t1) = (p.token0().await.unwrap(), p.token1().await.unwrap());
        assert!(t0 < t1);
        let reserves = p.get_reserves().await.unwrap();
        let weth_reserve = if t0 == weth { reserves.reserve0 } else { reserves.reserve1 };
        assert_eq!(weth_reserve, eth(10));
        assert_eq!(p.symbol().await.unwrap(), "UNI-V2");

        // sqrt(10e18 * 20e18), less the locked minimum
        let supply = p.total_supply().await.unwrap();
        let provider = p.balance_of(Address::repeat_byte(0x11)).await.unwrap();
        assert_eq!(provider + U256::from(MINIMUM_LIQUIDITY), supply);
    }

    #[tokio::test]
    async fn test_swap_needs_allowance_then_pays_out() {
        let (chain, weth, test, _) = setup().await;
        let user = chain.sender().await;
        chain.mint(weth, user, eth(1)).await.unwrap();

        let router = chain.router();
        let expected = router.get_amounts_out(eth(1), &[weth, test]).await.unwrap()[1];
        let params = SwapParams {
            amount_in: eth(1),
            amount_out_min: expected,
            path: vec![weth, test],
            to: user,
            deadline: deadline(),
        };

        let tx = router.swap_exact_tokens_for_tokens(params.clone()).await.unwrap();
        assert!(matches!(tx.confirm().await, Err(GatewayError::Reverted { .. })));
        assert_eq!(chain.balance(weth, user).await, eth(1));

        chain
            .weth()
            .approve(router.address(), U256::MAX)
            .await
            .unwrap()
            .confirm()
            .await
            .unwrap();
        router
            .swap_exact_tokens_for_tokens(params)
            .await
            .unwrap()
            .confirm()
            .await
            .unwrap();

        assert_eq!(chain.balance(weth, user).await, U256::ZERO);
        assert_eq!(chain.balance(test, user).await, expected);
        assert_eq!(
            chain.allowance(weth, user, router.address()).await,
            U256::MAX
        );
    }

    #[tokio::test]
    async fn test_expired_deadline_reverts() {
        let (chain, weth, test, _) = setup().await;
        let user = chain.sender().await;
        chain.mint(weth, user, eth(1)).await.unwrap();
        chain.weth().approve(chain.router_address(), U256::MAX).await.unwrap();

        let tx = chain
            .router()
            .swap_exact_tokens_for_tokens(SwapParams {
                amount_in: eth(1),
                amount_out_min: U256::ZERO,
                path: vec![weth, test],
                to: user,
                deadline: U256::from(1u64),
            })
            .await
            .unwrap();
        assert!(tx.confirm().await.is_err());
    }

    #[tokio::test]
    async fn test_add_and_remove_liquidity() {
        let (chain, weth, test, pair) = setup().await;
        let user = chain.sender().await;
        let router = chain.router_address();
        chain.mint(weth, user, eth(1)).await.unwrap();
        chain.mint(test, user, eth(5)).await.unwrap();
        chain.token(weth).approve(router, U256::MAX).await.unwrap();
        chain.token(test).approve(router, U256::MAX).await.unwrap();

        chain
            .router()
            .add_liquidity(AddLiquidityParams {
                token_a: weth,
                token_b: test,
                amount_a_desired: eth(1),
                amount_b_desired: eth(5),
                amount_a_min: U256::ZERO,
                amount_b_min: U256::ZERO,
                to: user,
                deadline: deadline(),
            })
            .await
            .unwrap()
            .confirm()
            .await
            .unwrap();

        // 1 WETH at a 1:2 price only takes 2 TEST
        assert_eq!(chain.balance(weth, user).await, U256::ZERO);
        assert_eq!(chain.balance(test, user).await, eth(3));
        let lp = chain.balance(pair, user).await;
        assert!(!lp.is_zero());

        chain.token(pair).approve(router, U256::MAX).await.unwrap();
        chain
            .router()
            .remove_liquidity(RemoveLiquidityParams {
                token_a: weth,
                token_b: test,
                liquidity: lp,
                amount_a_min: U256::ZERO,
                amount_b_min: U256::ZERO,
                to: user,
                deadline: deadline(),
            })
            .await
            .unwrap()
            .confirm()
            .await
            .unwrap();

        assert_eq!(chain.balance(pair, user).await, U256::ZERO);
        let weth_back = chain.balance(weth, user).await;
        assert!(weth_back <= eth(1) && weth_back > eth(1) - U256::from(10u64));
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let (chain, _, _, pair) = setup().await;
        chain.fail_reads(pair).await;
        assert!(chain.pair(pair).get_reserves().await.is_err());
        assert_eq!(chain.call_count("getReserves").await, 1);

        chain.fail_next_transaction("user rejected").await;
        let err = chain
            .weth()
            .approve(chain.router_address(), U256::MAX)
            .await
            .err();
        assert!(matches!(err, Some(GatewayError::CallFailed { method: "approve", .. })));
        assert!(chain.weth().approve(chain.router_address(), U256::MAX).await.is_ok());
    }

    #[tokio::test]
    async fn test_wrap_and_unwrap() {
        let user = Address::repeat_byte(0xaa);
        let chain = SimulatedChain::new(user);
        chain.fund_ether(user, eth(2)).await;

        chain.weth().deposit(eth(2)).await.unwrap().confirm().await.unwrap();
        assert_eq!(chain.balance(chain.weth_address(), user).await, eth(2));
        assert_eq!(chain.ether_balance(user).await, U256::ZERO);

        chain.weth().withdraw(eth(1)).await.unwrap().confirm().await.unwrap();
        assert_eq!(chain.ether_balance(user).await, eth(1));

        let tx = chain.weth().withdraw(eth(5)).await.unwrap();
        assert!(matches!(tx.confirm().await, Err(GatewayError::Reverted { .. })));
    }

    #[tokio::test]
    async fn test_sender_follows_selected_account() {
        let (alice, bob) = (Address::repeat_byte(0xaa), Address::repeat_byte(0xbb));
        let account = AccountState::new(Some(alice));
        let chain = SimulatedChain::new(alice).follow_account(account.clone());
        let weth = chain.weth_address();
        let router = chain.router_address();

        account.set(Some(bob));
        chain.token(weth).approve(router, eth(1)).await.unwrap();
        assert_eq!(chain.allowance(weth, bob, router).await, eth(1));
        assert!(chain.allowance(weth, alice, router).await.is_zero());

        account.set(None);
        chain.token(weth).approve(router, eth(2)).await.unwrap();
        assert_eq!(chain.allowance(weth, bob, router).await, eth(2));
    }

    #[tokio::test]
    async fn test_delays_hold_reads_and_confirmations() {
        let (chain, weth, _, _) = setup().await;
        chain.delay_reads(Some(std::time::Duration::from_millis(50))).await;
        let started = std::time::Instant::now();
        chain.token(weth).total_supply().await.unwrap();
        assert!(started.elapsed() >= std::time::Duration::from_millis(50));

        chain.delay_reads(None).await;
        chain
            .delay_confirmations(Some(std::time::Duration::from_millis(50)))
            .await;
        let pending = chain
            .token(weth)
            .approve(chain.router_address(), eth(1))
            .await
            .unwrap();
        let started = std::time::Instant::now();
        pending.confirm().await.unwrap();
        assert!(started.elapsed() >= std::time::Duration::from_millis(50));
    }
}
