//! Swapdesk service library
//!
//! Wires configuration, the chain gateway, the completion client and the
//! HTTP API together.

pub mod account_sync;
pub mod demo;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use evm_gateway::{AccountState, ContractGateway, RpcGateway};
use intent::ChatCompletionClient;
use swapdesk_api::{start_server, AppState};
use swapdesk_core::{AppConfig, TokenRegistry};

const CONFIG_ENV: &str = "SWAPDESK_CONFIG";
const DEFAULT_CONFIG: &str = "swapdesk.json";

pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,swapdesk=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Load the config file named by `SWAPDESK_CONFIG`, then apply environment overrides
pub fn load_config() -> anyhow::Result<AppConfig> {
    let path = std::env::var(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG));
    let mut config = AppConfig::load(&path)?;
    config.apply_env()?;
    Ok(config)
}

/// Run the service until the server stops
pub async fn run() -> anyhow::Result<()> {
    init_tracing();
    tracing::info!("Starting Swapdesk");

    let mut config = load_config()?;

    let (gateway, account) = if config.chain.simulated {
        let (chain, contracts) = demo::seeded_chain().await?;
        config.contracts = contracts;
        let account = AccountState::new(Some(chain.sender().await));
        tracing::info!("Using simulated chain, signing as the selected account");
        let gateway: Arc<dyn ContractGateway> = Arc::new(chain.follow_account(account.clone()));
        (gateway, account)
    } else {
        let missing = config.missing_contracts();
        if !missing.is_empty() {
            tracing::warn!("Contract addresses not configured: {}", missing.join(", "));
        }
        let rpc = RpcGateway::connect(&config.chain, &config.contracts)
            .with_context(|| format!("connecting to {}", config.chain.rpc_url))?;
        match rpc.chain_id().await {
            Ok(id) => tracing::info!("Connected to chain {}", id),
            Err(e) => tracing::warn!("Node not reachable yet: {}", e),
        }
        let account = AccountState::bound_to(rpc.signer());
        let gateway: Arc<dyn ContractGateway> = Arc::new(rpc);
        (gateway, account)
    };

    let registry = if config.registry.is_empty() {
        let mut addresses = vec![config.contracts.weth];
        addresses.extend(config.contracts.tokens.iter().copied());
        amm::load_token_registry(gateway.as_ref(), &addresses).await
    } else {
        TokenRegistry::new(config.registry.clone())
    };
    tracing::info!("Token registry holds {} tokens", registry.len());

    match account.address() {
        Some(address) => tracing::info!("Account {}", address),
        None => tracing::warn!("No signing key configured; operations stay disabled"),
    }
    account_sync::spawn(account.subscribe());

    let completion = ChatCompletionClient::new(&config.completion);
    if !completion.is_configured() {
        tracing::warn!("No completion API key; the intent endpoint will reject requests");
    }

    let state = AppState::new(config, gateway, account, registry, Arc::new(completion));
    start_server(state, shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
