//! Configuration types for Swapdesk

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::types::{parse_address, Address, Token};

/// Chain connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// JSON-RPC URL (e.g., "http://localhost:8545")
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Hex private key of the signing account (optional, read-only without it)
    #[serde(default, skip_serializing)]
    pub private_key: Option<String>,

    /// Run against the in-memory chain instead of an RPC endpoint
    #[serde(default)]
    pub simulated: bool,

    /// Upper bound on waiting for a transaction receipt
    #[serde(default)]
    pub confirmation_timeout_secs: Option<u64>,
}

fn default_rpc_url() -> String {
    "http://localhost:8545".to_string()
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            private_key: None,
            simulated: false,
            confirmation_timeout_secs: None,
        }
    }
}

/// Deployed contract addresses
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractAddresses {
    #[serde(default)]
    pub weth: Address,
    #[serde(default)]
    pub factory: Address,
    #[serde(default)]
    pub router: Address,
    /// Additional ERC20 tokens offered alongside WETH
    #[serde(default)]
    pub tokens: Vec<Address>,
}

/// Text-completion service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    #[serde(default = "default_completion_url")]
    pub base_url: String,

    #[serde(default, skip_serializing)]
    pub api_key: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default)]
    pub temperature: f32,

    #[serde(default = "default_completion_timeout")]
    pub timeout_secs: u64,
}

fn default_completion_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4.1-nano-2025-04-14".to_string()
}

fn default_completion_timeout() -> u64 {
    30
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: default_completion_url(),
            api_key: String::new(),
            model: default_model(),
            temperature: 0.0,
            timeout_secs: default_completion_timeout(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub chain: ChainConfig,

    #[serde(default)]
    pub contracts: ContractAddresses,

    /// Static token registry; derived from chain symbols when empty
    #[serde(default)]
    pub registry: Vec<Token>,

    #[serde(default)]
    pub completion: CompletionConfig,

    /// Interface the API listens on
    #[serde(default = "default_api_host")]
    pub api_host: String,

    /// API server port
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Slippage tolerance used when a request does not specify one
    #[serde(default = "default_slippage_bps")]
    pub default_slippage_bps: u32,
}

fn default_api_host() -> String {
    "127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
    18545
}

fn default_slippage_bps() -> u32 {
    50
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            chain: ChainConfig::default(),
            contracts: ContractAddresses::default(),
            registry: Vec::new(),
            completion: CompletionConfig::default(),
            api_host: default_api_host(),
            api_port: default_api_port(),
            default_slippage_bps: default_slippage_bps(),
        }
    }
}

impl AppConfig {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load from a JSON file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self, Error> {
        if !path.exists() {
            tracing::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> Result<(), Error> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup (the environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let address = |key: &str| -> Result<Option<Address>, Error> {
            match lookup(key).filter(|v| !v.trim().is_empty()) {
                Some(v) => parse_address(&v)
                    .map(Some)
                    .map_err(|e| Error::Config(format!("{}: {}", key, e))),
                None => Ok(None),
            }
        };

        if let Some(url) = lookup("SWAPDESK_RPC_URL") {
            self.chain.rpc_url = url;
        }
        if let Some(key) = lookup("SWAPDESK_PRIVATE_KEY") {
            self.chain.private_key = Some(key);
        }
        if let Some(host) = lookup("SWAPDESK_API_HOST").filter(|v| !v.trim().is_empty()) {
            self.api_host = host;
        }
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.completion.api_key = key;
        }
        if let Some(weth) = address("WETH_ADDRESS")? {
            self.contracts.weth = weth;
        }
        if let Some(factory) = address("FACTORY_ADDRESS")? {
            self.contracts.factory = factory;
        }
        if let Some(router) = address("ROUTER_ADDRESS")? {
            self.contracts.router = router;
        }
        for key in ["TEST_TOKEN_ADDRESS", "TEST_TOKEN2_ADDRESS"] {
            if let Some(token) = address(key)? {
                if !token.is_zero() && !self.contracts.tokens.contains(&token) {
                    self.contracts.tokens.push(token);
                }
            }
        }
        Ok(())
    }

    /// Names of contracts still at the zero address
    pub fn missing_contracts(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.contracts.weth.is_zero() {
            missing.push("weth");
        }
        if self.contracts.factory.is_zero() {
            missing.push("factory");
        }
        if self.contracts.router.is_zero() {
            missing.push("router");
        }
        missing
    }
}
