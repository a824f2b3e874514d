//! Core type definitions for Swapdesk

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use alloy_primitives::{Address, TxHash, U256};

use crate::errors::ProtocolError;

/// ERC20 token known to the client
///
/// Identity is the address. Addresses are byte values, so hex case (checksum
/// display) never affects equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub address: Address,
    pub symbol: String,
    /// Wallet balance as a decimal string, when it has been read
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<String>,
}

impl Token {
    pub fn new(address: Address, symbol: impl Into<String>) -> Self {
        Self {
            address,
            symbol: symbol.into(),
            balance: None,
        }
    }

    /// Lower-cased hex address, the token's unique key
    pub fn id(&self) -> String {
        self.address.to_string().to_lowercase()
    }

    pub fn with_balance(mut self, balance: impl Into<String>) -> Self {
        self.balance = Some(balance.into());
        self
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for Token {}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.symbol, self.address)
    }
}

/// Parse a 20-byte hex address, accepting any letter case
pub fn parse_address(value: &str) -> Result<Address, ProtocolError> {
    Address::from_str(value.trim())
        .map_err(|_| ProtocolError::invalid_input(format!("'{}' is not an address", value)))
}

/// Token list supplied by deployment configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenRegistry {
    tokens: Vec<Token>,
}

impl TokenRegistry {
    pub fn new(tokens: Vec<Token>) -> Self {
        let mut registry = Self::default();
        for token in tokens {
            registry.insert(token);
        }
        registry
    }

    /// Add a token, ignoring addresses already present
    pub fn insert(&mut self, token: Token) -> bool {
        if self.find_address(token.address).is_some() {
            return false;
        }
        self.tokens.push(token);
        true
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Case-insensitive symbol lookup
    pub fn find_symbol(&self, symbol: &str) -> Option<&Token> {
        self.tokens
            .iter()
            .find(|t| t.symbol.eq_ignore_ascii_case(symbol.trim()))
    }

    pub fn find_address(&self, address: Address) -> Option<&Token> {
        self.tokens.iter().find(|t| t.address == address)
    }

    /// The wrapped-ether entry
    pub fn weth(&self) -> Option<&Token> {
        self.find_symbol("weth")
    }
}

/// User operation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Swap,
    Deposit,
    Redeem,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Swap => "swap",
            Self::Deposit => "deposit",
            Self::Redeem => "redeem",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Operation {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "swap" => Ok(Self::Swap),
            "deposit" => Ok(Self::Deposit),
            "redeem" => Ok(Self::Redeem),
            other => Err(ProtocolError::invalid_input(format!(
                "unknown operation '{}'",
                other
            ))),
        }
    }
}

/// An operation handed from one screen to the next.
///
/// Written by the intent resolver or the pool selector, consumed once by the
/// matching orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOperation {
    pub operation: Operation,
    pub token0: Token,
    pub token1: Token,
    /// Pair contract, when selected from the pool directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool: Option<Address>,
    /// Decimal amount for token0 (swap input or first deposit amount)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount0: Option<String>,
    /// Decimal amount for token1 (second deposit amount)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount1: Option<String>,
    /// Share of the LP position to redeem, in basis points
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentage_bps: Option<u32>,
    /// Slippage tolerance override, in basis points
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slippage_bps: Option<u32>,
}

impl PendingOperation {
    pub fn new(operation: Operation, token0: Token, token1: Token) -> Self {
        Self {
            operation,
            token0,
            token1,
            pool: None,
            amount0: None,
            amount1: None,
            percentage_bps: None,
            slippage_bps: None,
        }
    }
}

/// Basis-point denominator (100% = 10_000)
pub const BPS_DENOMINATOR: u32 = 10_000;

#[cfg(test)]
mod tests {
    use super::*;

    const WETH: &str = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2";

    #[test]
    fn test_address_compare_is_case_insensitive() {
        let checksummed = parse_address(WETH).unwrap();
        let lower = parse_address(&WETH.to_lowercase()).unwrap();
        let upper = parse_address(&format!("0x{}", WETH[2..].to_uppercase())).unwrap();
        assert_eq!(checksummed, lower);
        assert_eq!(lower, upper);
        assert_eq!(Token::new(lower, "WETH"), Token::new(upper, "weth"));
    }

    #[test]
    fn test_parse_address_rejects_garbage() {
        assert!(parse_address("0x1234").is_err());
        assert!(parse_address("not an address").is_err());
    }

    #[test]
    fn test_registry_lookup() {
        let weth = Token::new(parse_address(WETH).unwrap(), "WETH");
        let test = Token::new(Address::repeat_byte(0x22), "TEST");
        let registry = TokenRegistry::new(vec![weth.clone(), test.clone(), weth.clone()]);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.find_symbol("test"), Some(&test));
        assert_eq!(registry.find_symbol(" Weth "), Some(&weth));
        assert_eq!(registry.weth(), Some(&weth));
        assert_eq!(registry.find_address(test.address), Some(&test));
        assert!(registry.find_symbol("FOO").is_none());
    }

    #[test]
    fn test_operation_parse() {
        assert_eq!("Swap".parse::<Operation>().unwrap(), Operation::Swap);
        assert_eq!("redeem".parse::<Operation>().unwrap(), Operation::Redeem);
        assert!("burn".parse::<Operation>().is_err());
    }

    #[test]
    fn test_token_id_is_lowercase() {
        let token = Token::new(parse_address(WETH).unwrap(), "WETH");
        assert_eq!(token.id(), WETH.to_lowercase());
    }
}
