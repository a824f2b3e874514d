//! AMM State Types
//!
//! Data structures for pools, quotes and orchestrator actions.

use std::fmt;

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use swapdesk_core::{ProtocolError, Token};

/// Serialize `U256` base-unit amounts as plain decimal strings
pub mod decimal {
    use alloy_primitives::U256;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let s = String::deserialize(deserializer)?;
        U256::from_str_radix(&s, 10).map_err(serde::de::Error::custom)
    }
}

/// Constant-product pair snapshot
///
/// `token0`/`token1` follow the pair contract's own ordering, which need not
/// match the order a user picked; use [`Pool::reserves_for`] to map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub address: Address,
    pub token0: Address,
    pub token1: Address,
    pub token0_symbol: String,
    pub token1_symbol: String,
    #[serde(with = "decimal")]
    pub reserve0: U256,
    #[serde(with = "decimal")]
    pub reserve1: U256,
    /// "SYM0/SYM1"
    pub pair_name: String,
}

impl Pool {
    pub fn contains(&self, token: Address) -> bool {
        self.token0 == token || self.token1 == token
    }

    /// Reserves as `(reserve_in, reserve_out)` for a trade from `token_in`
    /// to `token_out`, matched by address
    pub fn reserves_for(
        &self,
        token_in: Address,
        token_out: Address,
    ) -> Result<(U256, U256), ProtocolError> {
        if token_in == self.token0 && token_out == self.token1 {
            Ok((self.reserve0, self.reserve1))
        } else if token_in == self.token1 && token_out == self.token0 {
            Ok((self.reserve1, self.reserve0))
        } else {
            Err(ProtocolError::invalid_input(format!(
                "tokens {} and {} do not belong to pool {}",
                token_in, token_out, self.pair_name
            )))
        }
    }

    pub fn tokens(&self) -> (Token, Token) {
        (
            Token::new(self.token0, self.token0_symbol.clone()),
            Token::new(self.token1, self.token1_symbol.clone()),
        )
    }

    pub fn has_liquidity(&self) -> bool {
        !self.reserve0.is_zero() && !self.reserve1.is_zero()
    }
}

impl fmt::Display for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) | {}: {} | {}: {}",
            self.pair_name,
            self.address,
            self.token0_symbol,
            self.reserve0,
            self.token1_symbol,
            self.reserve1
        )
    }
}

/// Swap quote
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwapQuote {
    pub pool: Address,
    pub token_in: Token,
    pub token_out: Token,
    #[serde(with = "decimal")]
    pub amount_in: U256,
    #[serde(with = "decimal")]
    pub amount_out: U256,
    #[serde(with = "decimal")]
    pub amount_out_min: U256,
    pub slippage_bps: u32,
    pub price_impact_bps: u32,
}

/// Add-liquidity quote
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepositQuote {
    /// Existing pair; `None` when the deposit creates the pool
    pub pool: Option<Address>,
    pub new_pool: bool,
    pub token_a: Token,
    pub token_b: Token,
    #[serde(with = "decimal")]
    pub amount_a: U256,
    #[serde(with = "decimal")]
    pub amount_b: U256,
    #[serde(with = "decimal")]
    pub amount_a_min: U256,
    #[serde(with = "decimal")]
    pub amount_b_min: U256,
    pub slippage_bps: u32,
    /// LP tokens the deposit is expected to mint
    #[serde(with = "decimal")]
    pub expected_liquidity: U256,
    /// Share of the pool held by this deposit afterwards
    pub pool_share_bps: u32,
}

/// Remove-liquidity quote
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedeemQuote {
    pub pool: Address,
    pub token_a: Token,
    pub token_b: Token,
    #[serde(with = "decimal")]
    pub liquidity: U256,
    #[serde(with = "decimal")]
    pub lp_balance: U256,
    pub percentage_bps: u32,
    #[serde(with = "decimal")]
    pub amount_a: U256,
    #[serde(with = "decimal")]
    pub amount_b: U256,
    #[serde(with = "decimal")]
    pub amount_a_min: U256,
    #[serde(with = "decimal")]
    pub amount_b_min: U256,
    pub slippage_bps: u32,
}

/// What the user can do next with the current form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action<Q> {
    /// Required input is missing or invalid
    Disabled { reason: String },
    /// `token` must be approved for the router first
    Approve { token: Token, quote: Q },
    /// Ready to submit
    Execute { quote: Q },
}

impl<Q> Action<Q> {
    pub fn disabled(reason: impl Into<String>) -> Self {
        Self::Disabled {
            reason: reason.into(),
        }
    }

    pub fn quote(&self) -> Option<&Q> {
        match self {
            Self::Disabled { .. } => None,
            Self::Approve { quote, .. } | Self::Execute { quote } => Some(quote),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Execute { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> Pool {
        Pool {
            address: Address::repeat_byte(0xcc),
            token0: Address::repeat_byte(0x01),
            token1: Address::repeat_byte(0x02),
            token0_symbol: "WETH".into(),
            token1_symbol: "TEST".into(),
            reserve0: U256::from(100u64),
            reserve1: U256::from(200u64),
            pair_name: "WETH/TEST".into(),
        }
    }

    #[test]
    fn test_reserves_follow_addresses_not_position() {
        let pool = pool();
        let (a, b) = (Address::repeat_byte(0x01), Address::repeat_byte(0x02));
        assert_eq!(
            pool.reserves_for(a, b).unwrap(),
            (U256::from(100u64), U256::from(200u64))
        );
        assert_eq!(
            pool.reserves_for(b, a).unwrap(),
            (U256::from(200u64), U256::from(100u64))
        );
        assert!(pool.reserves_for(a, Address::repeat_byte(0x03)).is_err());
    }

    #[test]
    fn test_pool_serializes_reserves_as_decimal() {
        let json = serde_json::to_value(pool()).unwrap();
        assert_eq!(json["reserve0"], "100");
        assert_eq!(json["pair_name"], "WETH/TEST");
    }

    #[test]
    fn test_action_tagging() {
        let action: Action<u32> = Action::disabled("Enter an amount");
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["action"], "disabled");
        assert_eq!(json["reason"], "Enter an amount");
        assert!(action.quote().is_none());

        let ready = Action::Execute { quote: 7u32 };
        assert!(ready.is_ready());
        assert_eq!(ready.quote(), Some(&7));
    }
}
