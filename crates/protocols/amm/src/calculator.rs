//! AMM Calculator
//!
//! Quote math for a constant-product pair (x * y = k). Every product is taken
//! in `BigUint` so intermediate values cannot overflow 256 bits, and every
//! division floors, matching the pair and router contracts.

use alloy_primitives::U256;
use num_bigint::BigUint;
use num_traits::Zero;
use swapdesk_core::{ProtocolError, BPS_DENOMINATOR};

use crate::constants::{fees, lp};

fn big(value: U256) -> BigUint {
    BigUint::from_bytes_be(&value.to_be_bytes::<32>())
}

fn narrow(value: BigUint) -> Result<U256, ProtocolError> {
    let bytes = value.to_bytes_be();
    if bytes.len() > 32 {
        return Err(ProtocolError::invalid_input("amount does not fit in 256 bits"));
    }
    Ok(U256::from_be_slice(&bytes))
}

/// Counterpart amount at the current reserve ratio, no fee.
///
/// Formula: amount_out = amount_in * reserve_out / reserve_in
///
/// This is the router's `quote`, used to pair liquidity deposits.
pub fn quote_counterpart(
    amount_in: U256,
    reserve_in: U256,
    reserve_out: U256,
) -> Result<U256, ProtocolError> {
    if amount_in.is_zero() {
        return Err(ProtocolError::invalid_input("amount must be greater than 0"));
    }
    if reserve_in.is_zero() || reserve_out.is_zero() {
        return Err(ProtocolError::NoLiquidity);
    }
    narrow(big(amount_in) * big(reserve_out) / big(reserve_in))
}

/// Swap output after the 0.3% fee.
///
/// Formula: out = (in * 997 * reserve_out) / (reserve_in * 1000 + in * 997)
///
/// Same result as the router's `getAmountsOut` for a single hop.
pub fn get_amount_out(
    amount_in: U256,
    reserve_in: U256,
    reserve_out: U256,
) -> Result<U256, ProtocolError> {
    if amount_in.is_zero() {
        return Err(ProtocolError::invalid_input("amount must be greater than 0"));
    }
    if reserve_in.is_zero() || reserve_out.is_zero() {
        return Err(ProtocolError::NoLiquidity);
    }
    let with_fee = big(amount_in) * BigUint::from(fees::FEE_NUM);
    let numerator = &with_fee * big(reserve_out);
    let denominator = big(reserve_in) * BigUint::from(fees::FEE_DENOM) + with_fee;
    narrow(numerator / denominator)
}

/// Minimum acceptable amount under a slippage tolerance.
///
/// min = amount * (10000 - bps) / 10000, floored. `bps` must be below 10000.
pub fn apply_slippage(amount: U256, slippage_bps: u32) -> Result<U256, ProtocolError> {
    if slippage_bps >= BPS_DENOMINATOR {
        return Err(ProtocolError::InvalidSlippage { bps: slippage_bps });
    }
    let kept = BigUint::from(BPS_DENOMINATOR - slippage_bps);
    narrow(big(amount) * kept / BigUint::from(BPS_DENOMINATOR))
}

/// Underlying tokens returned for burning `lp_amount` LP tokens.
///
/// amount_x = lp_amount * reserve_x / total_supply
pub fn quote_redeem_shares(
    lp_amount: U256,
    total_supply: U256,
    reserve0: U256,
    reserve1: U256,
) -> Result<(U256, U256), ProtocolError> {
    if total_supply.is_zero() {
        return Err(ProtocolError::NoSupply);
    }
    if lp_amount > total_supply {
        return Err(ProtocolError::invalid_input(
            "LP amount exceeds the pool's total supply",
        ));
    }
    let share = |reserve: U256| narrow(big(lp_amount) * big(reserve) / big(total_supply));
    Ok((share(reserve0)?, share(reserve1)?))
}

/// How a deposit's second amount is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepositMode {
    /// The pair exists; the second amount follows the reserve ratio
    Existing { reserve_a: U256, reserve_b: U256 },
    /// No pair yet; both amounts are the user's own
    NewPool,
}

/// Amounts `(a, b)` for an add-liquidity call.
///
/// For a new pool both inputs are returned unchanged and `amount_b` is
/// required. For an existing pool `amount_b` is ignored and derived from
/// `amount_a`.
pub fn quote_deposit(
    mode: DepositMode,
    amount_a: U256,
    amount_b: Option<U256>,
) -> Result<(U256, U256), ProtocolError> {
    match mode {
        DepositMode::NewPool => match amount_b {
            Some(b) if !amount_a.is_zero() && !b.is_zero() => Ok((amount_a, b)),
            _ => Err(ProtocolError::invalid_input(
                "a new pool needs both amounts greater than 0",
            )),
        },
        DepositMode::Existing {
            reserve_a,
            reserve_b,
        } => Ok((amount_a, quote_counterpart(amount_a, reserve_a, reserve_b)?)),
    }
}

/// LP tokens minted for a deposit.
///
/// Existing pool: min(a * supply / reserve_a, b * supply / reserve_b).
/// New pool: sqrt(a * b) less the permanently locked minimum.
pub fn expected_liquidity(
    mode: DepositMode,
    amount_a: U256,
    amount_b: U256,
    total_supply: U256,
) -> Result<U256, ProtocolError> {
    match mode {
        DepositMode::NewPool => {
            let root = (big(amount_a) * big(amount_b)).sqrt();
            let minimum = BigUint::from(lp::MINIMUM_LIQUIDITY);
            if root <= minimum {
                return Ok(U256::ZERO);
            }
            narrow(root - minimum)
        }
        DepositMode::Existing {
            reserve_a,
            reserve_b,
        } => {
            if reserve_a.is_zero() || reserve_b.is_zero() {
                return Err(ProtocolError::NoLiquidity);
            }
            let by_a = big(amount_a) * big(total_supply) / big(reserve_a);
            let by_b = big(amount_b) * big(total_supply) / big(reserve_b);
            narrow(by_a.min(by_b))
        }
    }
}

/// `part / whole` in basis points, floored and capped at 100%
pub fn share_bps(part: U256, whole: U256) -> u32 {
    if whole.is_zero() {
        return 0;
    }
    let bps = big(part) * BigUint::from(BPS_DENOMINATOR) / big(whole);
    let capped = bps.min(BigUint::from(BPS_DENOMINATOR));
    // capped <= 10_000
    capped.to_u32_digits().first().copied().unwrap_or(0)
}

/// `amount * bps / 10000`, floored
pub fn percentage_of(amount: U256, bps: u32) -> Result<U256, ProtocolError> {
    if bps == 0 || bps > BPS_DENOMINATOR {
        return Err(ProtocolError::invalid_input(format!(
            "percentage {}% out of range",
            bps as f64 / 100.0
        )));
    }
    narrow(big(amount) * BigUint::from(bps) / BigUint::from(BPS_DENOMINATOR))
}

/// Pool share a deposit of `amount_a` holds after joining `reserve_a`
pub fn pool_share_bps(amount_a: U256, reserve_a: U256) -> u32 {
    let total = big(amount_a) + big(reserve_a);
    if total.is_zero() {
        return 0;
    }
    match narrow(total) {
        Ok(total) => share_bps(amount_a, total),
        Err(_) => 0,
    }
}

/// Price impact of a swap in basis points.
///
/// Compares the execution price (out / in) with the spot price
/// (reserve_out / reserve_in); includes the fee.
pub fn price_impact_bps(
    amount_in: U256,
    amount_out: U256,
    reserve_in: U256,
    reserve_out: U256,
) -> u32 {
    if amount_in.is_zero() || reserve_in.is_zero() || reserve_out.is_zero() {
        return 0;
    }
    let execution = big(amount_out) * big(reserve_in) * BigUint::from(BPS_DENOMINATOR);
    let spot = big(amount_in) * big(reserve_out);
    let ratio = execution / spot;
    let full = BigUint::from(BPS_DENOMINATOR);
    if ratio >= full {
        return 0;
    }
    (full - ratio)
        .to_u32_digits()
        .first()
        .copied()
        .unwrap_or(0)
}
