//! Fixed-point unit conversion
//!
//! Converts between human decimal strings ("1.5") and the integer base-unit
//! representation used on-chain (1.5 * 10^18). Parsing is strict: digits and at
//! most one decimal point. Fractional digits beyond `decimals` are truncated,
//! matching on-chain truncation.

use alloy_primitives::U256;

use crate::errors::ProtocolError;

/// Decimals used by WETH, the test tokens and every pair's LP token
pub const DEFAULT_DECIMALS: u8 = 18;

/// Split a decimal string into validated integer and fraction digit runs.
fn split_decimal(amount: &str) -> Result<(&str, &str), ProtocolError> {
    let trimmed = amount.trim();
    if trimmed.is_empty() {
        return Err(ProtocolError::invalid_input("amount is empty"));
    }

    let (int_part, frac_part) = trimmed.split_once('.').unwrap_or((trimmed, ""));

    if frac_part.contains('.') {
        return Err(ProtocolError::invalid_input(format!(
            "'{}' has more than one decimal point",
            amount
        )));
    }
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(ProtocolError::invalid_input(format!(
            "'{}' has no digits",
            amount
        )));
    }
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int_part) || !all_digits(frac_part) {
        return Err(ProtocolError::invalid_input(format!(
            "'{}' is not a decimal number",
            amount
        )));
    }

    Ok((int_part, frac_part))
}

/// Convert a decimal string into base units.
///
/// `"1.5"` with 18 decimals becomes `1_500_000_000_000_000_000`.
pub fn to_base_units(amount: &str, decimals: u8) -> Result<U256, ProtocolError> {
    let (int_part, frac_part) = split_decimal(amount)?;
    let scale = decimals as usize;
    let frac_part = &frac_part[..frac_part.len().min(scale)];

    let mut digits = String::with_capacity(int_part.len() + scale);
    digits.push_str(int_part);
    digits.push_str(frac_part);
    digits.extend(std::iter::repeat('0').take(scale - frac_part.len()));

    let digits = digits.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }

    U256::from_str_radix(digits, 10).map_err(|_| {
        ProtocolError::invalid_input(format!("'{}' does not fit in 256 bits", amount.trim()))
    })
}

/// Convert base units back into a canonical decimal string.
///
/// Whole numbers have no fraction (`"10"`), fractions carry no trailing zeros
/// (`"0.5"`) and zero is `"0"`.
pub fn from_base_units(value: U256, decimals: u8) -> String {
    let scale = decimals as usize;
    let raw = value.to_string();

    let padded = if raw.len() <= scale {
        format!("{}{}", "0".repeat(scale + 1 - raw.len()), raw)
    } else {
        raw
    };

    let (int_part, frac_part) = padded.split_at(padded.len() - scale);
    let frac_part = frac_part.trim_end_matches('0');

    if frac_part.is_empty() {
        int_part.to_string()
    } else {
        format!("{}.{}", int_part, frac_part)
    }
}

/// Canonical form of a decimal string at the given precision
pub fn normalize(amount: &str, decimals: u8) -> Result<String, ProtocolError> {
    to_base_units(amount, decimals).map(|v| from_base_units(v, decimals))
}

/// Parse an amount that must be strictly positive
pub fn parse_positive(amount: &str, decimals: u8) -> Result<U256, ProtocolError> {
    let value = to_base_units(amount, decimals)?;
    if value.is_zero() {
        return Err(ProtocolError::invalid_input("amount must be greater than 0"));
    }
    Ok(value)
}
