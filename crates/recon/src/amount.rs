//! Exact conversion between token base units and ledger milliunits.
//!
//! Token amounts are unsigned 256-bit integers counted in base units
//! (`10^decimals` per display unit). Ledger amounts are signed 64-bit
//! milliunits (1000 per currency unit). Both directions use floor division.

use alloy_primitives::U256;
use thiserror::Error;

/// Ledger fixed-point scale: 1000 milliunits per currency unit.
pub const LEDGER_SCALE: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("invalid amount '{0}'")]
    Invalid(String),
    #[error("amount '{value}' has more decimal places than the token supports ({decimals})")]
    ExcessPrecision { value: String, decimals: u8 },
    #[error("amount '{0}' exceeds the representable range")]
    Overflow(String),
}

/// `10^exp` as a U256, or None when it does not fit.
pub fn pow10(exp: u32) -> Option<U256> {
    let ten = U256::from(10u64);
    let mut acc = U256::from(1u64);
    for _ in 0..exp {
        acc = acc.checked_mul(ten)?;
    }
    Some(acc)
}

fn strip_grouping(text: &str) -> String {
    text.chars().filter(|c| !matches!(c, ',' | '_' | ' ')).collect()
}

fn parse_digits(digits: &str, original: &str) -> Result<U256, AmountError> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AmountError::Invalid(original.to_string()));
    }
    U256::from_str_radix(digits, 10).map_err(|_| AmountError::Overflow(original.to_string()))
}

/// Parse an integer count of base units, e.g. `"1,000,000"`.
pub fn parse_base_units(text: &str) -> Result<U256, AmountError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Empty);
    }
    parse_digits(&strip_grouping(trimmed), trimmed)
}

/// Parse a human decimal string (`"101.5"`) into base units for a token
/// with `decimals` fractional digits.
pub fn parse_decimal_to_base_units(text: &str, decimals: u8) -> Result<U256, AmountError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Empty);
    }
    // Grouping separators are only allowed before the decimal point.
    let (int_part, frac_part) = match trimmed.split_once('.') {
        Some((i, f)) => (strip_grouping(i), f.trim_end_matches('0')),
        None => (strip_grouping(trimmed), ""),
    };
    if !frac_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AmountError::Invalid(trimmed.to_string()));
    }

    let scale = pow10(decimals as u32).ok_or_else(|| AmountError::Overflow(trimmed.to_string()))?;
    let whole = parse_digits(&int_part, trimmed)?
        .checked_mul(scale)
        .ok_or_else(|| AmountError::Overflow(trimmed.to_string()))?;

    if frac_part.is_empty() {
        return Ok(whole);
    }
    if frac_part.len() > decimals as usize {
        return Err(AmountError::ExcessPrecision { value: trimmed.to_string(), decimals });
    }

    let padding = pow10((decimals as usize - frac_part.len()) as u32)
        .ok_or_else(|| AmountError::Overflow(trimmed.to_string()))?;
    let fraction = parse_digits(frac_part, trimmed)?
        .checked_mul(padding)
        .ok_or_else(|| AmountError::Overflow(trimmed.to_string()))?;

    whole.checked_add(fraction).ok_or_else(|| AmountError::Overflow(trimmed.to_string()))
}

/// Convert base units to ledger milliunits, negated for outbound transfers.
///
/// Sub-milliunit remainders are discarded, so transfers smaller than
/// `10^decimals / 1000` base units become 0.
pub fn base_units_to_ledger_amount(
    base: &U256,
    decimals: u8,
    outbound: bool,
) -> Result<i64, AmountError> {
    let scale = pow10(decimals as u32).ok_or_else(|| AmountError::Overflow(base.to_string()))?;
    let milli = base
        .checked_mul(U256::from(LEDGER_SCALE))
        .ok_or_else(|| AmountError::Overflow(base.to_string()))?
        / scale;

    if milli > U256::from(i64::MAX as u64) {
        return Err(AmountError::Overflow(base.to_string()));
    }
    let magnitude = milli.as_limbs()[0] as i64;
    Ok(if outbound { -magnitude } else { magnitude })
}

/// Expected base units for a ledger amount: `|amount| * 10^decimals / 1000`.
pub fn ledger_amount_to_expected_base_units(
    ledger_amount: i64,
    decimals: u8,
) -> Result<U256, AmountError> {
    let scale = pow10(decimals as u32)
        .ok_or_else(|| AmountError::Overflow(ledger_amount.to_string()))?;
    let scaled = U256::from(ledger_amount.unsigned_abs())
        .checked_mul(scale)
        .ok_or_else(|| AmountError::Overflow(ledger_amount.to_string()))?;
    Ok(scaled / U256::from(LEDGER_SCALE))
}

/// Render base units as a decimal string with trailing fractional zeros
/// removed. `None` renders as `"0"`.
pub fn format_base_units(value: Option<&U256>, decimals: u8) -> String {
    let Some(value) = value else {
        return "0".to_string();
    };
    let digits = value.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }

    let padded = if digits.len() <= decimals {
        format!("{}{}", "0".repeat(decimals - digits.len() + 1), digits)
    } else {
        digits
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - decimals);
    let frac_part = frac_part.trim_end_matches('0');
    if frac_part.is_empty() {
        int_part.to_string()
    } else {
        format!("{int_part}.{frac_part}")
    }
}

/// Render ledger milliunits as a signed decimal, e.g. `-1000` as `"-1"`.
pub fn format_ledger_amount(milliunits: i64) -> String {
    let sign = if milliunits < 0 { "-" } else { "" };
    let abs = milliunits.unsigned_abs();
    let whole = abs / LEDGER_SCALE;
    let frac = abs % LEDGER_SCALE;
    if frac == 0 {
        return format!("{sign}{whole}");
    }
    let frac = format!("{frac:03}");
    format!("{sign}{whole}.{}", frac.trim_end_matches('0'))
}

/// Smallest amount offered for manual ledger entry creation.
pub fn dust_threshold(decimals: u8) -> U256 {
    pow10(decimals.saturating_sub(2) as u32).unwrap_or(U256::MAX)
}
