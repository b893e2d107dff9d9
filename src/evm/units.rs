//! Conversion between integer base units and decimal token amounts

use alloy::primitives::{I256, U256};
use rust_decimal::Decimal;
use tracing::warn;

/// Largest mantissa a [`Decimal`] can hold (2^96 - 1).
const MAX_MANTISSA: u128 = (1u128 << 96) - 1;
const MAX_SCALE: u32 = 28;

pub fn pow10(n: u32) -> U256 {
    U256::from(10u8).saturating_pow(U256::from(n))
}

/// Divides `value` by `10^decimals`, keeping `decimals` fractional digits.
///
/// Values beyond `Decimal`'s 96-bit mantissa shed their lowest fractional
/// digits (truncation). Integer parts too large for `Decimal` saturate to
/// `Decimal::MAX`.
pub fn to_decimal(value: U256, decimals: u8) -> Decimal {
    let max_mantissa = U256::from(MAX_MANTISSA);
    let ten = U256::from(10u8);
    let mut digits = value;
    let mut scale = decimals as u32;

    while digits > max_mantissa || scale > MAX_SCALE {
        if scale == 0 {
            warn!("Amount {} exceeds decimal range, saturating", value);
            return Decimal::MAX;
        }
        digits /= ten;
        scale -= 1;
    }

    Decimal::from_i128_with_scale(digits.to::<u128>() as i128, scale)
}

/// Signed variant of [`to_decimal`] for balance deltas.
pub fn signed_to_decimal(value: I256, decimals: u8) -> Decimal {
    let (sign, abs) = value.into_sign_and_abs();
    let amount = to_decimal(abs, decimals);
    if sign.is_negative() { -amount } else { amount }
}

/// Multiplies by `10^decimals` and truncates toward zero.
///
/// Negative amounts have no base-unit representation and map to zero.
pub fn to_base_units(amount: Decimal, decimals: u8) -> U256 {
    if amount.is_sign_negative() {
        return U256::ZERO;
    }

    let mantissa = U256::from(amount.mantissa().unsigned_abs());
    let scale = amount.scale();
    let decimals = decimals as u32;

    if decimals >= scale {
        mantissa.saturating_mul(pow10(decimals - scale))
    } else {
        mantissa / pow10(scale - decimals)
    }
}
