//! Token amounts locked by liquidity over a sqrt-price range.
//!
//! Follows SqrtPriceMath.getAmount0Delta / getAmount1Delta, including the
//! rounding direction: adding liquidity rounds up, removing rounds down.

use alloy::primitives::{aliases::U512, I256, Sign, U256};

use crate::error::ReserveError;

use super::tick_math::Q96;

/// Calculate amount0 for `liquidity` between two sqrt prices.
///
/// amount0 = L * Q96 * (pb - pa) / (pa * pb), computed with 512-bit
/// intermediates. Price order doesn't matter.
pub fn amount0_delta(
    liquidity: U256,
    sqrt_price_a_x96: U256,
    sqrt_price_b_x96: U256,
    round_up: bool,
) -> Result<U256, ReserveError> {
    let (pa, pb) = sort_prices(sqrt_price_a_x96, sqrt_price_b_x96);
    if pa.is_zero() {
        return Err(ReserveError::ZeroPrice);
    }

    let numerator = widen(liquidity)
        .checked_mul(widen(Q96))
        .and_then(|n| n.checked_mul(widen(pb - pa)))
        .ok_or(ReserveError::Overflow)?;
    let denominator = widen(pa) * widen(pb);

    narrow(div_rounding(numerator, denominator, round_up))
}

/// Calculate amount1 for `liquidity` between two sqrt prices.
///
/// amount1 = L * (pb - pa) / Q96. Price order doesn't matter.
pub fn amount1_delta(
    liquidity: U256,
    sqrt_price_a_x96: U256,
    sqrt_price_b_x96: U256,
    round_up: bool,
) -> Result<U256, ReserveError> {
    let (pa, pb) = sort_prices(sqrt_price_a_x96, sqrt_price_b_x96);

    let numerator = widen(liquidity)
        .checked_mul(widen(pb - pa))
        .ok_or(ReserveError::Overflow)?;

    narrow(div_rounding(numerator, widen(Q96), round_up))
}

/// Signed amount0 for a liquidity change.
///
/// Negative liquidity (removal) rounds down and yields a negative amount,
/// non-negative liquidity rounds up.
pub fn amount0(
    liquidity: I256,
    sqrt_price_a_x96: U256,
    sqrt_price_b_x96: U256,
) -> Result<I256, ReserveError> {
    let magnitude = liquidity.unsigned_abs();
    if liquidity.is_negative() {
        let amount = amount0_delta(magnitude, sqrt_price_a_x96, sqrt_price_b_x96, false)?;
        to_signed(Sign::Negative, amount)
    } else {
        let amount = amount0_delta(magnitude, sqrt_price_a_x96, sqrt_price_b_x96, true)?;
        to_signed(Sign::Positive, amount)
    }
}

/// Signed amount1 for a liquidity change, same rounding rules as [`amount0`].
pub fn amount1(
    liquidity: I256,
    sqrt_price_a_x96: U256,
    sqrt_price_b_x96: U256,
) -> Result<I256, ReserveError> {
    let magnitude = liquidity.unsigned_abs();
    if liquidity.is_negative() {
        let amount = amount1_delta(magnitude, sqrt_price_a_x96, sqrt_price_b_x96, false)?;
        to_signed(Sign::Negative, amount)
    } else {
        let amount = amount1_delta(magnitude, sqrt_price_a_x96, sqrt_price_b_x96, true)?;
        to_signed(Sign::Positive, amount)
    }
}

// ============================================
// Internal Helpers
// ============================================

#[inline]
fn sort_prices(a: U256, b: U256) -> (U256, U256) {
    if a > b {
        (b, a)
    } else {
        (a, b)
    }
}

fn div_rounding(numerator: U512, denominator: U512, round_up: bool) -> U512 {
    let (quotient, remainder) = numerator.div_rem(denominator);
    if round_up && !remainder.is_zero() {
        quotient + U512::from(1u8)
    } else {
        quotient
    }
}

#[inline]
fn widen(value: U256) -> U512 {
    let l = value.as_limbs();
    U512::from_limbs([l[0], l[1], l[2], l[3], 0, 0, 0, 0])
}

fn narrow(value: U512) -> Result<U256, ReserveError> {
    let l = value.as_limbs();
    if l[4..].iter().any(|&limb| limb != 0) {
        return Err(ReserveError::Overflow);
    }
    Ok(U256::from_limbs([l[0], l[1], l[2], l[3]]))
}

fn to_signed(sign: Sign, amount: U256) -> Result<I256, ReserveError> {
    I256::checked_from_sign_and_abs(sign, amount).ok_or(ReserveError::Overflow)
}
