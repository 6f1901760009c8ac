//! Price conversion utilities for Uniswap V3 pools.

use alloy::primitives::U256;
use bigdecimal::BigDecimal;
use num_traits::{ToPrimitive, Zero};

use super::conversion::{big_pow10, u256_to_bigint};
use super::tick_math::Q96;

// ============================================
// sqrtPriceX96 to Price Conversion
// ============================================

/// Convert sqrtPriceX96 to a decimal-adjusted price (token1 per token0).
///
/// price = (sqrtPriceX96 / 2^96)^2 * 10^(decimals0 - decimals1)
///
/// The whole computation runs in BigDecimal; only the final value is
/// narrowed to f64.
///
/// # Returns
/// * `Some(price)` if the input is non-zero and the result is finite, `None` otherwise
pub fn sqrt_price_x96_to_adjusted_price(
    sqrt_price_x96: U256,
    token0_decimals: u8,
    token1_decimals: u8,
) -> Option<f64> {
    let sqrt_price = BigDecimal::from(u256_to_bigint(sqrt_price_x96));
    if sqrt_price.is_zero() {
        return None;
    }

    let q96 = BigDecimal::from(u256_to_bigint(Q96));

    // raw_price = (sqrtPriceX96 / Q96)^2
    let normalized = &sqrt_price / &q96;
    let raw_price = &normalized * &normalized;

    // decimal adjustment: 10^(decimals0 - decimals1)
    let decimal_diff = token0_decimals as i32 - token1_decimals as i32;
    let adjusted = if decimal_diff >= 0 {
        raw_price * big_pow10(decimal_diff as u8)
    } else {
        raw_price / big_pow10((-decimal_diff) as u8)
    };

    adjusted.to_f64().filter(|p| p.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::tick_math::tick_to_sqrt_price_x96;

    #[test]
    fn test_unit_price_at_q96() {
        let price = sqrt_price_x96_to_adjusted_price(Q96, 18, 18).unwrap();
        assert!((price - 1.0).abs() < 1e-15);
    }

    #[test]
    fn test_decimal_adjustment() {
        // USDC (6) / WETH (18) at raw price 1 -> 1e-12
        let price = sqrt_price_x96_to_adjusted_price(Q96, 6, 18).unwrap();
        assert!((price / 1e-12 - 1.0).abs() < 1e-9);
        let price = sqrt_price_x96_to_adjusted_price(Q96, 18, 6).unwrap();
        assert!((price / 1e12 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_matches_tick_power() {
        let sqrt_price = tick_to_sqrt_price_x96(-121450).unwrap();
        let price = sqrt_price_x96_to_adjusted_price(sqrt_price, 18, 18).unwrap();
        let expected = 1.0001f64.powi(-121450);
        assert!((price / expected - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_price_rejected() {
        assert!(sqrt_price_x96_to_adjusted_price(U256::ZERO, 18, 18).is_none());
    }
}
