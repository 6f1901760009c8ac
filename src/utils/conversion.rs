//! Type conversion utilities.
//!
//! Raw on-chain amounts go through BigDecimal before becoming f64 so large
//! values keep their precision.

use alloy::primitives::U256;
use bigdecimal::BigDecimal;
use num_bigint::{BigInt, Sign};
use num_traits::ToPrimitive;
use once_cell::sync::Lazy;

// ============================================
// Big Number Conversions
// ============================================

/// Convert U256 to BigInt via little-endian bytes (faster than string parsing).
pub fn u256_to_bigint(value: U256) -> BigInt {
    let bytes: [u8; 32] = value.to_le_bytes();
    BigInt::from_bytes_le(Sign::Plus, &bytes)
}

/// Token amount in whole units, 0.0 when it does not fit an f64.
pub fn u256_to_f64(value: U256, decimals: u8) -> f64 {
    u256_to_f64_safe(value, decimals).unwrap_or(0.0)
}

/// Token amount in whole units, `None` when not representable as a finite f64.
pub fn u256_to_f64_safe(value: U256, decimals: u8) -> Option<f64> {
    let big_value = BigDecimal::from(u256_to_bigint(value));

    let adjusted = big_value / big_pow10(decimals);

    let result = adjusted.to_f64()?;

    if result.is_finite() {
        Some(result)
    } else {
        None
    }
}

// ============================================
// Internal Helpers
// ============================================

static POW10_CACHE: Lazy<[BigDecimal; 25]> =
    Lazy::new(|| std::array::from_fn(|i| BigDecimal::from(BigInt::from(10u32).pow(i as u32))));

/// Compute 10^exp as BigDecimal.
pub(crate) fn big_pow10(exp: u8) -> BigDecimal {
    if (exp as usize) < POW10_CACHE.len() {
        POW10_CACHE[exp as usize].clone()
    } else {
        BigDecimal::from(BigInt::from(10u32).pow(exp as u32))
    }
}
