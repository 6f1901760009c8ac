//! Fixed-point math and conversion utilities.
//!
//! This module is organized into focused submodules:
//!
//! - [`tick_math`] - Tick to Q64.96 sqrt price conversion
//! - [`tick_range`] - Spacing-aligned segments and bitmap coordinates
//! - [`liquidity_amounts`] - Token amounts locked in a price segment
//! - [`price`] - Decimal-adjusted prices from sqrtPriceX96
//! - [`conversion`] - Type conversions (U256, f64, BigInt)

mod conversion;
mod liquidity_amounts;
mod price;
mod tick_math;
mod tick_range;

// ============================================
// Re-exports
// ============================================

// Conversion utilities
pub use conversion::{u256_to_bigint, u256_to_f64, u256_to_f64_safe};

// Segment amount math
pub use liquidity_amounts::{amount0, amount0_delta, amount1, amount1_delta};

// Price conversion utilities
pub use price::sqrt_price_x96_to_adjusted_price;

// Tick math utilities
pub use tick_math::{
    tick_to_sqrt_price_x96, MAX_SQRT_RATIO, MAX_TICK, MIN_SQRT_RATIO, MIN_TICK, Q96,
};

// Tick range utilities
pub use tick_range::{clamp_segment, segment_bounds, tick_from_word_and_bit, word_position};
