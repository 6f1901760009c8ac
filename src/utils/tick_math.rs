//! Tick math for Uniswap V3 pools.
//!
//! Bit-exact port of TickMath.getSqrtRatioAtTick: the Q64.96 sqrt price is
//! rebuilt from the bits of |tick| with 256-bit integer arithmetic, so the
//! result agrees with on-chain accounting to the last unit.

use alloy::primitives::{uint, U256};

use crate::error::ReserveError;

// ============================================
// Constants
// ============================================

pub const MIN_TICK: i32 = -887272;
pub const MAX_TICK: i32 = -MIN_TICK;

/// Sqrt ratio at MIN_TICK.
pub const MIN_SQRT_RATIO: U256 = uint!(4295128739_U256);

/// Sqrt ratio at MAX_TICK.
pub const MAX_SQRT_RATIO: U256 =
    uint!(1461446703485210103287273052203988822378723970342_U256);

/// 2^96, the Q64.96 scaling factor.
pub const Q96: U256 = uint!(0x1000000000000000000000000_U256);

// Seeds for bit 0 of |tick|: 1.0001^(-1/2) in Q128, or exactly 1.0 in Q128.
const RATIO_ODD: U256 = uint!(0xfffcb933bd6fad37aa2d162d1a594001_U256);
const RATIO_EVEN: U256 = uint!(0x100000000000000000000000000000000_U256);

// 1.0001^(-2^(i-1)) in Q128 for bits i = 1..19 of |tick|.
const TICK_MULTIPLIERS: [U256; 19] = [
    uint!(0xfff97272373d413259a46990580e213a_U256), // bit 1
    uint!(0xfff2e50f5f656932ef12357cf3c7fdcc_U256), // bit 2
    uint!(0xffe5caca7e10e4e61c3624eaa0941cd0_U256), // bit 3
    uint!(0xffcb9843d60f6159c9db58835c926644_U256), // bit 4
    uint!(0xff973b41fa98c081472e6896dfb254c0_U256), // bit 5
    uint!(0xff2ea16466c96a3843ec78b326b52861_U256), // bit 6
    uint!(0xfe5dee046a99a2a811c461f1969c3053_U256), // bit 7
    uint!(0xfcbe86c7900a88aedcffc83b479aa3a4_U256), // bit 8
    uint!(0xf987a7253ac413176f2b074cf7815e54_U256), // bit 9
    uint!(0xf3392b0822b70005940c7a398e4b70f3_U256), // bit 10
    uint!(0xe7159475a2c29b7443b29c7fa6e889d9_U256), // bit 11
    uint!(0xd097f3bdfd2022b8845ad8f792aa5825_U256), // bit 12
    uint!(0xa9f746462d870fdf8a65dc1f90e061e5_U256), // bit 13
    uint!(0x70d869a156d2a1b890bb3df62baf32f7_U256), // bit 14
    uint!(0x31be135f97d08fd981231505542fcfa6_U256), // bit 15
    uint!(0x9aa508b5b7a84e1c677de54f3e99bc9_U256),  // bit 16
    uint!(0x5d6af8dedb81196699c329225ee604_U256),   // bit 17
    uint!(0x2216e584f5fa1ea926041bedfe98_U256),     // bit 18
    uint!(0x48a170391f7dc42444e8fa2_U256),          // bit 19
];

// ============================================
// Tick to Price Conversion
// ============================================

/// Convert a tick to its sqrt price ratio (Q64.96 format)
///
/// Formula: sqrt(1.0001^tick) * 2^96, rounded up.
/// Valid tick range: -887272 to 887272. Ticks outside it are rejected,
/// never clamped.
pub fn tick_to_sqrt_price_x96(tick: i32) -> Result<U256, ReserveError> {
    let abs_tick = tick.unsigned_abs();
    if abs_tick > MAX_TICK as u32 {
        return Err(ReserveError::OutOfRangeTick(tick));
    }

    let mut ratio = if abs_tick & 0x1 != 0 { RATIO_ODD } else { RATIO_EVEN };

    // ratio stays below 2^129 and every multiplier is below 2^128,
    // so the product never leaves 256 bits.
    for (i, multiplier) in TICK_MULTIPLIERS.iter().enumerate() {
        if abs_tick & (1 << (i + 1)) != 0 {
            ratio = (ratio * *multiplier) >> 128;
        }
    }

    // For positive ticks, take reciprocal
    if tick > 0 {
        ratio = U256::MAX / ratio;
    }

    // Q128.128 -> Q64.96, rounding up
    let round_up = ratio.as_limbs()[0] & 0xFFFF_FFFF != 0;
    Ok((ratio >> 32) + U256::from(round_up as u8))
}
