//! Reserve estimation from initialized ticks.
//!
//! Sweeps the initialized ticks left to right along the price axis, keeping
//! a running active liquidity, and prices each tick's spacing-wide segment
//! against the pool's current price.

use alloy::primitives::{I256, U256};
use log::warn;

use crate::error::ReserveError;
use crate::utils::{
    amount0, amount1, clamp_segment, segment_bounds, tick_to_sqrt_price_x96, MAX_TICK, MIN_TICK,
};

use super::snapshot::{PoolSnapshot, ReserveResult};

/// Compute the pool's total token reserves from its `liquidityNet` deltas.
///
/// The deltas may arrive in any order (e.g. straight from a hash map); they
/// are sorted ascending before the sweep. A tick that appears twice fails
/// with `UnsortedInput`. A nonzero net-liquidity sum is tolerated with a
/// warning, since fetched data may be stale.
pub fn compute_reserves<I>(snapshot: &PoolSnapshot, deltas: I) -> Result<ReserveResult, ReserveError>
where
    I: IntoIterator<Item = (i32, i128)>,
{
    let ordered = ordered_deltas(deltas)?;

    let spacing = snapshot.tick_spacing();
    let current_tick = snapshot.tick();
    let sqrt_price = snapshot.sqrt_price_x96();

    let mut liquidity = I256::ZERO;
    let mut reserve0 = I256::ZERO;
    let mut reserve1 = I256::ZERO;

    for (tick, delta) in ordered {
        if delta == 0 {
            continue;
        }
        if !(MIN_TICK..=MAX_TICK).contains(&tick) {
            return Err(ReserveError::OutOfRangeTick(tick));
        }

        liquidity = liquidity
            .checked_add(I256::unchecked_from(delta))
            .ok_or(ReserveError::Overflow)?;

        // Empty segment contributes nothing
        if liquidity.is_zero() {
            continue;
        }

        let (lower, upper) = segment_bounds(tick, spacing)?;
        let (lower, upper) = clamp_segment(lower, upper, spacing);
        let sqrt_lower = tick_to_sqrt_price_x96(lower)?;
        let sqrt_upper = tick_to_sqrt_price_x96(upper)?;

        let (amount0_seg, amount1_seg) = segment_amounts(
            liquidity,
            current_tick,
            sqrt_price,
            (lower, upper),
            (sqrt_lower, sqrt_upper),
        )?;

        reserve0 = reserve0
            .checked_add(amount0_seg)
            .ok_or(ReserveError::Overflow)?;
        reserve1 = reserve1
            .checked_add(amount1_seg)
            .ok_or(ReserveError::Overflow)?;
    }

    if !liquidity.is_zero() {
        warn!(
            "Net liquidity after sweep is {} instead of 0; tick data may be stale or partial",
            liquidity
        );
    }

    Ok(ReserveResult {
        reserve0: saturate_to_unsigned(reserve0, "reserve0"),
        reserve1: saturate_to_unsigned(reserve1, "reserve1"),
    })
}

/// Reserves backed by the current in-range liquidity only.
///
/// Prices the spacing-aligned segment containing the current tick with the
/// pool's active liquidity. This is the cheap estimate available without a
/// bitmap scan.
pub fn in_range_reserves(snapshot: &PoolSnapshot) -> Result<ReserveResult, ReserveError> {
    let spacing = snapshot.tick_spacing();
    let (lower, upper) = segment_bounds(snapshot.tick(), spacing)?;
    let (lower, upper) = clamp_segment(lower, upper, spacing);

    let liquidity = I256::unchecked_from(snapshot.liquidity());
    let sqrt_price = snapshot.sqrt_price_x96();

    let reserve0 = amount0(liquidity, sqrt_price, tick_to_sqrt_price_x96(upper)?)?;
    let reserve1 = amount1(liquidity, tick_to_sqrt_price_x96(lower)?, sqrt_price)?;

    Ok(ReserveResult {
        reserve0: saturate_to_unsigned(reserve0, "reserve0"),
        reserve1: saturate_to_unsigned(reserve1, "reserve1"),
    })
}

/// Sum of all `liquidityNet` values. Zero for a well-formed pool.
pub fn net_liquidity<'a, I>(deltas: I) -> I256
where
    I: IntoIterator<Item = &'a i128>,
{
    deltas
        .into_iter()
        .fold(I256::ZERO, |acc, d| acc.saturating_add(I256::unchecked_from(*d)))
}

// ============================================
// Internal Helpers
// ============================================

fn ordered_deltas<I>(deltas: I) -> Result<Vec<(i32, i128)>, ReserveError>
where
    I: IntoIterator<Item = (i32, i128)>,
{
    let mut ordered: Vec<(i32, i128)> = deltas.into_iter().collect();
    ordered.sort_unstable_by_key(|(tick, _)| *tick);

    if let Some(pair) = ordered.windows(2).find(|pair| pair[0].0 == pair[1].0) {
        return Err(ReserveError::UnsortedInput { tick: pair[0].0 });
    }

    Ok(ordered)
}

/// Token amounts of one segment, by where the current tick sits.
fn segment_amounts(
    liquidity: I256,
    current_tick: i32,
    sqrt_price: U256,
    (lower, upper): (i32, i32),
    (sqrt_lower, sqrt_upper): (U256, U256),
) -> Result<(I256, I256), ReserveError> {
    if current_tick < lower {
        // Entirely above the current price: all token0
        Ok((amount0(liquidity, sqrt_lower, sqrt_upper)?, I256::ZERO))
    } else if current_tick < upper {
        Ok((
            amount0(liquidity, sqrt_price, sqrt_upper)?,
            amount1(liquidity, sqrt_lower, sqrt_price)?,
        ))
    } else {
        // Entirely below the current price: all token1
        Ok((I256::ZERO, amount1(liquidity, sqrt_lower, sqrt_upper)?))
    }
}

fn saturate_to_unsigned(value: I256, label: &str) -> U256 {
    if value.is_negative() {
        warn!("Computed {} is negative ({}), saturating at 0", label, value);
        U256::ZERO
    } else {
        value.into_raw()
    }
}
