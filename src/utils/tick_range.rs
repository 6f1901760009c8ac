//! Spacing-aligned tick segments and bitmap coordinates.

use crate::error::ReserveError;

use super::tick_math::{MAX_TICK, MIN_TICK};

/// Spacing-aligned segment enclosing `tick`.
///
/// `lower = floor(tick / spacing) * spacing` and `upper = lower + spacing`,
/// so `lower <= tick < upper` holds for negative ticks too.
pub fn segment_bounds(tick: i32, spacing: i32) -> Result<(i32, i32), ReserveError> {
    if spacing <= 0 {
        return Err(ReserveError::InvalidSpacing(spacing));
    }

    let lower = tick.div_euclid(spacing) * spacing;
    let upper = lower.checked_add(spacing).ok_or(ReserveError::Overflow)?;
    Ok((lower, upper))
}

/// Pull a segment that sticks out of the valid tick range back inside it,
/// keeping its width.
///
/// The top usable tick of a pool usually sits less than one spacing below
/// MAX_TICK, so its raw segment cannot be priced without this.
pub fn clamp_segment(lower: i32, upper: i32, spacing: i32) -> (i32, i32) {
    if lower < MIN_TICK {
        (MIN_TICK, MIN_TICK + spacing)
    } else if upper > MAX_TICK {
        (MAX_TICK - spacing, MAX_TICK)
    } else {
        (lower, upper)
    }
}

/// Bitmap coordinate (word position, bit position) of a tick.
///
/// The tick is compressed by the spacing with floor division, the same way
/// the pool indexes its `tickBitmap`.
pub fn word_position(tick: i32, spacing: i32) -> Result<(i16, u8), ReserveError> {
    if spacing <= 0 {
        return Err(ReserveError::InvalidSpacing(spacing));
    }

    let compressed = tick.div_euclid(spacing);
    let word = i16::try_from(compressed >> 8).map_err(|_| ReserveError::OutOfRangeTick(tick))?;
    Ok((word, (compressed & 0xff) as u8))
}

/// Tick encoded by bit `bit` of bitmap word `word`.
#[inline]
pub fn tick_from_word_and_bit(word: i16, bit: u8, spacing: i32) -> i64 {
    (word as i64 * 256 + bit as i64) * spacing as i64
}
