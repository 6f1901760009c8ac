use alloy::primitives::U256;

use crate::error::ReserveError;
use crate::utils::{
    sqrt_price_x96_to_adjusted_price, u256_to_f64, MAX_SQRT_RATIO, MAX_TICK, MIN_SQRT_RATIO,
    MIN_TICK,
};

/// Point-in-time view of a pool, built once per estimation run.
///
/// Fields are fixed at construction; every function that needs pool
/// constants takes the snapshot explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSnapshot {
    sqrt_price_x96: U256,
    tick: i32,
    tick_spacing: i32,
    liquidity: u128,
    decimals0: u8,
    decimals1: u8,
}

impl PoolSnapshot {
    pub fn new(
        sqrt_price_x96: U256,
        tick: i32,
        tick_spacing: i32,
        liquidity: u128,
        decimals0: u8,
        decimals1: u8,
    ) -> Result<Self, ReserveError> {
        if tick_spacing <= 0 {
            return Err(ReserveError::InvalidSpacing(tick_spacing));
        }
        if !(MIN_TICK..=MAX_TICK).contains(&tick) {
            return Err(ReserveError::OutOfRangeTick(tick));
        }
        if sqrt_price_x96 < MIN_SQRT_RATIO || sqrt_price_x96 >= MAX_SQRT_RATIO {
            return Err(ReserveError::InvalidSqrtPrice(sqrt_price_x96));
        }

        Ok(Self {
            sqrt_price_x96,
            tick,
            tick_spacing,
            liquidity,
            decimals0,
            decimals1,
        })
    }

    pub fn sqrt_price_x96(&self) -> U256 {
        self.sqrt_price_x96
    }

    pub fn tick(&self) -> i32 {
        self.tick
    }

    pub fn tick_spacing(&self) -> i32 {
        self.tick_spacing
    }

    /// Liquidity active at the current price.
    pub fn liquidity(&self) -> u128 {
        self.liquidity
    }

    pub fn decimals(&self) -> (u8, u8) {
        (self.decimals0, self.decimals1)
    }

    /// Decimal-adjusted price of token0 in token1.
    pub fn price(&self) -> Option<f64> {
        sqrt_price_x96_to_adjusted_price(self.sqrt_price_x96, self.decimals0, self.decimals1)
    }
}

/// Raw token reserves (before decimal scaling).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReserveResult {
    pub reserve0: U256,
    pub reserve1: U256,
}

impl ReserveResult {
    /// Reserves scaled by token decimals, for display.
    pub fn adjusted(&self, decimals0: u8, decimals1: u8) -> (f64, f64) {
        (
            u256_to_f64(self.reserve0, decimals0),
            u256_to_f64(self.reserve1, decimals1),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::Q96;

    #[test]
    fn test_snapshot_validation() {
        assert!(PoolSnapshot::new(Q96, 0, 60, 0, 18, 18).is_ok());
        assert_eq!(
            PoolSnapshot::new(Q96, 0, 0, 0, 18, 18),
            Err(ReserveError::InvalidSpacing(0))
        );
        assert_eq!(
            PoolSnapshot::new(Q96, MAX_TICK + 1, 60, 0, 18, 18),
            Err(ReserveError::OutOfRangeTick(MAX_TICK + 1))
        );
        assert_eq!(
            PoolSnapshot::new(MAX_SQRT_RATIO, 0, 60, 0, 18, 18),
            Err(ReserveError::InvalidSqrtPrice(MAX_SQRT_RATIO))
        );
        assert!(PoolSnapshot::new(U256::from(1u8), 0, 60, 0, 18, 18).is_err());
    }

    #[test]
    fn test_snapshot_price() {
        let snapshot = PoolSnapshot::new(Q96, 0, 60, 0, 6, 6).unwrap();
        assert!((snapshot.price().unwrap() - 1.0).abs() < 1e-15);
    }

    #[test]
    fn test_adjusted_reserves() {
        let result = ReserveResult {
            reserve0: U256::from(2_000_000u64),
            reserve1: U256::from(3_000_000_000_000_000_000u128),
        };
        let (r0, r1) = result.adjusted(6, 18);
        assert!((r0 - 2.0).abs() < 1e-12);
        assert!((r1 - 3.0).abs() < 1e-12);
    }
}
