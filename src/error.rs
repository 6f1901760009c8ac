use alloy::primitives::U256;
use thiserror::Error;

/// Failures of the reserve engine.
///
/// Range and arithmetic errors come from the pure math layer and propagate
/// untouched to the caller of `compute_reserves`. `IncompleteFetch` covers
/// every way the external data path can leave the tick set partial.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReserveError {
    #[error("tick {0} is outside [-887272, 887272]")]
    OutOfRangeTick(i32),

    #[error("tick spacing must be positive, got {0}")]
    InvalidSpacing(i32),

    #[error("sqrtPriceX96 {0} is outside the valid ratio range")]
    InvalidSqrtPrice(U256),

    #[error("incomplete fetch: {0}")]
    IncompleteFetch(String),

    #[error("tick {tick} appears more than once, tick set cannot be strictly ordered")]
    UnsortedInput { tick: i32 },

    #[error("math overflow")]
    Overflow,

    #[error("sqrt price is zero")]
    ZeroPrice,
}

impl ReserveError {
    pub fn incomplete(msg: impl Into<String>) -> Self {
        Self::IncompleteFetch(msg.into())
    }
}
