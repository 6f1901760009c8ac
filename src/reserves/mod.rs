//! Concentrated-liquidity reserve estimation.
//!
//! - [`scanner`] - Discovers initialized ticks through the tick bitmap
//! - [`accumulator`] - Sweeps tick deltas into total reserves
//! - [`snapshot`] - Immutable pool view and the reserve result
//! - [`source`] - Batched tick-state capability consumed by the scanner

pub mod accumulator;
pub mod scanner;
pub mod snapshot;
pub mod source;

pub use accumulator::{compute_reserves, in_range_reserves, net_liquidity};
pub use scanner::{decode_word, ActiveTickScanner, MAX_WORD, MIN_WORD};
pub use snapshot::{PoolSnapshot, ReserveResult};
pub use source::TickDataSource;
