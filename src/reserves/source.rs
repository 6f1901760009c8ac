use alloy::primitives::U256;
use auto_impl::auto_impl;
use rustc_hash::FxHashMap;

use crate::error::ReserveError;

/// Batched access to a pool's tick state.
///
/// Implementations may be called concurrently for disjoint batches.
#[async_trait::async_trait]
#[auto_impl(&, Box, Arc)]
pub trait TickDataSource: Send + Sync {
    /// Bitmap words for the given word positions. All-zero words may be
    /// left out of the map.
    async fn fetch_bitmap_words(&self, words: &[i16])
        -> Result<FxHashMap<i16, U256>, ReserveError>;

    /// `liquidityNet` for the given ticks. A tick with no record is
    /// uninitialized and reads as zero.
    async fn fetch_tick_records(&self, ticks: &[i32])
        -> Result<FxHashMap<i32, i128>, ReserveError>;
}
