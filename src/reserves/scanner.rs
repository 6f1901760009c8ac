//! Active tick discovery through the pool's tick bitmap.
//!
//! The full tick space is far too large to read tick by tick, so the scan
//! walks the sparse bitmap word by word and decodes set bits into ticks.

use std::time::Duration;

use alloy::primitives::U256;
use futures::{stream, StreamExt, TryStreamExt};
use log::debug;
use rustc_hash::FxHashMap;

use crate::error::ReserveError;
use crate::utils::{tick_from_word_and_bit, MAX_TICK, MIN_TICK};

use super::source::TickDataSource;

/// Lowest bitmap word position scanned (`MIN_TICK >> 8`).
pub const MIN_WORD: i16 = (MIN_TICK >> 8) as i16;

/// Highest bitmap word position scanned (`MAX_TICK >> 8`).
pub const MAX_WORD: i16 = (MAX_TICK >> 8) as i16;

/// Scans the tick bitmap of one pool.
#[derive(Debug, Clone)]
pub struct ActiveTickScanner {
    spacing: i32,
    batch_size: usize,
    concurrency: usize,
    call_timeout: Duration,
}

impl ActiveTickScanner {
    pub const DEFAULT_BATCH_SIZE: usize = 5_000;
    pub const DEFAULT_CONCURRENCY: usize = 4;
    pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(spacing: i32) -> Result<Self, ReserveError> {
        if spacing <= 0 {
            return Err(ReserveError::InvalidSpacing(spacing));
        }

        Ok(Self {
            spacing,
            batch_size: Self::DEFAULT_BATCH_SIZE,
            concurrency: Self::DEFAULT_CONCURRENCY,
            call_timeout: Self::DEFAULT_CALL_TIMEOUT,
        })
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn spacing(&self) -> i32 {
        self.spacing
    }

    /// Word positions to query, split into batches.
    ///
    /// Every call starts a fresh pass over `[MIN_WORD, MAX_WORD]`.
    pub fn word_chunks(&self) -> impl Iterator<Item = Vec<i16>> {
        let batch = self.batch_size.min(u16::MAX as usize) as i32;
        let mut next = MIN_WORD as i32;

        std::iter::from_fn(move || {
            if next > MAX_WORD as i32 {
                return None;
            }
            let end = (next + batch - 1).min(MAX_WORD as i32);
            let chunk = (next..=end).map(|w| w as i16).collect();
            next = end + 1;
            Some(chunk)
        })
    }

    /// Discover every initialized tick of the pool, sorted ascending.
    ///
    /// Batches are dispatched concurrently. Any failed or timed-out batch
    /// fails the whole scan; a partial tick set is never returned.
    pub async fn scan<S: TickDataSource>(&self, source: &S) -> Result<Vec<i32>, ReserveError> {
        let call_timeout = self.call_timeout;

        let batches: Vec<FxHashMap<i16, U256>> = stream::iter(self.word_chunks())
            .map(|chunk| async move {
                let words = tokio::time::timeout(call_timeout, source.fetch_bitmap_words(&chunk))
                    .await
                    .map_err(|_| {
                        ReserveError::incomplete(format!(
                            "bitmap batch of {} words timed out after {:?}",
                            chunk.len(),
                            call_timeout
                        ))
                    })??;
                debug!(
                    "Fetched bitmap batch of {} words, {} non-zero",
                    chunk.len(),
                    words.len()
                );
                Ok::<_, ReserveError>(words)
            })
            .buffer_unordered(self.concurrency)
            .try_collect()
            .await?;

        let mut ticks = Vec::new();
        for (word, bits) in batches.into_iter().flatten() {
            for tick in decode_word(word, bits, self.spacing) {
                ticks.push(tick?);
            }
        }

        // Batches complete in any order
        ticks.sort_unstable();
        ticks.dedup();

        debug!("Bitmap scan found {} initialized ticks", ticks.len());
        Ok(ticks)
    }

    /// Fetch `liquidityNet` for the given ticks in concurrent batches.
    ///
    /// Ticks without a record are absent from the map. As with the scan,
    /// one failed batch fails the whole fetch.
    pub async fn fetch_liquidity<S: TickDataSource>(
        &self,
        source: &S,
        ticks: &[i32],
    ) -> Result<FxHashMap<i32, i128>, ReserveError> {
        let call_timeout = self.call_timeout;

        let batches: Vec<FxHashMap<i32, i128>> = stream::iter(ticks.chunks(self.batch_size).map(<[i32]>::to_vec))
            .map(|chunk: Vec<i32>| async move {
                match tokio::time::timeout(call_timeout, source.fetch_tick_records(&chunk)).await {
                    Ok(records) => records,
                    Err(_) => Err(ReserveError::incomplete(format!(
                        "tick batch of {} ticks timed out after {:?}",
                        chunk.len(),
                        call_timeout
                    ))),
                }
            })
            .buffer_unordered(self.concurrency)
            .try_collect()
            .await?;

        let mut records = FxHashMap::default();
        for batch in batches {
            records.extend(batch);
        }

        debug!(
            "Fetched {} tick records for {} ticks",
            records.len(),
            ticks.len()
        );
        Ok(records)
    }
}

/// Ticks encoded by one bitmap word, lowest bit first.
///
/// Bit `j` of word `w` is tick `(w * 256 + j) * spacing`. A set bit that
/// lands outside the valid tick range yields `OutOfRangeTick`.
pub fn decode_word(
    word: i16,
    bits: U256,
    spacing: i32,
) -> impl Iterator<Item = Result<i32, ReserveError>> {
    (0..=u8::MAX)
        .filter(move |&bit| bits.bit(bit as usize))
        .map(move |bit| {
            let tick = tick_from_word_and_bit(word, bit, spacing);
            match i32::try_from(tick) {
                Ok(t) if (MIN_TICK..=MAX_TICK).contains(&t) => Ok(t),
                _ => Err(ReserveError::OutOfRangeTick(
                    tick.clamp(i32::MIN as i64, i32::MAX as i64) as i32,
                )),
            }
        })
}
