use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use alloy::primitives::U256;
use rustc_hash::FxHashMap;

use crate::error::ReserveError;
use crate::reserves::TickDataSource;
use crate::utils::word_position;

/// In-memory pool tick state.
#[derive(Default)]
pub struct MockTickSource {
    pub words: FxHashMap<i16, U256>,
    pub records: FxHashMap<i32, i128>,
    pub fail_word: Option<i16>,
    pub delay: Option<Duration>,
    pub bitmap_calls: AtomicUsize,
    pub record_calls: AtomicUsize,
}

impl MockTickSource {
    /// Builds the bitmap and records from `(tick, liquidityNet)` pairs.
    pub fn with_ticks(spacing: i32, ticks: &[(i32, i128)]) -> Self {
        let mut source = Self::default();
        for &(tick, liquidity_net) in ticks {
            let (word, bit) = word_position(tick, spacing).unwrap();
            let entry = source.words.entry(word).or_insert(U256::ZERO);
            *entry |= U256::ONE << bit as usize;
            source.records.insert(tick, liquidity_net);
        }
        source
    }
}

#[async_trait::async_trait]
impl TickDataSource for MockTickSource {
    async fn fetch_bitmap_words(
        &self,
        words: &[i16],
    ) -> Result<FxHashMap<i16, U256>, ReserveError> {
        self.bitmap_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(fail) = self.fail_word {
            if words.contains(&fail) {
                return Err(ReserveError::incomplete(format!("word {fail} unavailable")));
            }
        }

        Ok(words
            .iter()
            .filter_map(|w| self.words.get(w).map(|bits| (*w, *bits)))
            .filter(|(_, bits)| !bits.is_zero())
            .collect())
    }

    async fn fetch_tick_records(
        &self,
        ticks: &[i32],
    ) -> Result<FxHashMap<i32, i128>, ReserveError> {
        self.record_calls.fetch_add(1, Ordering::SeqCst);
        Ok(ticks
            .iter()
            .filter_map(|t| self.records.get(t).map(|net| (*t, *net)))
            .collect())
    }
}
