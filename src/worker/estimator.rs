use std::time::{Duration, Instant};

use alloy::primitives::{Address, I256};
use anyhow::{Context, Result};
use log::{debug, info};
use tokio_util::sync::CancellationToken;

use crate::config::ScanSettings;
use crate::error::ReserveError;
use crate::reserves::{
    compute_reserves, in_range_reserves, net_liquidity, ActiveTickScanner, PoolSnapshot,
    ReserveResult, TickDataSource,
};
use crate::worker::RpcTickSource;

/// Outcome of one estimation run
#[derive(Debug, Clone)]
pub struct ReserveReport {
    pub pool: Address,
    pub snapshot: PoolSnapshot,
    /// Reserves from the full tick sweep
    pub reserves: ReserveResult,
    /// Reserves backed by the current in-range liquidity only
    pub in_range: ReserveResult,
    pub active_ticks: usize,
    pub net_liquidity: I256,
}

/// Runs reserve estimation for one pool.
///
/// A run is all-or-nothing: a failed fetch or a cancellation at any step
/// fails the run instead of summing over a partial tick set.
pub struct ReserveEstimator<S> {
    name: String,
    pool: Address,
    source: S,
    scan: ScanSettings,
    call_timeout: Duration,
}

impl<S: TickDataSource> ReserveEstimator<S> {
    pub fn new(
        name: String,
        pool: Address,
        source: S,
        scan: ScanSettings,
        call_timeout: Duration,
    ) -> Self {
        Self {
            name,
            pool,
            source,
            scan,
            call_timeout,
        }
    }

    /// Scan, fetch and sweep against an already fetched snapshot.
    pub async fn estimate(
        &self,
        snapshot: PoolSnapshot,
        cancel: &CancellationToken,
    ) -> Result<ReserveReport> {
        self.estimate_with(&self.source, snapshot, cancel).await
    }

    async fn estimate_with(
        &self,
        source: &S,
        snapshot: PoolSnapshot,
        cancel: &CancellationToken,
    ) -> Result<ReserveReport> {
        let started = Instant::now();

        let scanner = ActiveTickScanner::new(snapshot.tick_spacing())?
            .with_batch_size(self.scan.bitmap_batch_size)
            .with_concurrency(self.scan.concurrency)
            .with_call_timeout(self.call_timeout);

        let ticks = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(ReserveError::incomplete("cancelled during bitmap scan").into());
            },
            result = scanner.scan(source) => {
                result.with_context(|| format!("Bitmap scan failed for pool {}", self.name))?
            },
        };

        let record_fetcher = scanner.with_batch_size(self.scan.tick_batch_size);
        let records = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(ReserveError::incomplete("cancelled during tick fetch").into());
            },
            result = record_fetcher.fetch_liquidity(source, &ticks) => {
                result.with_context(|| format!("Tick fetch failed for pool {}", self.name))?
            },
        };

        // The sweep warns on a nonzero sum; the report only carries it
        let net = net_liquidity(records.values());

        let reserves = compute_reserves(&snapshot, records)
            .with_context(|| format!("Reserve sweep failed for pool {}", self.name))?;
        let in_range = in_range_reserves(&snapshot)
            .with_context(|| format!("In-range estimate failed for pool {}", self.name))?;

        info!(
            "Pool {} ({}): {} active ticks, reserve0={} reserve1={} in {:?}",
            self.name,
            self.pool,
            ticks.len(),
            reserves.reserve0,
            reserves.reserve1,
            started.elapsed()
        );

        Ok(ReserveReport {
            pool: self.pool,
            snapshot,
            reserves,
            in_range,
            active_ticks: ticks.len(),
            net_liquidity: net,
        })
    }
}

impl ReserveEstimator<RpcTickSource> {
    /// Full run against a live node: snapshot, scan, tick records, sweep.
    ///
    /// An unpinned source is pinned to the current block for the duration
    /// of the run.
    pub async fn run(&self, cancel: CancellationToken) -> Result<ReserveReport> {
        let source = match self.source.block() {
            Some(_) => self.source.clone(),
            None => {
                let block = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        return Err(ReserveError::incomplete("cancelled before block lookup").into());
                    },
                    result = self.source.latest_block() => result?,
                };
                self.source.clone().at_block(block)
            }
        };
        debug!("Pool {} pinned to block {:?}", self.name, source.block());

        let snapshot = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(ReserveError::incomplete("cancelled during snapshot fetch").into());
            },
            result = source.fetch_snapshot() => result?,
        };

        self.estimate_with(&source, snapshot, &cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockTickSource;
    use alloy::primitives::U256;
    use std::str::FromStr;

    const L: i128 = 66835806823279760363;

    fn snapshot() -> PoolSnapshot {
        let sqrt_price = U256::from_str("182711349204900817339797210").unwrap();
        PoolSnapshot::new(sqrt_price, -121450, 200, L as u128, 18, 18).unwrap()
    }

    fn estimator(source: MockTickSource) -> ReserveEstimator<MockTickSource> {
        ReserveEstimator::new(
            "test".to_string(),
            Address::ZERO,
            source,
            ScanSettings {
                bitmap_batch_size: 1000,
                tick_batch_size: 2,
                concurrency: 2,
            },
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_estimate_end_to_end() {
        let source = MockTickSource::with_ticks(200, &[(-121600, L), (-121400, -L)]);
        let report = estimator(source)
            .estimate(snapshot(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.active_ticks, 2);
        assert_eq!(report.net_liquidity, I256::ZERO);
        assert_eq!(
            report.reserves.reserve0,
            U256::from_str("71872219985808057658").unwrap()
        );
        assert_eq!(report.reserves.reserve1, U256::from(1154196053808741u64));
        assert_eq!(report.in_range, report.reserves);
    }

    #[tokio::test]
    async fn test_bitmap_without_record_is_skipped() {
        let mut source = MockTickSource::with_ticks(200, &[(-121600, L), (-121400, -L)]);
        // Flagged in the bitmap but no tick record behind it
        source.records.remove(&-121400);
        let report = estimator(source)
            .estimate(snapshot(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.active_ticks, 2);
        assert_eq!(report.net_liquidity, I256::unchecked_from(L));
    }

    #[tokio::test]
    async fn test_fetch_failure_fails_run() {
        let mut source = MockTickSource::with_ticks(200, &[(-121600, L), (-121400, -L)]);
        source.fail_word = Some(-3);
        let err = estimator(source)
            .estimate(snapshot(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ReserveError>(),
            Some(ReserveError::IncompleteFetch(_))
        ));
    }

    #[tokio::test]
    async fn test_cancelled_run_fails() {
        let mut source = MockTickSource::with_ticks(200, &[(-121600, L), (-121400, -L)]);
        source.delay = Some(Duration::from_millis(500));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = estimator(source)
            .estimate(snapshot(), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ReserveError>(),
            Some(ReserveError::IncompleteFetch(_))
        ));
    }
}
