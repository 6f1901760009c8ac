use std::future::IntoFuture;
use std::time::Duration;

use alloy::eips::BlockId;
use alloy::primitives::{aliases::I24, Address, U256};
use alloy::providers::{DynProvider, ProviderBuilder, MULTICALL3_ADDRESS};
use alloy::sol_types::SolCall;
use anyhow::{Context, Result};
use log::debug;
use rustc_hash::FxHashMap;
use url::Url;

use crate::abis::{Call3, IMulticall3, IUniswapV3Pool, McResult, IERC20};
use crate::error::ReserveError;
use crate::reserves::{PoolSnapshot, TickDataSource};

/// Tick state of one Uniswap V3 pool, read over JSON-RPC through multicall3
///
/// All reads go to `block` when pinned, so the snapshot, bitmap and tick
/// records describe the same state.
#[derive(Clone)]
pub struct RpcTickSource {
    pool: Address,
    provider: DynProvider,
    call_timeout: Duration,
    block: Option<u64>,
}

impl RpcTickSource {
    pub fn new(rpc_url: &str, pool: Address, call_timeout: Duration) -> Result<Self> {
        let url = Url::parse(rpc_url).context("Invalid RPC URL")?;

        let client = ProviderBuilder::new().connect_http(url);

        Ok(Self::with_provider(DynProvider::new(client), pool, call_timeout))
    }

    pub fn with_provider(provider: DynProvider, pool: Address, call_timeout: Duration) -> Self {
        Self {
            pool,
            provider,
            call_timeout,
            block: None,
        }
    }

    pub fn at_block(mut self, block: u64) -> Self {
        self.block = Some(block);
        self
    }

    pub fn block(&self) -> Option<u64> {
        self.block
    }

    fn block_id(&self) -> BlockId {
        self.block.map(BlockId::number).unwrap_or(BlockId::latest())
    }

    /// Current block number as seen by the multicall contract.
    pub async fn latest_block(&self) -> Result<u64> {
        let multicall = IMulticall3::new(MULTICALL3_ADDRESS, &self.provider);
        let number = self.timed(multicall.getBlockNumber().call(), "getBlockNumber").await?;
        u64::try_from(number)
            .ok()
            .context("Block number does not fit in u64")
    }

    /// Read slot0, spacing, active liquidity and token decimals.
    pub async fn fetch_snapshot(&self) -> Result<PoolSnapshot> {
        let pool = IUniswapV3Pool::new(self.pool, &self.provider);

        let block = self.block_id();

        let slot0 = self.timed(pool.slot0().block(block).call(), "slot0").await?;
        let tick_spacing = self
            .timed(pool.tickSpacing().block(block).call(), "tickSpacing")
            .await?;
        let liquidity = self
            .timed(pool.liquidity().block(block).call(), "liquidity")
            .await?;
        let token0 = self.timed(pool.token0().block(block).call(), "token0").await?;
        let token1 = self.timed(pool.token1().block(block).call(), "token1").await?;

        // Decimals are immutable, no need to pin them
        let decimals0 = self
            .timed(IERC20::new(token0, &self.provider).decimals().call(), "token0 decimals")
            .await?;
        let decimals1 = self
            .timed(IERC20::new(token1, &self.provider).decimals().call(), "token1 decimals")
            .await?;

        let snapshot = PoolSnapshot::new(
            U256::from(slot0.sqrtPriceX96),
            slot0.tick.as_i32(),
            tick_spacing.as_i32(),
            liquidity,
            decimals0,
            decimals1,
        )
        .with_context(|| format!("Pool {} returned an invalid slot0", self.pool))?;

        debug!("Fetched snapshot for pool {}: {:?}", self.pool, snapshot);
        Ok(snapshot)
    }

    async fn timed<F, T, E>(&self, call: F, what: &str) -> Result<T>
    where
        F: IntoFuture<Output = std::result::Result<T, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        tokio::time::timeout(self.call_timeout, call)
            .await
            .with_context(|| format!("{} call timed out", what))?
            .with_context(|| format!("{} call failed", what))
    }

    /// One aggregate3 round trip. Every sub-call must come back.
    async fn aggregate(&self, calls: Vec<Call3>) -> Result<Vec<McResult>, ReserveError> {
        let expected = calls.len();
        let multicall = IMulticall3::new(MULTICALL3_ADDRESS, &self.provider);

        let results = multicall
            .aggregate3(calls)
            .block(self.block_id())
            .call()
            .await
            .map_err(|e| ReserveError::incomplete(format!("Multicall aggregate3 failed: {e}")))?;

        if results.len() != expected {
            return Err(ReserveError::incomplete(format!(
                "Multicall returned {} results for {} calls",
                results.len(),
                expected
            )));
        }

        Ok(results)
    }

    fn call3(&self, call_data: Vec<u8>) -> Call3 {
        Call3 {
            target: self.pool,
            allowFailure: true,
            callData: call_data.into(),
        }
    }
}

#[async_trait::async_trait]
impl TickDataSource for RpcTickSource {
    async fn fetch_bitmap_words(
        &self,
        words: &[i16],
    ) -> Result<FxHashMap<i16, U256>, ReserveError> {
        let calls = words
            .iter()
            .map(|&word| self.call3(IUniswapV3Pool::tickBitmapCall { wordPosition: word }.abi_encode()))
            .collect();

        let results = self.aggregate(calls).await?;

        let mut bitmap = FxHashMap::default();
        for (word, result) in words.iter().zip(results) {
            if !result.success {
                return Err(ReserveError::incomplete(format!("tickBitmap({word}) reverted")));
            }
            let bits = IUniswapV3Pool::tickBitmapCall::abi_decode_returns(&result.returnData)
                .map_err(|e| ReserveError::incomplete(format!("tickBitmap({word}) decode: {e}")))?;

            // Absent means all-zero
            if !bits.is_zero() {
                bitmap.insert(*word, bits);
            }
        }

        Ok(bitmap)
    }

    async fn fetch_tick_records(
        &self,
        ticks: &[i32],
    ) -> Result<FxHashMap<i32, i128>, ReserveError> {
        let mut calls = Vec::with_capacity(ticks.len());
        for &tick in ticks {
            let tick24 = I24::try_from(tick).map_err(|_| ReserveError::OutOfRangeTick(tick))?;
            calls.push(self.call3(IUniswapV3Pool::ticksCall { tick: tick24 }.abi_encode()));
        }

        let results = self.aggregate(calls).await?;

        let mut records = FxHashMap::default();
        for (tick, result) in ticks.iter().zip(results) {
            if !result.success {
                return Err(ReserveError::incomplete(format!("ticks({tick}) reverted")));
            }
            let info = IUniswapV3Pool::ticksCall::abi_decode_returns(&result.returnData)
                .map_err(|e| ReserveError::incomplete(format!("ticks({tick}) decode: {e}")))?;

            if info.initialized {
                records.insert(*tick, info.liquidityNet);
            }
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abis::IMulticall3::aggregate3Call;
    use alloy::primitives::aliases::{I56, U160};
    use alloy::primitives::{address, Bytes};
    use alloy::providers::transport::mock::Asserter;

    const POOL: Address = address!("0x88e6A0c2dDD26FEEb64F039a2c41296FcB3f5640");

    fn mock_source() -> (RpcTickSource, Asserter) {
        let asserter = Asserter::new();
        let provider = ProviderBuilder::new().connect_mocked_client(asserter.clone());
        let source = RpcTickSource::with_provider(
            DynProvider::new(provider),
            POOL,
            Duration::from_secs(5),
        );
        (source, asserter)
    }

    fn ok(return_data: Vec<u8>) -> McResult {
        McResult {
            success: true,
            returnData: return_data.into(),
        }
    }

    fn reverted() -> McResult {
        McResult {
            success: false,
            returnData: Bytes::new(),
        }
    }

    fn push_aggregate(asserter: &Asserter, results: Vec<McResult>) {
        let encoded = aggregate3Call::abi_encode_returns(&results);
        asserter.push_success(&Bytes::from(encoded));
    }

    fn bitmap_word(bits: U256) -> McResult {
        ok(IUniswapV3Pool::tickBitmapCall::abi_encode_returns(&bits))
    }

    fn tick_record(liquidity_net: i128, initialized: bool) -> McResult {
        let info = IUniswapV3Pool::ticksReturn {
            liquidityGross: liquidity_net.unsigned_abs(),
            liquidityNet: liquidity_net,
            feeGrowthOutside0X128: U256::ZERO,
            feeGrowthOutside1X128: U256::ZERO,
            tickCumulativeOutside: I56::ZERO,
            secondsPerLiquidityOutsideX128: U160::ZERO,
            secondsOutside: 0,
            initialized,
        };
        ok(IUniswapV3Pool::ticksCall::abi_encode_returns(&info))
    }

    #[tokio::test]
    async fn test_zero_words_left_out() {
        let (source, asserter) = mock_source();
        push_aggregate(
            &asserter,
            vec![
                bitmap_word(U256::ZERO),
                bitmap_word(U256::from(0b101u8)),
                bitmap_word(U256::ZERO),
            ],
        );

        let words = source.fetch_bitmap_words(&[-4, -3, -2]).await.unwrap();

        assert_eq!(words.len(), 1);
        assert_eq!(words[&-3], U256::from(0b101u8));
    }

    #[tokio::test]
    async fn test_uninitialized_ticks_left_out() {
        let (source, asserter) = mock_source();
        push_aggregate(
            &asserter,
            vec![
                tick_record(1_000, true),
                tick_record(0, false),
                tick_record(-1_000, true),
            ],
        );

        let records = source
            .fetch_tick_records(&[-121600, -121500, -121400])
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[&-121600], 1_000);
        assert_eq!(records[&-121400], -1_000);
        assert!(!records.contains_key(&-121500));
    }

    #[tokio::test]
    async fn test_reverted_sub_call_is_incomplete() {
        let (source, asserter) = mock_source();
        push_aggregate(&asserter, vec![bitmap_word(U256::ONE), reverted()]);

        let result = source.fetch_bitmap_words(&[0, 1]).await;
        assert!(matches!(result, Err(ReserveError::IncompleteFetch(_))));

        push_aggregate(&asserter, vec![reverted(), tick_record(5, true)]);

        let result = source.fetch_tick_records(&[-60, 60]).await;
        assert!(matches!(result, Err(ReserveError::IncompleteFetch(_))));
    }

    #[tokio::test]
    async fn test_short_result_set_is_incomplete() {
        let (source, asserter) = mock_source();
        push_aggregate(&asserter, vec![bitmap_word(U256::ONE)]);

        let result = source.fetch_bitmap_words(&[0, 1]).await;
        assert!(matches!(result, Err(ReserveError::IncompleteFetch(_))));

        push_aggregate(&asserter, vec![tick_record(5, true)]);

        let result = source.fetch_tick_records(&[-60, 0, 60]).await;
        assert!(matches!(result, Err(ReserveError::IncompleteFetch(_))));
    }

    #[tokio::test]
    async fn test_rpc_error_is_incomplete() {
        let (source, asserter) = mock_source();
        asserter.push_failure_msg("execution reverted");

        let result = source.fetch_bitmap_words(&[0]).await;
        assert!(matches!(result, Err(ReserveError::IncompleteFetch(_))));
    }

    #[tokio::test]
    async fn test_tick_outside_int24_rejected() {
        let (source, _asserter) = mock_source();

        let result = source.fetch_tick_records(&[1 << 24]).await;
        assert_eq!(result, Err(ReserveError::OutOfRangeTick(1 << 24)));
    }
}
