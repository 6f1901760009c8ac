use config::{Config, ConfigError, File};
use serde::Deserialize;

/// JSON-RPC endpoint configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct RpcSettings {
    pub url: String,
    /// Timeout for a single RPC or multicall round trip
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
    /// Pin every read to this block, latest when unset
    #[serde(default)]
    pub block_number: Option<u64>,
}

fn default_call_timeout_secs() -> u64 {
    30
}

/// Batching and concurrency for the bitmap scan and tick fetch.
///
/// Batch sizes trade RPC round trips against response size; they do not
/// change the computed reserves.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ScanSettings {
    #[serde(default = "default_bitmap_batch_size")]
    pub bitmap_batch_size: usize,
    #[serde(default = "default_tick_batch_size")]
    pub tick_batch_size: usize,
    /// Batches in flight at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            bitmap_batch_size: default_bitmap_batch_size(),
            tick_batch_size: default_tick_batch_size(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_bitmap_batch_size() -> usize {
    5_000
}

fn default_tick_batch_size() -> usize {
    5_000
}

fn default_concurrency() -> usize {
    4
}

/// A pool to estimate.
#[derive(Debug, Deserialize, Clone)]
pub struct PoolSettings {
    pub name: String,
    pub address: String,
}

/// Root application configuration.
///
/// Loaded from `config.yaml` at startup unless another path is given.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub rpc: RpcSettings,
    #[serde(default)]
    pub scan: ScanSettings,
    #[serde(default)]
    pub pools: Vec<PoolSettings>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_path("config")
    }

    pub fn from_path(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path))
            .build()?;

        let settings: Settings = s.try_deserialize()?;

        Ok(settings)
    }
}
