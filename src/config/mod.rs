mod config;

pub use self::config::{PoolSettings, RpcSettings, ScanSettings, Settings};
