pub mod abis;
pub mod config;
pub mod error;
pub mod reserves;
pub mod utils;
pub mod worker;

#[cfg(test)]
pub(crate) mod test_utils;

pub use crate::config::Settings;
pub use error::ReserveError;
pub use reserves::{compute_reserves, ActiveTickScanner, PoolSnapshot, ReserveResult};
pub use worker::{ReserveEstimator, ReserveReport, RpcTickSource};
