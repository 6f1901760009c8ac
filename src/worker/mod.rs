pub mod estimator;
pub mod rpc_source;

pub use estimator::{ReserveEstimator, ReserveReport};
pub use rpc_source::RpcTickSource;
