use std::time::Duration;

use alloy::primitives::Address;
use anyhow::Context;
use futures::future::join_all;
use jemallocator::Jemalloc;
use log::{error, info, LevelFilter};
use simple_logger::SimpleLogger;
use tokio_util::sync::CancellationToken;

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use ticksweep::{ReserveEstimator, ReserveReport, RpcTickSource, Settings};

#[tokio::main()]
async fn main() -> anyhow::Result<()> {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .init()
        .unwrap();

    // Optional config path, defaults to ./config.yaml
    let settings = match std::env::args().nth(1) {
        Some(path) => Settings::from_path(&path)
            .with_context(|| format!("Failed to load {}. Please ensure it exists and is valid", path))?,
        None => Settings::new()
            .context("Failed to load config.yaml. Please ensure it exists and is valid")?,
    };

    if settings.pools.is_empty() {
        info!("No pools configured, nothing to do");
        return Ok(());
    }

    let call_timeout = Duration::from_secs(settings.rpc.call_timeout_secs);
    let cancellation_token = CancellationToken::new();

    let mut handles = Vec::with_capacity(settings.pools.len());
    for pool in &settings.pools {
        let address: Address = pool
            .address
            .parse()
            .with_context(|| format!("Invalid address for pool {}", pool.name))?;

        let mut source = RpcTickSource::new(&settings.rpc.url, address, call_timeout)?;
        if let Some(block) = settings.rpc.block_number {
            source = source.at_block(block);
        }

        let estimator = ReserveEstimator::new(
            pool.name.clone(),
            address,
            source,
            settings.scan.clone(),
            call_timeout,
        );

        let name = pool.name.clone();
        let token = cancellation_token.child_token();
        handles.push(tokio::spawn(async move {
            match estimator.run(token).await {
                Ok(report) => log_report(&name, &report),
                Err(e) => error!("Pool {} failed: {:#}", name, e),
            }
        }));
    }

    info!("Estimating {} pools. Press Ctrl+C to stop.", handles.len());

    let shutdown_token = cancellation_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal (Ctrl+C), cancelling runs...");
            shutdown_token.cancel();
        }
    });

    for result in join_all(handles).await {
        if let Err(e) = result {
            error!("Estimation task panicked: {}", e);
        }
    }

    info!("Done");
    Ok(())
}

fn log_report(name: &str, report: &ReserveReport) {
    let (decimals0, decimals1) = report.snapshot.decimals();
    let (reserve0, reserve1) = report.reserves.adjusted(decimals0, decimals1);
    let (active0, active1) = report.in_range.adjusted(decimals0, decimals1);

    info!(
        "{}: reserve0={:.6} reserve1={:.6} (in range {:.6} / {:.6}), price={:?}, tick={}, {} active ticks",
        name,
        reserve0,
        reserve1,
        active0,
        active1,
        report.snapshot.price(),
        report.snapshot.tick(),
        report.active_ticks
    );
}
