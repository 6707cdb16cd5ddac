//! Pairstream Application
//!
//! One binary, three modes selected by `PAIRSTREAM_MODE`: `process`
//! derives pair features from raw OHLCV CSVs, `replay` streams a
//! processed series over websocket, and `simulate` publishes a synthetic
//! random walk.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use pairstream_core::features::{FeatureConfig, FeatureEngine};
use pairstream_core::series::{load_bars_csv, ProcessedSeries};
use pairstream_feed::control::ShutdownController;
use pairstream_feed::replay::{ReplayConfig, ReplayScheduler};
use pairstream_feed::simulator::{SimulatorConfig, SimulatorFeed};
use pairstream_feed::transport::{PublisherConfig, WsFeedPublisher};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("🚀 Starting Pairstream");

    let mode = env_str("PAIRSTREAM_MODE", "replay");
    match mode.as_str() {
        "process" => run_process().await,
        "replay" => run_replay().await,
        "simulate" => run_simulate().await,
        other => bail!(
            "Unknown PAIRSTREAM_MODE '{}' (expected process, replay or simulate)",
            other
        ),
    }
}

/// Derive pair features from two raw OHLCV files and persist them
async fn run_process() -> Result<()> {
    let symbol_a = env_str("PAIRSTREAM_SYMBOL_A", "AAPL");
    let symbol_b = env_str("PAIRSTREAM_SYMBOL_B", "MSFT");
    let data_dir = PathBuf::from(env_str("PAIRSTREAM_DATA_DIR", "data"));
    let window = env_parse("PAIRSTREAM_WINDOW", 60usize);

    let series_a = load_bars_csv(
        data_dir.join("raw").join(format!("{}.csv", symbol_a)),
        &symbol_a,
    )
    .with_context(|| format!("Failed to load raw bars for {}", symbol_a))?;
    let series_b = load_bars_csv(
        data_dir.join("raw").join(format!("{}.csv", symbol_b)),
        &symbol_b,
    )
    .with_context(|| format!("Failed to load raw bars for {}", symbol_b))?;

    let engine = FeatureEngine::new(FeatureConfig { window });
    let records = engine.compute(&series_a, &series_b)?;
    let processed = ProcessedSeries::from_feature_records(&symbol_a, &symbol_b, &records);

    let out_dir = data_dir.join("processed");
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    let out_path = out_dir.join(format!("pair_{}_{}.csv", symbol_a, symbol_b));
    processed.write_csv(&out_path)?;

    info!(
        "💾 Saved {} feature rows to {}",
        processed.rows.len(),
        out_path.display()
    );
    if let Some(last) = processed.rows.last() {
        info!("📊 Last z-score: {:.4}", last.z_score);
    }
    Ok(())
}

/// Stream a processed series over websocket at a time-compressed rate
async fn run_replay() -> Result<()> {
    let symbol_a = env_str("PAIRSTREAM_SYMBOL_A", "AAPL");
    let symbol_b = env_str("PAIRSTREAM_SYMBOL_B", "MSFT");
    let data_dir = PathBuf::from(env_str("PAIRSTREAM_DATA_DIR", "data"));
    let default_path = data_dir
        .join("processed")
        .join(format!("pair_{}_{}.csv", symbol_a, symbol_b));
    let path = PathBuf::from(env_str(
        "PAIRSTREAM_PROCESSED",
        &default_path.display().to_string(),
    ));

    let series = ProcessedSeries::load_csv(&path)
        .with_context(|| format!("Failed to load processed series from {}", path.display()))?;

    let publisher = WsFeedPublisher::bind(PublisherConfig {
        bind_addr: env_str("PAIRSTREAM_BIND", "127.0.0.1:5562"),
        ..PublisherConfig::default()
    })
    .await?;

    let warmup_secs = env_parse("PAIRSTREAM_WARMUP_SECS", 3.0f64);
    let warmup = duration_from_secs(warmup_secs, Duration::ZERO);
    let mut scheduler = ReplayScheduler::new(ReplayConfig {
        speed: env_parse("PAIRSTREAM_SPEED", 100.0f64),
        warmup,
        ..ReplayConfig::default()
    })?;

    let controller = ShutdownController::new();
    let mut shutdown = controller.listener();
    spawn_ctrl_c_handler(controller);

    let report = scheduler.run(&series, &publisher, &mut shutdown).await?;
    info!(
        "Replay finished: {} records, {} messages in {:?}",
        report.records_replayed, report.messages_published, report.elapsed
    );

    publisher.shutdown().await;
    Ok(())
}

/// Publish a simulated random walk over websocket until Ctrl+C
async fn run_simulate() -> Result<()> {
    let publisher = WsFeedPublisher::bind(PublisherConfig {
        bind_addr: env_str("PAIRSTREAM_BIND", "127.0.0.1:5558"),
        ..PublisherConfig::default()
    })
    .await?;

    let interval_secs = env_parse("PAIRSTREAM_INTERVAL_SECS", 0.1f64);
    let interval = duration_from_secs(interval_secs.max(0.001), Duration::from_millis(100));
    let seed = std::env::var("PAIRSTREAM_SEED")
        .ok()
        .and_then(|raw| raw.parse().ok());
    let mut feed = SimulatorFeed::new(SimulatorConfig {
        symbol: env_str("PAIRSTREAM_SYMBOL", "AAPL"),
        exchange: env_str("PAIRSTREAM_EXCHANGE", "NASDAQ"),
        initial_price: env_parse("PAIRSTREAM_INITIAL_PRICE", 150.0f64),
        spread: env_parse("PAIRSTREAM_SPREAD", 0.02f64),
        mu: env_parse("PAIRSTREAM_MU", 0.1f64),
        sigma: env_parse("PAIRSTREAM_SIGMA", 0.2f64),
        interval,
        seed,
    });

    let controller = ShutdownController::new();
    let mut shutdown = controller.listener();
    spawn_ctrl_c_handler(controller);

    info!("📡 Press Ctrl+C to stop");
    let report = feed.run(&publisher, &mut shutdown).await?;
    info!(
        "Simulation finished: {} ticks, last price {:.2}",
        report.ticks_emitted, report.last_price
    );

    publisher.shutdown().await;
    Ok(())
}

/// Translate Ctrl+C into the cooperative shutdown signal
fn spawn_ctrl_c_handler(controller: ShutdownController) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("🛑 Shutdown signal received...");
                controller.shutdown();
            }
            Err(err) => warn!("Failed to listen for shutdown signal: {}", err),
        }
    });
}

fn env_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: FromStr + Copy>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

/// Positive finite seconds as a `Duration`, saturating at `Duration::MAX`;
/// anything else gets the fallback
fn duration_from_secs(secs: f64, fallback: Duration) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    } else {
        fallback
    }
}
