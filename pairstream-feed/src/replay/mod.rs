//! Time-accurate replay of processed feature series

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use pairstream_core::series::ProcessedSeries;
use pairstream_core::wire::{FeatureMessage, Instrument, TickMessage};

use crate::clock::{Clock, SystemClock};
use crate::control::ShutdownListener;
use crate::error::{FeedError, FeedResult};
use crate::transport::{publish_json, FeedSink};

/// Replay configuration
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Historical-to-wall-clock time compression factor
    pub speed: f64,
    /// Pause before the first row so subscribers can attach
    pub warmup: Duration,
    /// Synthetic half-spread applied around each close
    pub half_spread: f64,
    /// Exchange stamped on every emitted tick
    pub exchange: String,
    /// Rows between progress log lines
    pub progress_every: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            speed: 100.0, // 100x wall clock
            warmup: Duration::from_secs(3),
            half_spread: 0.01,
            exchange: "NASDAQ".to_string(),
            progress_every: 500,
        }
    }
}

/// Lifecycle of a replay run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayState {
    Idle,
    WarmingUp,
    Streaming,
    Done,
}

/// Summary of a finished or cancelled run
#[derive(Debug, Clone, Default)]
pub struct ReplayReport {
    pub records_replayed: usize,
    pub messages_published: usize,
    pub elapsed: Duration,
}

/// Replays a processed series into a sink at a configurable multiple of
/// historical time.
///
/// Gaps between consecutive row timestamps are divided by the speed
/// factor and slept on; the row group itself is published back to back.
pub struct ReplayScheduler {
    config: ReplayConfig,
    clock: Arc<dyn Clock>,
    state: ReplayState,
}

impl ReplayScheduler {
    pub fn new(config: ReplayConfig) -> FeedResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Scheduler on an explicit clock, used by tests to control pacing
    pub fn with_clock(config: ReplayConfig, clock: Arc<dyn Clock>) -> FeedResult<Self> {
        if !config.speed.is_finite() || config.speed <= 0.0 {
            return Err(FeedError::InvalidSpeed {
                speed: config.speed,
            });
        }
        Ok(Self {
            config,
            clock,
            state: ReplayState::Idle,
        })
    }

    pub fn state(&self) -> ReplayState {
        self.state
    }

    /// Replay every row of `series` into `sink`.
    ///
    /// Each row publishes one tick per instrument column followed by one
    /// feature message. Cancellation takes effect during the warm-up and
    /// inter-row pauses, never inside a row's message group.
    pub async fn run(
        &mut self,
        series: &ProcessedSeries,
        sink: &dyn FeedSink,
        shutdown: &mut ShutdownListener,
    ) -> FeedResult<ReplayReport> {
        let started = self.clock.now();
        let pair = series.pair_symbol();
        let total = series.rows.len();

        if total == 0 {
            self.state = ReplayState::Done;
            info!("⏭️ Nothing to replay for {}", pair);
            return Err(FeedError::NoData);
        }

        let clock = Arc::clone(&self.clock);
        let instruments: Vec<Instrument> = series
            .symbols
            .iter()
            .map(|symbol| Instrument::stock(symbol.clone(), self.config.exchange.clone()))
            .collect();

        self.state = ReplayState::WarmingUp;
        info!(
            "⏳ Replaying {} records of {} at {}x after {:?} warm-up",
            total, pair, self.config.speed, self.config.warmup
        );

        let mut report = ReplayReport::default();
        tokio::select! {
            biased;
            _ = shutdown.wait() => {
                self.state = ReplayState::Done;
                info!("🛑 Replay of {} cancelled during warm-up", pair);
                report.elapsed = self.clock.now() - started;
                return Ok(report);
            }
            _ = clock.sleep(self.config.warmup) => {}
        }

        self.state = ReplayState::Streaming;
        let progress_every = self.config.progress_every.max(1);
        let mut previous: Option<DateTime<Utc>> = None;

        for row in &series.rows {
            if let Some(previous) = previous {
                let gap = scaled_gap(
                    (row.timestamp - previous).to_std().unwrap_or(Duration::ZERO),
                    self.config.speed,
                );
                tokio::select! {
                    biased;
                    _ = shutdown.wait() => break,
                    _ = clock.sleep(gap) => {}
                }
            }

            for (instrument, &close) in instruments.iter().zip(&row.closes) {
                let tick = TickMessage::with_half_spread(
                    instrument.clone(),
                    close,
                    self.config.half_spread,
                    row.timestamp,
                );
                publish_json(sink, &tick).await?;
                report.messages_published += 1;
            }
            let feature = FeatureMessage::new(pair.clone(), row.z_score, row.timestamp);
            publish_json(sink, &feature).await?;
            report.messages_published += 1;
            report.records_replayed += 1;

            if report.records_replayed % progress_every == 0 {
                info!(
                    "▶️ {} {}/{} at {} (z {:.4})",
                    pair, report.records_replayed, total, row.timestamp, row.z_score
                );
            }

            previous = Some(row.timestamp);
        }

        self.state = ReplayState::Done;
        report.elapsed = self.clock.now() - started;
        if report.records_replayed == total {
            info!(
                "✅ Replay of {} complete: {} records, {} messages in {:?}",
                pair, report.records_replayed, report.messages_published, report.elapsed
            );
        } else {
            info!(
                "🛑 Replay of {} stopped early: {} of {} records, {} messages in {:?}",
                pair, report.records_replayed, total, report.messages_published, report.elapsed
            );
        }
        Ok(report)
    }
}

/// Historical gap divided by the speed factor, saturating at
/// `Duration::MAX` when a very small speed overflows the division
fn scaled_gap(gap: Duration, speed: f64) -> Duration {
    Duration::try_from_secs_f64(gap.as_secs_f64() / speed).unwrap_or(Duration::MAX)
}
