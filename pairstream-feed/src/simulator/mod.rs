//! Geometric Brownian motion price simulator

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use pairstream_core::wire::BatchUpdateMessage;

use crate::clock::{Clock, SystemClock};
use crate::control::ShutdownListener;
use crate::error::FeedResult;
use crate::transport::{publish_json, FeedSink};

/// Seconds in the 365-day year used to annualize the step interval
pub const SECONDS_PER_YEAR: f64 = 365.0 * 24.0 * 3600.0;

/// Simulator configuration
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    pub symbol: String,
    pub exchange: String,
    /// Price the walk starts from
    pub initial_price: f64,
    /// Full bid/ask spread around the simulated price
    pub spread: f64,
    /// Annualized drift
    pub mu: f64,
    /// Annualized volatility
    pub sigma: f64,
    /// Wall-clock pause between ticks
    pub interval: Duration,
    /// Fixed RNG seed; `None` seeds from the OS
    pub seed: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            symbol: "AAPL".to_string(),
            exchange: "NASDAQ".to_string(),
            initial_price: 150.0,
            spread: 0.02,
            mu: 0.1,    // 10% annual drift
            sigma: 0.2, // 20% annual volatility
            interval: Duration::from_millis(100),
            seed: None,
        }
    }
}

/// Discrete geometric Brownian motion price process.
///
/// Each step multiplies the price by `exp((mu - sigma^2/2) dt + sigma
/// sqrt(dt) Z)`, so the price stays strictly positive for any parameters.
#[derive(Debug, Clone)]
pub struct GeometricBrownianMotion {
    price: f64,
    mu: f64,
    sigma: f64,
    dt: f64,
    rng: StdRng,
}

impl GeometricBrownianMotion {
    pub fn new(initial_price: f64, mu: f64, sigma: f64, dt: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            price: initial_price,
            mu,
            sigma,
            dt,
            rng,
        }
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    /// Advance one step and return the new price
    pub fn step(&mut self) -> f64 {
        let z: f64 = self.rng.sample(StandardNormal);
        let drift = (self.mu - 0.5 * self.sigma * self.sigma) * self.dt;
        let diffusion = self.sigma * self.dt.sqrt() * z;
        self.price *= (drift + diffusion).exp();
        self.price
    }
}

/// Interval as a fraction of the 365-day year
pub fn annualized_dt(interval: Duration) -> f64 {
    interval.as_secs_f64() / SECONDS_PER_YEAR
}

/// Summary of a simulator run
#[derive(Debug, Clone, Default)]
pub struct SimulatorReport {
    pub ticks_emitted: u64,
    pub last_price: f64,
}

/// Publishes one simulated batch update per interval until shutdown
pub struct SimulatorFeed {
    config: SimulatorConfig,
    process: GeometricBrownianMotion,
    clock: Arc<dyn Clock>,
}

impl SimulatorFeed {
    pub fn new(config: SimulatorConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Simulator on an explicit clock, used by tests
    pub fn with_clock(config: SimulatorConfig, clock: Arc<dyn Clock>) -> Self {
        let process = GeometricBrownianMotion::new(
            config.initial_price,
            config.mu,
            config.sigma,
            annualized_dt(config.interval),
            config.seed,
        );
        Self {
            config,
            process,
            clock,
        }
    }

    /// Run until shutdown, pausing one interval before each tick
    pub async fn run(
        &mut self,
        sink: &dyn FeedSink,
        shutdown: &mut ShutdownListener,
    ) -> FeedResult<SimulatorReport> {
        info!(
            "📈 Simulating {} on {}: start {} mu {} sigma {} every {:?}",
            self.config.symbol,
            self.config.exchange,
            self.config.initial_price,
            self.config.mu,
            self.config.sigma,
            self.config.interval
        );

        let clock = Arc::clone(&self.clock);
        let interval = self.config.interval;
        let mut report = SimulatorReport {
            last_price: self.process.price(),
            ..SimulatorReport::default()
        };

        loop {
            tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                _ = clock.sleep(interval) => {}
            }

            let price = self.process.step();
            let message = BatchUpdateMessage::single(
                self.config.symbol.clone(),
                self.config.exchange.clone(),
                price,
                self.config.spread,
                Utc::now(),
            );
            publish_json(sink, &message).await?;
            report.ticks_emitted += 1;
            report.last_price = price;
        }

        info!(
            "📉 Simulator for {} stopped after {} ticks, last price {:.2}",
            self.config.symbol, report.ticks_emitted, report.last_price
        );
        Ok(report)
    }
}
