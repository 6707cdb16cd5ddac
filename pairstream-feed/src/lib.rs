//! Pairstream Feed Library
//!
//! Feed producers for the pairstream wire schema: time-accurate replay of
//! processed feature series, a geometric Brownian motion simulator, and
//! the websocket publisher both stream through.

pub mod clock;
pub mod control;
pub mod error;
pub mod replay;
pub mod simulator;
pub mod transport;

// Re-export main types for easy access
pub use clock::{Clock, SystemClock, VirtualClock};
pub use control::{ShutdownController, ShutdownListener};
pub use error::{FeedError, FeedResult};
pub use replay::{ReplayConfig, ReplayReport, ReplayScheduler, ReplayState};
pub use simulator::{
    GeometricBrownianMotion, SimulatorConfig, SimulatorFeed, SimulatorReport,
};
pub use transport::{
    publish_json, FeedSink, PublisherConfig, PublisherMetrics, WsFeedPublisher,
};
