pub mod breaker;
pub mod engine;
pub mod error;
pub mod latency;

pub use breaker::CircuitBreaker;
pub use engine::{Monitor, MonitorConfig, DEFAULT_PLATFORMS};
pub use error::*;
pub use latency::LatencyWindow;
