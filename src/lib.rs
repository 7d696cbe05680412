//! Netpulse - internet connectivity monitor
//!
//! This crate probes well-known platforms across social, international,
//! and domestic categories, classifies the overall connection state, and
//! tracks latency and uptime statistics. Local VPN/proxy endpoints are
//! auto-detected and checks route through them, with fallback to direct
//! connections when the proxy breaks.

pub mod checker;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod logging;
pub mod monitor;
pub mod proxy;
pub mod stats;
pub mod types;

pub use monitor::{Monitor, MonitorConfig};
pub use types::*;
