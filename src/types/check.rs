use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::platform::{Platform, PlatformStatus};

/// Why a platform probe came back blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// HTTP responded with an error status.
    HttpFailed,
    /// The request did not complete within the probe timeout.
    Timeout,
    /// The configured proxy itself was unreachable.
    ProxyConnect,
    /// Any other transport-level request error.
    Request,
    /// The platform was skipped because its circuit breaker is open.
    CircuitOpen,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::HttpFailed => "http_failed",
            FailureKind::Timeout => "timeout",
            FailureKind::ProxyConnect => "proxy_connect",
            FailureKind::Request => "request_error",
            FailureKind::CircuitOpen => "circuit_open",
        };
        write!(f, "{label}")
    }
}

/// Outcome of one three-layer check for a single platform.
///
/// HTTP is the authoritative signal for the status; the DNS and TCP
/// outcomes are diagnostic and feed interference detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub platform: Platform,
    pub status: PlatformStatus,
    /// Measured HTTP latency, 0 when the request failed.
    pub ping_ms: f64,
    pub timestamp: DateTime<Utc>,
    pub dns_success: bool,
    pub tcp_success: bool,
    pub http_success: bool,
    pub failure: Option<FailureKind>,
}

impl CheckResult {
    pub fn is_accessible(&self) -> bool {
        self.status.is_accessible()
    }

    /// Synthetic result for a platform that was not actually probed.
    pub fn blocked(platform: Platform, failure: FailureKind) -> Self {
        Self {
            platform,
            status: PlatformStatus::Blocked,
            ping_ms: 0.0,
            timestamp: Utc::now(),
            dns_success: false,
            tcp_success: false,
            http_success: false,
            failure: Some(failure),
        }
    }
}
