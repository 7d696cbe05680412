use chrono::Utc;
use reqwest::Client;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::{lookup_host, TcpStream};
use tokio::sync::Semaphore;
use tokio::time::{timeout, Instant};
use tracing::{debug, warn};

use super::dns_cache::DnsCache;
use crate::types::{CheckResult, FailureKind, Platform, PlatformStatus};

/// HTTP latency above this is reported as slow rather than online.
const SLOW_THRESHOLD_MS: f64 = 500.0;
const DNS_CACHE_TTL: Duration = Duration::from_secs(300);
/// Body bytes read to confirm real connectivity past the headers.
const HTTP_BODY_SAMPLE: usize = 1024;
const TLS_PORT: u16 = 443;

/// Three-layer probe (DNS, TCP, HTTP) for a single platform.
///
/// The layers run concurrently, bounded by a semaphore shared across all
/// platforms of a check cycle. HTTP is the authoritative status signal;
/// DNS and TCP are diagnostic. When a proxy is active they still run
/// locally so interference patterns stay visible, while the HTTP request
/// goes through the proxied client.
pub struct PlatformChecker {
    timeout: Duration,
    semaphore: Arc<Semaphore>,
    proxy: Option<String>,
    dns_cache: Mutex<DnsCache>,
}

impl PlatformChecker {
    pub fn new(timeout: Duration, semaphore: Arc<Semaphore>) -> Self {
        Self {
            timeout,
            semaphore,
            proxy: None,
            dns_cache: Mutex::new(DnsCache::new(DNS_CACHE_TTL)),
        }
    }

    /// Record the proxy the HTTP client routes through. Used for logging
    /// and for classifying connect errors.
    pub fn update_proxy(&mut self, proxy: Option<String>) {
        if self.proxy != proxy {
            debug!("checker proxy updated: {:?} -> {:?}", self.proxy, proxy);
            self.proxy = proxy;
        }
    }

    pub fn clear_dns_cache(&self) {
        if let Ok(mut cache) = self.dns_cache.lock() {
            cache.clear();
        }
    }

    /// Run all three layers concurrently and aggregate the outcome.
    pub async fn check(&self, platform: &Platform, client: &Client) -> CheckResult {
        let permit = self.semaphore.acquire().await;
        let host = platform.host();

        let (dns_success, tcp_success, http) = tokio::join!(
            self.check_dns(&host),
            self.check_tcp(&host),
            self.check_http(platform, client),
        );
        drop(permit);

        if !dns_success {
            debug!("DNS failed for {}", platform.name);
        }
        if !tcp_success {
            debug!("TCP failed for {}", platform.name);
        }

        let (http_success, ping_ms, failure) = match http {
            Ok(latency) => {
                let ping_ms = latency.as_secs_f64() * 1000.0;
                debug!(
                    "HTTP success for {}: {ping_ms:.0}ms{}",
                    platform.name,
                    if self.proxy.is_some() { " [via proxy]" } else { "" }
                );
                (true, ping_ms, None)
            }
            Err(kind) => {
                if kind == FailureKind::ProxyConnect {
                    warn!("proxy connection error for {}", platform.url);
                } else {
                    debug!("HTTP failed for {}: {kind}", platform.name);
                }
                (false, 0.0, Some(kind))
            }
        };

        let status = if http_success {
            if ping_ms < SLOW_THRESHOLD_MS {
                PlatformStatus::Online
            } else {
                PlatformStatus::Slow
            }
        } else {
            PlatformStatus::Blocked
        };

        CheckResult {
            platform: platform.clone(),
            status,
            ping_ms,
            timestamp: Utc::now(),
            dns_success,
            tcp_success,
            http_success,
            failure,
        }
    }

    async fn check_dns(&self, host: &str) -> bool {
        // The lock is never held across an await.
        if let Ok(cache) = self.dns_cache.lock() {
            if let Some(cached) = cache.get(host) {
                return cached;
            }
        }

        let resolved = match timeout(self.timeout, lookup_host((host, TLS_PORT))).await {
            Ok(Ok(mut addrs)) => addrs.next().is_some(),
            _ => false,
        };

        if let Ok(mut cache) = self.dns_cache.lock() {
            cache.insert(host, resolved);
        }
        resolved
    }

    async fn check_tcp(&self, host: &str) -> bool {
        matches!(
            timeout(self.timeout, TcpStream::connect((host, TLS_PORT))).await,
            Ok(Ok(_))
        )
    }

    async fn check_http(
        &self,
        platform: &Platform,
        client: &Client,
    ) -> Result<Duration, FailureKind> {
        let start = Instant::now();

        let mut response = match client.get(platform.url.as_str()).send().await {
            Ok(response) => response,
            Err(err) => return Err(self.classify_error(&err)),
        };
        let status = response.status();

        let mut read = 0usize;
        while read < HTTP_BODY_SAMPLE {
            match response.chunk().await {
                Ok(Some(bytes)) => read += bytes.len(),
                Ok(None) => break,
                Err(err) => return Err(self.classify_error(&err)),
            }
        }

        if status.is_success() || status.is_redirection() {
            Ok(start.elapsed())
        } else {
            Err(FailureKind::HttpFailed)
        }
    }

    fn classify_error(&self, err: &reqwest::Error) -> FailureKind {
        if err.is_timeout() {
            FailureKind::Timeout
        } else if err.is_connect() && self.proxy.is_some() {
            // With a proxy configured, a connect failure means the proxy
            // itself is unreachable, not the target platform.
            FailureKind::ProxyConnect
        } else {
            FailureKind::Request
        }
    }
}
