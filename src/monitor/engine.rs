use futures::future::join_all;
use once_cell::sync::Lazy;
use reqwest::{redirect, Client, Proxy};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Semaphore;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

use super::breaker::CircuitBreaker;
use super::latency::LatencyWindow;
use super::{MonitorError, Result};
use crate::checker::PlatformChecker;
use crate::classifier::ConnectionClassifier;
use crate::proxy;
use crate::types::{
    CheckResult, FailureKind, InternetStatus, MonitorReport, Platform, PlatformCategory, Quality,
};
use chrono::Utc;

const FAILURE_THRESHOLD: u32 = 3;
/// Short enough that blocked platforms are re-probed quickly after a VPN
/// toggle.
const BREAKER_COOLDOWN: Duration = Duration::from_secs(45);
const LATENCY_WINDOW: usize = 20;
const SMOOTHING_WINDOW: usize = 3;
/// Fast enough to catch a VPN being switched on or off.
const PROXY_RESCAN_INTERVAL: Duration = Duration::from_secs(5);
const QUICK_PING_ADDR: (&str, u16) = ("1.1.1.1", 53);
const QUICK_PING_TIMEOUT: Duration = Duration::from_secs(2);
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Default platform roster across the three probe categories.
pub static DEFAULT_PLATFORMS: Lazy<Vec<Platform>> = Lazy::new(|| {
    vec![
        Platform::new(
            "Instagram",
            "📷",
            "https://www.instagram.com",
            PlatformCategory::Social,
        ),
        Platform::new(
            "Telegram",
            "✈️",
            "https://web.telegram.org",
            PlatformCategory::Social,
        ),
        Platform::new("X", "🐦", "https://x.com", PlatformCategory::Social),
        Platform::new(
            "Google",
            "🌍",
            "https://www.google.com/generate_204",
            PlatformCategory::International,
        ),
        Platform::new(
            "Cloudflare",
            "☁️",
            "https://cloudflare.com/cdn-cgi/trace",
            PlatformCategory::International,
        ),
        Platform::new(
            "Microsoft",
            "Ⓜ️",
            "https://www.microsoft.com",
            PlatformCategory::International,
        ),
        Platform::new("IRNA", "📰", "https://www.irna.ir", PlatformCategory::Domestic),
        Platform::new("ISNA", "📰", "https://www.isna.ir", PlatformCategory::Domestic),
        Platform::new(
            "Digikala",
            "🛒",
            "https://www.digikala.com",
            PlatformCategory::Domestic,
        ),
    ]
});

/// Runtime configuration for a [`Monitor`].
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub timeout: Duration,
    pub max_concurrent: usize,
    /// Fixed proxy URL; set, it disables auto-detection.
    pub proxy_override: Option<String>,
    pub detect_proxy: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            max_concurrent: 5,
            proxy_override: None,
            detect_proxy: true,
        }
    }
}

/// Monitors platform accessibility with instant state-change detection.
///
/// One instance is meant to live for the whole session: the classifier's
/// smoothing history, the latency windows, and the circuit-breaker state
/// carry over between cycles, which is what makes fast VPN-toggle
/// detection work.
pub struct Monitor {
    config: MonitorConfig,
    platforms: Vec<Platform>,
    checker: PlatformChecker,
    breaker: CircuitBreaker,
    latency: LatencyWindow,
    classifier: ConnectionClassifier,
    client: Option<Client>,
    current_proxy: Option<String>,
    last_proxy_scan: Option<Instant>,
    last_known_status: Option<InternetStatus>,
    fast_recheck: bool,
    last_check_duration: Duration,
}

impl Monitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self::with_platforms(config, DEFAULT_PLATFORMS.clone())
    }

    pub fn with_platforms(config: MonitorConfig, platforms: Vec<Platform>) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent));
        let checker = PlatformChecker::new(config.timeout, semaphore);

        Self {
            config,
            platforms,
            checker,
            breaker: CircuitBreaker::new(FAILURE_THRESHOLD, BREAKER_COOLDOWN),
            latency: LatencyWindow::new(LATENCY_WINDOW),
            classifier: ConnectionClassifier::new(SMOOTHING_WINDOW),
            client: None,
            current_proxy: None,
            last_proxy_scan: None,
            last_known_status: None,
            fast_recheck: false,
            last_check_duration: Duration::ZERO,
        }
    }

    /// Full platform check with proxy auto-detection and fallback.
    ///
    /// Flow: direct connectivity ping, proxy refresh, concurrent platform
    /// probes, direct retry when the proxy broke every check, then
    /// aggregation into a report.
    pub async fn check_all(&mut self) -> Result<MonitorReport> {
        let started = Instant::now();

        if !self.quick_ping().await {
            info!("direct ping failed, no internet access");
            let report = MonitorReport::offline();
            self.note_status(report.internet_status);
            return Ok(report);
        }

        self.refresh_proxy().await?;

        let mut report = self.run_checks().await?;

        if self.current_proxy.is_some() && report.internet_status == InternetStatus::Offline {
            self.force_clear_proxy();
            report = self.run_checks().await?;
        }

        self.last_check_duration = started.elapsed();
        info!(
            "check_all {:.2}s -> {} | {}{}",
            self.last_check_duration.as_secs_f64(),
            report.internet_status,
            report.quality,
            match &self.current_proxy {
                Some(proxy) => format!(" [via {proxy}]"),
                None => " [direct]".to_string(),
            }
        );

        self.note_status(report.internet_status);
        Ok(report)
    }

    /// Probe a single platform by name, refreshing the proxy first.
    /// Returns None for an unknown platform name.
    pub async fn check_platform(&mut self, name: &str) -> Result<Option<CheckResult>> {
        let Some(platform) = self
            .platforms
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .cloned()
        else {
            return Ok(None);
        };

        self.refresh_proxy().await?;
        let client = self.client()?;
        Ok(Some(self.checker.check(&platform, &client).await))
    }

    /// Direct TCP dial to a public resolver, bypassing any proxy.
    pub async fn quick_ping(&self) -> bool {
        matches!(
            timeout(QUICK_PING_TIMEOUT, TcpStream::connect(QUICK_PING_ADDR)).await,
            Ok(Ok(_))
        )
    }

    /// Consume the fast-recheck flag raised by a significant state change.
    /// The run loop uses it to schedule a confirmation check early.
    pub fn take_fast_recheck(&mut self) -> bool {
        std::mem::take(&mut self.fast_recheck)
    }

    pub fn current_proxy(&self) -> Option<&str> {
        self.current_proxy.as_deref()
    }

    pub fn platforms(&self) -> &[Platform] {
        &self.platforms
    }

    pub fn last_check_duration(&self) -> Duration {
        self.last_check_duration
    }

    pub fn latency_averages(&self) -> HashMap<String, Option<f64>> {
        self.latency.averages()
    }

    async fn refresh_proxy(&mut self) -> Result<()> {
        if let Some(manual) = self.config.proxy_override.clone() {
            if self.current_proxy.as_deref() != Some(manual.as_str()) {
                self.apply_proxy(Some(manual))?;
            }
            return Ok(());
        }

        if !self.config.detect_proxy {
            if self.current_proxy.is_some() {
                self.apply_proxy(None)?;
            }
            return Ok(());
        }

        if self
            .last_proxy_scan
            .is_some_and(|at| at.elapsed() < PROXY_RESCAN_INTERVAL)
        {
            return Ok(());
        }
        self.last_proxy_scan = Some(Instant::now());

        let detected = proxy::detect_proxy().await;
        if detected != self.current_proxy {
            self.apply_proxy(detected)?;
        }

        Ok(())
    }

    /// Switch the active proxy, resetting everything that assumed the old
    /// network path: breaker state (platforms that tripped before a VPN
    /// came up would otherwise stay dark through the cooldown), the DNS
    /// cache, and the HTTP client.
    fn apply_proxy(&mut self, proxy: Option<String>) -> Result<()> {
        let old = self.current_proxy.take();
        self.current_proxy = proxy.clone();
        self.checker.update_proxy(proxy.clone());
        self.classifier.set_proxy_status(proxy.as_deref());

        match &self.current_proxy {
            Some(new) => info!("proxy activated: {new}"),
            None => info!("proxy removed (was: {old:?}), direct connection"),
        }

        self.breaker.reset();
        self.checker.clear_dns_cache();
        debug!("circuit breakers and DNS cache reset (proxy state change)");
        self.client = None;
        // Rebuild eagerly so an invalid proxy URL surfaces here.
        self.client()?;
        Ok(())
    }

    fn force_clear_proxy(&mut self) {
        if let Some(proxy) = &self.current_proxy {
            warn!("proxy {proxy} caused all checks to fail, clearing and retrying direct");
        }
        self.last_proxy_scan = None;
        if self.apply_proxy(None).is_err() {
            // Direct client construction does not depend on proxy parsing;
            // leave the client unset and let the next cycle rebuild it.
            self.client = None;
        }
    }

    fn client(&mut self) -> Result<Client> {
        if let Some(client) = &self.client {
            return Ok(client.clone());
        }

        let mut builder = Client::builder()
            .timeout(self.config.timeout)
            .connect_timeout(self.config.timeout / 2)
            .redirect(redirect::Policy::limited(3))
            .pool_max_idle_per_host(2)
            .pool_idle_timeout(Duration::from_secs(60))
            .user_agent(USER_AGENT);

        if let Some(proxy_url) = &self.current_proxy {
            let proxy = Proxy::all(proxy_url).map_err(|err| MonitorError::InvalidProxy {
                url: proxy_url.clone(),
                reason: err.to_string(),
            })?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build()?;
        self.client = Some(client.clone());
        Ok(client)
    }

    async fn run_checks(&mut self) -> Result<MonitorReport> {
        let client = self.client()?;

        let mut probed = Vec::new();
        let mut skipped = Vec::new();
        for platform in self.platforms.clone() {
            if self.breaker.is_allowed(&platform.name) {
                probed.push(platform);
            } else {
                debug!("{} skipped, circuit open", platform.name);
                skipped.push(platform);
            }
        }

        let results = join_all(
            probed
                .iter()
                .map(|platform| self.checker.check(platform, &client)),
        )
        .await;

        let mut platforms: HashMap<String, CheckResult> = HashMap::new();
        for result in results {
            if result.is_accessible() {
                self.breaker.record_success(&result.platform.name);
                if result.ping_ms > 0.0 {
                    self.latency.add(&result.platform.name, result.ping_ms);
                }
            } else {
                self.breaker.record_failure(&result.platform.name);
            }
            platforms.insert(result.platform.name.clone(), result);
        }

        for platform in skipped {
            platforms.insert(
                platform.name.clone(),
                CheckResult::blocked(platform, FailureKind::CircuitOpen),
            );
        }

        Ok(self.compute_report(platforms))
    }

    fn compute_report(&mut self, platforms: HashMap<String, CheckResult>) -> MonitorReport {
        let international_ping = category_mean(&platforms, PlatformCategory::International);
        let domestic_ping = category_mean(&platforms, PlatformCategory::Domestic);

        let raw = self.classifier.classify(&platforms);
        let internet_status = self.classifier.smooth(raw);

        let avg_ping = if international_ping > 0.0 && domestic_ping > 0.0 {
            (international_ping + domestic_ping) / 2.0
        } else {
            international_ping.max(domestic_ping)
        };

        MonitorReport {
            platforms,
            timestamp: Utc::now(),
            internet_status,
            quality: Quality::from_ping(avg_ping),
            international_ping,
            domestic_ping,
        }
    }

    fn note_status(&mut self, status: InternetStatus) {
        if let Some(last) = self.last_known_status {
            if last.group() != status.group() {
                debug!("state group changed: '{last}' -> '{status}', requesting fast follow-up");
                self.fast_recheck = true;
            }
        }
        self.last_known_status = Some(status);
    }
}

fn category_mean(platforms: &HashMap<String, CheckResult>, category: PlatformCategory) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for result in platforms
        .values()
        .filter(|r| r.platform.category == category && r.is_accessible())
    {
        sum += result.ping_ms;
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PlatformStatus;

    fn accessible(name: &str, category: PlatformCategory, ping_ms: f64) -> CheckResult {
        CheckResult {
            platform: Platform::new(name, "🔗", &format!("https://{name}.example"), category),
            status: PlatformStatus::Online,
            ping_ms,
            timestamp: Utc::now(),
            dns_success: true,
            tcp_success: true,
            http_success: true,
            failure: None,
        }
    }

    fn blocked(name: &str, category: PlatformCategory) -> CheckResult {
        CheckResult::blocked(
            Platform::new(name, "🔗", &format!("https://{name}.example"), category),
            FailureKind::HttpFailed,
        )
    }

    fn map(results: Vec<CheckResult>) -> HashMap<String, CheckResult> {
        results
            .into_iter()
            .map(|r| (r.platform.name.clone(), r))
            .collect()
    }

    #[test]
    fn test_compute_report_aggregates_pings() {
        let mut monitor = Monitor::new(MonitorConfig::default());
        let platforms = map(vec![
            accessible("Google", PlatformCategory::International, 100.0),
            accessible("Cloudflare", PlatformCategory::International, 300.0),
            accessible("IRNA", PlatformCategory::Domestic, 50.0),
            accessible("Instagram", PlatformCategory::Social, 80.0),
        ]);

        let report = monitor.compute_report(platforms);
        assert!((report.international_ping - 200.0).abs() < 1e-9);
        assert!((report.domestic_ping - 50.0).abs() < 1e-9);
        // (200 + 50) / 2 = 125ms average.
        assert_eq!(report.quality, Quality::Good);
        assert_eq!(report.internet_status, InternetStatus::VpnActive);
    }

    #[test]
    fn test_compute_report_one_sided_ping_uses_max() {
        let mut monitor = Monitor::new(MonitorConfig::default());
        let platforms = map(vec![
            accessible("IRNA", PlatformCategory::Domestic, 40.0),
            blocked("Google", PlatformCategory::International),
            blocked("Instagram", PlatformCategory::Social),
        ]);

        let report = monitor.compute_report(platforms);
        assert_eq!(report.international_ping, 0.0);
        assert!((report.domestic_ping - 40.0).abs() < 1e-9);
        assert_eq!(report.quality, Quality::Excellent);
        assert_eq!(report.internet_status, InternetStatus::DomesticOnly);
    }

    #[test]
    fn test_compute_report_empty_is_offline() {
        let mut monitor = Monitor::new(MonitorConfig::default());
        let report = monitor.compute_report(HashMap::new());
        assert_eq!(report.internet_status, InternetStatus::Offline);
        assert_eq!(report.quality, Quality::Unknown);
    }

    #[test]
    fn test_fast_recheck_flag_on_group_change() {
        let mut monitor = Monitor::new(MonitorConfig::default());

        monitor.note_status(InternetStatus::SocialBlocked);
        assert!(!monitor.take_fast_recheck());

        // Same group: no fast recheck requested.
        monitor.note_status(InternetStatus::DpiSuspected);
        assert!(!monitor.take_fast_recheck());

        // Restricted to Connected: fast recheck requested, then consumed.
        monitor.note_status(InternetStatus::VpnActive);
        assert!(monitor.take_fast_recheck());
        assert!(!monitor.take_fast_recheck());
    }

    #[test]
    fn test_default_roster_covers_all_categories() {
        for category in [
            PlatformCategory::Social,
            PlatformCategory::International,
            PlatformCategory::Domestic,
        ] {
            assert!(
                DEFAULT_PLATFORMS.iter().any(|p| p.category == category),
                "roster is missing a {category:?} platform"
            );
        }
        assert_eq!(DEFAULT_PLATFORMS.len(), 9);
    }
}
