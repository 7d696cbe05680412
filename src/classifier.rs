//! Connection state classification with instant state-change detection.
//!
//! Smoothing only applies to minor fluctuations inside a state group;
//! cross-group transitions (VPN toggled, internet lost or regained) take
//! effect immediately instead of waiting for a majority vote.

use std::collections::HashMap;
use tracing::{debug, info};

use crate::types::{CheckResult, InternetStatus, PlatformCategory};

const DPI_MIN_MATCHES: usize = 2;
const DPI_MIN_RATIO: f64 = 0.5;

/// Classifies internet state from aggregated platform results.
///
/// Smoothing strategy:
/// - instant update plus history reset when the new raw state is in a
///   different group than the current smoothed state;
/// - majority vote over the last N raw states when the groups match, to
///   avoid flicker between adjacent states.
pub struct ConnectionClassifier {
    smoothing_window: usize,
    history: Vec<InternetStatus>,
    current: Option<InternetStatus>,
    proxy_active: bool,
}

impl ConnectionClassifier {
    pub fn new(smoothing_window: usize) -> Self {
        Self {
            smoothing_window,
            history: Vec::new(),
            current: None,
            proxy_active: false,
        }
    }

    /// Record the proxy state observed by the monitor. A proxy appearing
    /// or disappearing resets the smoothing history so the next
    /// classification takes effect without waiting for a majority.
    pub fn set_proxy_status(&mut self, proxy: Option<&str>) {
        let active = proxy.is_some();
        if active != self.proxy_active {
            debug!("proxy status changed, resetting classifier history");
            self.reset_smoothing();
        }
        self.proxy_active = active;
    }

    /// Derive the raw internet state for one cycle of platform results.
    pub fn classify(&self, platforms: &HashMap<String, CheckResult>) -> InternetStatus {
        if platforms.is_empty() {
            return InternetStatus::Offline;
        }

        let accessible_in = |category: PlatformCategory| {
            platforms
                .values()
                .any(|r| r.is_accessible() && r.platform.category == category)
        };

        let domestic_ok = accessible_in(PlatformCategory::Domestic);
        let international_ok = accessible_in(PlatformCategory::International);
        let social_ok = accessible_in(PlatformCategory::Social);

        if !domestic_ok && !international_ok && !social_ok {
            return InternetStatus::Offline;
        }

        if domestic_ok && !international_ok && !social_ok {
            return InternetStatus::DomesticOnly;
        }

        // Social platforms are reachable only when filters are bypassed,
        // either through a local proxy or a TUN-mode VPN.
        if social_ok {
            return InternetStatus::VpnActive;
        }

        if international_ok {
            if self.proxy_active {
                return InternetStatus::VpnActiveSocialBlocked;
            }
            if self.dpi_pattern(platforms) {
                return InternetStatus::DpiSuspected;
            }
            return InternetStatus::SocialBlocked;
        }

        InternetStatus::Unstable
    }

    /// Return the state to display, applying the smoothing strategy.
    pub fn smooth(&mut self, new_state: InternetStatus) -> InternetStatus {
        if let Some(current) = self.current {
            if current.group() != new_state.group() {
                info!("significant state change: '{current}' -> '{new_state}', instant update");
                self.history.clear();
                self.history.push(new_state);
                self.current = Some(new_state);
                return new_state;
            }
        }

        self.history.push(new_state);
        if self.history.len() > self.smoothing_window {
            self.history.remove(0);
        }

        let smoothed = majority(&self.history).unwrap_or(new_state);
        self.current = Some(smoothed);
        smoothed
    }

    /// Clear the vote history. The current state is kept so the next
    /// `smooth` call can still detect a group change.
    pub fn reset_smoothing(&mut self) {
        self.history.clear();
    }

    /// Share of the history window held by the majority state.
    pub fn confidence(&self) -> f64 {
        if self.history.is_empty() {
            return 0.0;
        }
        let Some(top) = majority(&self.history) else {
            return 0.0;
        };
        let count = self.history.iter().filter(|s| **s == top).count();
        count as f64 / self.history.len() as f64
    }

    /// DNS and TCP succeeding while HTTP fails across blocked platforms
    /// is the signature of deep-packet-inspection interference.
    fn dpi_pattern(&self, platforms: &HashMap<String, CheckResult>) -> bool {
        let blocked: Vec<&CheckResult> =
            platforms.values().filter(|r| !r.is_accessible()).collect();
        if blocked.is_empty() {
            return false;
        }

        let matches = blocked
            .iter()
            .filter(|r| r.dns_success && r.tcp_success && !r.http_success)
            .count();

        matches >= DPI_MIN_MATCHES || matches as f64 / blocked.len() as f64 >= DPI_MIN_RATIO
    }
}

/// Most frequent state, ties broken by first occurrence.
fn majority(history: &[InternetStatus]) -> Option<InternetStatus> {
    let mut counts: HashMap<InternetStatus, usize> = HashMap::new();
    for state in history {
        *counts.entry(*state).or_insert(0) += 1;
    }

    let mut best: Option<(InternetStatus, usize)> = None;
    for state in history {
        let count = counts[state];
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((*state, count));
        }
    }
    best.map(|(state, _)| state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FailureKind, Platform, PlatformStatus};
    use chrono::Utc;

    fn result(
        name: &str,
        category: PlatformCategory,
        accessible: bool,
        dns: bool,
        tcp: bool,
    ) -> CheckResult {
        let platform = Platform::new(name, "🔗", &format!("https://{name}.example"), category);
        CheckResult {
            platform,
            status: if accessible {
                PlatformStatus::Online
            } else {
                PlatformStatus::Blocked
            },
            ping_ms: if accessible { 80.0 } else { 0.0 },
            timestamp: Utc::now(),
            dns_success: dns,
            tcp_success: tcp,
            http_success: accessible,
            failure: if accessible {
                None
            } else {
                Some(FailureKind::HttpFailed)
            },
        }
    }

    fn map(results: Vec<CheckResult>) -> HashMap<String, CheckResult> {
        results
            .into_iter()
            .map(|r| (r.platform.name.clone(), r))
            .collect()
    }

    #[test]
    fn test_empty_results_are_offline() {
        let classifier = ConnectionClassifier::new(3);
        assert_eq!(
            classifier.classify(&HashMap::new()),
            InternetStatus::Offline
        );
    }

    #[test]
    fn test_everything_blocked_is_offline() {
        let classifier = ConnectionClassifier::new(3);
        let platforms = map(vec![
            result("Instagram", PlatformCategory::Social, false, false, false),
            result("Google", PlatformCategory::International, false, false, false),
            result("IRNA", PlatformCategory::Domestic, false, false, false),
        ]);
        assert_eq!(classifier.classify(&platforms), InternetStatus::Offline);
    }

    #[test]
    fn test_domestic_only_network() {
        let classifier = ConnectionClassifier::new(3);
        let platforms = map(vec![
            result("Instagram", PlatformCategory::Social, false, true, false),
            result("Google", PlatformCategory::International, false, true, false),
            result("IRNA", PlatformCategory::Domestic, true, true, true),
        ]);
        assert_eq!(
            classifier.classify(&platforms),
            InternetStatus::DomesticOnly
        );
    }

    #[test]
    fn test_accessible_social_means_vpn() {
        let classifier = ConnectionClassifier::new(3);
        let platforms = map(vec![
            result("Instagram", PlatformCategory::Social, true, true, true),
            result("Google", PlatformCategory::International, true, true, true),
        ]);
        assert_eq!(classifier.classify(&platforms), InternetStatus::VpnActive);
    }

    #[test]
    fn test_social_blocked_without_proxy() {
        let classifier = ConnectionClassifier::new(3);
        let platforms = map(vec![
            result("Instagram", PlatformCategory::Social, false, false, false),
            result("Google", PlatformCategory::International, true, true, true),
            result("IRNA", PlatformCategory::Domestic, true, true, true),
        ]);
        assert_eq!(
            classifier.classify(&platforms),
            InternetStatus::SocialBlocked
        );
    }

    #[test]
    fn test_social_blocked_with_proxy_active() {
        let mut classifier = ConnectionClassifier::new(3);
        classifier.set_proxy_status(Some("http://127.0.0.1:10809"));
        let platforms = map(vec![
            result("Instagram", PlatformCategory::Social, false, false, false),
            result("Google", PlatformCategory::International, true, true, true),
        ]);
        assert_eq!(
            classifier.classify(&platforms),
            InternetStatus::VpnActiveSocialBlocked
        );
    }

    #[test]
    fn test_dpi_pattern_detection() {
        let classifier = ConnectionClassifier::new(3);
        // Two blocked platforms with DNS and TCP fine but HTTP dead.
        let platforms = map(vec![
            result("Instagram", PlatformCategory::Social, false, true, true),
            result("Telegram", PlatformCategory::Social, false, true, true),
            result("Google", PlatformCategory::International, true, true, true),
        ]);
        assert_eq!(classifier.classify(&platforms), InternetStatus::DpiSuspected);
    }

    #[test]
    fn test_dns_level_blocking_is_not_dpi() {
        let classifier = ConnectionClassifier::new(3);
        let platforms = map(vec![
            result("Instagram", PlatformCategory::Social, false, false, false),
            result("Telegram", PlatformCategory::Social, false, false, false),
            result("Google", PlatformCategory::International, true, true, true),
        ]);
        assert_eq!(
            classifier.classify(&platforms),
            InternetStatus::SocialBlocked
        );
    }

    #[test]
    fn test_smoothing_majority_within_group() {
        let mut classifier = ConnectionClassifier::new(3);
        assert_eq!(
            classifier.smooth(InternetStatus::SocialBlocked),
            InternetStatus::SocialBlocked
        );
        assert_eq!(
            classifier.smooth(InternetStatus::SocialBlocked),
            InternetStatus::SocialBlocked
        );
        // A single same-group outlier does not flip the state.
        assert_eq!(
            classifier.smooth(InternetStatus::DpiSuspected),
            InternetStatus::SocialBlocked
        );
    }

    #[test]
    fn test_cross_group_change_is_instant() {
        let mut classifier = ConnectionClassifier::new(3);
        classifier.smooth(InternetStatus::SocialBlocked);
        classifier.smooth(InternetStatus::SocialBlocked);
        classifier.smooth(InternetStatus::SocialBlocked);

        // Restricted to Connected applies immediately, no majority needed.
        assert_eq!(
            classifier.smooth(InternetStatus::VpnActive),
            InternetStatus::VpnActive
        );
        assert_eq!(classifier.confidence(), 1.0);
    }

    #[test]
    fn test_proxy_change_resets_history() {
        let mut classifier = ConnectionClassifier::new(3);
        classifier.smooth(InternetStatus::SocialBlocked);
        classifier.smooth(InternetStatus::SocialBlocked);

        classifier.set_proxy_status(Some("http://127.0.0.1:7890"));
        // Same group, but the vote history is gone so the new state wins.
        assert_eq!(
            classifier.smooth(InternetStatus::DpiSuspected),
            InternetStatus::DpiSuspected
        );
    }

    #[test]
    fn test_confidence_reflects_history() {
        let mut classifier = ConnectionClassifier::new(3);
        assert_eq!(classifier.confidence(), 0.0);

        classifier.smooth(InternetStatus::SocialBlocked);
        classifier.smooth(InternetStatus::SocialBlocked);
        classifier.smooth(InternetStatus::DpiSuspected);
        assert!((classifier.confidence() - 2.0 / 3.0).abs() < 1e-9);
    }
}
