use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::check::CheckResult;

/// Overall internet state derived from the aggregated platform results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InternetStatus {
    FullAccess,
    SocialBlocked,
    InternationalRestricted,
    DomesticOnly,
    VpnActive,
    VpnActiveSocialBlocked,
    DpiSuspected,
    Unstable,
    Offline,
}

/// Coarse grouping used to decide between instant and smoothed updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateGroup {
    Connected,
    Restricted,
    Offline,
}

/// Display color associated with an internet state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusColor {
    Green,
    Yellow,
    Orange,
    Purple,
    Gray,
    Red,
}

impl InternetStatus {
    pub fn group(self) -> StateGroup {
        match self {
            InternetStatus::FullAccess
            | InternetStatus::VpnActive
            | InternetStatus::VpnActiveSocialBlocked => StateGroup::Connected,
            InternetStatus::SocialBlocked
            | InternetStatus::InternationalRestricted
            | InternetStatus::DomesticOnly
            | InternetStatus::DpiSuspected
            | InternetStatus::Unstable => StateGroup::Restricted,
            InternetStatus::Offline => StateGroup::Offline,
        }
    }

    pub fn color(self) -> StatusColor {
        match self {
            InternetStatus::FullAccess => StatusColor::Green,
            InternetStatus::SocialBlocked | InternetStatus::DpiSuspected => StatusColor::Yellow,
            InternetStatus::InternationalRestricted | InternetStatus::DomesticOnly => {
                StatusColor::Orange
            }
            InternetStatus::VpnActive | InternetStatus::VpnActiveSocialBlocked => {
                StatusColor::Purple
            }
            InternetStatus::Unstable => StatusColor::Gray,
            InternetStatus::Offline => StatusColor::Red,
        }
    }
}

impl fmt::Display for InternetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InternetStatus::FullAccess => "Full Internet Access",
            InternetStatus::SocialBlocked => "Social Media Blocked",
            InternetStatus::InternationalRestricted => "International Internet Restricted",
            InternetStatus::DomesticOnly => "Domestic-Only Network",
            InternetStatus::VpnActive => "VPN Active",
            InternetStatus::VpnActiveSocialBlocked => "VPN Active (Social Still Blocked)",
            InternetStatus::DpiSuspected => "DPI Interference Suspected",
            InternetStatus::Unstable => "Unstable Connection",
            InternetStatus::Offline => "No Internet Access",
        };
        write!(f, "{label}")
    }
}

/// Connection quality grade derived from average latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    Unknown,
    Excellent,
    Good,
    Average,
    Poor,
    VeryPoor,
}

impl Quality {
    pub fn from_ping(avg_ms: f64) -> Self {
        if avg_ms <= 0.0 {
            Quality::Unknown
        } else if avg_ms < 100.0 {
            Quality::Excellent
        } else if avg_ms < 300.0 {
            Quality::Good
        } else if avg_ms < 600.0 {
            Quality::Average
        } else if avg_ms < 1000.0 {
            Quality::Poor
        } else {
            Quality::VeryPoor
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Quality::Unknown => "Unknown",
            Quality::Excellent => "Excellent",
            Quality::Good => "Good",
            Quality::Average => "Average",
            Quality::Poor => "Poor",
            Quality::VeryPoor => "Very Poor",
        };
        write!(f, "{label}")
    }
}

/// Complete result of one monitoring cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorReport {
    pub platforms: HashMap<String, CheckResult>,
    pub timestamp: DateTime<Utc>,
    pub internet_status: InternetStatus,
    pub quality: Quality,
    pub international_ping: f64,
    pub domestic_ping: f64,
}

impl MonitorReport {
    /// Empty report used when the direct connectivity ping already failed.
    pub fn offline() -> Self {
        Self {
            platforms: HashMap::new(),
            timestamp: Utc::now(),
            internet_status: InternetStatus::Offline,
            quality: Quality::Unknown,
            international_ping: 0.0,
            domestic_ping: 0.0,
        }
    }

    pub fn is_online(&self) -> bool {
        self.internet_status != InternetStatus::Offline
    }

    pub fn status_color(&self) -> StatusColor {
        self.internet_status.color()
    }

    /// Names of accessible platforms, sorted for stable output.
    pub fn accessible_platforms(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .platforms
            .iter()
            .filter(|(_, r)| r.is_accessible())
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    /// Names of blocked platforms, sorted for stable output.
    pub fn blocked_platforms(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .platforms
            .iter()
            .filter(|(_, r)| !r.is_accessible())
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FailureKind, Platform, PlatformCategory, PlatformStatus};

    fn sample(name: &str, status: PlatformStatus) -> CheckResult {
        let platform = Platform::new(name, "🔗", "https://example.com", PlatformCategory::Social);
        CheckResult {
            platform,
            status,
            ping_ms: 0.0,
            timestamp: Utc::now(),
            dns_success: true,
            tcp_success: true,
            http_success: status.is_accessible(),
            failure: if status.is_accessible() {
                None
            } else {
                Some(FailureKind::HttpFailed)
            },
        }
    }

    #[test]
    fn test_offline_report() {
        let report = MonitorReport::offline();
        assert!(!report.is_online());
        assert_eq!(report.quality, Quality::Unknown);
        assert_eq!(report.status_color(), StatusColor::Red);
        assert!(report.platforms.is_empty());
    }

    #[test]
    fn test_accessible_and_blocked_partition() {
        let mut report = MonitorReport::offline();
        report
            .platforms
            .insert("A".to_string(), sample("A", PlatformStatus::Online));
        report
            .platforms
            .insert("B".to_string(), sample("B", PlatformStatus::Blocked));
        report
            .platforms
            .insert("C".to_string(), sample("C", PlatformStatus::Slow));

        assert_eq!(report.accessible_platforms(), vec!["A", "C"]);
        assert_eq!(report.blocked_platforms(), vec!["B"]);
    }

    #[test]
    fn test_quality_thresholds() {
        assert_eq!(Quality::from_ping(0.0), Quality::Unknown);
        assert_eq!(Quality::from_ping(50.0), Quality::Excellent);
        assert_eq!(Quality::from_ping(100.0), Quality::Good);
        assert_eq!(Quality::from_ping(450.0), Quality::Average);
        assert_eq!(Quality::from_ping(800.0), Quality::Poor);
        assert_eq!(Quality::from_ping(1500.0), Quality::VeryPoor);
    }

    #[test]
    fn test_state_groups() {
        assert_eq!(InternetStatus::VpnActive.group(), StateGroup::Connected);
        assert_eq!(InternetStatus::SocialBlocked.group(), StateGroup::Restricted);
        assert_eq!(InternetStatus::Offline.group(), StateGroup::Offline);
    }
}
