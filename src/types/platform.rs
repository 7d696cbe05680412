use serde::{Deserialize, Serialize};
use url::Url;

/// Category a probed platform belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformCategory {
    Social,
    International,
    Domestic,
}

/// A well-known endpoint probed on every check cycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    pub name: String,
    pub emoji: String,
    pub url: String,
    pub category: PlatformCategory,
}

impl Platform {
    pub fn new(name: &str, emoji: &str, url: &str, category: PlatformCategory) -> Self {
        Self {
            name: name.to_string(),
            emoji: emoji.to_string(),
            url: url.to_string(),
            category,
        }
    }

    /// Hostname part of the platform URL. Falls back to raw string
    /// splitting for bare hosts without a scheme.
    pub fn host(&self) -> String {
        if let Ok(parsed) = Url::parse(&self.url) {
            if let Some(host) = parsed.host_str() {
                return host.to_string();
            }
        }
        let rest = match self.url.split_once("://") {
            Some((_, rest)) => rest,
            None => &self.url,
        };
        rest.split('/').next().unwrap_or(rest).to_string()
    }
}

/// Connection status of a single platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformStatus {
    Online,
    Slow,
    Blocked,
}

impl PlatformStatus {
    pub fn is_accessible(self) -> bool {
        self != PlatformStatus::Blocked
    }
}
