use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Positive and negative DNS lookup cache with TTL expiry, to keep
/// repeated check cycles from hammering the resolver.
pub struct DnsCache {
    ttl: Duration,
    entries: HashMap<String, (Instant, bool)>,
}

impl DnsCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, host: &str) -> Option<bool> {
        let (cached_at, resolved) = self.entries.get(host)?;
        if cached_at.elapsed() < self.ttl {
            Some(*resolved)
        } else {
            None
        }
    }

    pub fn insert(&mut self, host: &str, resolved: bool) {
        self.entries
            .insert(host.to_string(), (Instant::now(), resolved));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
