use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// Temporarily disables platforms that keep failing.
///
/// After `failure_threshold` consecutive failures the circuit opens and
/// the platform is skipped until the cooldown expires. Successes clear
/// both the failure count and any open circuit.
pub struct CircuitBreaker {
    failure_threshold: u32,
    cooldown: Duration,
    failures: HashMap<String, u32>,
    open_until: HashMap<String, Instant>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            failure_threshold,
            cooldown,
            failures: HashMap::new(),
            open_until: HashMap::new(),
        }
    }

    pub fn record_failure(&mut self, name: &str) {
        self.record_failure_at(name, Instant::now());
    }

    fn record_failure_at(&mut self, name: &str, now: Instant) {
        // Failures during an open cooldown don't count again.
        if self.open_until.get(name).is_some_and(|until| now < *until) {
            return;
        }

        let count = self.failures.entry(name.to_string()).or_insert(0);
        *count += 1;

        if *count >= self.failure_threshold {
            self.open_until.insert(name.to_string(), now + self.cooldown);
            self.failures.remove(name);
            debug!(
                "circuit opened for {name} ({}s cooldown)",
                self.cooldown.as_secs()
            );
        }
    }

    pub fn record_success(&mut self, name: &str) {
        self.failures.remove(name);
        self.open_until.remove(name);
    }

    pub fn is_allowed(&mut self, name: &str) -> bool {
        self.is_allowed_at(name, Instant::now())
    }

    fn is_allowed_at(&mut self, name: &str, now: Instant) -> bool {
        if let Some(until) = self.open_until.get(name) {
            if now < *until {
                return false;
            }
            self.open_until.remove(name);
        }
        true
    }

    /// Clear all breaker state so every platform is probed next cycle.
    pub fn reset(&mut self) {
        self.failures.clear();
        self.open_until.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opens_after_threshold() {
        let mut breaker = CircuitBreaker::new(3, Duration::from_secs(45));
        let now = Instant::now();

        breaker.record_failure_at("Instagram", now);
        breaker.record_failure_at("Instagram", now);
        assert!(breaker.is_allowed_at("Instagram", now));

        breaker.record_failure_at("Instagram", now);
        assert!(!breaker.is_allowed_at("Instagram", now));
    }

    #[test]
    fn test_cooldown_expires() {
        let cooldown = Duration::from_secs(45);
        let mut breaker = CircuitBreaker::new(1, cooldown);
        let now = Instant::now();

        breaker.record_failure_at("X", now);
        assert!(!breaker.is_allowed_at("X", now + Duration::from_secs(44)));
        assert!(breaker.is_allowed_at("X", now + cooldown));
        // Expired cooldown is dropped, the platform starts fresh.
        breaker.record_failure_at("X", now + cooldown);
        assert!(!breaker.is_allowed_at("X", now + cooldown));
    }

    #[test]
    fn test_failures_during_cooldown_do_not_extend_it() {
        let cooldown = Duration::from_secs(45);
        let mut breaker = CircuitBreaker::new(1, cooldown);
        let now = Instant::now();

        breaker.record_failure_at("Telegram", now);
        breaker.record_failure_at("Telegram", now + Duration::from_secs(10));
        assert!(breaker.is_allowed_at("Telegram", now + cooldown));
    }

    #[test]
    fn test_success_clears_state() {
        let mut breaker = CircuitBreaker::new(1, Duration::from_secs(45));
        let now = Instant::now();

        breaker.record_failure_at("IRNA", now);
        assert!(!breaker.is_allowed_at("IRNA", now));

        breaker.record_success("IRNA");
        assert!(breaker.is_allowed_at("IRNA", now));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut breaker = CircuitBreaker::new(1, Duration::from_secs(45));
        let now = Instant::now();

        breaker.record_failure_at("A", now);
        breaker.record_failure_at("B", now);
        breaker.reset();

        assert!(breaker.is_allowed_at("A", now));
        assert!(breaker.is_allowed_at("B", now));
    }
}
