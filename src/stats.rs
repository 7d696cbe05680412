//! Uptime statistics across check cycles.

use chrono::{DateTime, Local, NaiveDate};
use std::collections::VecDeque;

/// 24 hours of history at a 5-minute cadence.
const HISTORY_CAPACITY: usize = 288;

#[derive(Debug, Clone, Copy)]
struct Sample {
    time: DateTime<Local>,
    online: bool,
}

/// Tracks uptime percentage and disconnection count for the current day.
pub struct Statistics {
    history: VecDeque<Sample>,
    total_checks: u64,
    online_checks: u64,
    today: NaiveDate,
}

impl Statistics {
    pub fn new() -> Self {
        Self {
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
            total_checks: 0,
            online_checks: 0,
            today: Local::now().date_naive(),
        }
    }

    pub fn add_check(&mut self, online: bool) {
        self.add_check_at(online, Local::now());
    }

    fn add_check_at(&mut self, online: bool, now: DateTime<Local>) {
        // Daily counters reset at the local-date rollover.
        if now.date_naive() != self.today {
            self.total_checks = 0;
            self.online_checks = 0;
            self.today = now.date_naive();
        }

        self.total_checks += 1;
        if online {
            self.online_checks += 1;
        }

        if self.history.len() == HISTORY_CAPACITY {
            self.history.pop_front();
        }
        self.history.push_back(Sample { time: now, online });
    }

    /// Uptime percentage for today, 0 when no checks ran yet.
    pub fn uptime_today(&self) -> f64 {
        if self.total_checks == 0 {
            return 0.0;
        }
        self.online_checks as f64 / self.total_checks as f64 * 100.0
    }

    /// Number of online-to-offline transitions among today's samples.
    pub fn disconnections_today(&self) -> u32 {
        let mut count = 0;
        let mut was_online = true;

        for sample in &self.history {
            if sample.time.date_naive() != self.today {
                continue;
            }
            if !sample.online && was_online {
                count += 1;
            }
            was_online = sample.online;
        }

        count
    }

    pub fn total_checks(&self) -> u64 {
        self.total_checks
    }

    pub fn online_checks(&self) -> u64 {
        self.online_checks
    }
}

impl Default for Statistics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(hour: u32, minute: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, 14, hour, minute, 0).unwrap()
    }

    fn stats_on(date: DateTime<Local>) -> Statistics {
        let mut stats = Statistics::new();
        stats.today = date.date_naive();
        stats
    }

    #[test]
    fn test_uptime_percentage() {
        let mut stats = stats_on(at(9, 0));
        stats.add_check_at(true, at(9, 0));
        stats.add_check_at(true, at(9, 5));
        stats.add_check_at(false, at(9, 10));
        stats.add_check_at(true, at(9, 15));

        assert_eq!(stats.total_checks(), 4);
        assert_eq!(stats.online_checks(), 3);
        assert!((stats.uptime_today() - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_checks_means_zero_uptime() {
        let stats = Statistics::new();
        assert_eq!(stats.uptime_today(), 0.0);
    }

    #[test]
    fn test_disconnection_counting() {
        let mut stats = stats_on(at(9, 0));
        // online, drop, recover, drop again: two disconnections.
        stats.add_check_at(true, at(9, 0));
        stats.add_check_at(false, at(9, 5));
        stats.add_check_at(false, at(9, 10));
        stats.add_check_at(true, at(9, 15));
        stats.add_check_at(false, at(9, 20));

        assert_eq!(stats.disconnections_today(), 2);
    }

    #[test]
    fn test_daily_rollover_resets_counters() {
        let mut stats = stats_on(at(23, 55));
        stats.add_check_at(false, at(23, 55));
        assert_eq!(stats.total_checks(), 1);

        let next_day = at(23, 55) + Duration::minutes(10);
        stats.add_check_at(true, next_day);

        assert_eq!(stats.total_checks(), 1);
        assert_eq!(stats.online_checks(), 1);
        assert!((stats.uptime_today() - 100.0).abs() < 1e-9);
        // Yesterday's offline sample no longer counts against today.
        assert_eq!(stats.disconnections_today(), 0);
    }
}
