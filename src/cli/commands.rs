use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info};

use crate::cli::output;
use crate::monitor::{Monitor, Result};
use crate::stats::Statistics;

/// Delay before the fast follow-up check after a significant state
/// change. Short enough to feel instant, long enough to avoid hammering.
const FAST_RECHECK_DELAY: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub interval: Duration,
    pub json: bool,
}

/// Scheduled monitoring loop: immediate first check, one check per
/// interval, fast re-checks after significant state changes, Ctrl-C to
/// stop.
pub async fn run_watch(
    monitor: &mut Monitor,
    stats: &mut Statistics,
    options: &WatchOptions,
) -> Result<()> {
    let mut next_check = Instant::now();

    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(next_check) => {
                let delay = match run_once(monitor, stats, options.json).await {
                    Ok(_) => {
                        if monitor.take_fast_recheck() {
                            info!(
                                "fast re-check scheduled in {}ms",
                                FAST_RECHECK_DELAY.as_millis()
                            );
                            FAST_RECHECK_DELAY
                        } else {
                            options.interval
                        }
                    }
                    Err(err) => {
                        // A failed cycle must not kill the loop.
                        error!("check failed: {err}");
                        options.interval
                    }
                };
                next_check = Instant::now() + delay;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
        }
    }

    if !options.json {
        output::print_session_summary(stats);
    }
    Ok(())
}

/// Run a single check cycle and report it. Returns whether the
/// connection was classified as online, for the process exit code.
pub async fn run_once(monitor: &mut Monitor, stats: &mut Statistics, json: bool) -> Result<bool> {
    let report = monitor.check_all().await?;
    stats.add_check(report.is_online());

    if json {
        println!("{}", serde_json::to_string(&report)?);
    } else {
        output::print_report(&report, stats);
    }
    Ok(report.is_online())
}

/// Spot-check a single platform by name. Returns None for an unknown
/// name, otherwise whether the platform was accessible.
pub async fn run_single_check(
    monitor: &mut Monitor,
    name: &str,
    json: bool,
) -> Result<Option<bool>> {
    let Some(result) = monitor.check_platform(name).await? else {
        return Ok(None);
    };

    if json {
        println!("{}", serde_json::to_string(&result)?);
    } else {
        output::print_single_check(&result);
    }
    Ok(Some(result.is_accessible()))
}
