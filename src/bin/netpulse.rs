use anyhow::Result;
use clap::Parser;
use netpulse::cli::{output, run_once, run_single_check, run_watch, WatchOptions};
use netpulse::config::Settings;
use netpulse::logging;
use netpulse::monitor::{Monitor, MonitorConfig, DEFAULT_PLATFORMS};
use netpulse::stats::Statistics;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "netpulse")]
#[command(about = "Internet connectivity monitor with multi-layer platform checks")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct NetpulseCli {
    /// Run a single check cycle and exit (exit code 1 when offline)
    #[arg(long)]
    once: bool,

    /// Spot-check a single platform by name and exit
    #[arg(long, value_name = "PLATFORM")]
    check: Option<String>,

    /// Seconds between scheduled checks
    #[arg(short, long)]
    interval: Option<u64>,

    /// Per-probe timeout in seconds
    #[arg(long)]
    timeout: Option<f64>,

    /// Proxy URL to route checks through (disables auto-detection)
    #[arg(long)]
    proxy: Option<String>,

    /// Disable proxy auto-detection
    #[arg(long)]
    no_proxy: bool,

    /// Emit newline-delimited JSON reports instead of human output
    #[arg(long)]
    json: bool,

    /// Directory for settings and state
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Directory for rolling log files
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// List the monitored platforms and exit
    #[arg(long)]
    list_platforms: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = NetpulseCli::parse();

    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(Settings::default_data_dir);
    let mut settings = Settings::load(&data_dir)?;

    // Seed the settings file on first run so users can edit it.
    if !Settings::file_path(&data_dir).exists() {
        settings.save(&data_dir)?;
    }

    if let Some(interval) = cli.interval {
        settings.check_interval_secs = interval;
    }
    if let Some(timeout) = cli.timeout {
        settings.timeout_secs = timeout;
    }
    if cli.proxy.is_some() {
        settings.proxy = cli.proxy.clone();
    }
    if cli.no_proxy {
        settings.detect_proxy = false;
        settings.proxy = None;
    }

    let log_dir = cli.log_dir.clone().or_else(|| settings.log_dir.clone());
    let _guard = logging::init(cli.verbose, log_dir.as_deref());

    info!("starting netpulse v{}", env!("CARGO_PKG_VERSION"));

    if cli.list_platforms {
        output::print_platforms(&DEFAULT_PLATFORMS);
        return Ok(());
    }

    let config = MonitorConfig {
        timeout: Duration::from_secs_f64(settings.timeout_secs),
        max_concurrent: settings.max_concurrent,
        proxy_override: settings.proxy.clone(),
        detect_proxy: settings.detect_proxy,
    };
    let mut monitor = Monitor::new(config);
    let mut stats = Statistics::new();

    if let Some(name) = &cli.check {
        match run_single_check(&mut monitor, name, cli.json).await? {
            Some(accessible) => {
                if !accessible {
                    std::process::exit(1);
                }
                return Ok(());
            }
            None => {
                eprintln!("unknown platform: {name}");
                eprintln!("use --list-platforms to see the monitored platforms");
                std::process::exit(2);
            }
        }
    }

    if cli.once {
        let online = run_once(&mut monitor, &mut stats, cli.json).await?;
        if !online {
            std::process::exit(1);
        }
        return Ok(());
    }

    let options = WatchOptions {
        interval: Duration::from_secs(settings.check_interval_secs),
        json: cli.json,
    };
    run_watch(&mut monitor, &mut stats, &options).await?;
    Ok(())
}
