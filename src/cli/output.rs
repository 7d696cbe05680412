use crate::stats::Statistics;
use crate::types::{CheckResult, MonitorReport, Platform, PlatformStatus, StatusColor};

/// Print a full human-readable report for one check cycle.
pub fn print_report(report: &MonitorReport, stats: &Statistics) {
    println!();
    println!("{} {}", status_emoji(report.status_color()), report.internet_status);
    println!("==================================================");
    println!(
        "Quality: {} ({:.0}ms international / {:.0}ms domestic)",
        report.quality, report.international_ping, report.domestic_ping
    );

    let accessible = report.accessible_platforms();
    if !accessible.is_empty() {
        println!("Accessible: {}", accessible.join(", "));
    }
    let blocked = report.blocked_platforms();
    if !blocked.is_empty() {
        println!("Blocked: {}", blocked.join(", "));
    }

    if !report.platforms.is_empty() {
        println!();
        println!("Platforms:");
        let mut results: Vec<&CheckResult> = report.platforms.values().collect();
        results.sort_by(|a, b| a.platform.name.cmp(&b.platform.name));
        for result in results {
            print_platform_line(result);
        }
    }

    println!();
    println!(
        "Uptime today: {:.1}% ({} disconnections)",
        stats.uptime_today(),
        stats.disconnections_today()
    );
}

/// Print the outcome of a single-platform spot check.
pub fn print_single_check(result: &CheckResult) {
    print_platform_line(result);
}

pub fn print_platforms(platforms: &[Platform]) {
    println!("Monitored platforms:");
    for platform in platforms {
        println!(
            "  {} {:<12} {:<14} {}",
            platform.emoji,
            platform.name,
            format!("[{:?}]", platform.category).to_lowercase(),
            platform.url
        );
    }
}

pub fn print_session_summary(stats: &Statistics) {
    println!();
    println!("Session summary");
    println!("==================================================");
    println!("  Checks run:        {}", stats.total_checks());
    println!("  Online:            {}", stats.online_checks());
    println!("  Uptime today:      {:.1}%", stats.uptime_today());
    println!("  Disconnections:    {}", stats.disconnections_today());
}

fn print_platform_line(result: &CheckResult) {
    let marker = match result.status {
        PlatformStatus::Online => "✅",
        PlatformStatus::Slow => "🐌",
        PlatformStatus::Blocked => "❌",
    };
    let detail = if result.http_success {
        format!("{:.0}ms", result.ping_ms)
    } else {
        blocked_detail(result)
    };
    println!(
        "  {} {} {:<12} {}",
        marker, result.platform.emoji, result.platform.name, detail
    );
}

fn blocked_detail(result: &CheckResult) -> String {
    let mut layers = Vec::new();
    if !result.dns_success {
        layers.push("dns");
    }
    if !result.tcp_success {
        layers.push("tcp");
    }
    if !result.http_success {
        layers.push("http");
    }

    match &result.failure {
        Some(kind) => format!("blocked ({kind}, failed: {})", layers.join("+")),
        None => format!("blocked (failed: {})", layers.join("+")),
    }
}

fn status_emoji(color: StatusColor) -> &'static str {
    match color {
        StatusColor::Green => "🟢",
        StatusColor::Yellow => "🟡",
        StatusColor::Orange => "🟠",
        StatusColor::Purple => "🟣",
        StatusColor::Gray => "⚪",
        StatusColor::Red => "🔴",
    }
}
