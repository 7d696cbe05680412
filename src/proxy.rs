//! VPN/proxy auto-detection.
//!
//! Only ports used by specific VPN/proxy applications are scanned.
//! Generic ports (8080, 8888, 9090) are excluded: debugging proxies, dev
//! servers, and WSL commonly squat on them, and a false positive here
//! breaks direct-connection detection.
//!
//! A candidate counts as a working proxy only if the TCP port is open AND
//! an actual HTTP request through it succeeds. A port left in TIME_WAIT
//! after a VPN shutdown accepts TCP but drops HTTP, and must not be
//! treated as an active proxy.

use reqwest::{Client, Proxy};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProxyScheme {
    Http,
    Socks5,
}

/// Loopback port used by a known VPN/proxy application.
struct KnownPort {
    scheme: ProxyScheme,
    host: &'static str,
    port: u16,
    app: &'static str,
}

const KNOWN_PROXY_PORTS: &[KnownPort] = &[
    KnownPort { scheme: ProxyScheme::Http, host: "127.0.0.1", port: 10809, app: "v2rayN HTTP" },
    KnownPort { scheme: ProxyScheme::Socks5, host: "127.0.0.1", port: 10808, app: "v2rayN SOCKS5" },
    KnownPort { scheme: ProxyScheme::Http, host: "127.0.0.1", port: 7890, app: "Clash / ClashX HTTP" },
    KnownPort { scheme: ProxyScheme::Socks5, host: "127.0.0.1", port: 7891, app: "Clash / ClashX SOCKS5" },
    KnownPort { scheme: ProxyScheme::Http, host: "127.0.0.1", port: 1087, app: "Shadowsocks HTTP" },
    KnownPort { scheme: ProxyScheme::Socks5, host: "127.0.0.1", port: 1086, app: "Shadowsocks SOCKS5" },
    KnownPort { scheme: ProxyScheme::Socks5, host: "127.0.0.1", port: 1080, app: "Generic SOCKS5" },
    KnownPort { scheme: ProxyScheme::Http, host: "127.0.0.1", port: 20171, app: "Outline HTTP" },
    KnownPort { scheme: ProxyScheme::Http, host: "127.0.0.1", port: 8118, app: "Privoxy HTTP" },
    KnownPort { scheme: ProxyScheme::Http, host: "127.0.0.1", port: 3128, app: "Squid / HTTP proxy" },
];

/// Plain-HTTP captive portal endpoint: tiny response, globally reachable.
const VERIFY_URL: &str = "http://cp.cloudflare.com/";
const VERIFY_TIMEOUT: Duration = Duration::from_secs(3);
const PORT_PROBE_TIMEOUT: Duration = Duration::from_millis(300);

/// Detect an active, working VPN/proxy.
///
/// Priority: environment variables, then the known-port scan. Returns a
/// proxy URL or None when no working proxy is found.
pub async fn detect_proxy() -> Option<String> {
    if let Some(url) = proxy_from_env() {
        return Some(url);
    }

    if let Some((url, app)) = scan_local_ports().await {
        info!("working proxy detected: {app} -> {url}");
        return Some(url);
    }

    None
}

pub fn is_socks_proxy(url: &str) -> bool {
    url.to_ascii_lowercase().starts_with("socks5://")
}

/// Confirm a proxy URL actually forwards HTTP traffic to the internet.
/// Any response below 500 means the proxy is alive, even when the status
/// itself is odd.
pub async fn verify_proxy(proxy_url: &str) -> bool {
    let proxy = match Proxy::all(proxy_url) {
        Ok(proxy) => proxy,
        Err(err) => {
            debug!("invalid proxy URL {proxy_url}: {err}");
            return false;
        }
    };
    let client = match Client::builder().proxy(proxy).timeout(VERIFY_TIMEOUT).build() {
        Ok(client) => client,
        Err(err) => {
            debug!("proxy client build failed for {proxy_url}: {err}");
            return false;
        }
    };

    match client.get(VERIFY_URL).send().await {
        Ok(response) => {
            let status = response.status().as_u16();
            debug!("proxy {proxy_url} replied HTTP {status}");
            status < 500
        }
        Err(err) => {
            debug!("proxy verification failed for {proxy_url}: {err}");
            false
        }
    }
}

fn proxy_from_env() -> Option<String> {
    for var in ["HTTPS_PROXY", "https_proxy", "HTTP_PROXY", "http_proxy"] {
        if let Ok(value) = std::env::var(var) {
            let value = value.trim();
            if !value.is_empty() {
                debug!("proxy from env {var}: {value}");
                return Some(value.to_string());
            }
        }
    }
    None
}

async fn is_port_open(host: &str, port: u16) -> bool {
    matches!(
        timeout(PORT_PROBE_TIMEOUT, TcpStream::connect((host, port))).await,
        Ok(Ok(_))
    )
}

/// Scan the known ports and return the first verified proxy. HTTP
/// candidates are tried before SOCKS5 ones.
async fn scan_local_ports() -> Option<(String, &'static str)> {
    let mut open = Vec::new();
    for candidate in KNOWN_PROXY_PORTS {
        if is_port_open(candidate.host, candidate.port).await {
            open.push(candidate);
        }
    }
    if open.is_empty() {
        return None;
    }

    for scheme in [ProxyScheme::Http, ProxyScheme::Socks5] {
        for candidate in open.iter().filter(|c| c.scheme == scheme) {
            let prefix = match scheme {
                ProxyScheme::Http => "http",
                ProxyScheme::Socks5 => "socks5",
            };
            let url = format!("{prefix}://{}:{}", candidate.host, candidate.port);
            if verify_proxy(&url).await {
                return Some((url, candidate.app));
            }
            debug!(
                "skipping {} ({url}): port open but proxy not responding",
                candidate.app
            );
        }
    }

    None
}
