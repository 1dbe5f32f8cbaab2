use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use rand::seq::SliceRandom;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect;
use tokio::time::Instant;
use tracing::debug;

use crate::extract;
use crate::resolver::Resolver;
use crate::scanner::Prober;
use crate::target;
use crate::types::{CheckOutcome, Finding, SslInfo};

/// Status codes that confirm a live host on the default ports. Auth-walled
/// and server-error responses count: their mere presence proves liveness.
const ACCEPTED_STATUS: &[u16] = &[200, 301, 302, 401, 403, 500];

/// Alternate-port probing uses a stricter set (no 500).
const ALT_PORT_ACCEPTED: &[u16] = &[200, 301, 302, 401, 403];

/// Fallback ports tried over plain HTTP when both default-port attempts fail.
const ALT_PORTS: &[u16] = &[8080, 3000, 5000, 8000];

/// Shorter per-attempt budget for alternate-port fallbacks.
const ALT_PORT_TIMEOUT: Duration = Duration::from_secs(5);

/// Browser User-Agent pool; one is picked at random per attempt to reduce
/// trivial fingerprinting by the target.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Edge/120.0.0.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Android 14; Mobile; rv:121.0) Gecko/121.0 Firefox/121.0",
];

/// True iff a default-port response status confirms a live host.
pub fn is_accepted_status(code: u16) -> bool {
    ACCEPTED_STATUS.contains(&code)
}

/// True iff an alternate-port response status confirms a live host.
pub fn is_alt_port_accepted(code: u16) -> bool {
    ALT_PORT_ACCEPTED.contains(&code)
}

/// A successful HTTP attempt, before normalization into a `Finding`.
struct RawResponse {
    status: u16,
    server: String,
    content_type: String,
    final_url: String,
    body: String,
    content_length: u64,
    elapsed: f64,
}

/// Network-backed prober: DNS resolution, then HTTPS/HTTP attempts with
/// redirect following and invalid certificates accepted.
pub struct NetProber {
    client: reqwest::Client,
    resolver: Resolver,
    timeout: Duration,
    alt_ports: bool,
}

impl NetProber {
    pub fn new(timeout: Duration, alt_ports: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .redirect(redirect::Policy::limited(10))
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            resolver: Resolver::new(timeout),
            timeout,
            alt_ports,
        })
    }

    async fn check_inner(&self, label: &str, domain: &str) -> CheckOutcome {
        let fqdn = target::join_fqdn(label, domain);

        if !self.resolver.resolves(&fqdn).await {
            return CheckOutcome::NoHit;
        }

        // HTTPS first, then plain HTTP on the default ports. A non-accepted
        // status on one scheme still lets the other scheme try.
        for scheme in ["https", "http"] {
            let url = format!("{scheme}://{fqdn}");
            if let Some(raw) = self.attempt(&url, self.timeout).await {
                if is_accepted_status(raw.status) {
                    let ssl_info = if scheme == "https" {
                        extract::fetch_ssl_info(&fqdn).await
                    } else {
                        None
                    };
                    return CheckOutcome::Found(make_finding(fqdn, url, raw, ssl_info));
                }
            }
        }

        if self.alt_ports {
            for &port in ALT_PORTS {
                let url = format!("http://{fqdn}:{port}");
                if let Some(raw) = self.attempt(&url, ALT_PORT_TIMEOUT).await {
                    if is_alt_port_accepted(raw.status) {
                        let subdomain = format!("{fqdn}:{port}");
                        return CheckOutcome::Found(make_finding(subdomain, url, raw, None));
                    }
                }
            }
        }

        CheckOutcome::NoHit
    }

    /// One HTTP attempt. Any network-level failure (refused connect, TLS
    /// failure, timeout, unreadable body) is swallowed into `None`; this
    /// never distinguishes why an unreachable host was unreachable.
    async fn attempt(&self, url: &str, timeout: Duration) -> Option<RawResponse> {
        let start = Instant::now();
        let resp = self
            .client
            .get(url)
            .headers(self.request_headers())
            .timeout(timeout)
            .send()
            .await;

        let resp = match resp {
            Ok(r) => r,
            Err(e) => {
                debug!(url, error = %e, "http attempt failed");
                return None;
            }
        };
        let elapsed = start.elapsed().as_secs_f64();

        let status = resp.status().as_u16();
        let server = header_or_unknown(resp.headers(), header::SERVER);
        let content_type = header_or_unknown(resp.headers(), header::CONTENT_TYPE);
        let final_url = resp.url().to_string();
        let bytes = resp.bytes().await.ok()?;

        Some(RawResponse {
            status,
            server,
            content_type,
            final_url,
            content_length: bytes.len() as u64,
            body: String::from_utf8_lossy(&bytes).into_owned(),
            elapsed,
        })
    }

    fn request_headers(&self) -> HeaderMap {
        let ua = USER_AGENTS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(USER_AGENTS[0]);
        let mut h = HeaderMap::new();
        h.insert(header::USER_AGENT, HeaderValue::from_static(ua));
        h.insert(
            header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        h.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9"),
        );
        h.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        h.insert(
            header::UPGRADE_INSECURE_REQUESTS,
            HeaderValue::from_static("1"),
        );
        h.insert(header::CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
        h.insert(
            HeaderName::from_static("sec-fetch-dest"),
            HeaderValue::from_static("document"),
        );
        h.insert(
            HeaderName::from_static("sec-fetch-mode"),
            HeaderValue::from_static("navigate"),
        );
        h.insert(
            HeaderName::from_static("sec-fetch-site"),
            HeaderValue::from_static("none"),
        );
        h
    }
}

impl Prober for NetProber {
    fn check(&self, label: String, domain: String) -> impl Future<Output = CheckOutcome> + Send {
        async move { self.check_inner(&label, &domain).await }
    }
}

fn make_finding(
    subdomain: String,
    url: String,
    raw: RawResponse,
    ssl_info: Option<SslInfo>,
) -> Finding {
    Finding {
        subdomain,
        url,
        status_code: raw.status,
        content_length: raw.content_length,
        title: extract::extract_title(&raw.body),
        server: raw.server,
        content_type: raw.content_type,
        response_time: raw.elapsed,
        final_url: raw.final_url,
        ssl_info,
    }
}

fn header_or_unknown(headers: &HeaderMap, name: HeaderName) -> String {
    headers
        .get(&name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("Unknown")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_statuses_include_auth_walls_and_errors() {
        for code in [200, 301, 302, 401, 403, 500] {
            assert!(is_accepted_status(code), "{code} should be accepted");
        }
    }

    #[test]
    fn not_found_is_rejected() {
        assert!(!is_accepted_status(404));
        assert!(!is_accepted_status(204));
        assert!(!is_accepted_status(503));
    }

    #[test]
    fn alt_port_set_excludes_500() {
        assert!(is_alt_port_accepted(200));
        assert!(!is_alt_port_accepted(500));
    }

    #[test]
    fn user_agent_pool_is_usable() {
        assert!(!USER_AGENTS.is_empty());
        // All entries must be valid header values.
        for &ua in USER_AGENTS {
            assert!(HeaderValue::from_str(ua).is_ok());
        }
    }
}
