use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::net::TcpStream;
use tokio::time;
use tracing::debug;
use x509_parser::prelude::*;
use ::time::format_description::well_known;

use crate::types::SslInfo;

/// Sentinel title used when no pattern matches the response body.
pub const NO_TITLE: &str = "No title";

/// Cap on extracted title length, in characters.
const TITLE_MAX_CHARS: usize = 150;

/// Timeout for the dedicated certificate-summary handshake.
const TLS_INFO_TIMEOUT: Duration = Duration::from_secs(5);

/// Title patterns tried in order; first match wins. This is a best-effort
/// text search over the body, not an HTML parser, so malformed markup may
/// simply yield no match.
static TITLE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?is)<title[^>]*>\s*([^<]+?)\s*</title>").unwrap(),
        Regex::new(r#"(?is)<meta[^>]*property=["']og:title["'][^>]*content=["']([^"']+)["']"#)
            .unwrap(),
        Regex::new(r#"(?is)<meta[^>]*name=["']title["'][^>]*content=["']([^"']+)["']"#).unwrap(),
    ]
});

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Extract a page title from a response body.
///
/// Tries the HTML `<title>` tag, then the Open Graph title meta tag, then a
/// generic title meta tag. Inner whitespace is collapsed to single spaces and
/// the result truncated to 150 characters; if nothing matches, returns the
/// `"No title"` sentinel.
pub fn extract_title(body: &str) -> String {
    for pattern in TITLE_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(body) {
            if let Some(m) = caps.get(1) {
                let title = WHITESPACE.replace_all(m.as_str(), " ").trim().to_string();
                if !title.is_empty() {
                    return truncate_chars(&title, TITLE_MAX_CHARS);
                }
            }
        }
    }
    NO_TITLE.to_string()
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

/// Retrieve a TLS certificate summary for `host` via a dedicated handshake
/// to port 443.
///
/// Invalid certificates are accepted (reconnaissance context); any failure
/// along the way yields `None`, never an error.
pub async fn fetch_ssl_info(host: &str) -> Option<SslInfo> {
    let connector = native_tls::TlsConnector::builder()
        .danger_accept_invalid_certs(true)
        .danger_accept_invalid_hostnames(true)
        .build()
        .ok()?;
    let connector = tokio_native_tls::TlsConnector::from(connector);

    let tcp = time::timeout(TLS_INFO_TIMEOUT, TcpStream::connect((host, 443)))
        .await
        .ok()?
        .ok()?;
    let tls = time::timeout(TLS_INFO_TIMEOUT, connector.connect(host, tcp))
        .await
        .ok()?
        .ok()?;

    let cert = tls.get_ref().peer_certificate().ok()??;
    let der = cert.to_der().ok()?;
    let (_, x509) = parse_x509_certificate(&der).ok()?;

    let not_after = x509
        .validity()
        .not_after
        .to_datetime()
        .format(&well_known::Rfc3339)
        .unwrap_or_else(|_| x509.validity().not_after.to_string());

    debug!(host, subject = %x509.subject(), "retrieved certificate summary");
    Some(SslInfo {
        issuer: x509.issuer().to_string(),
        subject: x509.subject().to_string(),
        version: x509.version().0,
        not_after,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_tag_wins() {
        let body = "<html><head><title> Example Site </title></head></html>";
        assert_eq!(extract_title(body), "Example Site");
    }

    #[test]
    fn og_title_fallback() {
        let body = r#"<html><head><meta property="og:title" content="OG Title"></head></html>"#;
        assert_eq!(extract_title(body), "OG Title");
    }

    #[test]
    fn meta_name_title_fallback() {
        let body = r#"<head><meta name="title" content="Meta Title"></head>"#;
        assert_eq!(extract_title(body), "Meta Title");
    }

    #[test]
    fn title_tag_preferred_over_og() {
        let body = r#"<title>Real</title><meta property="og:title" content="OG">"#;
        assert_eq!(extract_title(body), "Real");
    }

    #[test]
    fn no_title_sentinel() {
        assert_eq!(extract_title("<html><body>nothing here</body></html>"), NO_TITLE);
        assert_eq!(extract_title(""), NO_TITLE);
        assert_eq!(extract_title("<title>   </title>"), NO_TITLE);
    }

    #[test]
    fn whitespace_collapsed() {
        let body = "<title>Multi\n   line\t\ttitle</title>";
        assert_eq!(extract_title(body), "Multi line title");
    }

    #[test]
    fn long_title_truncated() {
        let long = "x".repeat(400);
        let body = format!("<title>{long}</title>");
        assert_eq!(extract_title(&body).chars().count(), 150);
    }

    #[test]
    fn case_insensitive_tags() {
        let body = "<TITLE>Upper</TITLE>";
        assert_eq!(extract_title(body), "Upper");
    }
}
