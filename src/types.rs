use serde::{Deserialize, Serialize};

/// One confirmed-live subdomain with captured metadata.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Finding {
    pub subdomain: String,
    pub url: String,
    pub status_code: u16,
    pub content_length: u64,
    pub title: String,
    pub server: String,
    pub content_type: String,
    pub response_time: f64,
    pub final_url: String,
    pub ssl_info: Option<SslInfo>,
}

/// Opportunistic TLS certificate summary for an HTTPS finding.
///
/// Metadata extraction only; no trust or chain validation happens here.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SslInfo {
    pub issuer: String,
    pub subject: String,
    pub version: u32,
    pub not_after: String,
}

/// Outcome of checking one candidate label.
///
/// Expected negative outcomes (NXDOMAIN, refused connects, timeouts,
/// non-accepted status codes) are `NoHit`, never an error. `Failed` is
/// reserved for genuinely unexpected failures inside a worker; the scan
/// logs those and keeps going.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    Found(Finding),
    NoHit,
    Failed(String),
}

/// Events streamed to the consumer while a scan runs.
///
/// The JSON shape is part of the wire contract with the web UI:
/// a tagged object with `"type"` of `progress`, `result` or `complete`.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScanEvent {
    Progress {
        total: u64,
        scanned: u64,
        found: u64,
    },
    Result(Finding),
    Complete {
        subdomains: Vec<Finding>,
        wordlist_size: u64,
        total_checked: u64,
        found_count: u64,
    },
}

/// Aggregate result of a full scan, returned by the non-streaming path.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ScanSummary {
    pub domain: String,
    pub total_checked: u64,
    pub found_count: u64,
    pub subdomains: Vec<Finding>,
    pub wordlist_size: u64,
}
