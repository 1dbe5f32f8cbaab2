use std::{sync::Arc, time::Duration};

use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use tower_http::services::ServeDir;
use tracing::{error, info};
use ::time::{format_description::well_known, OffsetDateTime};

use crate::{
    probe::NetProber,
    scanner::{self, ScanConfig},
    target,
    types::{ScanEvent, ScanSummary},
};

/// Capacity of the engine event channel feeding the status endpoints.
const EVENT_BUFFER: usize = 64;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<RwLock<ServerState>>, // shared mutable state for progress/results
    wordlist: Arc<Vec<String>>,
}

#[derive(Debug)]
struct ServerState {
    status: Status,
    results: Option<ScanSummary>,
    cancel: Option<CancellationToken>,
    /// Bumped for every scan started. A finished scan may only write its
    /// outcome back while its epoch is still the current one.
    epoch: u64,
}

#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub struct Status {
    pub total: u64,
    pub scanned: u64,
    pub found: u64,
    pub state: String, // "idle" | "running" | "done"
    pub started_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    pub domain: String,
    #[serde(default)]
    pub concurrency: Option<usize>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub alt_ports: Option<bool>,
}

impl AppState {
    fn new(wordlist: Vec<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ServerState {
                status: Status {
                    total: 0,
                    scanned: 0,
                    found: 0,
                    state: "idle".into(),
                    started_at: None,
                },
                results: None,
                cancel: None,
                epoch: 0,
            })),
            wordlist: Arc::new(wordlist),
        }
    }

    /// Install a new scan as current, cancelling any scan already in flight.
    /// Returns the new scan's epoch and a snapshot of the stored status.
    async fn begin_scan(&self, total: u64, cancel: CancellationToken) -> (u64, Status) {
        let mut s = self.inner.write().await;
        if let Some(c) = s.cancel.take() {
            c.cancel();
        }
        s.epoch += 1;
        s.status = Status {
            total,
            scanned: 0,
            found: 0,
            state: "running".into(),
            started_at: Some(now_rfc3339()),
        };
        s.results = None;
        s.cancel = Some(cancel);
        (s.epoch, s.status.clone())
    }

    async fn record_progress(&self, epoch: u64, scanned: u64, found: u64) {
        let mut s = self.inner.write().await;
        if s.epoch != epoch {
            return;
        }
        s.status.scanned = scanned;
        s.status.found = found;
    }

    async fn record_result(&self, epoch: u64) {
        let mut s = self.inner.write().await;
        if s.epoch != epoch {
            return;
        }
        s.status.found += 1;
    }

    /// Write back a finished scan's outcome. A scan that was superseded by a
    /// newer one (its token cancelled, a fresh epoch installed) still runs to
    /// completion, but must leave the current scan's state untouched.
    async fn finish_scan(&self, epoch: u64, res: Result<ScanSummary>) {
        let mut s = self.inner.write().await;
        if s.epoch != epoch {
            info!(epoch, "superseded scan finished; dropping its outcome");
            return;
        }
        match res {
            Ok(summary) => {
                s.status.scanned = summary.total_checked;
                s.status.found = summary.found_count;
                s.status.state = "done".into();
                s.results = Some(summary);
                s.cancel = None;
            }
            Err(e) => {
                s.status.state = "idle".into();
                s.cancel = None;
                error!(error = %e, "scan failed");
            }
        }
    }
}

pub async fn spawn_server(bind: &str, wordlist: Vec<String>) -> Result<()> {
    let state = AppState::new(wordlist);

    let api = Router::new()
        .route("/status", get(get_status))
        .route("/scan", post(post_scan))
        .route("/scan/sync", post(post_scan_sync))
        .route("/cancel", post(post_cancel))
        .route("/results", get(get_results))
        .with_state(state.clone());

    let static_svc = ServeDir::new("ui").append_index_html_on_directories(true);

    let app = Router::new().nest("/api", api).fallback_service(static_svc);

    println!("Serving UI on http://{}", bind);
    axum::serve(tokio::net::TcpListener::bind(bind).await?, app).await?;
    Ok(())
}

async fn get_status(State(app): State<AppState>) -> impl IntoResponse {
    let s = app.inner.read().await;
    (StatusCode::OK, Json(s.status.clone()))
}

async fn get_results(State(app): State<AppState>) -> impl IntoResponse {
    let s = app.inner.read().await;
    if let Some(res) = s.results.as_ref() {
        (StatusCode::OK, Json(res.clone())).into_response()
    } else {
        StatusCode::NO_CONTENT.into_response()
    }
}

async fn post_cancel(State(app): State<AppState>) -> impl IntoResponse {
    let mut s = app.inner.write().await;
    if let Some(c) = s.cancel.take() {
        c.cancel();
        (StatusCode::ACCEPTED, "cancelling").into_response()
    } else {
        (StatusCode::CONFLICT, "no scan running").into_response()
    }
}

async fn post_scan(State(app): State<AppState>, Json(req): Json<ScanRequest>) -> impl IntoResponse {
    // Invalid input is rejected here, before any scanning starts.
    let domain = match target::sanitize_domain(&req.domain) {
        Ok(d) => d,
        Err(e) => return (StatusCode::BAD_REQUEST, format!("invalid domain: {e}")).into_response(),
    };

    let config = request_config(&req);
    let prober = match NetProber::new(config.timeout, req.alt_ports.unwrap_or(false)) {
        Ok(p) => Arc::new(p),
        Err(e) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, format!("prober init: {e}"))
                .into_response()
        }
    };

    let candidates = app.wordlist.as_ref().clone();
    let total = candidates.len() as u64;
    let cancel = CancellationToken::new();
    let (tx, mut rx) = mpsc::channel::<ScanEvent>(EVENT_BUFFER);

    let (epoch, status) = app.begin_scan(total, cancel.clone()).await;

    // Run the engine and drain its event stream into the polled status.
    let app2 = app.clone();
    tokio::spawn(async move {
        let engine = scanner::run_scan(&domain, candidates, config, prober, tx, cancel);

        let consumer = async {
            while let Some(ev) = rx.recv().await {
                match ev {
                    ScanEvent::Progress { scanned, found, .. } => {
                        app2.record_progress(epoch, scanned, found).await;
                    }
                    ScanEvent::Result(f) => {
                        info!(subdomain = %f.subdomain, status = f.status_code, "live result");
                        app2.record_result(epoch).await;
                    }
                    ScanEvent::Complete { .. } => {}
                }
            }
        };

        let (res, ()) = tokio::join!(engine, consumer);
        app2.finish_scan(epoch, res).await;
    });

    (StatusCode::ACCEPTED, Json(status)).into_response()
}

/// Non-streaming variant: runs the whole scan before responding with the
/// full summary. Independent of the polled scan state.
async fn post_scan_sync(
    State(app): State<AppState>,
    Json(req): Json<ScanRequest>,
) -> impl IntoResponse {
    let config = request_config(&req);
    let prober = match NetProber::new(config.timeout, req.alt_ports.unwrap_or(false)) {
        Ok(p) => Arc::new(p),
        Err(e) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, format!("prober init: {e}"))
                .into_response()
        }
    };

    let candidates = app.wordlist.as_ref().clone();
    let (tx, mut rx) = mpsc::channel::<ScanEvent>(EVENT_BUFFER);
    // Nobody streams these events; drain them so the engine never blocks.
    tokio::spawn(async move { while rx.recv().await.is_some() {} });

    match scanner::run_scan(
        &req.domain,
        candidates,
        config,
        prober,
        tx,
        CancellationToken::new(),
    )
    .await
    {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => (StatusCode::BAD_REQUEST, format!("{e}")).into_response(),
    }
}

fn request_config(req: &ScanRequest) -> ScanConfig {
    ScanConfig {
        concurrency: req.concurrency.unwrap_or(scanner::DEFAULT_CONCURRENCY),
        timeout: req
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(scanner::DEFAULT_TIMEOUT),
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&well_known::Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}
