use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::target;
use crate::types::{CheckOutcome, Finding, ScanEvent, ScanSummary};

/// Hard cap on concurrent candidate checks, bounding socket and memory use.
pub const MAX_CONCURRENCY: usize = 200;

/// Default number of concurrent candidate checks.
pub const DEFAULT_CONCURRENCY: usize = 100;

/// Default per-probe timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);

/// A progress event is emitted every this many completed candidates, plus
/// once at the very end, to bound event volume without starving liveness.
const PROGRESS_EVERY: u64 = 10;

/// Seam between the orchestrator and the network.
///
/// The real implementation is `probe::NetProber` (DNS resolution followed by
/// HTTPS/HTTP attempts); tests drive the orchestrator with a mock instead.
pub trait Prober: Send + Sync + 'static {
    /// Check one candidate label against the target domain.
    fn check(&self, label: String, domain: String) -> impl Future<Output = CheckOutcome> + Send;
}

/// Per-scan tunables.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Concurrent candidate checks, clamped to `[1, MAX_CONCURRENCY]`.
    pub concurrency: usize,
    /// Per-probe timeout.
    pub timeout: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Scan-scoped mutable state. One instance per scan invocation, owned by
/// `run_scan` and shared only with that scan's workers; independent scans
/// never see each other's counters or ledger.
struct ScanSession {
    total: u64,
    scanned: AtomicU64,
    found: AtomicU64,
    /// Dedup ledger: lowercased hosts already reported in this scan.
    seen: Mutex<HashSet<String>>,
    findings: Mutex<Vec<Finding>>,
}

impl ScanSession {
    fn new(total: u64) -> Self {
        Self {
            total,
            scanned: AtomicU64::new(0),
            found: AtomicU64::new(0),
            seen: Mutex::new(HashSet::new()),
            findings: Mutex::new(Vec::new()),
        }
    }

    /// Atomic check-then-mark over the dedup ledger. Returns true iff this
    /// caller is the first to report `subdomain` in the current scan.
    async fn claim(&self, subdomain: &str) -> bool {
        self.seen.lock().await.insert(subdomain.to_lowercase())
    }

    fn progress_event(&self) -> ScanEvent {
        // Read `found` first; paired with the increment order in the worker
        // this keeps `found <= scanned` in every snapshot.
        let found = self.found.load(Ordering::Acquire);
        let scanned = self.scanned.load(Ordering::Acquire);
        ScanEvent::Progress {
            total: self.total,
            scanned,
            found,
        }
    }
}

/// Run a full subdomain scan, streaming `ScanEvent`s to `events` as work
/// completes and returning the final summary.
///
/// - Workers run under a `Semaphore` bound; each candidate is one task.
/// - Events follow completion order, not candidate order; the final
///   `Complete` event carries findings sorted by subdomain for determinism.
/// - Cancellation is best-effort: no new tasks are dispatched and no further
///   findings are emitted, but in-flight probes are left to finish or time
///   out on their own.
/// - A worker failure (or panic) is logged and counted as scanned with no
///   hit; it never aborts the scan.
///
/// Only invalid top-level input (an empty domain) produces an error, and it
/// does so before any probing starts.
pub async fn run_scan<P: Prober>(
    domain: &str,
    candidates: Vec<String>,
    config: ScanConfig,
    prober: Arc<P>,
    events: mpsc::Sender<ScanEvent>,
    cancel: CancellationToken,
) -> Result<ScanSummary> {
    let domain = target::sanitize_domain(domain)?;
    let total = candidates.len() as u64;
    let concurrency = config.concurrency.clamp(1, MAX_CONCURRENCY);

    info!(domain = %domain, total, concurrency, "starting subdomain scan");

    let session = Arc::new(ScanSession::new(total));
    let sem = Arc::new(Semaphore::new(concurrency));
    let mut set = JoinSet::new();

    for label in candidates {
        if cancel.is_cancelled() {
            break;
        }
        let permit = sem
            .clone()
            .acquire_owned()
            .await
            .expect("semaphore in scope");
        let session = session.clone();
        let prober = prober.clone();
        let events = events.clone();
        let cancel = cancel.clone();
        let domain = domain.clone();

        set.spawn(async move {
            let _permit = permit; // keep permit until task completes

            if cancel.is_cancelled() {
                return;
            }

            let outcome = prober.check(label.clone(), domain).await;

            // `scanned` rises before `found` so a progress snapshot can
            // never show more findings than completed checks.
            let done = session.scanned.fetch_add(1, Ordering::Release) + 1;

            match outcome {
                CheckOutcome::Found(finding) => {
                    // The ledger gate is what keeps two candidate spellings
                    // of the same host from both reporting.
                    if session.claim(&finding.subdomain).await && !cancel.is_cancelled() {
                        session.found.fetch_add(1, Ordering::Release);
                        session.findings.lock().await.push(finding.clone());
                        info!(subdomain = %finding.subdomain, status = finding.status_code, "found");
                        let _ = events.send(ScanEvent::Result(finding)).await;
                    }
                }
                CheckOutcome::NoHit => {}
                CheckOutcome::Failed(reason) => {
                    warn!(label = %label, reason = %reason, "candidate check failed unexpectedly");
                }
            }

            if done % PROGRESS_EVERY == 0 || done == session.total {
                let _ = events.send(session.progress_event()).await;
            }
        });
    }

    while let Some(res) = set.join_next().await {
        if let Err(e) = res {
            if e.is_panic() {
                // A panic can only come from `check`, which runs before the
                // worker counts its candidate.
                warn!(error = %e, "scan worker panicked; counting candidate as scanned");
                session.scanned.fetch_add(1, Ordering::Release);
            }
        }
    }

    let mut findings = std::mem::take(&mut *session.findings.lock().await);
    findings.sort_by(|a, b| a.subdomain.cmp(&b.subdomain));

    let scanned = session.scanned.load(Ordering::Acquire);
    let found_count = findings.len() as u64;

    let _ = events
        .send(ScanEvent::Complete {
            subdomains: findings.clone(),
            wordlist_size: total,
            total_checked: scanned,
            found_count,
        })
        .await;

    info!(domain = %domain, scanned, found_count, "scan complete");

    Ok(ScanSummary {
        domain,
        total_checked: scanned,
        found_count,
        subdomains: findings,
        wordlist_size: total,
    })
}
