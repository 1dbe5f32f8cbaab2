use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use sub_scan_rs::probe::NetProber;
use sub_scan_rs::scanner::{self, ScanConfig};
use sub_scan_rs::types::{ScanEvent, ScanSummary};
use sub_scan_rs::{server, wordlist};

use serde_json;
use std::fs::File;

use anyhow::Result;
use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// sub-scan-rs — Fast async subdomain discovery scanner with a tiny embedded web UI.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "sub-scan-rs",
    version,
    about = "Fast async subdomain discovery scanner with a tiny embedded web UI.",
    long_about = None
)]
struct Cli {
    /// Target domain (e.g., example.com). A leading scheme or path is stripped.
    domain: Option<String>,

    /// Path to wordlist file (one subdomain label per line).
    #[arg(long, default_value = "wordlist.txt")]
    wordlist: PathBuf,

    /// Max concurrent candidate checks (capped at 200).
    #[arg(long, default_value_t = scanner::DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Per-probe timeout in seconds.
    #[arg(long = "timeout-secs", default_value_t = 8)]
    timeout_secs: u64,

    /// Also try plain HTTP on ports 8080, 3000, 5000 and 8000 as a fallback.
    #[arg(long = "alt-ports", default_value_t = false)]
    alt_ports: bool,

    /// Write results as pretty JSON to this path (optional).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Start the embedded HTTP UI server (serves static UI and scan API).
    #[arg(long = "serve-ui", default_value_t = false)]
    serve_ui: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    println!("sub-scan-rs configuration:");
    println!(
        "  domain       : {}",
        cli.domain.as_deref().unwrap_or("<none>")
    );
    println!("  wordlist     : {}", cli.wordlist.display());
    println!("  concurrency  : {}", cli.concurrency);
    println!("  timeout_secs : {}", cli.timeout_secs);
    println!("  alt_ports    : {}", cli.alt_ports);
    println!(
        "  output       : {}",
        cli.output
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<none>".to_string())
    );
    println!("  serve_ui     : {}", cli.serve_ui);

    let candidates = wordlist::load_wordlist_or_default(&cli.wordlist)?;
    println!("Loaded {} candidate labels", candidates.len());

    // Start embedded UI server if requested (non-blocking background task)
    if cli.serve_ui {
        let bind = "127.0.0.1:8080";
        let server_wordlist = candidates.clone();
        tokio::spawn(async move {
            if let Err(e) = server::spawn_server(bind, server_wordlist).await {
                eprintln!("HTTP UI server error: {e}");
            }
        });
        println!("UI server starting at http://{} (Ctrl+C to stop)", bind);
    }

    if let Some(domain) = cli.domain.clone() {
        let timeout = Duration::from_secs(cli.timeout_secs);
        let config = ScanConfig {
            concurrency: cli.concurrency,
            timeout,
        };
        let prober = Arc::new(NetProber::new(timeout, cli.alt_ports)?);

        let cancel = CancellationToken::new();
        let cancel_ctrlc = cancel.clone();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            cancel_ctrlc.cancel();
        });

        let (tx, mut rx) = mpsc::channel::<ScanEvent>(64);
        let handle = tokio::spawn(async move {
            scanner::run_scan(&domain, candidates, config, prober, tx, cancel).await
        });

        while let Some(ev) = rx.recv().await {
            match ev {
                ScanEvent::Result(f) => {
                    println!("Found: {} [{}] {}", f.subdomain, f.status_code, f.title)
                }
                ScanEvent::Progress {
                    total,
                    scanned,
                    found,
                } => println!("Progress: {scanned}/{total} ({found} found)"),
                ScanEvent::Complete { .. } => {}
            }
        }

        let summary = handle.await??;
        print_results_table(&summary);

        if let Some(path) = cli.output.as_deref() {
            if let Err(e) = write_results_json(path, &summary) {
                eprintln!("Failed to write JSON to {}: {}", path.display(), e);
            } else {
                println!("Wrote JSON results to {}", path.display());
            }
        }
    } else if !cli.serve_ui {
        println!("\nNothing to do: pass a domain to scan, or --serve-ui for the web UI.");
    }

    // If UI is running, keep the process alive until Ctrl+C.
    if cli.serve_ui {
        println!("Press Ctrl+C to stop the server...");
        let _ = tokio::signal::ctrl_c().await;
    }

    Ok(())
}

fn print_results_table(summary: &ScanSummary) {
    let mut sub_w = "subdomain".len();
    let mut server_w = "server".len();
    let mut title_w = "title".len();
    for f in &summary.subdomains {
        sub_w = sub_w.max(f.subdomain.len());
        server_w = server_w.max(f.server.len().min(30));
        title_w = title_w.max(f.title.len().min(60));
    }
    let status_w = "status".len();

    println!(
        "\nFound subdomains: {} (checked: {})",
        summary.found_count, summary.total_checked
    );
    println!(
        "{:<sub_w$}  {:>status_w$}  {:<server_w$}  {:<title_w$}",
        "subdomain",
        "status",
        "server",
        "title",
        sub_w = sub_w,
        status_w = status_w,
        server_w = server_w,
        title_w = title_w
    );
    println!(
        "{:-<sub_w$}  {:-<status_w$}  {:-<server_w$}  {:-<title_w$}",
        "",
        "",
        "",
        "",
        sub_w = sub_w,
        status_w = status_w,
        server_w = server_w,
        title_w = title_w
    );
    for f in &summary.subdomains {
        let server: String = f.server.chars().take(30).collect();
        let title: String = f.title.chars().take(60).collect();
        println!(
            "{:<sub_w$}  {:>status_w$}  {:<server_w$}  {:<title_w$}",
            f.subdomain,
            f.status_code,
            server,
            title,
            sub_w = sub_w,
            status_w = status_w,
            server_w = server_w,
            title_w = title_w
        );
    }
}

fn write_results_json(path: &std::path::Path, summary: &ScanSummary) -> anyhow::Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, summary)?;
    Ok(())
}
