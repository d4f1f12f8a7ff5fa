use std::path::PathBuf;
use std::time::{Duration, Instant};

use tls_latency_rank::{input, report, scheduler};
use tls_latency_rank::scheduler::{ProbeSettings, DEFAULT_CONCURRENCY, DEFAULT_PORT, DEFAULT_TIMEOUT};

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// tls-latency-rank — measure TLS handshake latency to many IPs and rank the fastest.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "tls-latency-rank",
    version,
    about = "Measure TLS handshake latency to a list of IPs on port 443 and rank the fastest.",
    long_about = None
)]
struct Cli {
    /// Candidate list, one address per line.
    #[arg(long, default_value = "ip.txt")]
    input: PathBuf,

    /// Ranked report output path.
    #[arg(long, default_value = "test_results.txt")]
    output: PathBuf,

    /// Also write the full run summary as pretty JSON to this path (optional).
    #[arg(long)]
    json: Option<PathBuf>,

    /// TCP port to handshake on.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Max probes in flight at once.
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Per-stage timeout in milliseconds (connect, then handshake).
    #[arg(long = "timeout-ms", default_value_t = DEFAULT_TIMEOUT.as_millis() as u64)]
    timeout_ms: u64,

    /// How many of the fastest results to print.
    #[arg(long, default_value_t = 10)]
    top: usize,

    /// Disable the rolling progress line.
    #[arg(long = "no-progress", default_value_t = false)]
    no_progress: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let candidates = input::load_candidates_from_path(&cli.input)?;

    let settings = ProbeSettings {
        port: cli.port,
        timeout: Duration::from_millis(cli.timeout_ms),
        concurrency: cli.concurrency,
        show_progress: !cli.no_progress,
    };
    println!("{}", report::render_banner(&settings, candidates.len()));

    let started = Instant::now();
    let summary = scheduler::probe_candidates(candidates, settings).await?;

    report::save_report(&cli.output, &summary.results)?;
    report::print_summary(&summary, &cli.output);

    if let Some(path) = cli.json.as_deref() {
        if let Err(e) = report::write_results_json(path, &summary) {
            eprintln!("Failed to write JSON to {}: {}", path.display(), e);
        } else {
            println!("Wrote JSON results to {}\n", path.display());
        }
    }

    report::print_top(&summary.results, cli.top);
    report::print_elapsed(started.elapsed());

    Ok(())
}
