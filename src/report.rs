use crate::limiter::ConcurrencyLimiter;
use crate::scheduler::ProbeSettings;
use crate::types::{ProbeOutcome, ProbeSummary, ResultSet};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

pub const REPORT_HEADER: &str = "IP address\t\tTLS latency\tstatus";
pub const REPORT_SEPARATOR: &str = "----------------------------------------";
pub const STATUS_AVAILABLE: &str = "available";

/// `<address padded to 20> <latency>ms\t<status>`, shared by the file and the console.
pub fn format_line(outcome: &ProbeOutcome) -> String {
    format!(
        "{:<20} {:.1}ms\t{}",
        outcome.address, outcome.latency_ms, STATUS_AVAILABLE
    )
}

/// Two header lines, then one line per outcome in ranked order.
pub fn write_report<W: Write>(mut w: W, results: &ResultSet) -> std::io::Result<()> {
    writeln!(w, "{REPORT_HEADER}")?;
    writeln!(w, "{REPORT_SEPARATOR}")?;
    for outcome in results {
        writeln!(w, "{}", format_line(outcome))?;
    }
    w.flush()
}

/// Persist the full ranked list. Errors if the file cannot be created or written.
pub fn save_report(path: &Path, results: &ResultSet) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create report file: {}", path.display()))?;
    write_report(BufWriter::new(file), results)
        .with_context(|| format!("failed to write report file: {}", path.display()))
}

pub fn write_results_json(path: &Path, summary: &ProbeSummary) -> Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), summary)?;
    Ok(())
}

/// Startup banner. Concurrency is shown as the limiter will enforce it.
pub fn render_banner(settings: &ProbeSettings, total: usize) -> String {
    format!(
        "\n[about]\n\
         TLS handshake latency test on port {port}\n\
         \n[config]\n\
         \x20 port         : {port} (TLS)\n\
         \x20 concurrency  : {concurrency}\n\
         \x20 timeout      : {timeout:.1}s\n\
         \nRead {total} candidate IPs\n",
        port = settings.port,
        concurrency = ConcurrencyLimiter::effective_capacity(settings.concurrency),
        timeout = settings.timeout.as_secs_f64(),
    )
}

pub fn print_summary(summary: &ProbeSummary, report_path: &Path) {
    println!(
        "\n\nDone! Found {} available IPs (of {} probed)",
        summary.results.len(),
        summary.completed
    );
    println!(
        "Dropped: connect {} / handshake {} / slow {}",
        summary.failures.connect, summary.failures.handshake, summary.failures.slow
    );
    println!("Results saved to {}\n", report_path.display());
}

pub fn print_top(results: &ResultSet, n: usize) {
    println!("Lowest-latency {n} available IPs:");
    println!("{REPORT_SEPARATOR}");
    println!("{REPORT_HEADER}");
    println!("{REPORT_SEPARATOR}");
    for outcome in results.top(n) {
        println!("{}", format_line(outcome));
    }
}

pub fn print_elapsed(elapsed: Duration) {
    println!("\nTotal time: {:.1}s", elapsed.as_secs_f64());
}
