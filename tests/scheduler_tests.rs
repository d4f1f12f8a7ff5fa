mod common;

use std::time::Duration;

use common::{spawn_silent_listener, temp_path, FakeHandshaker};
use tls_latency_rank::report::{save_report, REPORT_HEADER, REPORT_SEPARATOR};
use tls_latency_rank::scheduler::{ProbeSettings, Scheduler};

fn settings(port: u16, concurrency: usize) -> ProbeSettings {
    ProbeSettings {
        port,
        timeout: Duration::from_millis(500),
        concurrency,
        show_progress: false,
    }
}

fn repeat(address: &str, n: usize) -> Vec<String> {
    vec![address.to_string(); n]
}

#[tokio::test]
async fn zero_candidates_complete_immediately() {
    let scheduler = Scheduler::new(settings(443, 8), FakeHandshaker::accepting(Duration::ZERO));
    let summary = scheduler.run(Vec::new()).await.unwrap();
    assert_eq!(summary.total, 0);
    assert_eq!(summary.completed, 0);
    assert!(summary.results.is_empty());
    assert_eq!(summary.peak_in_flight, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn in_flight_never_exceeds_ceiling() {
    let port = spawn_silent_listener().await;
    let scheduler = Scheduler::new(
        settings(port, 4),
        FakeHandshaker::accepting(Duration::from_millis(30)),
    );
    let summary = tokio::time::timeout(
        Duration::from_secs(10),
        scheduler.run(repeat("127.0.0.1", 40)),
    )
    .await
    .expect("run finishes")
    .unwrap();

    assert_eq!(summary.total, 40);
    assert_eq!(summary.completed, 40);
    assert_eq!(summary.succeeded, 40);
    assert_eq!(summary.results.len(), 40);
    assert!(summary.peak_in_flight >= 1);
    assert!(summary.peak_in_flight <= 4, "peak {}", summary.peak_in_flight);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn finished_tasks_are_reaped_while_launching() {
    // Nothing listens on port 1, so every candidate is refused quickly.
    let scheduler = Scheduler::new(settings(1, 4), FakeHandshaker::accepting(Duration::ZERO));
    let summary = scheduler.run(repeat("127.0.0.1", 400)).await.unwrap();

    assert_eq!(summary.completed, 400);
    assert_eq!(summary.failures.connect, 400);
    assert!(summary.peak_in_flight <= 4);
    assert!(
        summary.peak_pending_tasks < 100,
        "pending tasks grew to {}",
        summary.peak_pending_tasks
    );
}

#[tokio::test]
async fn peak_in_flight_is_per_run() {
    let port = spawn_silent_listener().await;
    let scheduler = Scheduler::new(
        settings(port, 8),
        FakeHandshaker::accepting(Duration::from_millis(50)),
    );
    let first = scheduler.run(repeat("127.0.0.1", 8)).await.unwrap();
    assert_eq!(first.peak_in_flight, 8);

    let second = scheduler.run(repeat("127.0.0.1", 1)).await.unwrap();
    assert_eq!(second.peak_in_flight, 1);
    assert_eq!(second.completed, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn results_are_sorted_by_latency() {
    let port = spawn_silent_listener().await;
    let delays = [40, 0, 20, 10, 30]
        .into_iter()
        .map(Duration::from_millis)
        .collect();
    let scheduler = Scheduler::new(settings(port, 3), FakeHandshaker::with_delays(delays));
    let summary = scheduler.run(repeat("127.0.0.1", 15)).await.unwrap();

    assert_eq!(summary.results.len(), 15);
    let latencies: Vec<f64> = summary.results.iter().map(|o| o.latency_ms).collect();
    assert!(latencies.windows(2).all(|w| w[0] <= w[1]), "{latencies:?}");
}

#[tokio::test]
async fn handshake_failures_are_counted_not_returned() {
    let port = spawn_silent_listener().await;
    let scheduler = Scheduler::new(settings(port, 8), FakeHandshaker::rejecting(&["127.0.0.1"]));
    let summary = scheduler.run(repeat("127.0.0.1", 3)).await.unwrap();

    assert!(summary.results.is_empty());
    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.completed, 3);
    assert_eq!(summary.failures.handshake, 3);
    assert_eq!(summary.failures.total() + summary.succeeded, summary.completed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn two_reachable_one_unreachable_end_to_end() {
    let port = spawn_silent_listener().await;
    let scheduler = Scheduler::new(
        settings(port, 2000),
        FakeHandshaker::accepting(Duration::from_millis(5)),
    );
    // The listener only serves IPv4 loopback, so ::1 cannot connect.
    let candidates = vec![
        "127.0.0.1".to_string(),
        "::1".to_string(),
        "127.0.0.1".to_string(),
    ];
    let summary = scheduler.run(candidates).await.unwrap();

    assert_eq!(summary.results.len(), 2);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failures.connect, 1);
    assert!(summary.results.iter().all(|o| o.address == "127.0.0.1"));

    let path = temp_path("e2e-report.txt");
    save_report(&path, &summary.results).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    let _ = std::fs::remove_file(&path);
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], REPORT_HEADER);
    assert_eq!(lines[1], REPORT_SEPARATOR);
    assert!(lines[2..].iter().all(|l| l.ends_with("ms\tavailable")));
}
