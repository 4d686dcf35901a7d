mod utils;
#[allow(unused)]
use utils::*;

use mock_service::{Behavior, Status};
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use volley::prelude::*;

#[tokio::test]
#[ntest::timeout(20_000)]
async fn paced_run_against_healthy_target_passes() {
    let server = mock(Behavior::default()).await;

    let config = env(&[
        ("MODE", "pace".into()),
        ("TARGET", server.url()),
        ("TOTAL", "20".into()),
    ])
    .duration(Duration::from_secs(1));
    let report = Scenario::new(config).await.unwrap();

    assert_eq!(report.http_reqs, 20);
    assert_eq!(report.counters.get(StatusFamily::Success), 20);
    assert_eq!(report.checks_passed, 20);
    assert_eq!(report.checks_failed, 0);
    assert_eq!(report.thresholds.failure_rate, 0.);
    assert!(report.passed());
    assert!(!report.halted);

    assert_eq!(server.stats.hits(), 20);
    assert_eq!(server.stats.cache_busted(), 0);
    assert_eq!(server.stats.no_cache(), 0);
}

#[tokio::test]
#[ntest::timeout(20_000)]
async fn constant_arrival_busts_caches() {
    let server = mock(Behavior::default()).await;

    let config = env(&[
        ("TARGET", server.url()),
        ("TOTAL", "20".into()),
        ("DURATION_S", "2".into()),
    ]);
    assert_eq!(config.mode, Mode::ConstantArrival);
    let report = Scenario::new(config).await.unwrap();

    assert!(
        (15..=21).contains(&report.http_reqs),
        "http_reqs {}",
        report.http_reqs
    );
    assert_eq!(report.dropped_iterations, 0);
    assert!(report.passed());

    let hits = server.stats.hits();
    assert_eq!(hits, report.http_reqs);
    assert_eq!(server.stats.cache_busted(), hits);
    assert_eq!(server.stats.no_cache(), hits);
}

#[tokio::test]
#[ntest::timeout(20_000)]
async fn two_percent_server_errors_fail_the_run() {
    let server = mock(Behavior::default().fail_every(50)).await;

    let config = RunConfig::new(Mode::FixedPace)
        .target(&server.url())
        .total_requests(NonZeroU32::new(100).unwrap())
        .duration(Duration::from_secs(1));
    let report = Scenario::new(config).await.unwrap();

    assert_eq!(report.http_reqs, 100);
    assert_eq!(report.counters.get(StatusFamily::Success), 98);
    assert_eq!(report.counters.get(StatusFamily::ServerError), 2);
    assert!((report.thresholds.failure_rate - 0.02).abs() < 1e-9);
    assert!(!report.passed());
    assert_eq!(report.thresholds.violations.len(), 1);
}

#[tokio::test]
#[ntest::timeout(20_000)]
async fn client_errors_fail_checks() {
    let server = mock(Behavior::default().status(Status::NOT_FOUND)).await;

    let config = RunConfig::new(Mode::FixedPace)
        .target(&server.url())
        .total_requests(NonZeroU32::new(10).unwrap())
        .duration(Duration::from_secs(1));
    let report = Scenario::new(config).await.unwrap();

    assert_eq!(report.counters.get(StatusFamily::ClientError), 10);
    assert_eq!(report.checks_failed, 10);
    assert_eq!(report.thresholds.failure_rate, 1.);
    assert!(!report.passed());
}

#[tokio::test]
#[ntest::timeout(20_000)]
async fn redirects_pass_checks() {
    let server = mock(Behavior::default().status(Status::FOUND)).await;

    let config = RunConfig::new(Mode::FixedPace)
        .target(&server.url())
        .total_requests(NonZeroU32::new(10).unwrap())
        .duration(Duration::from_secs(1));
    let report = Scenario::new(config).await.unwrap();

    assert_eq!(report.counters.get(StatusFamily::Redirection), 10);
    assert_eq!(report.checks_passed, 10);
    assert!(report.passed());
}

#[tokio::test]
#[ntest::timeout(20_000)]
async fn unreachable_target_counts_as_server_errors() {
    init();

    let config = RunConfig::new(Mode::FixedPace)
        .target("http://127.0.0.1:1")
        .total_requests(NonZeroU32::new(5).unwrap())
        .duration(Duration::from_secs(1));
    let report = Scenario::new(config).await.unwrap();

    assert_eq!(report.http_reqs, 5);
    assert_eq!(report.counters.get(StatusFamily::ServerError), 5);
    assert_eq!(report.checks_failed, 5);
    assert!(!report.passed());
    assert!(!report.halted);
}

#[tokio::test]
#[ntest::timeout(20_000)]
async fn writes_json_summary() -> anyhow::Result<()> {
    let server = mock(Behavior::default()).await;
    let path = std::env::temp_dir().join(format!("volley-summary-{}.json", std::process::id()));

    let config = env(&[
        ("MODE", "pace".into()),
        ("TARGET", server.url()),
        ("TOTAL", "5".into()),
        ("LABEL", "smoke".into()),
        ("SUMMARY_PATH", path.display().to_string()),
    ])
    .duration(Duration::from_secs(1));
    let report = Scenario::new(config).await?;

    let raw = std::fs::read_to_string(&path)?;
    std::fs::remove_file(&path)?;
    let summary: serde_json::Value = serde_json::from_str(&raw)?;

    assert_eq!(summary["label"], "smoke");
    assert_eq!(summary["mode"], "pace");
    assert_eq!(summary["http_reqs"], 5);
    assert_eq!(summary["counters"]["code_2xx"], 5);
    assert_eq!(summary["thresholds"]["passed"], true);
    assert!(report.csv_row().starts_with("smoke,5,5,"));
    Ok(())
}

#[tokio::test]
#[ntest::timeout(20_000)]
async fn forwards_increments_to_extra_sinks() {
    #[derive(Default)]
    struct Tally([AtomicU64; 4]);

    impl CounterSink for Tally {
        fn increment(&self, family: StatusFamily) {
            self.0[family.index()].fetch_add(1, Ordering::Relaxed);
        }
    }

    let server = mock(Behavior::default().fail_every(2)).await;
    let tally = Arc::new(Tally::default());

    let config = RunConfig::new(Mode::FixedPace)
        .target(&server.url())
        .total_requests(NonZeroU32::new(10).unwrap())
        .duration(Duration::from_secs(1));
    let report = Scenario::new(config).sink(tally.clone()).await.unwrap();

    assert_eq!(tally.0[StatusFamily::Success.index()].load(Ordering::Relaxed), 5);
    assert_eq!(
        tally.0[StatusFamily::ServerError.index()].load(Ordering::Relaxed),
        5
    );
    assert_eq!(report.counters.get(StatusFamily::ServerError), 5);
}

#[cfg(feature = "integration")]
mod integration {
    use super::*;

    #[tokio::test]
    #[ntest::timeout(60_000)]
    async fn sustained_rate_with_slow_target() {
        let server = mock(Behavior::default().delay(Duration::from_millis(50))).await;

        let config = RunConfig::new(Mode::ConstantArrival)
            .target(&server.url())
            .total_requests(NonZeroU32::new(1_000).unwrap())
            .duration(Duration::from_secs(10));
        assert_eq!(
            Schedule::for_config(&config),
            Schedule::ConstantArrival {
                rate_per_second: NonZeroU32::new(100).unwrap(),
                preallocated_workers: 300,
                max_workers: 2000,
            }
        );

        let report = Scenario::new(config).await.unwrap();

        assert!(
            (950..=1_001).contains(&report.http_reqs),
            "http_reqs {}",
            report.http_reqs
        );
        assert_eq!(report.dropped_iterations, 0);
        assert!(report.latency_p50 >= Duration::from_millis(50));
        assert!(report.passed());
    }
}
