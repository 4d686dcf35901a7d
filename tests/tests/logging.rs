// Tests asserting on captured logs. `#[traced_test]` installs its own global
// subscriber, so these live in a separate test binary from the ones that call
// `utils::init()`.
mod utils;
#[allow(unused)]
use utils::*;

use std::num::NonZeroU32;
use std::time::Duration;
use tracing_test::traced_test;
use volley::prelude::*;

#[traced_test]
#[tokio::test]
#[ntest::timeout(20_000)]
async fn consecutive_transport_failures_halt_the_run() {
    let config = env(&[
        ("MODE", "pace".into()),
        ("TARGET", "http://127.0.0.1:1".into()),
        ("TOTAL", "50".into()),
        ("MAX_CONSECUTIVE_FAILURES", "3".into()),
    ])
    .duration(Duration::from_secs(1));
    let report = Scenario::new(config).await.unwrap();

    assert!(report.halted);
    assert_eq!(report.http_reqs, 3);
    assert!(!report.passed());
    assert!(logs_contain("3 consecutive transport failures"));
    assert!(logs_contain("Run halted after 3 iterations"));
}

#[traced_test]
#[test]
fn pace_mode_ignores_duration_from_environment() {
    let config = env(&[
        ("MODE", "pace".into()),
        ("TOTAL", "5000".into()),
        ("DURATION_S", "10".into()),
    ]);
    let scenario = Scenario::new(config);

    assert_eq!(scenario.config().duration, Duration::from_secs(300));
    assert_eq!(
        scenario.schedule(),
        Schedule::FixedPace {
            period: Duration::from_millis(60),
            iterations: NonZeroU32::new(5000).unwrap(),
        }
    );
    assert!(logs_contain("Ignoring DURATION_S"));
}
