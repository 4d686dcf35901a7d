use anyhow::Context;
use std::process::ExitCode;
#[allow(unused_imports)]
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use volley::prelude::*;

/// Exit status for a run that completed but crossed a threshold.
const THRESHOLDS_FAILED: u8 = 99;

/// Setup errors propagate out of `main` and exit with status 1.
#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("volley=info")),
        )
        .init();

    #[cfg(feature = "metrics")]
    install_metrics_exporter(std::env::var("METRICS_ADDR").ok())?;

    let config = RunConfig::from_env();
    let report = Scenario::new(config)
        .await
        .context("Load generation run failed")?;

    println!("{report}");
    println!("{}", RunReport::csv_header());
    println!("{}", report.csv_row());

    Ok(ExitCode::from(exit_status(&report)))
}

fn exit_status(report: &RunReport) -> u8 {
    if report.passed() {
        0
    } else {
        THRESHOLDS_FAILED
    }
}

/// Serves Prometheus metrics on `METRICS_ADDR` when it is set.
#[cfg(feature = "metrics")]
fn install_metrics_exporter(raw: Option<String>) -> anyhow::Result<()> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    if let Some(addr) = metrics_addr(raw) {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Unable to install Prometheus exporter")?;
        info!("Serving metrics on {addr}");
    }
    Ok(())
}

#[cfg(feature = "metrics")]
fn metrics_addr(raw: Option<String>) -> Option<std::net::SocketAddr> {
    let raw = raw?;
    match raw.trim().parse() {
        Ok(addr) => Some(addr),
        Err(err) => {
            warn!("Ignoring METRICS_ADDR={raw:?}: {err}");
            None
        }
    }
}
