use axum::http::StatusCode;
use mock_service::{Behavior, MockServer};
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::FmtSubscriber;

/// Standalone target for manual runs.
///
/// `MOCK_ADDR` (default `0.0.0.0:3002`), `MOCK_STATUS` (default `200`), `MOCK_FAIL_EVERY` and
/// `MOCK_DELAY_MS` shape every response.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter("mock_service=debug")
        .init();

    let addr: SocketAddr = env_or("MOCK_ADDR", "0.0.0.0:3002").parse()?;
    let behavior = Behavior::default()
        .status(StatusCode::from_u16(env_or("MOCK_STATUS", "200").parse()?)?)
        .fail_every(env_or("MOCK_FAIL_EVERY", "0").parse()?)
        .delay(Duration::from_millis(env_or("MOCK_DELAY_MS", "0").parse()?));

    let server = MockServer::bind(addr, behavior).await?;
    tracing::info!("Mock service listening on {} with {behavior:?}", server.addr);

    let stats = server.stats.clone();
    tokio::spawn(async move {
        let mut last = 0;
        loop {
            tokio::time::sleep(Duration::from_millis(1000)).await;
            let hits = stats.hits();
            println!("{} TPS", hits - last);
            last = hits;
        }
    });

    server.wait().await
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
