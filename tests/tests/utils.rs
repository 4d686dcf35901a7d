use mock_service::{Behavior, MockServer};
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::error;
use tracing_subscriber::FmtSubscriber;
use volley::prelude::RunConfig;

#[allow(unused)]
pub fn init() {
    static ONCE_LOCK: OnceLock<()> = OnceLock::new();

    ONCE_LOCK.get_or_init(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            default_panic(info);
            error!("Panic occurred: {info:?}");
        }));

        FmtSubscriber::builder()
            .with_env_filter("volley=debug,mock_service=debug")
            .try_init()
            .ok();
    });
}

#[allow(unused)]
pub async fn mock(behavior: Behavior) -> MockServer {
    init();
    MockServer::start(behavior)
        .await
        .expect("mock service failed to start")
}

#[allow(unused)]
pub fn env(pairs: &[(&str, String)]) -> RunConfig {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    RunConfig::from_lookup(|key| vars.get(key).cloned())
}
