use crate::error::VolleyError;
use reqwest::header::CACHE_CONTROL;
use reqwest::{Client, RequestBuilder};
use std::sync::Arc;
use std::time::Instant;
#[allow(unused_imports)]
use tracing::{debug, error, trace, warn};
use volley_core::{ResponseOutcome, RunConfig, CACHE_BUST_PARAM};

/// Issues the run's GET requests. Clones share the underlying connection pool.
#[derive(Clone, Debug)]
pub struct RequestExecutor {
    client: Client,
    url: Arc<str>,
    cache_bust: bool,
}

impl RequestExecutor {
    pub fn new(config: &RunConfig) -> Result<Self, VolleyError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self::with_client(
            client,
            &config.request_url(),
            config.mode.cache_bust(),
        ))
    }

    pub fn with_client(client: Client, url: &str, cache_bust: bool) -> Self {
        Self {
            client,
            url: Arc::from(url),
            cache_bust,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Each cache-busting request carries a fresh random `rnd` value and `Cache-Control: no-cache`.
    pub fn request(&self) -> RequestBuilder {
        let request = self.client.get(&*self.url);
        if self.cache_bust {
            request
                .query(&[(CACHE_BUST_PARAM, rand::random::<f64>())])
                .header(CACHE_CONTROL, "no-cache")
        } else {
            request
        }
    }

    /// Sends one request and waits for the full response body.
    ///
    /// Never fails: anything that prevents a complete HTTP response (refused connection, DNS,
    /// timeout, a broken body) is reported as a transport failure.
    pub async fn execute(&self) -> ResponseOutcome {
        let start = Instant::now();

        let response = match self.request().send().await {
            Ok(response) => response,
            Err(err) => {
                debug!("Request to {} failed: {err}", self.url);
                return ResponseOutcome::transport_failure(start.elapsed());
            }
        };

        let status = response.status().as_u16();
        match response.bytes().await {
            Ok(_) => ResponseOutcome::new(status, start.elapsed()),
            Err(err) => {
                debug!("Reading response body from {} failed: {err}", self.url);
                ResponseOutcome::transport_failure(start.elapsed())
            }
        }
    }
}
