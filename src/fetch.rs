//! Page fetching over HTTP GET.

use crate::error::{Error, Result};
use crate::retry::Backoff;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

const USER_AGENT: &str = concat!("coin_news_relay/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client plus the retry policy applied to page fetches.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    backoff: Backoff,
}

impl Fetcher {
    /// Build the shared client.
    ///
    /// # Arguments
    ///
    /// * `timeout` - Applied to every request made with the client
    /// * `backoff` - Retry policy for transient page fetch failures
    ///
    /// # Errors
    ///
    /// [`Error::Config`] when the TLS backend cannot be initialised.
    pub fn new(timeout: Duration, backoff: Backoff) -> Result<Self> {
        let client = build_client(timeout)?;
        Ok(Self { client, backoff })
    }

    /// The underlying client, shared with the generative service and the
    /// publishers so every call gets the same user agent and timeout.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// GET `url` and return the body text. Any non-2xx status is a
    /// [`Error::Fetch`].
    #[instrument(level = "debug", skip_all, fields(%url))]
    pub async fn get_text(&self, url: &str) -> Result<String> {
        self.backoff
            .run_when("fetch", || async move {
                let t0 = Instant::now();
                let resp = self
                    .client
                    .get(url)
                    .send()
                    .await
                    .map_err(|e| Error::fetch(url, e))?;
                let status = resp.status();
                if !status.is_success() {
                    return Err(Error::Fetch {
                        url: url.to_string(),
                        status: Some(status.as_u16()),
                        reason: format!("HTTP {status}"),
                    });
                }
                let body = resp.text().await.map_err(|e| Error::fetch(url, e))?;
                debug!(
                    bytes = body.len(),
                    elapsed_ms = t0.elapsed().as_millis(),
                    "Fetched page"
                );
                Ok(body)
            }, Error::is_transient)
            .await
    }
}

/// Build the reqwest client used by every stage.
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| Error::Config(format!("could not build HTTP client: {e}")))
}
