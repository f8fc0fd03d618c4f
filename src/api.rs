//! Generative-language service client with retry.
//!
//! # Architecture
//!
//! - [`AskAsync`]: core trait, one prompt in, one text blob out
//! - [`GeminiClient`]: talks to the `generateContent` REST endpoint
//! - [`RetryAsk`]: decorator adding bounded backoff to any [`AskAsync`]
//!
//! Generation has no remote side effects, so retrying it is safe. No
//! structured output is enforced; callers parse the returned text.

use crate::config::GeminiSettings;
use crate::error::{Error, Result};
use crate::retry::Backoff;
use crate::utils::truncate_for_log;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use tracing::{debug, instrument, warn};

/// Trait for async generative-model interaction.
pub trait AskAsync {
    /// Send `prompt` and return the generated text.
    async fn ask(&self, prompt: &str) -> Result<String>;
}

/// Wrapper that adds exponential backoff retry logic to any [`AskAsync`].
pub struct RetryAsk<T> {
    inner: T,
    backoff: Backoff,
}

impl<T: AskAsync> RetryAsk<T> {
    /// Retry `inner` on any error, as `backoff` allows.
    pub fn new(inner: T, backoff: Backoff) -> Self {
        Self { inner, backoff }
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.backoff.max_retries)
            .field("base_delay", &self.backoff.base_delay)
            .field("max_delay", &self.backoff.max_delay)
            .finish()
    }
}

impl<T: AskAsync> AskAsync for RetryAsk<T> {
    #[instrument(level = "info", skip_all)]
    async fn ask(&self, prompt: &str) -> Result<String> {
        self.backoff.run("generate", || self.inner.ask(prompt)).await
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[allow(non_snake_case)]
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    promptFeedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[allow(non_snake_case)]
#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(default)]
    blockReason: Option<String>,
}

/// Build the `generateContent` JSON body for a single text prompt.
fn request_body(prompt: &str) -> GenerateRequest<'_> {
    GenerateRequest {
        contents: vec![Content {
            parts: vec![Part { text: prompt }],
        }],
    }
}

/// Pull the generated text out of a `generateContent` response body.
///
/// The parts of the first candidate are concatenated. A response with no
/// text at all is a [`Error::Generation`].
pub fn parse_generate_response(body: &str) -> Result<String> {
    let resp: GenerateResponse = serde_json::from_str(body).map_err(|e| {
        Error::Generation(format!(
            "unparseable response ({e}): {}",
            truncate_for_log(body, 300)
        ))
    })?;

    let text: String = resp
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = resp
            .promptFeedback
            .and_then(|f| f.blockReason)
            .unwrap_or_else(|| "no candidates".to_string());
        return Err(Error::Generation(format!("empty response: {reason}")));
    }
    Ok(text)
}

/// Client for the Gemini `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    settings: GeminiSettings,
}

impl GeminiClient {
    /// Client for the `generateContent` endpoint of `settings.model`.
    pub fn new(client: Client, settings: GeminiSettings) -> Self {
        Self { client, settings }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.model
        )
    }
}

impl AskAsync for GeminiClient {
    #[instrument(level = "info", skip_all, fields(model = %self.settings.model))]
    async fn ask(&self, prompt: &str) -> Result<String> {
        let t0 = Instant::now();
        let resp = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.settings.api_key)
            .json(&request_body(prompt))
            .send()
            .await
            .map_err(|e| Error::Generation(format!("request failed: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::Generation(format!("could not read response: {e}")))?;
        let dt = t0.elapsed();

        if !status.is_success() {
            warn!(elapsed_ms = dt.as_millis(), %status, "API call failed");
            return Err(Error::Generation(format!(
                "HTTP {status}: {}",
                truncate_for_log(&body, 300)
            )));
        }
        debug!(elapsed_ms = dt.as_millis(), bytes = body.len(), "API call succeeded");
        parse_generate_response(&body)
    }
}
