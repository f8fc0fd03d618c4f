//! Blog publishing over the REST API with basic authentication.

use crate::config::RestCredentials;
use crate::error::{Error, Result};
use crate::models::PostReceipt;
use crate::publishers::response_text;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, instrument};

pub const DESTINATION: &str = "wordpress-rest";

#[derive(Debug, Serialize)]
struct NewPost<'a> {
    title: &'a str,
    content: &'a str,
    status: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreatedPost {
    id: Value,
    #[serde(default)]
    link: Option<String>,
}

/// Map a REST response to a receipt. Non-2xx statuses carry the body back
/// verbatim so the caller sees the server's own error code.
pub fn interpret_response(status: u16, body: &str) -> Result<PostReceipt> {
    let rejected = |payload: String| Error::Publish {
        destination: DESTINATION,
        status: Some(status),
        payload,
    };
    if !(200..300).contains(&status) {
        return Err(rejected(body.to_string()));
    }
    let created: CreatedPost =
        serde_json::from_str(body).map_err(|e| rejected(format!("unreadable response ({e}): {body}")))?;
    let post_id = match created.id {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        other => return Err(rejected(format!("unexpected post id {other}"))),
    };
    Ok(PostReceipt {
        post_id,
        link: created.link,
    })
}

#[derive(Debug, Clone)]
pub struct RestPublisher {
    client: Client,
    creds: RestCredentials,
}

impl RestPublisher {
    /// Wrap the shared HTTP client with the site and account to post as.
    pub fn new(client: Client, creds: RestCredentials) -> Self {
        Self { client, creds }
    }

    fn endpoint(&self) -> String {
        format!("{}/wp-json/wp/v2/posts", self.creds.base_url.trim_end_matches('/'))
    }

    /// Create a post with `POST /wp-json/wp/v2/posts`.
    ///
    /// # Arguments
    ///
    /// * `title` - Post title
    /// * `content` - Rendered HTML body
    /// * `status` - WordPress post status, e.g. `publish` or `draft`
    ///
    /// # Returns
    ///
    /// The new post's id and permalink.
    ///
    /// # Errors
    ///
    /// [`Error::Publish`] on transport failure, an unreadable body or a
    /// rejection; see [`interpret_response`].
    #[instrument(level = "debug", skip_all, fields(base_url = %self.creds.base_url))]
    pub async fn new_post(&self, title: &str, content: &str, status: &str) -> Result<PostReceipt> {
        let t0 = Instant::now();
        let resp = self
            .client
            .post(self.endpoint())
            .basic_auth(&self.creds.username, Some(&self.creds.password))
            .json(&NewPost { title, content, status })
            .send()
            .await
            .map_err(|e| Error::Publish {
                destination: DESTINATION,
                status: None,
                payload: e.to_string(),
            })?;
        let status_code = resp.status().as_u16();
        let body = response_text(resp, DESTINATION).await?;
        debug!(elapsed_ms = t0.elapsed().as_millis(), status = status_code, "REST call returned");
        interpret_response(status_code, &body)
    }
}
