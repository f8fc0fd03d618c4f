//! Social posting through the X API v2 with OAuth 1.0a user-context signing.
//!
//! Only the `oauth_*` parameters and query parameters take part in the
//! signature; the JSON body of `POST /2/tweets` does not.

use crate::config::XCredentials;
use crate::error::{Error, Result};
use crate::models::PostReceipt;
use crate::publishers::response_text;
use base64::{Engine, engine::general_purpose};
use hmac::{Hmac, Mac};
use rand::{Rng, distr::Alphanumeric, rng};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use sha1::Sha1;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, instrument};

pub const DESTINATION: &str = "x";

/// RFC 3986 percent-encoding as OAuth requires it.
pub fn percent_encode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

/// One OAuth signing input: consumer/token pair plus per-request values.
#[derive(Debug, Clone)]
pub struct OAuthRequest<'a> {
    pub method: &'a str,
    pub url: &'a str,
    /// Query or form parameters that are part of the signature.
    pub params: &'a [(&'a str, &'a str)],
    pub nonce: &'a str,
    pub timestamp: u64,
}

fn oauth_params(creds: &XCredentials, req: &OAuthRequest<'_>) -> Vec<(String, String)> {
    vec![
        ("oauth_consumer_key".to_string(), creds.api_key.clone()),
        ("oauth_nonce".to_string(), req.nonce.to_string()),
        ("oauth_signature_method".to_string(), "HMAC-SHA1".to_string()),
        ("oauth_timestamp".to_string(), req.timestamp.to_string()),
        ("oauth_token".to_string(), creds.access_token.clone()),
        ("oauth_version".to_string(), "1.0".to_string()),
    ]
}

/// The signature base string: method, URL and the sorted, encoded
/// parameter string, each percent-encoded and joined with `&`.
pub fn signature_base_string(creds: &XCredentials, req: &OAuthRequest<'_>) -> String {
    let mut pairs: Vec<(String, String)> = oauth_params(creds, req)
        .into_iter()
        .chain(req.params.iter().map(|(k, v)| (k.to_string(), v.to_string())))
        .map(|(k, v)| (percent_encode(&k), percent_encode(&v)))
        .collect();
    pairs.sort();
    let param_string = pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    format!(
        "{}&{}&{}",
        req.method.to_ascii_uppercase(),
        percent_encode(req.url),
        percent_encode(&param_string)
    )
}

/// Base64 HMAC-SHA1 of the base string keyed by both secrets.
pub fn sign(creds: &XCredentials, req: &OAuthRequest<'_>) -> Result<String> {
    let key = format!(
        "{}&{}",
        percent_encode(&creds.api_secret),
        percent_encode(&creds.access_secret)
    );
    let mut mac = Hmac::<Sha1>::new_from_slice(key.as_bytes()).map_err(|e| Error::Publish {
        destination: DESTINATION,
        status: None,
        payload: format!("could not sign request: {e}"),
    })?;
    mac.update(signature_base_string(creds, req).as_bytes());
    Ok(general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

/// The `Authorization: OAuth ...` header value.
pub fn authorization_header(creds: &XCredentials, req: &OAuthRequest<'_>) -> Result<String> {
    let signature = sign(creds, req)?;
    let mut params = oauth_params(creds, req);
    params.push(("oauth_signature".to_string(), signature));
    params.sort();
    let fields = params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!("OAuth {fields}"))
}

fn nonce() -> String {
    rng().sample_iter(&Alphanumeric).take(32).map(char::from).collect()
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[derive(Debug, Deserialize)]
struct CreatedTweet {
    data: TweetData,
}

#[derive(Debug, Deserialize)]
struct TweetData {
    id: String,
}

/// Map a `POST /2/tweets` response to a receipt.
pub fn interpret_response(status: u16, body: &str) -> Result<PostReceipt> {
    let rejected = |payload: String| Error::Publish {
        destination: DESTINATION,
        status: Some(status),
        payload,
    };
    if !(200..300).contains(&status) {
        return Err(rejected(body.to_string()));
    }
    let created: CreatedTweet =
        serde_json::from_str(body).map_err(|e| rejected(format!("unreadable response ({e}): {body}")))?;
    let link = format!("https://x.com/i/web/status/{}", created.data.id);
    Ok(PostReceipt {
        post_id: created.data.id,
        link: Some(link),
    })
}

#[derive(Debug, Clone)]
pub struct XPublisher {
    client: Client,
    creds: XCredentials,
}

impl XPublisher {
    /// Wrap the shared HTTP client with the account keys to sign with.
    pub fn new(client: Client, creds: XCredentials) -> Self {
        Self { client, creds }
    }

    fn endpoint(&self) -> String {
        format!("{}/2/tweets", self.creds.base_url.trim_end_matches('/'))
    }

    /// Post `text` as a new status, signed with OAuth 1.0a user context.
    ///
    /// The body is JSON, so only the `oauth_*` parameters enter the
    /// signature.
    ///
    /// # Errors
    ///
    /// [`Error::Publish`] on transport failure, an unreadable body or a
    /// non-2xx status, with the raw body as payload.
    #[instrument(level = "debug", skip_all)]
    pub async fn post_status(&self, text: &str) -> Result<PostReceipt> {
        let url = self.endpoint();
        let nonce = nonce();
        let auth = authorization_header(
            &self.creds,
            &OAuthRequest {
                method: "POST",
                url: &url,
                params: &[],
                nonce: &nonce,
                timestamp: unix_timestamp(),
            },
        )?;

        let t0 = Instant::now();
        let resp = self
            .client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, auth)
            .json(&json!({ "text": text }))
            .send()
            .await
            .map_err(|e| Error::Publish {
                destination: DESTINATION,
                status: None,
                payload: e.to_string(),
            })?;
        let status = resp.status().as_u16();
        let body = response_text(resp, DESTINATION).await?;
        debug!(elapsed_ms = t0.elapsed().as_millis(), status, chars = text.chars().count(), "Post call returned");
        interpret_response(status, &body)
    }
}
