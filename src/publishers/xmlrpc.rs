//! Blog publishing over XML-RPC (`wp.newPost`).
//!
//! The request is a fixed document shape, so it is written directly with
//! every text value escaped. The response is walked with a pull parser: it
//! is either a `<params>` block holding the new post id or a `<fault>` struct
//! with `faultCode` and `faultString` members.

use crate::config::XmlRpcCredentials;
use crate::error::{Error, Result};
use crate::models::PostReceipt;
use crate::publishers::response_text;
use crate::utils::truncate_for_log;
use quick_xml::escape::{escape, resolve_predefined_entity};
use quick_xml::events::{BytesRef, Event};
use quick_xml::Reader;
use reqwest::Client;
use std::time::Instant;
use tracing::{debug, instrument, warn};

pub const DESTINATION: &str = "wordpress-xmlrpc";

fn string_value(s: &str) -> String {
    format!("<value><string>{}</string></value>", escape(s))
}

fn member(name: &str, value: &str) -> String {
    format!("<member><name>{name}</name>{}</member>", string_value(value))
}

/// Build the `wp.newPost(blog_id = 0, username, password, content)` call.
pub fn build_new_post_request(username: &str, password: &str, title: &str, content: &str, status: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            "\n<methodCall><methodName>wp.newPost</methodName><params>",
            "<param><value><int>0</int></value></param>",
            "<param>{}</param>",
            "<param>{}</param>",
            "<param><value><struct>{}{}{}</struct></value></param>",
            "</params></methodCall>\n"
        ),
        string_value(username),
        string_value(password),
        member("post_title", title),
        member("post_content", content),
        member("post_status", status),
    )
}

/// Decoded `wp.newPost` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodResponse {
    PostId(String),
    Fault { code: Option<i64>, message: String },
}

/// Text of an entity or character reference such as `&amp;` or `&#38;`.
/// Entities outside the predefined five are kept as written.
fn resolve_reference(r: &BytesRef<'_>) -> Option<String> {
    if let Some(c) = r.resolve_char_ref().ok()? {
        return Some(c.to_string());
    }
    let name = r.decode().ok()?;
    Some(match resolve_predefined_entity(&name) {
        Some(text) => text.to_string(),
        None => format!("&{name};"),
    })
}

/// Interpret a method response body. `None` when it is not well-formed XML,
/// or is neither a fault nor carries a parameter.
///
/// Scalar text is gathered per `<value>` from plain text, CDATA sections and
/// references, so type tags (`<string>`, `<int>`, `<i4>`) and surrounding
/// whitespace do not matter.
pub fn parse_response(body: &str) -> Option<MethodResponse> {
    let mut reader = Reader::from_str(body);
    let mut in_fault = false;
    let mut in_params = false;
    let mut value_depth = 0usize;
    let mut member_name = String::new();
    let mut text = String::new();

    let mut post_id: Option<String> = None;
    let mut code: Option<i64> = None;
    let mut message: Option<String> = None;

    loop {
        match reader.read_event().ok()? {
            Event::Start(e) => match e.name().as_ref() {
                b"fault" => in_fault = true,
                b"params" => in_params = true,
                b"name" => text.clear(),
                b"value" => {
                    value_depth += 1;
                    text.clear();
                }
                _ => {}
            },
            Event::Text(e) => text.push_str(&e.decode().ok()?),
            Event::CData(e) => text.push_str(&e.decode().ok()?),
            Event::GeneralRef(r) => text.push_str(&resolve_reference(&r)?),
            Event::End(e) => match e.name().as_ref() {
                b"name" => member_name = text.trim().to_string(),
                b"member" => member_name.clear(),
                b"value" => {
                    let scalar = text.trim().to_string();
                    text.clear();
                    if in_fault {
                        match member_name.as_str() {
                            "faultCode" => code = scalar.parse().ok(),
                            "faultString" => message = Some(scalar),
                            _ => {}
                        }
                    } else if in_params && value_depth == 1 && post_id.is_none() && !scalar.is_empty() {
                        post_id = Some(scalar);
                    }
                    value_depth = value_depth.saturating_sub(1);
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if in_fault {
        return Some(MethodResponse::Fault {
            code,
            message: message.unwrap_or_default(),
        });
    }
    post_id.map(MethodResponse::PostId)
}

#[derive(Debug, Clone)]
pub struct XmlRpcPublisher {
    client: Client,
    creds: XmlRpcCredentials,
}

impl XmlRpcPublisher {
    /// Wrap the shared HTTP client with the endpoint and account to post as.
    pub fn new(client: Client, creds: XmlRpcCredentials) -> Self {
        Self { client, creds }
    }

    /// Create a post through `wp.newPost` and return its id.
    ///
    /// # Arguments
    ///
    /// * `title` - Post title, sent as `post_title`
    /// * `content` - Rendered HTML body, sent as `post_content`
    /// * `status` - WordPress post status, e.g. `publish` or `draft`
    ///
    /// # Errors
    ///
    /// [`Error::Publish`] on transport failure, a non-2xx status, a fault
    /// response (`fault {code}: {message}`) or an unrecognised body. The raw
    /// body is kept as the payload wherever there is one.
    #[instrument(level = "debug", skip_all, fields(endpoint = %self.creds.endpoint))]
    pub async fn new_post(&self, title: &str, content: &str, status: &str) -> Result<PostReceipt> {
        let request = build_new_post_request(&self.creds.username, &self.creds.password, title, content, status);
        let t0 = Instant::now();
        let resp = self
            .client
            .post(&self.creds.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "text/xml; charset=utf-8")
            .body(request)
            .send()
            .await
            .map_err(|e| Error::Publish {
                destination: DESTINATION,
                status: None,
                payload: e.to_string(),
            })?;

        let status_code = resp.status();
        let body = response_text(resp, DESTINATION).await?;
        debug!(elapsed_ms = t0.elapsed().as_millis(), status = %status_code, "XML-RPC call returned");

        let rejected = |payload: String| Error::Publish {
            destination: DESTINATION,
            status: Some(status_code.as_u16()),
            payload,
        };
        if !status_code.is_success() {
            return Err(rejected(body));
        }
        match parse_response(&body) {
            Some(MethodResponse::PostId(post_id)) => Ok(PostReceipt { post_id, link: None }),
            Some(MethodResponse::Fault { code, message }) => {
                warn!(?code, %message, "XML-RPC fault");
                Err(rejected(match code {
                    Some(code) => format!("fault {code}: {message}"),
                    None => message,
                }))
            }
            None => {
                warn!(response_preview = %truncate_for_log(&body, 300), "Unrecognised XML-RPC response");
                Err(rejected(body))
            }
        }
    }
}
