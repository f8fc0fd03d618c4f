//! Error taxonomy shared by every pipeline stage.
//!
//! Configuration problems surface as [`Error::Config`] before any request is
//! sent. Everything else is raised per URL or per article and is isolated by
//! the pipeline, so one bad page never aborts a batch.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Network failure or non-success HTTP status while fetching a page.
    #[error("fetch failed for {url}: {reason}")]
    Fetch {
        url: String,
        status: Option<u16>,
        reason: String,
    },

    /// An expected structural element was absent from the page.
    #[error("no element matching `{selector}` on {url}")]
    NotFound { url: String, selector: String },

    /// The transform service errored or returned content we cannot use.
    #[error("generation failed: {0}")]
    Generation(String),

    /// The destination rejected or failed the post. `payload` is the raw
    /// response body when one was received.
    #[error("{destination} rejected the post (status {status:?}): {payload}")]
    Publish {
        destination: &'static str,
        status: Option<u16>,
        payload: String,
    },

    /// Missing or malformed configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// A fetch failure with no HTTP status, e.g. a refused connection.
    pub fn fetch(url: impl Into<String>, reason: impl ToString) -> Self {
        Error::Fetch {
            url: url.into(),
            status: None,
            reason: reason.to_string(),
        }
    }

    /// Whether retrying the same request could plausibly succeed: network
    /// failures, 429 and 5xx responses.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Fetch { status: None, .. } => true,
            Error::Fetch { status: Some(s), .. } => *s == 429 || *s >= 500,
            Error::Generation(_) => true,
            _ => false,
        }
    }

    /// Short tag used in logs and run reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Fetch { .. } => "fetch",
            Error::NotFound { .. } => "not_found",
            Error::Generation(_) => "generation",
            Error::Publish { .. } => "publish",
            Error::Config(_) => "config",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_error_display_includes_payload() {
        let e = Error::Publish {
            destination: "wordpress-rest",
            status: Some(401),
            payload: r#"{"code":"rest_cannot_create"}"#.to_string(),
        };
        let msg = e.to_string();
        assert!(msg.contains("401"));
        assert!(msg.contains("rest_cannot_create"));
        assert_eq!(e.kind(), "publish");
    }

    #[test]
    fn test_fetch_helper() {
        let e = Error::fetch("https://example.com", "HTTP 503");
        assert_eq!(e.to_string(), "fetch failed for https://example.com: HTTP 503");
        assert_eq!(e.kind(), "fetch");
        assert!(e.is_transient());
    }

    #[test]
    fn test_client_errors_are_not_transient() {
        let not_found = Error::Fetch {
            url: "https://example.com".to_string(),
            status: Some(404),
            reason: "HTTP 404".to_string(),
        };
        assert!(!not_found.is_transient());
        let busy = Error::Fetch {
            url: "https://example.com".to_string(),
            status: Some(503),
            reason: "HTTP 503".to_string(),
        };
        assert!(busy.is_transient());
        assert!(!Error::Config("x".to_string()).is_transient());
    }
}
