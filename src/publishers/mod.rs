//! Publisher stage: submit a finished post to its destination.
//!
//! | Target | Module | Protocol |
//! |--------|--------|----------|
//! | Blog (remote procedure) | [`xmlrpc`] | XML-RPC `wp.newPost` |
//! | Blog (REST) | [`rest`] | `POST /wp-json/wp/v2/posts`, basic auth |
//! | Social network | [`social`] | `POST /2/tweets`, OAuth 1.0a user context |
//!
//! Publishing is a single attempt. Destinations are not idempotent: posting
//! the same article twice creates two posts with two identifiers.

pub mod rest;
pub mod social;
pub mod xmlrpc;

use crate::config::{ContentOptions, PublisherCredentials};
use crate::error::{Error, Result};
use crate::models::{Article, PostReceipt};
use crate::utils::clip_with_ellipsis;
use quick_xml::escape::escape;
use reqwest::{Client, Response};
use tracing::{info, instrument};

/// Render the blog post body as simple inline HTML.
///
/// Text is escaped, newlines become `<br>`, and the optional summary block
/// and source link are appended after a rule.
pub fn render_blog_html(article: &Article, opts: &ContentOptions) -> String {
    let mut html = format!("<p>{}</p>", escape(article.publish_body()).replace('\n', "<br>"));

    if opts.include_summary {
        if let Some(summary) = &article.summary {
            html.push_str(&format!(
                "\n<hr>\n<p><strong>{}</strong> {}</p>",
                escape(opts.summary_label.as_str()),
                escape(summary.as_str()).replace('\n', "<br>")
            ));
        }
    }

    if let Some(label) = &opts.source_link_label {
        html.push_str(&format!(
            "\n<hr>\n<p><a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a></p>",
            escape(article.source_url.as_str()),
            escape(label.as_str())
        ));
    }
    html
}

/// Render a plain-text social post: title, optional summary, source URL.
///
/// The text part is clipped so the whole post fits `opts.social_max_chars`.
/// The URL is never cut: when it leaves no room for text, the post is the
/// bare URL, whatever its length.
pub fn render_social_text(article: &Article, opts: &ContentOptions) -> String {
    let mut head = article.publish_title().to_string();
    if opts.include_summary {
        if let Some(summary) = &article.summary {
            head.push('\n');
            head.push_str(summary);
        }
    }

    let url = article.source_url.as_str();
    let budget = opts.social_max_chars.saturating_sub(url.chars().count() + 1);
    if budget == 0 {
        return url.to_string();
    }
    format!("{}\n{}", clip_with_ellipsis(&head, budget), url)
}

/// Read the body of a destination's reply, whatever its status.
///
/// # Errors
///
/// [`Error::Publish`] when the body cannot be read to the end; the read
/// failure becomes the payload so the rejection is still explained.
pub(crate) async fn response_text(resp: Response, destination: &'static str) -> Result<String> {
    let status = resp.status().as_u16();
    resp.text().await.map_err(|e| Error::Publish {
        destination,
        status: Some(status),
        payload: format!("could not read response: {e}"),
    })
}

/// A configured destination.
#[derive(Debug, Clone)]
pub enum Publisher {
    XmlRpc(xmlrpc::XmlRpcPublisher),
    Rest(rest::RestPublisher),
    X(social::XPublisher),
}

impl Publisher {
    /// Build the publisher matching the resolved credentials.
    pub fn new(client: Client, credentials: PublisherCredentials) -> Self {
        match credentials {
            PublisherCredentials::WordpressXmlrpc(c) => Publisher::XmlRpc(xmlrpc::XmlRpcPublisher::new(client, c)),
            PublisherCredentials::WordpressRest(c) => Publisher::Rest(rest::RestPublisher::new(client, c)),
            PublisherCredentials::X(c) => Publisher::X(social::XPublisher::new(client, c)),
        }
    }

    /// Destination label used in logs, errors and reports.
    pub fn name(&self) -> &'static str {
        match self {
            Publisher::XmlRpc(_) => xmlrpc::DESTINATION,
            Publisher::Rest(_) => rest::DESTINATION,
            Publisher::X(_) => social::DESTINATION,
        }
    }

    /// Submit `article` as a new post.
    ///
    /// # Errors
    ///
    /// [`Error::Publish`](crate::error::Error::Publish) with the
    /// destination's raw payload when the post is rejected.
    #[instrument(level = "info", skip_all, fields(destination = self.name(), url = %article.source_url))]
    pub async fn publish(&self, article: &Article, opts: &ContentOptions) -> Result<PostReceipt> {
        let title = article.publish_title();
        let receipt = match self {
            Publisher::XmlRpc(p) => {
                p.new_post(title, &render_blog_html(article, opts), &opts.post_status)
                    .await?
            }
            Publisher::Rest(p) => {
                p.new_post(title, &render_blog_html(article, opts), &opts.post_status)
                    .await?
            }
            Publisher::X(p) => p.post_status(&render_social_text(article, opts)).await?,
        };
        info!(post_id = %receipt.post_id, link = ?receipt.link, "Published");
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article() -> Article {
        Article {
            source_url: "https://example.com/a?x=1&y=2".to_string(),
            title: Some("Title".to_string()),
            body: Some("Line <one>\nLine & two".to_string()),
            summary: Some("Short summary".to_string()),
            ..Article::default()
        }
    }

    #[test]
    fn test_blog_html_escapes_and_breaks_lines() {
        let opts = ContentOptions {
            source_link_label: Some("元記事はこちら".to_string()),
            ..ContentOptions::default()
        };
        let html = render_blog_html(&article(), &opts);
        assert!(html.starts_with("<p>Line &lt;one&gt;<br>Line &amp; two</p>"));
        assert!(html.contains("<strong>Summary:</strong> Short summary"));
        assert!(html.contains(r#"<a href="https://example.com/a?x=1&amp;y=2" target="_blank""#));
        assert!(html.contains(">元記事はこちら</a>"));
    }

    #[test]
    fn test_blog_html_without_extras() {
        let opts = ContentOptions {
            include_summary: false,
            ..ContentOptions::default()
        };
        let html = render_blog_html(&article(), &opts);
        assert!(!html.contains("<hr>"));
        assert!(!html.contains("Short summary"));
    }

    #[test]
    fn test_social_text_fits_limit_and_keeps_url() {
        let mut a = article();
        a.generated_title = Some("T".repeat(400));
        let opts = ContentOptions::default();
        let text = render_social_text(&a, &opts);
        assert!(text.chars().count() <= 280);
        assert!(text.ends_with("\nhttps://example.com/a?x=1&y=2"));
        assert!(text.contains('…'));
    }

    #[test]
    fn test_social_text_short_post_is_untouched() {
        let opts = ContentOptions::default();
        assert_eq!(
            render_social_text(&article(), &opts),
            "Title\nShort summary\nhttps://example.com/a?x=1&y=2"
        );
    }

    #[test]
    fn test_social_text_never_cuts_long_url() {
        let mut a = article();
        a.source_url = format!("https://example.com/{}", "p".repeat(300));
        let text = render_social_text(&a, &ContentOptions::default());
        assert_eq!(text, a.source_url);
    }

    #[test]
    fn test_social_text_url_leaving_one_char_gets_ellipsis_head() {
        let mut a = article();
        a.source_url = format!("https://example.com/{}", "p".repeat(258));
        assert_eq!(a.source_url.len(), 278);
        let text = render_social_text(&a, &ContentOptions::default());
        assert_eq!(text.chars().count(), 280);
        assert!(text.ends_with(&a.source_url));
    }
}
