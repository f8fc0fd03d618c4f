//! Data models for scraped articles and publish outcomes.
//!
//! - [`Article`]: one extracted post, enriched in place by the transformer
//! - [`PublishResult`]: what the destination said about a single post
//! - [`RunReport`]: everything a run touched, for the optional JSON report
//!
//! Nothing here is persisted between runs. Re-running a source re-publishes
//! the same content.

use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// Shown in place of a title the extractor could not find.
pub const TITLE_PLACEHOLDER: &str = "(no title)";
/// Shown in place of a date the extractor could not find.
pub const DATE_PLACEHOLDER: &str = "(no date)";
/// Shown in place of a body the extractor could not find.
pub const BODY_PLACEHOLDER: &str = "(no body)";

/// Title substituted when the generative call fails.
pub const GENERATION_FAILED_TITLE: &str = "[generation error] title unavailable";
/// Body substituted when the generative call fails.
pub const GENERATION_FAILED_BODY: &str = "[generation error] body unavailable";
/// Body substituted when a rewrite came back as a single line.
pub const GENERATED_BODY_MISSING: &str = "[generation error] the model returned a title only";

/// A single article as extracted from a source page.
///
/// Extracted fields are `None` when the page lacked the element, so callers
/// can tell "really titled `(no title)`" apart from a failed extraction. The
/// `*_or_placeholder` accessors supply the documented defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// The page the article was extracted from. Archive pages yield several
    /// articles sharing one source URL.
    pub source_url: String,
    /// Publication date as printed by the source; not normalised.
    pub date: Option<String>,
    pub title: Option<String>,
    /// Plain text, markup stripped, one block per line.
    pub body: Option<String>,
    pub generated_title: Option<String>,
    pub generated_body: Option<String>,
    pub summary: Option<String>,
}

impl Article {
    /// An article with only its page URL known.
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            ..Default::default()
        }
    }

    /// Extracted title, or a fixed placeholder when the page had none.
    pub fn title_or_placeholder(&self) -> &str {
        self.title.as_deref().unwrap_or(TITLE_PLACEHOLDER)
    }

    pub fn date_or_placeholder(&self) -> &str {
        self.date.as_deref().unwrap_or(DATE_PLACEHOLDER)
    }

    pub fn body_or_placeholder(&self) -> &str {
        self.body.as_deref().unwrap_or(BODY_PLACEHOLDER)
    }

    /// Title to publish: the generated one when present, else the extracted one.
    pub fn publish_title(&self) -> &str {
        self.generated_title
            .as_deref()
            .unwrap_or_else(|| self.title_or_placeholder())
    }

    /// Body to publish: the generated one when present, else the extracted one.
    pub fn publish_body(&self) -> &str {
        self.generated_body
            .as_deref()
            .unwrap_or_else(|| self.body_or_placeholder())
    }

    /// Replace the generated fields with labelled placeholders.
    pub fn mark_generation_failed(&mut self) {
        self.generated_title = Some(GENERATION_FAILED_TITLE.to_string());
        self.generated_body = Some(GENERATION_FAILED_BODY.to_string());
    }
}

/// Receipt returned by a destination that accepted a post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostReceipt {
    pub post_id: String,
    /// Public URL of the post when the destination reports one.
    pub link: Option<String>,
}

/// Outcome of one publish attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishResult {
    pub success: bool,
    /// Present only on success.
    pub post_id: Option<String>,
    pub link: Option<String>,
    /// Present only on failure.
    pub error: Option<String>,
}

impl PublishResult {
    pub fn ok(receipt: PostReceipt) -> Self {
        Self {
            success: true,
            post_id: Some(receipt.post_id),
            link: receipt.link,
            error: None,
        }
    }

    pub fn failed(error: impl ToString) -> Self {
        Self {
            success: false,
            post_id: None,
            link: None,
            error: Some(error.to_string()),
        }
    }
}

impl<E: std::fmt::Display> From<Result<PostReceipt, E>> for PublishResult {
    fn from(res: Result<PostReceipt, E>) -> Self {
        match res {
            Ok(r) => PublishResult::ok(r),
            Err(e) => PublishResult::failed(e),
        }
    }
}

/// Counters logged at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub candidates: usize,
    pub extracted: usize,
    pub transformed: usize,
    pub published: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl AddAssign for RunStats {
    fn add_assign(&mut self, other: Self) {
        self.candidates += other.candidates;
        self.extracted += other.extracted;
        self.transformed += other.transformed;
        self.published += other.published;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

/// An article together with what happened to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportEntry {
    pub article: Article,
    /// `None` in dry-run mode or when the article was skipped before publishing.
    pub result: Option<PublishResult>,
    /// Why the article stopped before the publisher, if it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything a single run touched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub source: String,
    /// RFC 3339 UTC timestamp of the run start.
    pub started_at: String,
    pub dry_run: bool,
    pub entries: Vec<ReportEntry>,
    pub stats: RunStats,
}
