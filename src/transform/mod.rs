//! Transformer stage: derive a summary or a rewritten title/body.
//!
//! Which sub-policy runs is set per source by
//! [`TransformPolicy`](crate::config::TransformPolicy). On failure the
//! source's [`FailurePolicy`] decides between labelled placeholders and
//! dropping the article; `None`-like values never reach the publisher.

pub mod rewrite;
pub mod summarize;

use crate::api::AskAsync;
use crate::config::{FailurePolicy, SummaryBackend, TransformPolicy};
use crate::error::{Error, Result};
use crate::models::Article;
use crate::utils::truncate_for_log;
use regex::Regex;
use tracing::{info, instrument, warn};

/// Summary text stored when summarisation fails under the placeholder policy.
pub const SUMMARY_FAILED: &str = "[generation error] summary unavailable";

/// What the transformer did to an article.
#[derive(Debug)]
pub enum Outcome {
    /// Policy `none`: the extracted text is published as-is.
    Unchanged,
    /// Generated fields were filled in.
    Generated,
    /// Generation failed and placeholders were substituted.
    Degraded(Error),
}

/// The transformer for one source.
#[derive(Debug)]
pub struct Transformer<A> {
    policy: TransformPolicy,
    patterns: Vec<Regex>,
    ask: Option<A>,
}

impl<A: AskAsync> Transformer<A> {
    /// `ask` must be present when the policy needs the generative service.
    pub fn new(policy: TransformPolicy, ask: Option<A>) -> Result<Self> {
        if policy.needs_generative_service() && ask.is_none() {
            return Err(Error::Config(
                "transform policy needs the generative service but no client is configured".to_string(),
            ));
        }
        let patterns = match &policy {
            TransformPolicy::Rewrite(o) => rewrite::compile_patterns(o)?,
            _ => Vec::new(),
        };
        Ok(Self { policy, patterns, ask })
    }

    fn client(&self) -> Result<&A> {
        self.ask
            .as_ref()
            .ok_or_else(|| Error::Config("generative service is not configured".to_string()))
    }

    /// Transform `article` in place.
    ///
    /// # Errors
    ///
    /// [`Error::Generation`] when generation fails and the policy is
    /// [`FailurePolicy::Skip`]; the caller drops the article.
    #[instrument(level = "info", skip_all, fields(url = %article.source_url))]
    pub async fn apply(&self, article: &mut Article) -> Result<Outcome> {
        match &self.policy {
            TransformPolicy::None => Ok(Outcome::Unchanged),

            TransformPolicy::Summarize(opts) => {
                let body = article.body.as_deref().unwrap_or_default();
                let res = match opts.backend {
                    SummaryBackend::Local => summarize::summarize_local(body, opts),
                    SummaryBackend::Remote => summarize::summarize_remote(self.client()?, body, opts).await,
                };
                match res {
                    Ok(summary) => {
                        info!(chars = summary.chars().count(), "Summarised article");
                        article.summary = Some(summary);
                        Ok(Outcome::Generated)
                    }
                    Err(e) => match opts.on_failure {
                        FailurePolicy::Placeholder => {
                            warn!(error = %e, "Summary failed; using placeholder");
                            article.summary = Some(SUMMARY_FAILED.to_string());
                            Ok(Outcome::Degraded(e))
                        }
                        FailurePolicy::Skip => Err(e),
                    },
                }
            }

            TransformPolicy::Rewrite(opts) => {
                let prompt = rewrite::build_prompt(article, opts);
                let res = match self.client()?.ask(&prompt).await {
                    Ok(text) => rewrite::parse_rewrite(&text, &self.patterns).inspect_err(|_| {
                        warn!(response_preview = %truncate_for_log(&text, 300), "Unusable rewrite response");
                    }),
                    Err(e) => Err(e),
                };
                match res {
                    Ok(r) => {
                        info!(title = %r.title, "Rewrote article");
                        article.generated_title = Some(r.title);
                        article.generated_body = Some(r.body);
                        Ok(Outcome::Generated)
                    }
                    Err(e) => match opts.on_failure {
                        FailurePolicy::Placeholder => {
                            warn!(error = %e, "Rewrite failed; using placeholders");
                            article.mark_generation_failed();
                            Ok(Outcome::Degraded(e))
                        }
                        FailurePolicy::Skip => Err(e),
                    },
                }
            }
        }
    }
}
