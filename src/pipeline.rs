//! The locate → extract → transform → publish pipeline for one source.
//!
//! Candidate URLs and the articles on each page are processed strictly one
//! at a time, in page order. A failure on one URL or one article is logged,
//! counted and recorded in the report; the run moves on to the next item.
//! Only a failure to locate candidates on the listing page ends the run.

use crate::api::AskAsync;
use crate::config::SourceProfile;
use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::models::{Article, PublishResult, ReportEntry, RunReport, RunStats};
use crate::publishers::Publisher;
use crate::scrapers::extractor::{self, CompiledRule};
use crate::scrapers::locator;
use crate::transform::{Outcome, Transformer};
use chrono::{SecondsFormat, Utc};
use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// Per-run switches from the command line.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Skip the locator and process this page only.
    pub url_override: Option<Url>,
    /// Cap on the number of candidate URLs.
    pub limit: Option<usize>,
    /// Run everything except the publisher.
    pub dry_run: bool,
}

/// One source's pipeline: the profile, its compiled extraction rule and the
/// stages that act on each article.
///
/// `publisher` may be absent only for dry runs.
pub struct Pipeline<A> {
    profile: SourceProfile,
    fetcher: Fetcher,
    rule: CompiledRule,
    transformer: Transformer<A>,
    publisher: Option<Publisher>,
}

impl<A: AskAsync> Pipeline<A> {
    /// Wire the stages for `profile`.
    ///
    /// # Arguments
    ///
    /// * `profile` - Source to run
    /// * `fetcher` - Shared client and retry policy for page fetches
    /// * `transformer` - Rewrite or summary stage for the profile's policy
    /// * `publisher` - Destination; `None` for a dry run
    ///
    /// # Errors
    ///
    /// [`Error::Config`] when the profile's extraction selectors do not parse.
    pub fn new(
        profile: SourceProfile,
        fetcher: Fetcher,
        transformer: Transformer<A>,
        publisher: Option<Publisher>,
    ) -> Result<Self> {
        let rule = CompiledRule::compile(&profile.extraction)?;
        Ok(Self {
            profile,
            fetcher,
            rule,
            transformer,
            publisher,
        })
    }

    /// Candidate URLs after the override and limit are applied.
    async fn candidates(&self, opts: &RunOptions) -> Result<Vec<Url>> {
        let mut urls = match &opts.url_override {
            Some(url) => {
                info!(%url, "Using URL from the command line; skipping locator");
                vec![url.clone()]
            }
            None => locator::locate(&self.fetcher, &self.profile).await?,
        };
        if let Some(limit) = opts.limit {
            if urls.len() > limit {
                debug!(found = urls.len(), limit, "Limiting candidates");
                urls.truncate(limit);
            }
        }
        Ok(urls)
    }

    /// Run once.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] when publishing is requested without a publisher
    /// - [`Error::Fetch`] / [`Error::NotFound`] when the listing page fails
    #[instrument(level = "info", skip_all, fields(source = %self.profile.id, dry_run = opts.dry_run))]
    pub async fn run(&self, opts: &RunOptions) -> Result<RunReport> {
        if !opts.dry_run && self.publisher.is_none() {
            return Err(Error::Config(format!(
                "source `{}`: no publisher configured and not a dry run",
                self.profile.id
            )));
        }
        let started_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

        let candidates = self.candidates(opts).await?;
        let mut stats = RunStats {
            candidates: candidates.len(),
            ..RunStats::default()
        };

        let per_url: Vec<(Vec<ReportEntry>, RunStats)> = stream::iter(candidates)
            .then(|url| self.process_url(url, opts.dry_run))
            .collect()
            .await;

        let mut entries = Vec::new();
        for (url_entries, url_stats) in per_url {
            entries.extend(url_entries);
            stats += url_stats;
        }

        info!(
            candidates = stats.candidates,
            extracted = stats.extracted,
            transformed = stats.transformed,
            published = stats.published,
            skipped = stats.skipped,
            failed = stats.failed,
            "Run summary"
        );

        Ok(RunReport {
            source: self.profile.id.clone(),
            started_at,
            dry_run: opts.dry_run,
            entries,
            stats,
        })
    }

    async fn process_url(&self, url: Url, dry_run: bool) -> (Vec<ReportEntry>, RunStats) {
        let mut stats = RunStats::default();
        let articles = match extractor::extract(&self.fetcher, url.as_str(), &self.rule).await {
            Ok(articles) => articles,
            Err(e) => {
                error!(%url, kind = e.kind(), error = %e, "Extraction failed; skipping URL");
                stats.failed += 1;
                let entry = ReportEntry {
                    article: Article::new(url.as_str()),
                    result: None,
                    error: Some(e.to_string()),
                };
                return (vec![entry], stats);
            }
        };
        stats.extracted += articles.len();

        let per_article: Vec<(ReportEntry, RunStats)> = stream::iter(articles)
            .then(|article| self.process_article(article, dry_run))
            .collect()
            .await;

        let mut entries = Vec::with_capacity(per_article.len());
        for (entry, article_stats) in per_article {
            entries.push(entry);
            stats += article_stats;
        }
        (entries, stats)
    }

    async fn process_article(&self, mut article: Article, dry_run: bool) -> (ReportEntry, RunStats) {
        let mut stats = RunStats::default();
        let skipped = |article: Article, reason: String, mut stats: RunStats| {
            stats.skipped += 1;
            let entry = ReportEntry {
                article,
                result: None,
                error: Some(reason),
            };
            (entry, stats)
        };

        if self.profile.extraction.require_body && article.body.is_none() {
            warn!(url = %article.source_url, title = article.title_or_placeholder(), "No body text; skipping article");
            return skipped(article, "no body text".to_string(), stats);
        }

        match self.transformer.apply(&mut article).await {
            Ok(Outcome::Generated) => stats.transformed += 1,
            Ok(Outcome::Unchanged) => {}
            Ok(Outcome::Degraded(e)) => {
                debug!(url = %article.source_url, error = %e, "Publishing with placeholders");
            }
            Err(e) => {
                warn!(url = %article.source_url, error = %e, "Transform failed; skipping article");
                return skipped(article, e.to_string(), stats);
            }
        }

        let publisher = match (&self.publisher, dry_run) {
            (Some(p), false) => p,
            _ => {
                info!(
                    url = %article.source_url,
                    title = article.publish_title(),
                    "Dry run; not publishing"
                );
                let entry = ReportEntry {
                    article,
                    result: None,
                    error: None,
                };
                return (entry, stats);
            }
        };

        let res = publisher.publish(&article, &self.profile.content).await;
        match &res {
            Ok(_) => stats.published += 1,
            Err(e) => {
                error!(url = %article.source_url, kind = e.kind(), error = %e, "Publish failed");
                stats.failed += 1;
            }
        }
        let entry = ReportEntry {
            article,
            result: Some(PublishResult::from(res)),
            error: None,
        };
        (entry, stats)
    }
}
