//! Extractor: article page → [`Article`]s.
//!
//! Missing fields never fail extraction; they stay `None` and the publisher
//! falls back to the placeholders in [`crate::models`]. Only a network
//! failure is an error. A page with no structural match at all yields an
//! empty list and a warning.

use crate::config::ExtractionRule;
use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::models::Article;
use scraper::{ElementRef, Html, Selector};
use tracing::{info, instrument, warn};

/// [`ExtractionRule`] with its selectors parsed.
#[derive(Debug)]
pub struct CompiledRule {
    block: Option<Selector>,
    title: Option<Selector>,
    date: Option<Selector>,
    body: Selector,
}

fn parse_selector(what: &str, s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| Error::Config(format!("invalid {what} `{s}`: {e}")))
}

impl CompiledRule {
    /// Parse every selector in `rule` once, ahead of the first page.
    ///
    /// # Errors
    ///
    /// [`Error::Config`](crate::error::Error::Config) naming the selector
    /// that does not parse.
    pub fn compile(rule: &ExtractionRule) -> Result<Self> {
        Ok(Self {
            block: rule
                .block_selector
                .as_deref()
                .map(|s| parse_selector("block selector", s))
                .transpose()?,
            title: rule
                .title_selector
                .as_deref()
                .map(|s| parse_selector("title selector", s))
                .transpose()?,
            date: rule
                .date_selector
                .as_deref()
                .map(|s| parse_selector("date selector", s))
                .transpose()?,
            body: parse_selector("body selector", &rule.body_selector)?,
        })
    }
}

/// Stripped text of an element, `None` when only whitespace.
fn stripped_text(element: ElementRef<'_>) -> Option<String> {
    let text = element.text().collect::<String>();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn first_text(scope: ElementRef<'_>, selector: Option<&Selector>) -> Option<String> {
    scope.select(selector?).find_map(stripped_text)
}

/// Join the stripped text of every body match with newlines, leaving out
/// matches that are empty after stripping.
fn body_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    let lines: Vec<String> = scope.select(selector).filter_map(stripped_text).collect();
    (!lines.is_empty()).then(|| lines.join("\n"))
}

fn article_from(scope: ElementRef<'_>, page_url: &str, rule: &CompiledRule) -> Article {
    Article {
        source_url: page_url.to_string(),
        date: first_text(scope, rule.date.as_ref()),
        title: first_text(scope, rule.title.as_ref()),
        body: body_text(scope, &rule.body),
        ..Article::default()
    }
}

/// Extract articles from an already-fetched page.
pub fn extract_from_html(html: &str, page_url: &str, rule: &CompiledRule) -> Vec<Article> {
    let document = Html::parse_document(html);

    let articles: Vec<Article> = match &rule.block {
        Some(block) => document
            .select(block)
            .map(|b| article_from(b, page_url, rule))
            .collect(),
        None => {
            let article = article_from(document.root_element(), page_url, rule);
            if article.title.is_none() && article.date.is_none() && article.body.is_none() {
                Vec::new()
            } else {
                vec![article]
            }
        }
    };

    if articles.is_empty() {
        warn!(url = page_url, "No structural matches on page");
    }
    for article in &articles {
        if article.title.is_none() {
            warn!(url = page_url, "Title missing; placeholder will be used");
        }
        if article.body.is_none() {
            warn!(url = page_url, title = article.title_or_placeholder(), "Body missing; placeholder will be used");
        }
    }
    articles
}

/// Fetch `url` and extract its articles.
///
/// # Errors
///
/// [`Error::Fetch`] when the page cannot be fetched.
#[instrument(level = "info", skip_all, fields(%url))]
pub async fn extract(fetcher: &Fetcher, url: &str, rule: &CompiledRule) -> Result<Vec<Article>> {
    let html = fetcher.get_text(url).await?;
    let articles = extract_from_html(&html, url, rule);
    info!(count = articles.len(), "Extracted articles");
    Ok(articles)
}
