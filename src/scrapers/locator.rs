//! Locator: listing page → candidate article URLs.
//!
//! Links are resolved with [`Url::join`], so `/articles/42` on
//! `https://example.com/news/` becomes `https://example.com/articles/42` and
//! a bare `42` becomes `https://example.com/news/42`.

use crate::config::{LocateMode, SourceProfile};
use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use itertools::Itertools;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Resolve every link matched by `selector` against the page URL `base`.
///
/// Matched elements without an `href` are searched for a descendant link.
/// Fragment-only, `javascript:` and `mailto:` links are dropped, as is
/// anything that does not resolve to http(s).
pub fn find_links(html: &str, base: &Url, selector: &str) -> Result<Vec<Url>> {
    let selector = Selector::parse(selector)
        .map_err(|e| Error::Config(format!("invalid link selector `{selector}`: {e}")))?;
    let anchor = Selector::parse("a[href]")
        .map_err(|e| Error::Config(format!("invalid anchor selector: {e}")))?;
    let document = Html::parse_document(html);

    let mut links = Vec::new();
    for element in document.select(&selector) {
        let href = element.value().attr("href").or_else(|| {
            element
                .select(&anchor)
                .next()
                .and_then(|a| a.value().attr("href"))
        });
        let Some(href) = href.map(str::trim) else {
            continue;
        };
        if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") || href.starts_with("mailto:") {
            continue;
        }
        match base.join(href) {
            Ok(resolved) if matches!(resolved.scheme(), "http" | "https") => links.push(resolved),
            Ok(resolved) => debug!(%resolved, "Skipping non-http link"),
            Err(e) => debug!(href, error = %e, "Skipping unresolvable link"),
        }
    }
    Ok(links)
}

/// Apply the locate mode to the links found on `page_url`.
pub fn select_candidates(links: Vec<Url>, mode: LocateMode, page_url: &Url, selector: &str) -> Result<Vec<Url>> {
    match mode {
        LocateMode::Latest => links
            .into_iter()
            .next()
            .map(|u| vec![u])
            .ok_or_else(|| Error::NotFound {
                url: page_url.to_string(),
                selector: selector.to_string(),
            }),
        LocateMode::Archive => {
            let unique: Vec<Url> = links.into_iter().unique().collect();
            if unique.is_empty() {
                warn!(url = %page_url, selector, "Archive index has no matching links");
            }
            Ok(unique)
        }
        LocateMode::Direct => Ok(vec![page_url.clone()]),
    }
}

/// Find candidate article URLs for `profile`.
///
/// # Errors
///
/// - [`Error::Fetch`] when the listing page cannot be fetched
/// - [`Error::NotFound`] in [`LocateMode::Latest`] when nothing matches
#[instrument(level = "info", skip_all, fields(source = %profile.id, url = %profile.listing_url))]
pub async fn locate(fetcher: &Fetcher, profile: &SourceProfile) -> Result<Vec<Url>> {
    if profile.mode == LocateMode::Direct {
        return Ok(vec![profile.listing_url.clone()]);
    }

    let html = fetcher.get_text(profile.listing_url.as_str()).await?;
    let links = find_links(&html, &profile.listing_url, &profile.link_selector)?;
    let candidates = select_candidates(links, profile.mode, &profile.listing_url, &profile.link_selector)?;

    info!(count = candidates.len(), mode = ?profile.mode, "Located candidate URLs");
    debug!(urls = ?candidates.iter().map(Url::as_str).collect::<Vec<_>>(), "Candidates");
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_host_relative_link_joins_origin() {
        let html = r#"<div class="list"><a href="/articles/42">Story</a></div>"#;
        let links = find_links(html, &base("https://example.com"), ".list a").unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].as_str(), "https://example.com/articles/42");
        assert!(!links[0].as_str().contains("com//"));
    }

    #[test]
    fn test_host_relative_link_ignores_listing_path() {
        let html = r#"<div class="list"><a href="/articles/42">Story</a></div>"#;
        let links = find_links(html, &base("https://example.com/news/latest/"), ".list a").unwrap();
        assert_eq!(links[0].as_str(), "https://example.com/articles/42");
    }

    #[test]
    fn test_path_relative_link_keeps_directory() {
        let html = r#"<div class="list"><a href="42">Story</a></div>"#;
        let links = find_links(html, &base("https://example.com/news/"), ".list a").unwrap();
        assert_eq!(links[0].as_str(), "https://example.com/news/42");
    }

    #[test]
    fn test_absolute_link_is_kept() {
        let html = r#"<div class="list"><a href="https://other.example/x">Story</a></div>"#;
        let links = find_links(html, &base("https://example.com/"), ".list a").unwrap();
        assert_eq!(links[0].as_str(), "https://other.example/x");
    }

    #[test]
    fn test_non_anchor_match_uses_descendant_link() {
        let html = r#"<li class="post"><span><a href="/p/1">One</a></span></li>"#;
        let links = find_links(html, &base("https://example.com/"), "li.post").unwrap();
        assert_eq!(links[0].as_str(), "https://example.com/p/1");
    }

    #[test]
    fn test_junk_links_are_dropped() {
        let html = r##"<div class="list">
            <a href="#top">Top</a>
            <a href="javascript:void(0)">JS</a>
            <a href="mailto:x@example.com">Mail</a>
            <a href="">Empty</a>
            <a href="/ok">Ok</a>
        </div>"##;
        let links = find_links(html, &base("https://example.com/"), ".list a").unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].as_str(), "https://example.com/ok");
    }

    #[test]
    fn test_latest_with_no_match_is_not_found() {
        let page = base("https://example.com/");
        let links = find_links("<p>nothing</p>", &page, ".list a").unwrap();
        assert!(links.is_empty());
        let err = select_candidates(links, LocateMode::Latest, &page, ".list a").unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_archive_with_no_match_is_empty() {
        let page = base("https://example.com/");
        let res = select_candidates(Vec::new(), LocateMode::Archive, &page, ".list a").unwrap();
        assert!(res.is_empty());
    }

    #[test]
    fn test_latest_takes_first_and_archive_dedupes() {
        let page = base("https://example.com/");
        let html = r#"<ul class="list">
            <li><a href="/a">A</a></li>
            <li><a href="/b">B</a></li>
            <li><a href="/a">A again</a></li>
        </ul>"#;
        let links = find_links(html, &page, ".list a").unwrap();
        assert_eq!(links.len(), 3);

        let latest = select_candidates(links.clone(), LocateMode::Latest, &page, ".list a").unwrap();
        assert_eq!(latest, vec![base("https://example.com/a")]);

        let archive = select_candidates(links, LocateMode::Archive, &page, ".list a").unwrap();
        assert_eq!(archive, vec![base("https://example.com/a"), base("https://example.com/b")]);
    }

    #[test]
    fn test_invalid_selector_is_config_error() {
        let err = find_links("<p></p>", &base("https://example.com/"), "a[[").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
