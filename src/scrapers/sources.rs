//! Built-in source profiles.
//!
//! | Id | Site | Locator | Transformer | Publisher |
//! |----|------|---------|-------------|-----------|
//! | `coinpost` | [CoinPost](https://coinpost.jp/) | latest | rewrite | blog XML-RPC |
//! | `bittimes` | [BITTIMES](https://bittimes.net/) | latest | local summary | social post |
//! | `ripple2c` | [Ripple 2ch](https://ripple.2chblog.jp/) | direct (one monthly archive page) | rewrite | blog XML-RPC |
//!
//! Any of these can be replaced, and new sites added, with a YAML file passed
//! via `--sources`.

use crate::config::{
    ContentOptions, ExtractionRule, LocateMode, PublisherTarget, RewriteOptions, SourceProfile,
    SourceRegistry, SummarizeOptions, TransformPolicy,
};
use url::Url;

fn url(s: &str) -> Url {
    // Built-in literals only.
    Url::parse(s).unwrap_or_else(|e| panic!("invalid built-in URL {s}: {e}"))
}

/// CoinPost front page: newest story, rewritten for beginners.
pub fn coinpost() -> SourceProfile {
    SourceProfile {
        id: "coinpost".to_string(),
        description: "Newest CoinPost story, rewritten for beginners".to_string(),
        listing_url: url("https://coinpost.jp/"),
        mode: LocateMode::Latest,
        link_selector: ".hmml-list .homelist-in:first-of-type .homelist-in-text a".to_string(),
        extraction: ExtractionRule {
            block_selector: None,
            title_selector: Some(".entry-content h1".to_string()),
            date_selector: Some("time".to_string()),
            body_selector: ".entry-content p".to_string(),
            require_body: true,
        },
        transform: TransformPolicy::Rewrite(RewriteOptions {
            instructions: vec![
                "Write in the polite desu/masu register.".to_string(),
                "Give the article a new title.".to_string(),
            ],
            include_source_url: true,
            ..RewriteOptions::default()
        }),
        publisher: PublisherTarget::WordpressXmlrpc,
        content: ContentOptions {
            source_link_label: Some("元記事はこちら".to_string()),
            ..ContentOptions::default()
        },
    }
}

/// BITTIMES front page: newest story, summarised locally and posted to the
/// social feed.
pub fn bittimes() -> SourceProfile {
    SourceProfile {
        id: "bittimes".to_string(),
        description: "Newest BITTIMES story, summarised and posted to X".to_string(),
        listing_url: url("https://bittimes.net/"),
        mode: LocateMode::Latest,
        link_selector: ".thumb-text-list-posts a".to_string(),
        extraction: ExtractionRule {
            block_selector: None,
            title_selector: Some("h1".to_string()),
            date_selector: None,
            body_selector: "h1, h2, p".to_string(),
            require_body: true,
        },
        transform: TransformPolicy::Summarize(SummarizeOptions::default()),
        publisher: PublisherTarget::X,
        content: ContentOptions::default(),
    }
}

/// Ripple 2ch blog: one monthly archive page, each post on it rewritten.
///
/// Other months are reached with `--url`, or with a YAML profile in
/// `archive` mode over the sidebar (`div#plugin-monthly-1172541 div.sidebody a`)
/// and a `--limit`.
pub fn ripple2c() -> SourceProfile {
    SourceProfile {
        id: "ripple2c".to_string(),
        description: "Every post on one Ripple 2ch monthly archive page, rewritten".to_string(),
        listing_url: url("https://ripple.2chblog.jp/archives/2025-03.html"),
        mode: LocateMode::Direct,
        link_selector: String::new(),
        extraction: ExtractionRule {
            block_selector: Some("div.article-outer.hentry".to_string()),
            title_selector: Some("h2.article-title.entry-title".to_string()),
            date_selector: Some(".article-date".to_string()),
            body_selector: "div.article-body.entry-content".to_string(),
            require_body: false,
        },
        transform: TransformPolicy::Rewrite(RewriteOptions {
            instructions: vec![
                "Do not use markdown heading markers such as ##.".to_string(),
                "Keep the title within 32 characters.".to_string(),
                "Use headings and paragraphs so the body is easy to read.".to_string(),
            ],
            ..RewriteOptions::default()
        }),
        publisher: PublisherTarget::WordpressXmlrpc,
        content: ContentOptions {
            source_link_label: Some("▶ 参考記事を読む".to_string()),
            ..ContentOptions::default()
        },
    }
}

/// The registry every run starts from.
pub fn builtin() -> SourceRegistry {
    SourceRegistry::new(vec![coinpost(), bittimes(), ripple2c()])
}
