//! Command-line interface definitions for Coin News Relay.
//!
//! Every option can also come from the environment variable named in its
//! `env` attribute.

use clap::Parser;
use std::path::PathBuf;
use url::Url;

/// Scrape a crypto news source, optionally rewrite or summarise the story,
/// and publish it to a blog or social account.
///
/// # Examples
///
/// ```sh
/// # Newest CoinPost story, rewritten and posted to the blog
/// coin_news_relay coinpost
///
/// # Everything except the publish call, with a JSON report
/// coin_news_relay ripple2c --dry-run -j ./reports
///
/// # One specific article, custom profiles
/// coin_news_relay mysite --sources ./sources.yaml --url https://example.com/news/1
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Source profile to run (see --list-sources)
    #[arg(required_unless_present = "list_sources")]
    pub source: Option<String>,

    /// YAML file adding or replacing source profiles
    #[arg(long, env = "COIN_NEWS_SOURCES")]
    pub sources: Option<PathBuf>,

    /// Settings file with credentials (default: ./.env when present)
    #[arg(long)]
    pub env_file: Option<PathBuf>,

    /// Process this article URL instead of locating candidates
    #[arg(long)]
    pub url: Option<Url>,

    /// Maximum number of candidate URLs to process
    #[arg(long)]
    pub limit: Option<usize>,

    /// Run everything except publishing
    #[arg(long)]
    pub dry_run: bool,

    /// Output directory for the JSON run report
    #[arg(short, long, env = "COIN_NEWS_JSON_DIR")]
    pub json_output_dir: Option<String>,

    /// Print the available source profiles and exit
    #[arg(long)]
    pub list_sources: bool,

    /// Per-request timeout in seconds
    #[arg(long, env = "COIN_NEWS_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Retries for transient page fetch failures
    #[arg(long, default_value_t = 2)]
    pub fetch_retries: usize,

    /// Retries for failed generative-service calls
    #[arg(long, default_value_t = 1)]
    pub generation_retries: usize,
}
