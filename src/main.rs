//! # Coin News Relay
//!
//! Scrapes cryptocurrency news sites, optionally rewrites or summarises the
//! story through a generative-language service, and publishes the result to a
//! blog or a social account.
//!
//! ## Features
//!
//! - Built-in profiles for CoinPost, BITTIMES and Ripple 2ch, extendable with
//!   a YAML file of selectors
//! - Generative rewrite (new title and body) or extractive summary
//! - Publishing over blog XML-RPC, the blog REST API, or the X API
//! - Dry runs and JSON run reports
//!
//! ## Usage
//!
//! ```sh
//! coin_news_relay coinpost
//! coin_news_relay ripple2c --dry-run -j ./reports
//! ```
//!
//! ## Architecture
//!
//! One generic pipeline, parameterised by a source profile:
//! 1. **Locating**: find candidate article URLs on the listing page
//! 2. **Extracting**: pull title, date and body out of each page
//! 3. **Transforming**: rewrite or summarise (sequential, one article at a time)
//! 4. **Publishing**: submit each post once, without retry

use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod api;
mod cli;
mod config;
mod error;
mod fetch;
mod models;
mod outputs;
mod pipeline;
mod publishers;
mod retry;
mod scrapers;
#[cfg(test)]
mod test_support;
mod transform;
mod utils;

use api::{GeminiClient, RetryAsk};
use cli::Cli;
use config::Settings;
use fetch::Fetcher;
use outputs::json;
use pipeline::{Pipeline, RunOptions};
use publishers::Publisher;
use retry::Backoff;
use transform::Transformer;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("coin_news_relay starting up");

    let args = Cli::parse();
    debug!(source = ?args.source, dry_run = args.dry_run, ?args.json_output_dir, "Parsed CLI arguments");

    // ---- Source profiles ----
    let mut registry = scrapers::sources::builtin();
    if let Some(path) = &args.sources {
        registry.merge_file(path)?;
    }

    if args.list_sources {
        for profile in registry.profiles() {
            println!(
                "{:<12} {:<8} {:?}  {}",
                profile.id,
                format!("{:?}", profile.mode).to_lowercase(),
                profile.publisher,
                profile.description
            );
        }
        return Ok(());
    }

    let source = args
        .source
        .as_deref()
        .ok_or_else(|| error::Error::Config("no source given".to_string()))?;
    let profile = registry.get(source)?.clone();
    profile.validate()?;
    info!(source = %profile.id, url = %profile.listing_url, mode = ?profile.mode, "Selected source");

    // ---- Credentials: fail before any network activity ----
    let settings = Settings::from_env(&profile, args.dry_run, args.env_file.as_deref())?;

    // Early check: ensure JSON output dir is writable
    if let Some(dir) = &args.json_output_dir {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(
                path = %dir,
                error = %e,
                "JSON output directory is not writable (fix perms or choose a different path)"
            );
            return Err(e.into());
        }
    }

    // ---- Stage wiring ----
    let fetcher = Fetcher::new(
        Duration::from_secs(args.timeout_secs),
        Backoff::new(args.fetch_retries, Duration::from_millis(500)),
    )?;

    let ask = settings.gemini.map(|g| {
        info!(model = %g.model, "Generative service configured");
        RetryAsk::new(
            GeminiClient::new(fetcher.client().clone(), g),
            Backoff::new(args.generation_retries, Duration::from_secs(1)),
        )
    });
    let transformer = Transformer::new(profile.transform.clone(), ask)?;

    let publisher = settings
        .publisher
        .map(|creds| Publisher::new(fetcher.client().clone(), creds));
    if let Some(p) = &publisher {
        info!(destination = p.name(), "Publisher configured");
    }

    let pipeline = Pipeline::new(profile, fetcher, transformer, publisher)?;

    // ---- Run ----
    let opts = RunOptions {
        url_override: args.url.clone(),
        limit: args.limit,
        dry_run: args.dry_run,
    };
    let report = match pipeline.run(&opts).await {
        Ok(report) => report,
        Err(e) => {
            error!(kind = e.kind(), error = %e, "Run aborted");
            return Err(e.into());
        }
    };

    if let Some(dir) = &args.json_output_dir {
        if let Err(e) = json::write_report(&report, dir).await {
            error!(error = %e, "Failed to write JSON run report");
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        published = report.stats.published,
        failed = report.stats.failed,
        "Execution complete"
    );

    Ok(())
}
