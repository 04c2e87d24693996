//! # VŽ Scraper
//!
//! Extracts subscriber-only articles from Verslo žinios (vz.lt) and Mano
//! Pinigai (manopinigai.vz.lt) with a logged-in headless browser, and posts
//! the batch back to the workflow that requested it.
//!
//! ## Usage
//!
//! ```sh
//! ARTICLES='[{"url":"https://www.vz.lt/...","title":"...","pubDate":"..."}]' \
//! VZ_EMAIL=... VZ_PASSWORD=... WEBHOOK_URL=https://... vz_scraper
//! ```
//!
//! ## Architecture
//!
//! The run is a strictly sequential pipeline:
//! 1. **Partitioning**: requests are deduplicated and grouped by site
//!    ([`batch`])
//! 2. **Scraping**: each group gets its own browser session, logs in once and
//!    walks its articles, re-logging in when the session drops ([`session`],
//!    [`auth`])
//! 3. **Extraction**: each rendered page goes through the text extraction
//!    cascade ([`extract`])
//! 4. **Delivery**: the collected results are posted to the webhook through a
//!    fallback matrix of token placements ([`delivery`])
//!
//! Per-article failures never stop a run. The process exits non-zero only on
//! configuration errors, or when delivery fails in strict mode.

use clap::Parser;
use std::error::Error;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod auth;
mod batch;
mod browser;
mod cli;
mod delivery;
mod error;
mod extract;
mod models;
mod report;
mod scrapers;
mod session;
mod utils;

use auth::{AuthTimings, Authenticator};
use batch::BatchCoordinator;
use browser::chromium::ChromiumLauncher;
use cli::Cli;
use delivery::{DeliveryClient, DeliveryOutcome, HttpTransport};
use extract::ContentExtractor;
use models::{BatchOutcome, BatchPayload};
use report::TracingReporter;

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

    let start_time = Instant::now();
    info!("vz_scraper starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // Configuration errors end the run before any browser starts.
    let delivery_config = args.delivery_config()?;
    let articles = args.load_articles()?;
    info!(
        articles = articles.len(),
        trending_topics = !args.trending_topics.is_empty(),
        "Loaded batch"
    );

    let outcome = if articles.is_empty() {
        warn!("No articles to scrape; delivering an empty batch");
        BatchOutcome::default()
    } else {
        let credentials = args.credentials()?;
        let coordinator = BatchCoordinator::new(
            ChromiumLauncher::new(args.browser_options()),
            TracingReporter,
            credentials,
        )
        .with_authenticator(Authenticator::new(AuthTimings::default()))
        .with_extractor(ContentExtractor::new(args.extraction_limits()))
        .with_pacing(args.pacing());
        coordinator.run_batch(&articles, &args.trending_topics).await
    };

    info!(
        requested = outcome.requested,
        attempted = outcome.attempted,
        succeeded = outcome.succeeded,
        groups = outcome.groups.len(),
        "Batch complete: {}/{} articles extracted",
        outcome.succeeded,
        outcome.requested
    );
    for failure in &outcome.failures {
        debug!(url = %failure.url, reason = %failure.reason, "Article not extracted");
    }

    // ---- Delivery ----
    let client = DeliveryClient::new(delivery_config, HttpTransport::new(args.delivery_timeout())?);
    let payload = BatchPayload {
        articles: &outcome.results,
        trending_topics: &args.trending_topics,
    };
    match client.deliver(&payload).await? {
        DeliveryOutcome::Delivered { attempts, status } => {
            info!(articles = outcome.results.len(), attempts, status, "Sent batch to webhook");
        }
        DeliveryOutcome::Failed { attempts, last_error } => {
            error!(
                attempts,
                error = %last_error,
                "Failed to deliver batch; exiting normally because strict delivery is off"
            );
        }
    }

    info!(
        elapsed_ms_total = start_time.elapsed().as_millis() as u64,
        attempted = outcome.attempted,
        succeeded = outcome.succeeded,
        "vz_scraper finished"
    );
    Ok(())
}
