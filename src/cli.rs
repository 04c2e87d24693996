//! Command-line interface definitions for the VŽ scraper.
//!
//! Every option can be given as a flag or through the environment variable
//! the workflow runner sets (`ARTICLES`, `WEBHOOK_URL`, ...). The helpers on
//! [`Cli`] turn raw options into validated runtime configuration; anything
//! invalid is a [`ConfigError`] and stops the process before a browser is
//! started.

use crate::browser::chromium::BrowserOptions;
use crate::delivery::{BasicAuth, DEFAULT_TOKEN_HEADER, DeliveryConfig};
use crate::extract::ExtractionLimits;
use crate::models::{ArticleRequest, Credentials};
use crate::session::Pacing;
use clap::Parser;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Configuration problems detected at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("WEBHOOK_URL is missing")]
    MissingWebhookUrl,

    #[error("ARTICLES is not a valid JSON array of articles: {0}")]
    InvalidArticles(#[from] serde_json::Error),

    #[error("failed to read articles file {path}: {source}")]
    ArticlesFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("VZ_EMAIL and VZ_PASSWORD are required to scrape articles")]
    MissingCredentials,
}

/// Command-line arguments for the scraper.
///
/// # Examples
///
/// ```sh
/// # Typical workflow invocation: everything from the environment
/// ARTICLES='[{"url":"https://www.vz.lt/..."}]' WEBHOOK_URL=https://... vz_scraper
///
/// # Local debugging with a visible browser and a file of articles
/// vz_scraper --articles-file ./articles.json --webhook-url http://localhost:5678/hook --headful
/// ```
#[derive(Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// JSON array of articles (`url`, `title`, `pubDate`)
    #[arg(long, env = "ARTICLES", hide_env_values = true, conflicts_with = "articles_file")]
    pub articles: Option<String>,

    /// Path of a file holding the articles JSON array
    #[arg(long, env = "ARTICLES_FILE")]
    pub articles_file: Option<PathBuf>,

    /// Free-text trending topics attached to every result
    #[arg(long, env = "TRENDING_TOPICS", default_value = "")]
    pub trending_topics: String,

    /// Subscriber login email
    #[arg(long, env = "VZ_EMAIL")]
    pub email: Option<String>,

    /// Subscriber login password
    #[arg(long, env = "VZ_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Endpoint the batch is posted to (usually a one-time resume URL)
    #[arg(long, env = "WEBHOOK_URL")]
    pub webhook_url: Option<String>,

    /// Shared secret sent as a query parameter and/or header
    #[arg(long, env = "WEBHOOK_TOKEN", hide_env_values = true)]
    pub webhook_token: Option<String>,

    /// Header name used for the webhook token
    #[arg(long, env = "WEBHOOK_TOKEN_HEADER", default_value = DEFAULT_TOKEN_HEADER)]
    pub webhook_token_header: String,

    /// HTTP basic auth user for the webhook
    #[arg(long, env = "WEBHOOK_BASIC_USER")]
    pub webhook_basic_user: Option<String>,

    /// HTTP basic auth password for the webhook
    #[arg(long, env = "WEBHOOK_BASIC_PASSWORD", hide_env_values = true)]
    pub webhook_basic_password: Option<String>,

    /// Exit non-zero when the batch cannot be delivered
    #[arg(long, env = "STRICT_DELIVERY")]
    pub strict_delivery: bool,

    /// Article text is truncated to this many characters
    #[arg(long, env = "MAX_TEXT_LENGTH", default_value_t = 20_000)]
    pub max_text_length: usize,

    /// Articles shorter than this many characters are treated as paywalled
    #[arg(long, env = "MIN_CONTENT_LENGTH", default_value_t = 50)]
    pub min_content_length: usize,

    /// Pause between articles, in milliseconds
    #[arg(long, env = "ITEM_DELAY_MS", default_value_t = 1000)]
    pub item_delay_ms: u64,

    /// Pause between delivery attempts, in milliseconds
    #[arg(long, env = "DELIVERY_BACKOFF_MS", default_value_t = 1000)]
    pub delivery_backoff_ms: u64,

    /// Per-request webhook timeout, in seconds
    #[arg(long, env = "DELIVERY_TIMEOUT_SECS", default_value_t = 20)]
    pub delivery_timeout_secs: u64,

    /// Chrome/Chromium binary (auto-detected by default)
    #[arg(long, env = "CHROME_EXECUTABLE")]
    pub chrome_executable: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    pub headful: bool,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl Cli {
    /// The articles to scrape; no input at all is an empty batch.
    pub fn load_articles(&self) -> Result<Vec<ArticleRequest>, ConfigError> {
        let raw = match (&self.articles, &self.articles_file) {
            (Some(json), _) => json.clone(),
            (None, Some(path)) => {
                std::fs::read_to_string(path).map_err(|source| ConfigError::ArticlesFile {
                    path: path.clone(),
                    source,
                })?
            }
            (None, None) => return Ok(Vec::new()),
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        match (non_empty(&self.email), non_empty(&self.password)) {
            (Some(email), Some(password)) => Ok(Credentials {
                email: email.to_string(),
                password: password.to_string(),
            }),
            _ => Err(ConfigError::MissingCredentials),
        }
    }

    pub fn delivery_config(&self) -> Result<DeliveryConfig, ConfigError> {
        let endpoint = non_empty(&self.webhook_url).ok_or(ConfigError::MissingWebhookUrl)?;
        let basic_auth = non_empty(&self.webhook_basic_user).map(|username| BasicAuth {
            username: username.to_string(),
            password: self.webhook_basic_password.clone().unwrap_or_default(),
        });
        Ok(DeliveryConfig {
            token: non_empty(&self.webhook_token).map(str::to_string),
            token_header: self.webhook_token_header.clone(),
            basic_auth,
            strict: self.strict_delivery,
            backoff: Duration::from_millis(self.delivery_backoff_ms),
            ..DeliveryConfig::new(endpoint)
        })
    }

    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery_timeout_secs)
    }

    pub fn extraction_limits(&self) -> ExtractionLimits {
        ExtractionLimits {
            floor: self.min_content_length,
            max_len: self.max_text_length,
            ..ExtractionLimits::default()
        }
    }

    pub fn pacing(&self) -> Pacing {
        Pacing {
            item_delay: Duration::from_millis(self.item_delay_ms),
            ..Pacing::default()
        }
    }

    pub fn browser_options(&self) -> BrowserOptions {
        BrowserOptions {
            executable: self.chrome_executable.clone(),
            headful: self.headful,
            ..BrowserOptions::default()
        }
    }
}

impl fmt::Debug for Cli {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = |value: &Option<String>| value.as_ref().map(|_| "<redacted>");
        f.debug_struct("Cli")
            .field("articles", &self.articles.as_ref().map(String::len))
            .field("articles_file", &self.articles_file)
            .field("trending_topics", &self.trending_topics)
            .field("email", &self.email)
            .field("password", &redacted(&self.password))
            .field("webhook_url", &self.webhook_url)
            .field("webhook_token", &redacted(&self.webhook_token))
            .field("webhook_token_header", &self.webhook_token_header)
            .field("webhook_basic_user", &self.webhook_basic_user)
            .field("webhook_basic_password", &redacted(&self.webhook_basic_password))
            .field("strict_delivery", &self.strict_delivery)
            .field("max_text_length", &self.max_text_length)
            .field("min_content_length", &self.min_content_length)
            .field("item_delay_ms", &self.item_delay_ms)
            .field("delivery_backoff_ms", &self.delivery_backoff_ms)
            .field("delivery_timeout_secs", &self.delivery_timeout_secs)
            .field("chrome_executable", &self.chrome_executable)
            .field("headful", &self.headful)
            .finish()
    }
}
