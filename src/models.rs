//! Data models for article requests, extraction results, and batch payloads.
//!
//! This module defines the core data structures used throughout the application:
//! - [`ArticleRequest`]: One article to scrape, as supplied by the workflow
//! - [`ExtractionResult`]: A successfully extracted article
//! - [`BatchOutcome`]: Everything one batch run produced, in group-then-item order
//! - [`BatchPayload`]: The JSON body posted to the webhook
//! - [`Credentials`]: The subscriber login used for every site group
//!
//! Field names on the wire follow the workflow's JSON (`pubDate`,
//! `trending_topics`), hence the serde renames.

use crate::scrapers::SiteId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An article the workflow wants scraped.
///
/// Identity is the URL: two requests with the same URL are the same article.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ArticleRequest {
    /// The article URL.
    pub url: String,
    /// The headline as known by the workflow.
    #[serde(default)]
    pub title: String,
    /// Publication date, passed through untouched.
    #[serde(default, rename = "pubDate", alias = "publicationDate")]
    pub publication_date: String,
}

/// A successfully extracted article.
///
/// Only created when the extraction cascade succeeds; `text` is already
/// truncated to the configured maximum length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub url: String,
    pub title: String,
    #[serde(rename = "pubDate")]
    pub publication_date: String,
    /// The normalized article text.
    pub text: String,
    /// The batch-wide trending topics annotation.
    pub trending_topics: String,
}

impl ExtractionResult {
    /// Build a result for `request` carrying the extracted `text`.
    pub fn new(request: &ArticleRequest, text: String, trending_topics: &str) -> Self {
        Self {
            url: request.url.clone(),
            title: request.title.clone(),
            publication_date: request.publication_date.clone(),
            text,
            trending_topics: trending_topics.to_string(),
        }
    }
}

/// An article that was attempted but produced no result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub url: String,
    pub reason: String,
}

/// Per-group counters reported at the end of a site group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSummary {
    pub site: SiteId,
    /// Requests assigned to this group.
    pub requested: usize,
    /// Requests whose extraction was actually started.
    pub attempted: usize,
    /// Requests that yielded an [`ExtractionResult`].
    pub succeeded: usize,
    /// Whether the group stopped early (login or re-login failed).
    pub aborted: bool,
}

/// The aggregated result of one batch run.
///
/// Results are ordered group-first (in site processing order), then by input
/// order within each group.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub results: Vec<ExtractionResult>,
    pub failures: Vec<ItemFailure>,
    pub groups: Vec<GroupSummary>,
    /// Unique requests in the batch.
    pub requested: usize,
    pub attempted: usize,
    pub succeeded: usize,
}

impl BatchOutcome {
    /// Fold one group's outcome into the batch.
    pub fn absorb(&mut self, group: GroupOutcome) {
        self.attempted += group.summary.attempted;
        self.succeeded += group.summary.succeeded;
        self.results.extend(group.results);
        self.failures.extend(group.failures);
        self.groups.push(group.summary);
    }
}

/// What one site group produced.
#[derive(Debug)]
pub struct GroupOutcome {
    pub summary: GroupSummary,
    pub results: Vec<ExtractionResult>,
    pub failures: Vec<ItemFailure>,
}

/// The JSON body posted to the webhook.
#[derive(Debug, Serialize)]
pub struct BatchPayload<'a> {
    pub articles: &'a [ExtractionResult],
    pub trending_topics: &'a str,
}

/// Subscriber login shared by both site families.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}
