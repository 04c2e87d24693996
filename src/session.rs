//! Per-site batch loop over one authenticated rendering session.
//!
//! A [`SessionRunner`] walks one site group through
//! `Init → LoggedIn → Processing → (Reauthenticating → Processing | Aborted) → Closed`:
//!
//! - an article URL that is not absolute http(s) fails as an item, without
//!   navigating
//! - the initial login failing is fatal to the group (nothing is attempted)
//! - an item failing for any reason other than session loss is recorded and
//!   the loop moves on
//! - session loss triggers exactly one re-login; on success the item is
//!   retried once, on failure the group stops but keeps what it collected
//! - the session is closed on every path out of the group

use crate::auth::{Authenticator, Session};
use crate::browser::{PageDriver, RenderedPage, SessionLauncher};
use crate::error::ScrapeError;
use crate::extract::{ContentExtractor, Extraction};
use crate::models::{
    ArticleRequest, Credentials, ExtractionResult, GroupOutcome, GroupSummary, ItemFailure,
};
use crate::report::BatchReporter;
use crate::scrapers::SiteProfile;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, instrument, warn};
use url::Url;

/// Delays and retry bounds of the item loop.
#[derive(Debug, Clone)]
pub struct Pacing {
    /// Pause after each successful item.
    pub item_delay: Duration,
    /// Wait each profile's settle delay after navigation.
    pub page_settle: bool,
    /// Extra attempts when the navigation context is lost.
    pub navigation_retries: usize,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            item_delay: Duration::from_millis(1000),
            page_settle: true,
            navigation_retries: 2,
        }
    }
}

impl Pacing {
    #[cfg(test)]
    pub fn immediate() -> Self {
        Self {
            item_delay: Duration::ZERO,
            page_settle: false,
            navigation_retries: 2,
        }
    }
}

/// Everything a runner borrows from the batch coordinator.
pub struct SessionRunner<'a, L, R> {
    pub launcher: &'a L,
    pub authenticator: &'a Authenticator,
    pub extractor: &'a ContentExtractor,
    pub reporter: &'a R,
    pub credentials: &'a Credentials,
    pub pacing: &'a Pacing,
}

impl<L, R> SessionRunner<'_, L, R>
where
    L: SessionLauncher,
    R: BatchReporter,
{
    /// Process one site group with a fresh session.
    ///
    /// Never fails: group-level problems mark the outcome as aborted and keep
    /// whatever results were collected.
    #[instrument(level = "info", skip_all, fields(site = %profile.id, items = requests.len()))]
    pub async fn run(
        &self,
        profile: &'static SiteProfile,
        requests: &[ArticleRequest],
        trending_topics: &str,
    ) -> GroupOutcome {
        let mut outcome = GroupOutcome {
            summary: GroupSummary {
                site: profile.id,
                requested: requests.len(),
                attempted: 0,
                succeeded: 0,
                aborted: false,
            },
            results: Vec::new(),
            failures: Vec::new(),
        };
        self.reporter.group_started(profile.id, requests.len());

        match Session::open(self.launcher, profile.id).await {
            Err(e) => {
                self.reporter.group_aborted(profile.id, &e);
                outcome.summary.aborted = true;
            }
            Ok(mut session) => {
                match self
                    .authenticator
                    .authenticate(&mut session, profile, self.credentials)
                    .await
                {
                    Ok(()) => {
                        self.reporter.logged_in(profile.id);
                        self.process(&mut session, profile, requests, trending_topics, &mut outcome)
                            .await;
                    }
                    Err(e) => {
                        self.reporter.group_aborted(profile.id, &e);
                        outcome.summary.aborted = true;
                    }
                }
                session.close().await;
            }
        }

        self.reporter.group_finished(&outcome.summary);
        outcome
    }

    async fn process<D: PageDriver>(
        &self,
        session: &mut Session<D>,
        profile: &'static SiteProfile,
        requests: &[ArticleRequest],
        trending_topics: &str,
        outcome: &mut GroupOutcome,
    ) {
        let total = requests.len();
        let mut index = 0;
        let mut retrying = false;

        while index < total {
            let request = &requests[index];
            if !retrying {
                outcome.summary.attempted += 1;
            }

            match self.extract_item(&mut session.driver, profile, request).await {
                Ok(extraction) => {
                    self.reporter
                        .item_succeeded(profile.id, index, total, request, &extraction);
                    outcome
                        .results
                        .push(ExtractionResult::new(request, extraction.text, trending_topics));
                    outcome.summary.succeeded += 1;
                    if index + 1 < total {
                        sleep(self.pacing.item_delay).await;
                    }
                }
                Err(e) if e.is_session_loss() => {
                    debug!(index, retrying, error = %e, "Session lost; re-authenticating");
                    let relogin = self
                        .authenticator
                        .authenticate(session, profile, self.credentials)
                        .await;
                    self.reporter.reauthenticated(profile.id, relogin.as_ref().copied());

                    if let Err(relogin_err) = relogin {
                        self.record_failure(outcome, profile, index, request, e);
                        self.reporter.group_aborted(profile.id, &relogin_err);
                        outcome.summary.aborted = true;
                        return;
                    }

                    if !retrying {
                        retrying = true;
                        continue;
                    }
                    self.record_failure(outcome, profile, index, request, e);
                }
                Err(e) => self.record_failure(outcome, profile, index, request, e),
            }

            index += 1;
            retrying = false;
        }
    }

    fn record_failure(
        &self,
        outcome: &mut GroupOutcome,
        profile: &SiteProfile,
        index: usize,
        request: &ArticleRequest,
        error: ScrapeError,
    ) {
        self.reporter.item_failed(profile.id, index, request, &error);
        outcome.failures.push(ItemFailure {
            url: request.url.clone(),
            reason: error.to_string(),
        });
    }

    async fn extract_item<D: PageDriver>(
        &self,
        driver: &mut D,
        profile: &SiteProfile,
        request: &ArticleRequest,
    ) -> Result<Extraction, ScrapeError> {
        validate_url(&request.url)?;
        let page = self.load(driver, profile, &request.url).await?;
        self.extractor.extract(&page, profile)
    }

    /// Navigate to `url` and snapshot it, retrying when the navigation
    /// context is lost.
    ///
    /// A reload is only issued once `url` itself has loaded; until then the
    /// tab may still show the previous article, so the retry navigates again.
    #[instrument(level = "info", skip_all, fields(url = %url))]
    async fn load<D: PageDriver>(
        &self,
        driver: &mut D,
        profile: &SiteProfile,
        url: &str,
    ) -> Result<RenderedPage, ScrapeError> {
        let mut attempt = 0;
        let mut on_target = false;
        loop {
            let navigated = if on_target {
                driver.reload().await
            } else {
                driver.goto(url).await
            };
            on_target = navigated.is_ok();
            let result = match navigated {
                Ok(()) => {
                    if self.pacing.page_settle {
                        sleep(Duration::from_millis(profile.settle_ms)).await;
                    }
                    driver.snapshot().await
                }
                Err(e) => Err(e),
            };

            match result {
                Err(ScrapeError::NavigationContextLost(message))
                    if attempt < self.pacing.navigation_retries =>
                {
                    attempt += 1;
                    warn!(
                        attempt,
                        max = self.pacing.navigation_retries,
                        reload = on_target,
                        error = %message,
                        "Navigation context lost; retrying"
                    );
                }
                other => return other,
            }
        }
    }
}

fn validate_url(url: &str) -> Result<(), ScrapeError> {
    let parsed = Url::parse(url).map_err(|e| ScrapeError::InvalidRequest {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(ScrapeError::InvalidRequest {
            url: url.to_string(),
            reason: format!("unsupported scheme {scheme}"),
        }),
    }
}
