//! Batch coordination across site groups.
//!
//! A batch is partitioned by site profile and each non-empty group is run by
//! its own [`SessionRunner`], one after the other, in
//! [`SiteId::PROCESSING_ORDER`]. A group aborting never aborts the batch:
//! whatever each group collected ends up in the [`BatchOutcome`].

use crate::auth::Authenticator;
use crate::browser::SessionLauncher;
use crate::extract::ContentExtractor;
use crate::models::{ArticleRequest, BatchOutcome, Credentials};
use crate::report::BatchReporter;
use crate::scrapers::{SiteId, SiteProfile, profile, profile_for};
use crate::session::{Pacing, SessionRunner};
use itertools::Itertools;
use tracing::{info, instrument, warn};

/// One site group: its profile and its requests in input order.
pub type SiteGroup = (&'static SiteProfile, Vec<ArticleRequest>);

/// Split `requests` into non-empty site groups, in processing order.
///
/// Requests with a URL seen earlier in the batch are dropped, so every
/// article is scraped at most once. Every other request lands in exactly one
/// group, malformed URLs included; those fail as items inside their group.
pub fn partition(requests: &[ArticleRequest]) -> Vec<SiteGroup> {
    let unique = requests.iter().unique_by(|r| r.url.clone()).collect_vec();
    if unique.len() < requests.len() {
        warn!(
            duplicates = requests.len() - unique.len(),
            "Dropped duplicate article URLs"
        );
    }

    let mut groups = SiteId::PROCESSING_ORDER
        .iter()
        .map(|&id| (profile(id), Vec::new()))
        .collect_vec();

    for request in unique {
        let site = profile_for(&request.url).id;
        if let Some((_, items)) = groups.iter_mut().find(|(p, _)| p.id == site) {
            items.push(request.clone());
        }
    }

    groups
        .into_iter()
        .filter(|(_, items)| !items.is_empty())
        .collect()
}

/// Runs whole batches, one rendering session per site group.
pub struct BatchCoordinator<L, R> {
    launcher: L,
    authenticator: Authenticator,
    extractor: ContentExtractor,
    reporter: R,
    credentials: Credentials,
    pacing: Pacing,
}

impl<L, R> BatchCoordinator<L, R>
where
    L: SessionLauncher,
    R: BatchReporter,
{
    pub fn new(launcher: L, reporter: R, credentials: Credentials) -> Self {
        Self {
            launcher,
            authenticator: Authenticator::default(),
            extractor: ContentExtractor::default(),
            reporter,
            credentials,
            pacing: Pacing::default(),
        }
    }

    pub fn with_authenticator(mut self, authenticator: Authenticator) -> Self {
        self.authenticator = authenticator;
        self
    }

    pub fn with_extractor(mut self, extractor: ContentExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// Scrape every request, stamping each result with `trending_topics`.
    ///
    /// # Returns
    ///
    /// Results in group-then-item order, plus per-group summaries and the
    /// failed items. Never fails: item and group problems are recorded in the
    /// outcome.
    #[instrument(level = "info", skip_all, fields(requests = requests.len()))]
    pub async fn run_batch(
        &self,
        requests: &[ArticleRequest],
        trending_topics: &str,
    ) -> BatchOutcome {
        let groups = partition(requests);
        let mut outcome = BatchOutcome {
            requested: groups.iter().map(|(_, items)| items.len()).sum(),
            ..BatchOutcome::default()
        };
        info!(
            groups = groups.len(),
            articles = outcome.requested,
            "Partitioned batch by site"
        );

        let runner = SessionRunner {
            launcher: &self.launcher,
            authenticator: &self.authenticator,
            extractor: &self.extractor,
            reporter: &self.reporter,
            credentials: &self.credentials,
            pacing: &self.pacing,
        };
        for (profile, items) in &groups {
            let group = runner.run(*profile, items, trending_topics).await;
            outcome.absorb(group);
        }

        info!(
            requested = outcome.requested,
            attempted = outcome.attempted,
            succeeded = outcome.succeeded,
            failed = outcome.failures.len(),
            "Batch finished"
        );
        outcome
    }
}
