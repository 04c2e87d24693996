//! Progress reporting hooks for batch runs.
//!
//! Orchestration code reports what happens through [`BatchReporter`] instead
//! of logging progress itself, so runs can be observed in tests. All hooks
//! default to no-ops; [`TracingReporter`] is the production implementation.

use crate::error::ScrapeError;
use crate::extract::Extraction;
use crate::models::{ArticleRequest, GroupSummary};
use crate::scrapers::SiteId;
use crate::utils::{char_len, truncate_for_log};
use tracing::{error, info, warn};

/// Observer of batch progress.
pub trait BatchReporter {
    fn group_started(&self, _site: SiteId, _items: usize) {}

    fn logged_in(&self, _site: SiteId) {}

    /// `index` is zero-based within the group.
    fn item_succeeded(
        &self,
        _site: SiteId,
        _index: usize,
        _total: usize,
        _request: &ArticleRequest,
        _extraction: &Extraction,
    ) {
    }

    fn item_failed(
        &self,
        _site: SiteId,
        _index: usize,
        _request: &ArticleRequest,
        _error: &ScrapeError,
    ) {
    }

    fn reauthenticated(&self, _site: SiteId, _result: Result<(), &ScrapeError>) {}

    /// The group stopped early; remaining items will not be attempted.
    fn group_aborted(&self, _site: SiteId, _error: &ScrapeError) {}

    fn group_finished(&self, _summary: &GroupSummary) {}
}

/// Reports progress as `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl BatchReporter for TracingReporter {
    fn group_started(&self, site: SiteId, items: usize) {
        info!(%site, items, "Starting site group");
    }

    fn logged_in(&self, site: SiteId) {
        info!(%site, "Session authenticated");
    }

    fn item_succeeded(
        &self,
        site: SiteId,
        index: usize,
        total: usize,
        request: &ArticleRequest,
        extraction: &Extraction,
    ) {
        info!(
            %site,
            item = index + 1,
            total,
            url = %request.url,
            title = %truncate_for_log(&request.title, 50),
            stage = %extraction.stage,
            chars = char_len(&extraction.text),
            truncated_from = ?extraction.truncated_from,
            "Article extracted"
        );
    }

    fn item_failed(
        &self,
        site: SiteId,
        index: usize,
        request: &ArticleRequest,
        error: &ScrapeError,
    ) {
        warn!(
            %site,
            item = index + 1,
            url = %request.url,
            error = %error,
            "Article extraction failed"
        );
    }

    fn reauthenticated(&self, site: SiteId, result: Result<(), &ScrapeError>) {
        match result {
            Ok(()) => info!(%site, "Re-login successful"),
            Err(e) => error!(%site, error = %e, "Re-login failed"),
        }
    }

    fn group_aborted(&self, site: SiteId, error: &ScrapeError) {
        error!(%site, error = %error, "Site group aborted");
    }

    fn group_finished(&self, summary: &GroupSummary) {
        info!(
            site = %summary.site,
            requested = summary.requested,
            attempted = summary.attempted,
            succeeded = summary.succeeded,
            aborted = summary.aborted,
            "Site group finished"
        );
    }
}

#[cfg(test)]
pub mod testing {
    use super::BatchReporter;
    use crate::error::ScrapeError;
    use crate::extract::Extraction;
    use crate::models::{ArticleRequest, GroupSummary};
    use crate::scrapers::SiteId;
    use std::cell::RefCell;

    /// Records every hook call as a short string.
    #[derive(Debug, Default)]
    pub struct RecordingReporter {
        pub events: RefCell<Vec<String>>,
    }

    impl RecordingReporter {
        pub fn events(&self) -> Vec<String> {
            self.events.borrow().clone()
        }

        fn push(&self, event: String) {
            self.events.borrow_mut().push(event);
        }
    }

    impl BatchReporter for RecordingReporter {
        fn group_started(&self, site: SiteId, items: usize) {
            self.push(format!("start {site} {items}"));
        }

        fn logged_in(&self, site: SiteId) {
            self.push(format!("login {site}"));
        }

        fn item_succeeded(
            &self,
            _site: SiteId,
            _index: usize,
            _total: usize,
            request: &ArticleRequest,
            _extraction: &Extraction,
        ) {
            self.push(format!("ok {}", request.url));
        }

        fn item_failed(
            &self,
            _site: SiteId,
            _index: usize,
            request: &ArticleRequest,
            _error: &ScrapeError,
        ) {
            self.push(format!("fail {}", request.url));
        }

        fn reauthenticated(&self, site: SiteId, result: Result<(), &ScrapeError>) {
            self.push(format!("relogin {site} {}", result.is_ok()));
        }

        fn group_aborted(&self, site: SiteId, _error: &ScrapeError) {
            self.push(format!("abort {site}"));
        }

        fn group_finished(&self, summary: &GroupSummary) {
            self.push(format!(
                "finish {} {}/{}",
                summary.site, summary.succeeded, summary.requested
            ));
        }
    }
}
