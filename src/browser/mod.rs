//! Boundary to the page-rendering engine.
//!
//! The pipeline only needs a handful of browser primitives, expressed by two
//! traits:
//!
//! - [`SessionLauncher`]: starts a fresh rendering session (one per site group)
//! - [`PageDriver`]: drives that session's single page
//!
//! [`chromium`] implements them on headless Chromium. Tests use the scripted
//! driver in `testing`.
//!
//! Locating login fields goes through [`locate_first`], which probes an
//! ordered list of [`Locator`]s and returns the first that appears.

use crate::error::ScrapeError;
use std::time::Duration;
use tracing::debug;

pub mod chromium;

/// A snapshot of a rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// The URL the page ended up on (after redirects).
    pub url: String,
    /// Serialized DOM.
    pub html: String,
}

/// A declarative CSS locator for an element the driver should find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Locator(pub &'static str);

impl Locator {
    pub fn css(&self) -> &'static str {
        self.0
    }
}

/// Primitive page operations of one rendering session.
///
/// All operations act on the session's single page.
pub trait PageDriver {
    /// Navigate to `url` and wait for the document to load.
    async fn goto(&mut self, url: &str) -> Result<(), ScrapeError>;

    /// Wait up to `timeout` for `selector` to match. `Ok(false)` on timeout.
    async fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<bool, ScrapeError>;

    /// Focus the element matching `selector` and type `text` into it.
    async fn type_text(&mut self, selector: &str, text: &str) -> Result<(), ScrapeError>;

    /// Click the element matching `selector`.
    async fn click(&mut self, selector: &str) -> Result<(), ScrapeError>;

    /// Wait up to `timeout` for the navigation triggered by the last action.
    async fn wait_for_navigation(&mut self, timeout: Duration) -> Result<(), ScrapeError>;

    /// Current URL and DOM of the page.
    async fn snapshot(&mut self) -> Result<RenderedPage, ScrapeError>;

    /// Reload the current page.
    async fn reload(&mut self) -> Result<(), ScrapeError>;

    /// Release the session. Called exactly once, on every exit path.
    async fn close(self) -> Result<(), ScrapeError>;
}

/// Starts rendering sessions.
pub trait SessionLauncher {
    type Driver: PageDriver;

    async fn launch(&self) -> Result<Self::Driver, ScrapeError>;
}

/// Probe `locators` in order and return the first one that appears within
/// `timeout`.
///
/// Each candidate gets the full timeout. Driver errors other than a timeout
/// are propagated.
pub async fn locate_first<D: PageDriver>(
    driver: &mut D,
    locators: &[Locator],
    timeout: Duration,
) -> Result<Option<Locator>, ScrapeError> {
    for locator in locators {
        if driver.wait_for_selector(locator.css(), timeout).await? {
            debug!(selector = locator.css(), "Locator resolved");
            return Ok(Some(*locator));
        }
        debug!(selector = locator.css(), "Locator did not resolve");
    }
    Ok(None)
}


#[cfg(test)]
mod tests {
    use super::testing::FakeLauncher;
    use super::*;

    const CANDIDATES: &[Locator] = &[
        Locator("#email"),
        Locator("input[name=\"email\"]"),
        Locator("input[type=\"text\"]"),
    ];

    #[tokio::test]
    async fn test_locate_first_returns_first_present_candidate() {
        let launcher =
            FakeLauncher::with_login_fields(&["input[type=\"text\"]", "input[name=\"email\"]"]);
        let mut driver = launcher.launch().await.unwrap();

        let found = locate_first(&mut driver, CANDIDATES, Duration::ZERO).await.unwrap();
        assert_eq!(found, Some(Locator("input[name=\"email\"]")));
        assert_eq!(launcher.count_calls("wait "), 2);
    }

    #[tokio::test]
    async fn test_locate_first_reports_not_found() {
        let launcher = FakeLauncher::with_login_fields(&[]);
        let mut driver = launcher.launch().await.unwrap();

        let found = locate_first(&mut driver, CANDIDATES, Duration::ZERO).await.unwrap();
        assert_eq!(found, None);
        assert_eq!(launcher.count_calls("wait "), CANDIDATES.len());
    }
}
