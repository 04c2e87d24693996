//! Subscriber login for a rendering session.
//!
//! The login host is a two-step form: an email page, then a password page.
//! Both steps follow the same pattern: probe candidate locators in order,
//! type into the first one that appears, submit, and wait for the next page.

use crate::browser::{Locator, PageDriver, SessionLauncher, locate_first};
use crate::error::ScrapeError;
use crate::models::Credentials;
use crate::scrapers::{SiteId, SiteProfile};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

/// Identity (email) field candidates, most specific first.
pub const IDENTITY_LOCATORS: &[Locator] = &[
    Locator("#email"),
    Locator("input[id=\"email\"]"),
    Locator("input[type=\"text\"][placeholder*=\"pašto\"]"),
    Locator("input[autocomplete=\"vzusername\"]"),
    Locator("input[type=\"text\"]"),
    Locator("input[name=\"email\"]"),
];

/// Credential (password) field candidates.
pub const CREDENTIAL_LOCATORS: &[Locator] = &[
    Locator("input[type=\"password\"]"),
    Locator("#password"),
    Locator("input[name=\"password\"]"),
];

pub const SUBMIT: Locator = Locator("button[type=\"submit\"]");

/// Waits used while driving the login form.
#[derive(Debug, Clone)]
pub struct AuthTimings {
    /// Pause after the login page loads.
    pub settle: Duration,
    /// Per-candidate wait for the identity field.
    pub identity_timeout: Duration,
    /// Per-candidate wait for the credential field.
    pub credential_timeout: Duration,
    /// Wait for the navigation after each submit.
    pub navigation_timeout: Duration,
}

impl Default for AuthTimings {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(1500),
            identity_timeout: Duration::from_secs(5),
            credential_timeout: Duration::from_secs(10),
            navigation_timeout: Duration::from_secs(30),
        }
    }
}

impl AuthTimings {
    #[cfg(test)]
    pub fn immediate() -> Self {
        Self {
            settle: Duration::ZERO,
            identity_timeout: Duration::ZERO,
            credential_timeout: Duration::ZERO,
            navigation_timeout: Duration::ZERO,
        }
    }
}

/// A rendering session owned by one site group.
///
/// Opened with [`Session::open`], released with [`Session::close`]; the
/// session runner closes it on every exit path.
pub struct Session<D> {
    pub site: SiteId,
    pub authenticated: bool,
    pub driver: D,
}

impl<D: PageDriver> Session<D> {
    pub async fn open<L>(launcher: &L, site: SiteId) -> Result<Self, ScrapeError>
    where
        L: SessionLauncher<Driver = D>,
    {
        let driver = launcher.launch().await?;
        Ok(Self {
            site,
            authenticated: false,
            driver,
        })
    }

    pub async fn close(self) {
        debug!(site = %self.site, authenticated = self.authenticated, "Closing rendering session");
        if let Err(e) = self.driver.close().await {
            warn!(site = %self.site, error = %e, "Failed to close rendering session");
        }
    }
}

/// Drives the login form of a site profile.
#[derive(Debug, Clone, Default)]
pub struct Authenticator {
    timings: AuthTimings,
}

impl Authenticator {
    pub fn new(timings: AuthTimings) -> Self {
        Self { timings }
    }

    /// Log `session` in to `profile`'s site.
    ///
    /// Safe to call on an already authenticated session; the flow simply runs
    /// again. On any failure the session is left unauthenticated.
    ///
    /// # Errors
    ///
    /// - [`ScrapeError::AuthFieldNotFound`] when no candidate locator for a
    ///   field appears
    /// - any driver error raised while navigating or typing
    #[instrument(level = "info", skip_all, fields(site = %profile.id))]
    pub async fn authenticate<D: PageDriver>(
        &self,
        session: &mut Session<D>,
        profile: &SiteProfile,
        credentials: &Credentials,
    ) -> Result<(), ScrapeError> {
        session.authenticated = false;
        info!(login_url = profile.login_url, "Logging in to {}", profile.display_name);

        let driver = &mut session.driver;
        driver.goto(profile.login_url).await?;
        sleep(self.timings.settle).await;

        self.fill_and_submit(
            driver,
            "identity",
            IDENTITY_LOCATORS,
            self.timings.identity_timeout,
            &credentials.email,
        )
        .await?;
        self.fill_and_submit(
            driver,
            "credential",
            CREDENTIAL_LOCATORS,
            self.timings.credential_timeout,
            &credentials.password,
        )
        .await?;

        session.authenticated = true;
        info!("Logged in to {}", profile.display_name);
        Ok(())
    }

    async fn fill_and_submit<D: PageDriver>(
        &self,
        driver: &mut D,
        field: &'static str,
        candidates: &[Locator],
        probe_timeout: Duration,
        value: &str,
    ) -> Result<(), ScrapeError> {
        let locator = locate_first(driver, candidates, probe_timeout)
            .await?
            .ok_or(ScrapeError::AuthFieldNotFound { field })?;

        driver.type_text(locator.css(), value).await?;
        driver.click(SUBMIT.css()).await?;
        driver
            .wait_for_navigation(self.timings.navigation_timeout)
            .await
    }
}
