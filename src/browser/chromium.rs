//! Headless Chromium rendering sessions over the DevTools protocol.
//!
//! Each [`ChromiumLauncher::launch`] starts a dedicated browser process with a
//! single page. The CDP event handler runs on its own tokio task for the
//! lifetime of the session and is torn down in [`PageDriver::close`].

use super::{PageDriver, RenderedPage, SessionLauncher};
use crate::error::ScrapeError;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, info, instrument, warn};

const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(150);

/// Browser process options.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// Chrome/Chromium binary; auto-detected when `None`.
    pub executable: Option<PathBuf>,
    /// Show the browser window (debugging only).
    pub headful: bool,
    pub user_agent: String,
    /// Upper bound for any single CDP request, navigation included.
    pub request_timeout: Duration,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            executable: None,
            headful: false,
            user_agent: DESKTOP_USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

fn cdp_error(e: impl std::fmt::Display) -> ScrapeError {
    ScrapeError::from_browser_message(e.to_string())
}

/// Launches one Chromium process per session.
#[derive(Debug, Clone, Default)]
pub struct ChromiumLauncher {
    options: BrowserOptions,
}

impl ChromiumLauncher {
    pub fn new(options: BrowserOptions) -> Self {
        Self { options }
    }
}

impl SessionLauncher for ChromiumLauncher {
    type Driver = ChromiumPage;

    #[instrument(level = "info", skip_all, fields(headful = self.options.headful))]
    async fn launch(&self) -> Result<ChromiumPage, ScrapeError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-setuid-sandbox")
            .arg("--disable-dev-shm-usage")
            .request_timeout(self.options.request_timeout);
        if self.options.headful {
            builder = builder.with_head();
        }
        if let Some(path) = &self.options.executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(ScrapeError::Browser)?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(cdp_error)?;
        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "CDP handler error");
                }
            }
        });

        let mut session = ChromiumPage {
            browser,
            page: None,
            events,
        };
        match open_page(&session.browser, &self.options.user_agent).await {
            Ok(page) => {
                session.page = Some(page);
                info!("Browser session started");
                Ok(session)
            }
            Err(e) => {
                if let Err(close_err) = session.shutdown().await {
                    warn!(error = %close_err, "Failed to close browser after setup error");
                }
                Err(e)
            }
        }
    }
}

async fn open_page(browser: &Browser, user_agent: &str) -> Result<Page, ScrapeError> {
    let page = browser.new_page("about:blank").await.map_err(cdp_error)?;
    page.set_user_agent(SetUserAgentOverrideParams::new(user_agent))
        .await
        .map_err(cdp_error)?;
    Ok(page)
}

/// A Chromium process driving a single page.
pub struct ChromiumPage {
    browser: Browser,
    page: Option<Page>,
    events: JoinHandle<()>,
}

impl ChromiumPage {
    fn page(&self) -> Result<&Page, ScrapeError> {
        self.page
            .as_ref()
            .ok_or_else(|| ScrapeError::Browser("browser has no open page".to_string()))
    }

    async fn shutdown(mut self) -> Result<(), ScrapeError> {
        let closed = self.browser.close().await.map(|_| ()).map_err(cdp_error);
        if let Err(e) = self.browser.wait().await {
            warn!(error = %e, "Browser process did not exit cleanly");
        }
        self.events.abort();
        closed
    }
}

impl PageDriver for ChromiumPage {
    async fn goto(&mut self, url: &str) -> Result<(), ScrapeError> {
        self.page()?.goto(url).await.map_err(cdp_error)?;
        Ok(())
    }

    async fn wait_for_selector(
        &mut self,
        selector: &str,
        wait: Duration,
    ) -> Result<bool, ScrapeError> {
        let page = self.page()?;
        let deadline = Instant::now() + wait;
        loop {
            if page.find_element(selector).await.is_ok() {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            sleep(SELECTOR_POLL_INTERVAL).await;
        }
    }

    async fn type_text(&mut self, selector: &str, text: &str) -> Result<(), ScrapeError> {
        let element = self.page()?.find_element(selector).await.map_err(cdp_error)?;
        element.click().await.map_err(cdp_error)?;
        element.type_str(text).await.map_err(cdp_error)?;
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<(), ScrapeError> {
        let element = self.page()?.find_element(selector).await.map_err(cdp_error)?;
        element.click().await.map_err(cdp_error)?;
        Ok(())
    }

    async fn wait_for_navigation(&mut self, wait: Duration) -> Result<(), ScrapeError> {
        match timeout(wait, self.page()?.wait_for_navigation()).await {
            Ok(result) => result.map(|_| ()).map_err(cdp_error),
            Err(_) => Err(ScrapeError::Browser(format!(
                "navigation timed out after {}ms",
                wait.as_millis()
            ))),
        }
    }

    async fn snapshot(&mut self) -> Result<RenderedPage, ScrapeError> {
        let page = self.page()?;
        let html = page.content().await.map_err(cdp_error)?;
        let url = page.url().await.map_err(cdp_error)?.unwrap_or_default();
        Ok(RenderedPage { url, html })
    }

    async fn reload(&mut self) -> Result<(), ScrapeError> {
        self.page()?.reload().await.map_err(cdp_error)?;
        Ok(())
    }

    #[instrument(level = "info", skip_all)]
    async fn close(self) -> Result<(), ScrapeError> {
        let result = self.shutdown().await;
        info!("Browser session closed");
        result
    }
}
