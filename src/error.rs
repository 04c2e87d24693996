//! Error taxonomy for extraction, session handling, and delivery.
//!
//! Every failure the pipeline can observe is a [`ScrapeError`]. Where an
//! error is handled depends on its kind:
//!
//! | Variant | Scope | Handling |
//! |---------|-------|----------|
//! | `AuthFieldNotFound` | site group | fatal to the group |
//! | `SessionExpired` | item | one re-login, group abort if that fails |
//! | `ExtractionTooShort` | item | item dropped, group continues |
//! | `NavigationContextLost` | item | reload and retry, then item dropped |
//! | `DeliveryFailed` | batch | logged, or fatal in strict mode |
//! | `InvalidRequest` | item | item dropped without navigating |

use thiserror::Error;

/// Errors raised while scraping a batch or delivering it.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// None of the candidate locators for a login field appeared.
    #[error("login {field} field not found")]
    AuthFieldNotFound { field: &'static str },

    /// The authenticated session was lost (the page is a login prompt).
    #[error("session expired: {0}")]
    SessionExpired(String),

    /// Every extraction stage came up short; the page is likely still paywalled.
    #[error("article content too short ({len} chars) - paywall?")]
    ExtractionTooShort { len: usize },

    /// The page navigated away while it was being read.
    #[error("navigation context lost: {0}")]
    NavigationContextLost(String),

    /// Every webhook URL/header combination was rejected.
    #[error("delivery failed after {attempts} attempts: {last}")]
    DeliveryFailed { attempts: usize, last: String },

    /// Any other error reported by the browser engine.
    #[error("browser error: {0}")]
    Browser(String),

    /// An article URL that is not an absolute http(s) URL.
    #[error("invalid article request {url}: {reason}")]
    InvalidRequest { url: String, reason: String },

    /// A CSS selector in a rule table failed to parse.
    #[error("invalid selector: {0}")]
    Selector(String),

    #[error("failed to serialize batch payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl ScrapeError {
    /// Map a raw browser-engine error message onto the taxonomy.
    ///
    /// Messages describing a destroyed or missing execution context become
    /// [`ScrapeError::NavigationContextLost`]; everything else is
    /// [`ScrapeError::Browser`].
    pub fn from_browser_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        let context_lost = [
            "execution context was destroyed",
            "cannot find context",
            "context with specified id",
        ]
        .iter()
        .any(|needle| lower.contains(needle));

        if context_lost {
            ScrapeError::NavigationContextLost(message)
        } else {
            ScrapeError::Browser(message)
        }
    }

    /// Whether this error means the login session is gone.
    pub fn is_session_loss(&self) -> bool {
        match self {
            ScrapeError::SessionExpired(_) => true,
            ScrapeError::Browser(message) => {
                let lower = message.to_lowercase();
                lower.contains("session") || lower.contains("login")
            }
            _ => false,
        }
    }
}
