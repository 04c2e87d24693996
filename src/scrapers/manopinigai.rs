//! Mano Pinigai (manopinigai.vz.lt) site profile.
//!
//! Bodies are CKEditor output (`.ck-content`, marked `.paywall` for
//! subscriber content). Bold lead-ins are only kept when long enough to be
//! prose rather than a label. When the session lapses the site redirects
//! article URLs to the shared login host, so article pages are checked for a
//! login prompt before extraction.

use super::{BOILERPLATE, END_MARKERS, ExtractionRules, SiteId, SiteProfile};
use url::Url;

/// Host match when the URL parses, plain substring match otherwise.
fn matches(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => parsed
            .host_str()
            .is_some_and(|host| host.contains("manopinigai")),
        Err(_) => url.contains("manopinigai"),
    }
}

pub static PROFILE: SiteProfile = SiteProfile {
    id: SiteId::ManoPinigai,
    display_name: "Mano Pinigai",
    matches,
    login_url: "https://prisijungimas.vz.lt/mano-pinigai",
    login_marker: "prisijungimas",
    guard_login_redirect: true,
    settle_ms: 1200,
    rules: ExtractionRules {
        lead: None,
        containers: &[
            ".ck-content.paywall",
            ".ck-content",
            ".article-content .ck-content",
            ".article-content",
        ],
        blocks: "p, h2, h3, h4",
        drop_italic_paragraphs: false,
        bold_min_len: 50,
        body_min_len: 2,
        end_markers: END_MARKERS,
        boilerplate: BOILERPLATE,
    },
};
