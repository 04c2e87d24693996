//! Verslo žinios (vz.lt) site profile.
//!
//! Article bodies are a flat run of `.content-paragraph` blocks with
//! `h2`-`h4` subheadings; the standfirst lives in a `<summary>` element.
//! Paragraphs containing `<i>` are author disclaimers and are skipped.
//!
//! This profile is the catch-all: it matches every URL the more specific
//! profiles do not.

use super::{BOILERPLATE, END_MARKERS, ExtractionRules, SiteId, SiteProfile};

fn matches(_url: &str) -> bool {
    true
}

pub static PROFILE: SiteProfile = SiteProfile {
    id: SiteId::Vz,
    display_name: "Verslo žinios",
    matches,
    login_url: "https://prisijungimas.vz.lt/verslo-zinios",
    login_marker: "prisijungimas",
    guard_login_redirect: false,
    settle_ms: 800,
    rules: ExtractionRules {
        lead: Some("summary"),
        containers: &[".article-content", "main article", ".content-body", "body"],
        blocks: "h2, h3, h4, .content-paragraph",
        drop_italic_paragraphs: true,
        bold_min_len: 5,
        body_min_len: 10,
        end_markers: END_MARKERS,
        boilerplate: BOILERPLATE,
    },
};
