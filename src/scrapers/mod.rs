//! Site profiles for the two supported paywalled site families.
//!
//! Each submodule declares one static [`SiteProfile`]: where to log in, how
//! long a page needs to settle, and the [`ExtractionRules`] row the content
//! extractor runs for that site.
//!
//! # Supported Sites
//!
//! | Site | Module | Login | Notes |
//! |------|--------|-------|-------|
//! | Verslo žinios | [`vz`] | `prisijungimas.vz.lt/verslo-zinios` | `.content-paragraph` blocks plus `<summary>` lead |
//! | Mano Pinigai | [`manopinigai`] | `prisijungimas.vz.lt/mano-pinigai` | CKEditor body; redirects to login when the session lapses |
//!
//! Matching is total: a URL whose host contains `manopinigai` belongs to
//! Mano Pinigai, every other string to Verslo žinios. URLs that do not parse
//! are matched on their raw text and fail later as item errors.

use std::fmt;

pub mod manopinigai;
pub mod vz;

/// Identifier of a site family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SiteId {
    Vz,
    ManoPinigai,
}

impl SiteId {
    /// Site groups are processed in this order.
    pub const PROCESSING_ORDER: [SiteId; 2] = [SiteId::Vz, SiteId::ManoPinigai];

    pub fn as_str(self) -> &'static str {
        match self {
            SiteId::Vz => "vz",
            SiteId::ManoPinigai => "manopinigai",
        }
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-site parameters of the primary extraction walk.
///
/// The walk visits every node matching `blocks` inside the first container
/// that exists, classifying each as heading, bold lead paragraph, or body
/// paragraph.
#[derive(Debug)]
pub struct ExtractionRules {
    /// Optional element read before the walk (e.g. a standfirst).
    pub lead: Option<&'static str>,
    /// Content containers, most specific first.
    pub containers: &'static [&'static str],
    /// Nodes visited by the walk, in document order.
    pub blocks: &'static str,
    /// Skip paragraphs that contain italic text (author disclaimers).
    pub drop_italic_paragraphs: bool,
    /// All-bold paragraphs shorter than this are labels, not content.
    pub bold_min_len: usize,
    /// Body paragraphs shorter than this are dropped.
    pub body_min_len: usize,
    /// The walk halts at the first node containing one of these.
    pub end_markers: &'static [&'static str],
    /// Nodes containing one of these are skipped.
    pub boilerplate: &'static [&'static str],
}

/// Static configuration of one site family.
#[derive(Debug)]
pub struct SiteProfile {
    pub id: SiteId,
    pub display_name: &'static str,
    /// Whether a raw article URL belongs to this site.
    pub matches: fn(&str) -> bool,
    pub login_url: &'static str,
    /// Fragment of the login host; seeing it in a page URL means a redirect to login.
    pub login_marker: &'static str,
    /// Check each article page for a login prompt before extracting.
    pub guard_login_redirect: bool,
    /// How long to let an article page settle after navigation, in ms.
    pub settle_ms: u64,
    pub rules: ExtractionRules,
}

/// Markers that end the article body (related-article banners).
pub const END_MARKERS: &[&str] = &[
    "DAUGIAU SKAITYKITE",
    "SUSIJĘ STRAIPSNIAI",
    "TAIP PAT SKAITYKITE",
];

/// Subscription prompts, editorial notices and photo credits.
pub const BOILERPLATE: &[&str] = &[
    "Prenumeruoti",
    "Prisijungti",
    "Norite pasiūlyti temą",
    "redaktoriams",
    "nuotr.",
    "koliažas",
];

/// Matching order: specific profiles first, the catch-all last.
static REGISTRY: [&SiteProfile; 2] = [&manopinigai::PROFILE, &vz::PROFILE];

/// Look up a profile by id.
pub fn profile(id: SiteId) -> &'static SiteProfile {
    match id {
        SiteId::Vz => &vz::PROFILE,
        SiteId::ManoPinigai => &manopinigai::PROFILE,
    }
}

/// Resolve the profile an article URL belongs to.
///
/// Never fails: the last registry entry accepts everything.
pub fn profile_for(url: &str) -> &'static SiteProfile {
    REGISTRY
        .iter()
        .copied()
        .find(|profile| (profile.matches)(url))
        .unwrap_or(&vz::PROFILE)
}
