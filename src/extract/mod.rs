//! Article text extraction cascade.
//!
//! A rendered page goes through ordered stages, each only attempted when the
//! previous ones produced too little text:
//!
//! 1. **Login guard**: for profiles that need it, a login prompt means the
//!    session is gone ([`ScrapeError::SessionExpired`])
//! 2. **Noise removal**: ads, embeds, forms and chrome are detached from the DOM
//! 3. **Primary walk**: the site's [`ExtractionRules`](crate::scrapers::ExtractionRules)
//!    over its content container
//! 4. **Generic containers**: the first well-known container with enough text
//! 5. **Whole page**: long, non-boilerplate lines of the visible page text
//!
//! Text that is still shorter than the floor fails with
//! [`ScrapeError::ExtractionTooShort`]; text longer than the maximum is
//! truncated, never rejected.

use crate::browser::RenderedPage;
use crate::error::ScrapeError;
use crate::scrapers::{BOILERPLATE, SiteProfile};
use crate::utils::{char_len, contains_any, truncate_chars};
use scraper::Html;
use std::fmt;
use tracing::{debug, instrument, warn};

pub mod dom;

/// Selectors removed before any text is read, for every site.
pub const NOISE_SELECTORS: &[&str] = &[
    ".infogram-embed",
    ".sas",
    ".has-ad-desktop",
    ".rekvizitai-embed",
    "iframe[src*=\"infogram\"]",
    "iframe[src*=\"rekvizitai\"]",
    "figure.infogram-embed",
    "figure.rekvizitai-embed",
    ".author-disclaimer",
    ".suggestion-form",
    "form",
    ".article-social-links",
    ".article-comments",
    "script",
    "style",
    "nav",
    "header",
    "footer",
    ".advertisement",
    ".banner",
    "figcaption",
    ".w-full.bg-vzGrey-2",
    ".additional-info",
    "[id^=\"sas_\"]",
];

/// Well-known article containers probed when the primary walk comes up short.
pub const GENERIC_CONTAINERS: &[&str] = &[
    ".article-content",
    ".article-body",
    ".content-body",
    "article .content",
    "main article",
    ".post-content",
    ".entry-content",
];

/// Extra phrases dropped by the whole-page heuristic.
const WHOLE_PAGE_EXTRA: &[&str] = &["© VŽ"];

const PASSWORD_INPUT: &str = "input[type=\"password\"]";

/// Length thresholds of the cascade, in characters.
#[derive(Debug, Clone)]
pub struct ExtractionLimits {
    /// Primary output at least this long is final.
    pub primary_min: usize,
    /// A generic container must be longer than this.
    pub container_min: usize,
    /// Whole-page lines must be longer than this.
    pub line_min: usize,
    /// Whole-page heuristic keeps at most this many lines.
    pub max_lines: usize,
    /// Final text shorter than this is a failure.
    pub floor: usize,
    /// Final text is clamped to this length.
    pub max_len: usize,
}

impl Default for ExtractionLimits {
    fn default() -> Self {
        Self {
            primary_min: 100,
            container_min: 200,
            line_min: 50,
            max_lines: 20,
            floor: 50,
            max_len: 20_000,
        }
    }
}

/// Which stage of the cascade produced the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Primary,
    Container,
    WholePage,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Primary => "primary",
            Stage::Container => "container",
            Stage::WholePage => "whole_page",
        })
    }
}

/// Text produced by a successful cascade run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub text: String,
    pub stage: Stage,
    /// Length before truncation, if the text was truncated.
    pub truncated_from: Option<usize>,
}

/// Runs the extraction cascade.
#[derive(Debug, Clone, Default)]
pub struct ContentExtractor {
    limits: ExtractionLimits,
}

impl ContentExtractor {
    pub fn new(limits: ExtractionLimits) -> Self {
        Self { limits }
    }

    /// Extract the article text of `page` using `profile`'s rules.
    ///
    /// # Errors
    ///
    /// - [`ScrapeError::SessionExpired`] when the page is a login prompt
    /// - [`ScrapeError::ExtractionTooShort`] when no stage clears the floor
    /// - [`ScrapeError::Selector`] when a rule selector is malformed
    #[instrument(level = "debug", skip_all, fields(url = %page.url, site = %profile.id))]
    pub fn extract(
        &self,
        page: &RenderedPage,
        profile: &SiteProfile,
    ) -> Result<Extraction, ScrapeError> {
        let mut document = Html::parse_document(&page.html);

        if profile.guard_login_redirect && is_login_page(page, &document, profile)? {
            return Err(ScrapeError::SessionExpired(format!(
                "still on login page ({}) - session might have expired",
                page.url
            )));
        }

        let removed = dom::strip(&mut document, &dom::parse_selectors(NOISE_SELECTORS)?);
        debug!(removed, "Stripped noise elements");

        let mut text = dom::primary_walk(&document, &profile.rules)?;
        let mut stage = Stage::Primary;
        debug!(chars = char_len(&text), "Primary walk finished");

        if char_len(&text) < self.limits.primary_min {
            if let Some(found) = self.generic_container(&document)? {
                text = found;
                stage = Stage::Container;
            }
        }

        if char_len(&text) < self.limits.primary_min {
            let heuristic = self.whole_page(&document);
            if char_len(&heuristic) > char_len(&text) {
                text = heuristic;
                stage = Stage::WholePage;
            }
        }

        let len = char_len(&text);
        if len < self.limits.floor {
            return Err(ScrapeError::ExtractionTooShort { len });
        }

        let (text, truncated) = truncate_chars(&text, self.limits.max_len);
        let truncated_from = truncated.then_some(len);
        if truncated {
            warn!(from = len, to = self.limits.max_len, "Content truncated");
        }

        Ok(Extraction {
            text,
            stage,
            truncated_from,
        })
    }

    fn generic_container(&self, document: &Html) -> Result<Option<String>, ScrapeError> {
        for selector in dom::parse_selectors(GENERIC_CONTAINERS)? {
            if let Some(element) = document.select(&selector).next() {
                let text = dom::visible_text(element);
                if char_len(&text) > self.limits.container_min {
                    return Ok(Some(text));
                }
            }
        }
        Ok(None)
    }

    fn whole_page(&self, document: &Html) -> String {
        let body = dom::visible_text(document.root_element());
        body.lines()
            .map(str::trim)
            .filter(|line| {
                char_len(line) > self.limits.line_min
                    && !contains_any(line, BOILERPLATE)
                    && !contains_any(line, WHOLE_PAGE_EXTRA)
            })
            .take(self.limits.max_lines)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

fn is_login_page(
    page: &RenderedPage,
    document: &Html,
    profile: &SiteProfile,
) -> Result<bool, ScrapeError> {
    if page.url.contains(profile.login_marker) {
        return Ok(true);
    }
    let password = dom::parse_selector(PASSWORD_INPUT)?;
    Ok(document.select(&password).next().is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::{manopinigai, vz};

    const VZ_URL: &str = "https://www.vz.lt/finansai/2025/05/06/straipsnis";
    const MP_URL: &str = "https://manopinigai.vz.lt/taupymas/2025/05/06/straipsnis";

    fn page(url: &str, body: &str) -> RenderedPage {
        RenderedPage {
            url: url.to_string(),
            html: format!("<html><head><title>t</title></head><body>{body}</body></html>"),
        }
    }

    fn sentence(n: usize) -> String {
        format!("Sakinys numeris {n} apie verslo naujienas ir rinkų pokyčius Lietuvoje.")
    }

    fn vz_body(paragraphs: &[String]) -> String {
        let ps = paragraphs
            .iter()
            .map(|p| format!(r#"<div class="content-paragraph">{p}</div>"#))
            .collect::<String>();
        format!(r#"<main><article><div class="article-content">{ps}</div></article></main>"#)
    }

    #[test]
    fn test_primary_result_is_returned_unmodified() {
        let body = format!(
            "<summary>Įžanga apie rinką.</summary>{}",
            vz_body(&[sentence(1), sentence(2)])
        );
        let extraction = ContentExtractor::default()
            .extract(&page(VZ_URL, &body), &vz::PROFILE)
            .unwrap();

        assert_eq!(extraction.stage, Stage::Primary);
        assert_eq!(
            extraction.text,
            format!("Įžanga apie rinką.\n\n{}\n\n{}", sentence(1), sentence(2))
        );
        assert_eq!(extraction.truncated_from, None);
    }

    #[test]
    fn test_primary_result_wins_over_longer_containers() {
        let related = (10..16)
            .map(|n| format!("<p>{}</p>", sentence(n)))
            .collect::<String>();
        let body = format!(
            r#"{}<div class="article-body">{related}</div><div class="post-content">{related}</div>"#,
            vz_body(&[sentence(1), sentence(2)])
        );
        let extraction = ContentExtractor::default()
            .extract(&page(VZ_URL, &body), &vz::PROFILE)
            .unwrap();

        assert_eq!(extraction.stage, Stage::Primary);
        assert_eq!(extraction.text, format!("{}\n\n{}", sentence(1), sentence(2)));
        assert!(!extraction.text.contains(&sentence(10)));
    }

    #[test]
    fn test_vz_walk_classifies_blocks() {
        let body = format!(
            r#"<div class="article-content">
                <h2>Rinkos apžvalga</h2>
                <div class="content-paragraph"><strong>Taip</strong></div>
                <div class="content-paragraph"><strong>Trumpa</strong></div>
                <div class="content-paragraph">{} <a href="/x">nuoroda</a> tęsinys.</div>
                <div class="content-paragraph"><i>Autoriaus nuomonė nebūtinai sutampa su redakcijos.</i> Tekstas</div>
                <div class="content-paragraph">Per trumpa</div>
                <div class="content-paragraph">{}</div>
            </div>"#,
            sentence(1),
            sentence(2)
        );
        let text = ContentExtractor::default()
            .extract(&page(VZ_URL, &body), &vz::PROFILE)
            .unwrap()
            .text;

        assert!(text.starts_with("Rinkos apžvalga\n\n"));
        assert!(text.contains("Trumpa\n\n"), "bold paragraph longer than 5 chars is kept");
        assert!(!text.contains("Taip"), "short bold label is dropped");
        assert!(text.contains("nuoroda tęsinys."), "inline link text is kept");
        assert!(!text.contains("Autoriaus"), "italic disclaimer paragraph is dropped");
        assert!(!text.contains("Per trumpa"));
        assert!(text.ends_with(&sentence(2)));
    }

    #[test]
    fn test_end_marker_halts_walk_and_boilerplate_is_skipped() {
        let body = format!(
            r#"<div class="ck-content paywall">
                <p>{}</p>
                <p>Jono Jonaičio nuotr.</p>
                <h3>Ką daryti toliau</h3>
                <p>{}</p>
                <p><strong>SUSIJĘ STRAIPSNIAI</strong></p>
                <p>{}</p>
            </div>"#,
            sentence(1),
            sentence(2),
            sentence(3)
        );
        let text = ContentExtractor::default()
            .extract(&page(MP_URL, &body), &manopinigai::PROFILE)
            .unwrap()
            .text;

        assert_eq!(
            text,
            format!("{}\n\n\nKą daryti toliau\n\n{}", sentence(1), sentence(2))
        );
    }

    #[test]
    fn test_manopinigai_short_bold_label_dropped_long_bold_kept() {
        let long_bold = "Tai ilga paryškinta įžanga, kuri yra daugiau nei penkiasdešimties simbolių ilgio.";
        let body = format!(
            r#"<div class="ck-content"><p><strong>Trumpai</strong></p><p><strong>{long_bold}</strong></p><p>{}</p></div>"#,
            sentence(1)
        );
        let text = ContentExtractor::default()
            .extract(&page(MP_URL, &body), &manopinigai::PROFILE)
            .unwrap()
            .text;

        assert_eq!(text, format!("{long_bold}\n\n{}", sentence(1)));
    }

    #[test]
    fn test_noise_is_removed_before_reading() {
        let body = format!(
            r#"<div class="article-content">
                <div class="content-paragraph">{}</div>
                <div class="sas"><div class="content-paragraph">Reklama reklama reklama reklama</div></div>
                <div class="content-paragraph">{}</div>
            </div>"#,
            sentence(1),
            sentence(2)
        );
        let text = ContentExtractor::default()
            .extract(&page(VZ_URL, &body), &vz::PROFILE)
            .unwrap()
            .text;

        assert!(!text.contains("Reklama"));
    }

    #[test]
    fn test_generic_container_used_when_primary_is_short() {
        let long = (1..=4).map(sentence).collect::<Vec<_>>().join(" ");
        let body = format!(r#"<div class="article-body"><p>{long}</p></div>"#);
        let extraction = ContentExtractor::default()
            .extract(&page(VZ_URL, &body), &vz::PROFILE)
            .unwrap();

        assert_eq!(extraction.stage, Stage::Container);
        assert_eq!(extraction.text, long);
    }

    #[test]
    fn test_container_must_exceed_its_floor() {
        // 120 chars in a generic container is not enough for stage 3, but the
        // whole-page heuristic still finds the long line.
        let text = "x".repeat(120);
        let body = format!(r#"<div class="post-content"><p>{text}</p></div>"#);
        let extraction = ContentExtractor::default()
            .extract(&page(VZ_URL, &body), &vz::PROFILE)
            .unwrap();

        assert_eq!(extraction.stage, Stage::WholePage);
        assert_eq!(extraction.text, text);
    }

    #[test]
    fn test_whole_page_heuristic_filters_lines() {
        let body = format!(
            r#"<div>{}</div><div>Prisijungti prie paskyros ir skaityti visus straipsnius be apribojimų</div>
               <div>Trumpa eilutė</div><div>{}</div><div>© VŽ visos teisės saugomos ir jokia dalis negali būti kopijuojama</div>"#,
            sentence(1),
            sentence(2)
        );
        let extraction = ContentExtractor::default()
            .extract(&page(MP_URL, &body), &manopinigai::PROFILE)
            .unwrap();

        assert_eq!(extraction.stage, Stage::WholePage);
        assert_eq!(extraction.text, format!("{}\n\n{}", sentence(1), sentence(2)));
    }

    #[test]
    fn test_whole_page_keeps_at_most_max_lines() {
        let body = (1..=30).map(|n| format!("<p>{}</p>", sentence(n))).collect::<String>();
        let extraction = ContentExtractor::default()
            .extract(&page(VZ_URL, &body), &vz::PROFILE)
            .unwrap();

        assert_eq!(extraction.stage, Stage::WholePage);
        assert_eq!(extraction.text.split("\n\n").count(), 20);
    }

    #[test]
    fn test_nothing_clears_floor_is_too_short() {
        let body = r#"<div class="article-content"><div class="content-paragraph">Tik pradžia...</div></div>"#;
        let err = ContentExtractor::default()
            .extract(&page(VZ_URL, body), &vz::PROFILE)
            .unwrap_err();

        assert!(matches!(err, ScrapeError::ExtractionTooShort { len } if len < 50));
    }

    #[test]
    fn test_truncation_clamps_to_exact_maximum() {
        let paragraphs = (1..=10).map(sentence).collect::<Vec<_>>();
        let limits = ExtractionLimits {
            max_len: 150,
            ..ExtractionLimits::default()
        };
        let extraction = ContentExtractor::new(limits)
            .extract(&page(VZ_URL, &vz_body(&paragraphs)), &vz::PROFILE)
            .unwrap();

        assert_eq!(char_len(&extraction.text), 150);
        assert!(extraction.truncated_from.unwrap() > 150);
    }

    #[test]
    fn test_login_redirect_is_session_expired() {
        let redirected = RenderedPage {
            url: "https://prisijungimas.vz.lt/mano-pinigai?return=x".to_string(),
            html: "<html><body><p>Prisijunkite</p></body></html>".to_string(),
        };
        let err = ContentExtractor::default()
            .extract(&redirected, &manopinigai::PROFILE)
            .unwrap_err();
        assert!(matches!(err, ScrapeError::SessionExpired(_)));
    }

    #[test]
    fn test_password_prompt_is_session_expired() {
        let body = format!(
            r#"<form><input type="password"></form><div class="ck-content"><p>{}</p><p>{}</p></div>"#,
            sentence(1),
            sentence(2)
        );
        let err = ContentExtractor::default()
            .extract(&page(MP_URL, &body), &manopinigai::PROFILE)
            .unwrap_err();
        assert!(matches!(err, ScrapeError::SessionExpired(_)));
    }

    #[test]
    fn test_vz_does_not_guard_login_redirect() {
        let body = format!(
            r#"<header><form><input type="password"></form></header>{}"#,
            vz_body(&[sentence(1), sentence(2)])
        );
        let extraction = ContentExtractor::default()
            .extract(&page(VZ_URL, &body), &vz::PROFILE)
            .unwrap();
        assert_eq!(extraction.stage, Stage::Primary);
    }

    #[test]
    fn test_static_selectors_parse() {
        assert!(dom::parse_selectors(NOISE_SELECTORS).is_ok());
        assert!(dom::parse_selectors(GENERIC_CONTAINERS).is_ok());
        assert!(dom::parse_selector(PASSWORD_INPUT).is_ok());
    }
}
