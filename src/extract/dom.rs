//! DOM helpers for the extraction cascade.

use crate::error::ScrapeError;
use crate::scrapers::ExtractionRules;
use crate::utils::{char_len, collapse_whitespace, contains_any, normalize_lines};
use scraper::{ElementRef, Html, Selector};

/// Elements that break lines when rendered.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "details", "div", "dl", "dt",
    "figure", "h1", "h2", "h3", "h4", "h5", "h6", "header", "footer", "hr", "li", "main",
    "nav", "ol", "p", "pre", "section", "summary", "table", "tr", "ul",
];

/// Elements whose text is never visible.
const INVISIBLE_TAGS: &[&str] = &["script", "style", "noscript", "template", "head"];

const HEADING_TAGS: &[&str] = &["h2", "h3", "h4"];

pub fn parse_selector(css: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(css).map_err(|e| ScrapeError::Selector(format!("{css}: {e}")))
}

pub fn parse_selectors(css: &[&str]) -> Result<Vec<Selector>, ScrapeError> {
    css.iter().map(|s| parse_selector(s)).collect()
}

/// Detach every element matching any of `selectors` from the document.
pub fn strip(document: &mut Html, selectors: &[Selector]) -> usize {
    let ids = selectors
        .iter()
        .flat_map(|selector| document.select(selector).map(|el| el.id()))
        .collect::<Vec<_>>();
    let mut removed = 0;
    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
            removed += 1;
        }
    }
    removed
}

/// Text of `element` as a browser would render it (`innerText`-like).
pub fn visible_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    push_visible(element, &mut out);
    normalize_lines(&out)
}

fn push_visible(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_el) = ElementRef::wrap(child) {
            let name = child_el.value().name();
            if INVISIBLE_TAGS.contains(&name) {
                continue;
            }
            if name == "br" {
                out.push('\n');
                continue;
            }
            let block = BLOCK_TAGS.contains(&name);
            if block {
                out.push('\n');
            }
            push_visible(child_el, out);
            if block {
                out.push('\n');
            }
        }
    }
}

/// Flattened single-line text of `element`.
pub fn flat_text(element: ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// How the primary walk classified a node.
#[derive(Debug, PartialEq, Eq)]
pub enum Block {
    Heading(String),
    BoldLead(String),
    Body(String),
    Skip,
}

/// Classify one node of the primary walk. `text` is the node's flat text.
pub fn classify(
    element: ElementRef<'_>,
    text: String,
    rules: &ExtractionRules,
    italic: &Selector,
    bold: &Selector,
) -> Block {
    if HEADING_TAGS.contains(&element.value().name()) {
        return Block::Heading(text);
    }
    if rules.drop_italic_paragraphs && element.select(italic).next().is_some() {
        return Block::Skip;
    }
    if let Some(strong) = element.select(bold).next() {
        if flat_text(strong) == text {
            return if char_len(&text) > rules.bold_min_len {
                Block::BoldLead(text)
            } else {
                Block::Skip
            };
        }
    }
    if char_len(&text) > rules.body_min_len {
        Block::Body(text)
    } else {
        Block::Skip
    }
}

/// Run the primary, site-specific walk over `document`.
///
/// Returns the assembled text (possibly empty when no container exists).
pub fn primary_walk(document: &Html, rules: &ExtractionRules) -> Result<String, ScrapeError> {
    let blocks = parse_selector(rules.blocks)?;
    let italic = parse_selector("i")?;
    let bold = parse_selector("strong, b")?;
    let mut content = String::new();

    if let Some(lead_css) = rules.lead {
        let lead = parse_selector(lead_css)?;
        if let Some(el) = document.select(&lead).next() {
            let text = flat_text(el);
            if !text.is_empty() && !contains_any(&text, rules.boilerplate) {
                content.push_str(&text);
                content.push_str("\n\n");
            }
        }
    }

    let containers = parse_selectors(rules.containers)?;
    let Some(container) = containers
        .iter()
        .find_map(|selector| document.select(selector).next())
    else {
        return Ok(content.trim().to_string());
    };

    for element in container.select(&blocks) {
        let text = flat_text(element);
        if text.is_empty() {
            continue;
        }
        if contains_any(&text, rules.end_markers) {
            break;
        }
        if contains_any(&text, rules.boilerplate) {
            continue;
        }
        match classify(element, text, rules, &italic, &bold) {
            Block::Heading(t) => {
                content.push('\n');
                content.push_str(&t);
                content.push_str("\n\n");
            }
            Block::BoldLead(t) | Block::Body(t) => {
                content.push_str(&t);
                content.push_str("\n\n");
            }
            Block::Skip => {}
        }
    }

    Ok(content.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first<'a>(document: &'a Html, css: &str) -> ElementRef<'a> {
        document.select(&Selector::parse(css).unwrap()).next().unwrap()
    }

    #[test]
    fn test_visible_text_breaks_blocks_and_hides_scripts() {
        let document = Html::parse_document(
            "<body><div>One <b>bold</b></div><p>Two<br>Three</p><script>var x = 1;</script></body>",
        );
        let text = visible_text(first(&document, "body"));
        assert_eq!(text, "One bold\n\nTwo\nThree");
    }

    #[test]
    fn test_strip_detaches_matches() {
        let mut document = Html::parse_document(
            r#"<body><p>Keep</p><div class="sas">Ad</div><div id="sas_12">Ad</div></body>"#,
        );
        let selectors = parse_selectors(&[".sas", "[id^=\"sas_\"]"]).unwrap();
        assert_eq!(strip(&mut document, &selectors), 2);
        assert_eq!(visible_text(first(&document, "body")), "Keep");
    }

    #[test]
    fn test_parse_selector_reports_bad_css() {
        assert!(matches!(parse_selector("p[["), Err(ScrapeError::Selector(_))));
    }
}
