//! Utility functions for text normalization and log-friendly truncation.
//!
//! This module provides helper functions used throughout the application:
//! - Character-based length and truncation (article text is Lithuanian, so
//!   byte offsets are never used for cutting)
//! - Whitespace normalization for text read out of the DOM
//! - Shortened previews for log fields

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static INLINE_WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\S\n]+").unwrap());
static BLANK_LINE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Number of characters (not bytes) in `s`.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Clamp `s` to at most `max` characters.
///
/// # Returns
///
/// The clamped string and whether anything was cut.
pub fn truncate_chars(s: &str, max: usize) -> (String, bool) {
    match s.char_indices().nth(max) {
        Some((byte_idx, _)) => (s[..byte_idx].to_string(), true),
        None => (s.to_string(), false),
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` characters with an ellipsis and
/// character count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 chars)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let (head, cut) = truncate_chars(s, max);
    if cut {
        format!("{}…(+{} chars)", head, char_len(s) - max)
    } else {
        head
    }
}

/// Collapse every whitespace run (including newlines) into a single space and trim.
pub fn collapse_whitespace(s: &str) -> String {
    WHITESPACE_RUN.replace_all(s, " ").trim().to_string()
}

/// Normalize multi-line text the way a rendered page reads.
///
/// Spaces and tabs collapse within each line, lines are trimmed, and runs of
/// blank lines shrink to a single blank line.
pub fn normalize_lines(s: &str) -> String {
    let lines = s
        .lines()
        .map(|line| INLINE_WHITESPACE_RUN.replace_all(line, " ").trim().to_string())
        .collect::<Vec<_>>()
        .join("\n");
    BLANK_LINE_RUN.replace_all(&lines, "\n\n").trim().to_string()
}

/// Whether `text` contains any of `phrases`.
pub fn contains_any(text: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|phrase| text.contains(phrase))
}
