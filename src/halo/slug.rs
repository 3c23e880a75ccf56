//! Slug derivation for post titles

use regex::Regex;
use std::sync::OnceLock;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Longest slug sent to the backend
pub const MAX_SLUG_LEN: usize = 80;

const SEPARATOR: char = '-';

/// Derive a URL-safe slug from a title.
///
/// Never fails: titles with no ASCII-representable characters fall back to a
/// timestamp-based slug.
pub fn derive(title: &str) -> String {
    let mut slug = String::with_capacity(title.len().min(MAX_SLUG_LEN));
    let mut pending_separator = false;

    // NFKD splits accented letters into base letter + combining mark
    for c in title.nfkd() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push(SEPARATOR);
            }
            pending_separator = false;
            slug.push(c.to_ascii_lowercase());
        } else if !is_combining_mark(c) {
            // non-Latin letters and punctuation still split words
            pending_separator = true;
        }
    }

    match truncate(&slug) {
        Some(slug) => slug,
        None => fallback(),
    }
}

/// Clean a caller-supplied slug, keeping `[A-Za-z0-9_-]` runs.
///
/// Returns `None` when nothing usable remains.
pub fn sanitize(slug: &str) -> Option<String> {
    static INVALID: OnceLock<Regex> = OnceLock::new();
    let invalid = INVALID.get_or_init(|| Regex::new(r"[^a-zA-Z0-9_-]+").expect("static regex"));
    let cleaned = invalid.replace_all(slug.trim(), "-");
    truncate(cleaned.trim_matches(SEPARATOR))
}

/// Timestamp-based slug
pub fn fallback() -> String {
    format!("post-{}", chrono::Utc::now().timestamp())
}

fn truncate(slug: &str) -> Option<String> {
    // slug is ASCII here, so byte slicing is safe
    let cut = if slug.len() > MAX_SLUG_LEN {
        &slug[..MAX_SLUG_LEN]
    } else {
        slug
    };
    let cut = cut.trim_matches(SEPARATOR);
    if cut.is_empty() {
        None
    } else {
        Some(cut.to_string())
    }
}

/// Whether a slug contains only URL-safe characters
#[cfg(test)]
fn is_url_safe(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
