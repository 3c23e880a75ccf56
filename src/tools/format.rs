//! Markdown formatting helpers shared by the tools

use chrono::{DateTime, Utc};

/// Characters of a comment shown in listings
pub const PREVIEW_CHARS: usize = 50;

/// Blockquote user content - prefix every line with `> `
pub fn blockquote_content(text: &str) -> String {
    if text.is_empty() {
        return "> ".to_string();
    }

    text.lines()
        .map(|line| format!("> {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Cut `text` to at most `max` characters, marking the cut with `...`
pub fn preview(text: &str, max: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{}...", cut.trim_end())
}

/// Format timestamp - ISO 8601 without fractional seconds, with Z suffix
pub fn format_timestamp(timestamp: Option<&DateTime<Utc>>) -> String {
    match timestamp {
        Some(ts) => ts.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        None => "unknown time".to_string(),
    }
}

/// Drop HTML tags from rendered comment content
pub fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}
