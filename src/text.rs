//! Cleanup helpers for the source's free-text fields.

use std::sync::LazyLock;

use regex::Regex;

static REPEATED_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]{2,}").unwrap());

static EXCESS_BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

static WRAPPED_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([^\n])\n([^\n])").unwrap());

/// Remove markup from an HTML fragment, keeping only its text content.
pub fn strip_html_tags(html: &str) -> String {
    let fragment = scraper::Html::parse_fragment(html);
    fragment.root_element().text().collect()
}

/// Collapse the whitespace noise contributors leave in description text:
/// runs of spaces, more than one blank line, and hard-wrapped lines.
pub fn cleanup(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }
    let text = REPEATED_SPACE.replace_all(input, " ");
    let text = EXCESS_BLANK_LINES.replace_all(&text, "\n\n");
    // A single interior newline is a wrapped line, not a paragraph break.
    let text = WRAPPED_LINE.replace_all(&text, "$1 $2");
    text.trim().to_owned()
}

pub fn remove_backslashes(input: &str) -> String {
    input.replace('\\', "")
}

/// Derive a short abstract from a full description: plain text, at most
/// `limit` characters, cut back to the last full word, with a `...` marker
/// when anything was dropped.
pub fn abbreviate(description: &str, limit: usize) -> String {
    let plain = cleanup(&strip_html_tags(&remove_backslashes(description)));
    match plain.char_indices().nth(limit) {
        None => plain,
        Some((cut, _)) => {
            let head = &plain[..cut];
            let head = match head.rfind(' ') {
                Some(space) => &head[..space],
                None => head,
            };
            format!("{}...", head.trim_end())
        }
    }
}
