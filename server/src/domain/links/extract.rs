//! URL extraction from message text

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s<>"']+"#).expect("valid URL regex"));

/// Characters that end a sentence rather than a URL
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '}', '"', '\''];

/// Extract outbound URLs from free text.
///
/// Trailing sentence punctuation is stripped and duplicates are removed
/// while preserving first-seen order.
pub fn extract_urls(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for m in URL_RE.find_iter(text) {
        let url = m.as_str().trim_end_matches(TRAILING_PUNCTUATION);
        if url.len() <= "https://".len() {
            continue;
        }
        if seen.insert(url.to_string()) {
            urls.push(url.to_string());
        }
    }

    urls
}
