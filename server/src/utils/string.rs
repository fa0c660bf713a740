//! String utility functions

/// Truncate text to max length in characters, appending an ellipsis
pub fn truncate_chars(text: &str, max_len: usize) -> String {
    let text = text.trim();
    if text.chars().count() > max_len {
        format!("{}...", text.chars().take(max_len).collect::<String>())
    } else {
        text.to_string()
    }
}

/// Parse a comma-separated parameter into trimmed, non-empty values
pub fn parse_csv_param(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
