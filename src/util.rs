//! Shared helpers for request handling.

use axum::http::HeaderMap;

/// Longest free-text field accepted from the public form, in characters.
pub const MAX_INPUT_CHARS: usize = 1000;

/// Extract a Bearer token from the Authorization header.
///
/// Returns the token string without the "Bearer " prefix, or None if
/// the header is missing, malformed, or empty after the prefix.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
}

/// Strip markup-significant characters (`< > " ' &`), trim, and cap the length.
pub fn sanitize_input(input: &str) -> String {
    let stripped: String = input
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '"' | '\'' | '&'))
        .collect();
    stripped.trim().chars().take(MAX_INPUT_CHARS).collect()
}

/// Basic email shape check: `local@domain.tld` with no whitespace and a single `@`.
///
/// Not RFC 5322. The dot must have at least one character on each side.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

/// Whole-dollar rendering of a cent amount, e.g. `75000` -> `$750`.
pub fn format_dollars(cents: i64) -> String {
    format!("${}", (cents as f64 / 100.0).round() as i64)
}
