//! Text helpers

/// Bound for captured output and error messages shown in logs and reports
pub const PREVIEW_CHARS: usize = 500;

/// First `max_chars` characters of `s`, cut on a char boundary
pub fn preview(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}

/// Shorten `s` to `max_chars`, marking the cut with `...`
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let keep = max_chars.saturating_sub(3);
        format!("{}...", preview(s, keep))
    }
}
