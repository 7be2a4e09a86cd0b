/// Truncate a string to at most `max_bytes` bytes at a character boundary.
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    &s[..end]
}

/// Strip markdown code blocks from a response.
pub fn strip_code_blocks(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// Preview a secret for startup logs: first few chars plus its length.
pub fn key_preview(key: &str) -> String {
    if key.is_empty() {
        return "<not set>".to_string();
    }
    let head = truncate_to_char_boundary(key, 5);
    format!("{head}...({} chars)", key.len())
}
