/// Find the largest byte offset <= `max_bytes` that falls on a UTF-8 char boundary.
pub(crate) fn floor_char_boundary(text: &str, max_bytes: usize) -> usize {
    if max_bytes >= text.len() {
        return text.len();
    }
    // Walk backwards from max_bytes until we hit a char boundary
    let mut i = max_bytes;
    while i > 0 && !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Truncate a string to approximately `max_bytes` bytes on a line boundary.
/// Safe for multi-byte UTF-8 text, never splits a character.
pub fn truncate_on_line_boundary(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let safe_end = floor_char_boundary(text, max_bytes);
    match text[..safe_end].rfind('\n') {
        Some(pos) => &text[..pos],
        None => &text[..safe_end],
    }
}
