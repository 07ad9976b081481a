use markdown_weaver_escape::escape_html;

/// HTML-escape `text` into a fresh string.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    // Writing to a String can't fail.
    let _ = escape_html(&mut out, text);
    out
}

/// Up to `max` characters of `text`, for log previews.
pub fn preview(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
