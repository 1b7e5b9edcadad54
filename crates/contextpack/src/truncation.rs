/// The first `max_chars` characters of `content` (never splitting a
/// code point), plus whether anything was cut.
pub fn truncate_chars(content: &str, max_chars: usize) -> (&str, bool) {
    match content.char_indices().nth(max_chars) {
        Some((boundary, _)) => (&content[..boundary], true),
        None => (content, false),
    }
}

/// Preview line body for a document: first `max_chars` characters with an
/// ellipsis. The ellipsis is appended whether or not the content was cut.
pub fn preview(content: &str, max_chars: usize) -> (String, bool) {
    let (head, truncated) = truncate_chars(content, max_chars);
    (format!("{head}..."), truncated)
}

/// Hard cap for model output that is supposed to be short already.
pub fn cap_output(text: &str, max_chars: usize) -> (String, bool) {
    let (head, truncated) = truncate_chars(text, max_chars);
    (head.to_string(), truncated)
}
