/// Placeholder shown for empty multi-valued columns.
pub(crate) const EMPTY_MARKER: &str = "—";

/// Capitalizes the first letter of every alphabetic run and lowercases the rest.
///
/// Any non-alphabetic character starts a new word, so `"ssri-class drug"`
/// becomes `"Ssri-Class Drug"`.
pub(crate) fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut at_word_start = true;
    for ch in value.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}

pub(crate) fn join_or_marker(values: &[String]) -> String {
    if values.is_empty() {
        EMPTY_MARKER.to_string()
    } else {
        values.join(", ")
    }
}

/// Truncates to at most `max_chars` characters without splitting a code point.
pub(crate) fn truncate_chars(value: &str, max_chars: usize) -> &str {
    match value.char_indices().nth(max_chars) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}
