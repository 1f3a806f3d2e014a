pub const DEFAULT_MAX_MESSAGE_CHARS: usize = 500;

/// Cleans inbound text before classification: collapses whitespace runs,
/// straightens curly quotes and truncates to `max_chars` characters.
pub fn sanitize_user_input(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");

    let normalized: String = collapsed
        .chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            other => other,
        })
        .collect();

    match normalized.char_indices().nth(max_chars) {
        Some((cut, _)) => normalized[..cut].to_string(),
        None => normalized,
    }
}
