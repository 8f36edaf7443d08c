//! Sanitizing and shortening text before it lands in results and logs.

use crate::config::MAX_ERROR_MESSAGE_LENGTH;

/// Removes control characters other than tab, newline and carriage return.
///
/// Error text from servers and transport libraries can carry raw control
/// bytes that break terminal output and JSON logs.
pub fn sanitize_error_message(message: &str) -> String {
    message
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\t' | '\n' | '\r'))
        .collect()
}

/// Sanitizes a message and truncates it to `MAX_ERROR_MESSAGE_LENGTH` characters.
///
/// Truncated messages end with a note carrying the original length.
pub fn sanitize_and_truncate_error_message(message: &str) -> String {
    let sanitized = sanitize_error_message(message);
    let total = sanitized.chars().count();
    if total <= MAX_ERROR_MESSAGE_LENGTH {
        return sanitized;
    }
    // Leave room for the truncation note
    let keep = MAX_ERROR_MESSAGE_LENGTH.saturating_sub(50);
    let head: String = sanitized.chars().take(keep).collect();
    format!("{head}... (truncated, original length: {total} chars)")
}

/// The first `max_chars` characters of `text`, with `...` appended when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.char_indices();
    match chars.nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_removes_control_chars() {
        let input = "Error\x00message\x01with\x02control\x1bchars";
        assert_eq!(sanitize_error_message(input), "Errormessagewithcontrolchars");
    }

    #[test]
    fn test_sanitize_preserves_whitespace_and_unicode() {
        let input = "line one\n\tline two\r\n测试 🚀";
        assert_eq!(sanitize_error_message(input), input);
    }

    #[test]
    fn test_truncate_long_message() {
        let long = "x".repeat(MAX_ERROR_MESSAGE_LENGTH + 10);
        let out = sanitize_and_truncate_error_message(&long);
        assert!(out.chars().count() < MAX_ERROR_MESSAGE_LENGTH);
        assert!(out.ends_with(&format!(
            "(truncated, original length: {} chars)",
            MAX_ERROR_MESSAGE_LENGTH + 10
        )));
    }

    #[test]
    fn test_short_message_untouched() {
        assert_eq!(sanitize_and_truncate_error_message("boom"), "boom");
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        assert_eq!(preview("hello", 10), "hello");
        assert_eq!(preview("hello", 5), "hello");
        assert_eq!(preview("hello world", 5), "hello...");
        assert_eq!(preview("巡检巡检", 2), "巡检...");
    }
}
