//! Formatting utilities for CLI output.

/// Truncate a string to at most `max_len` characters, ending in `...` when cut.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_str("hello", 10), "hello");
/// assert_eq!(truncate_str("hello world", 8), "hello...");
/// ```
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    if max_len <= 3 {
        return ".".repeat(max_len);
    }
    let kept: String = s.chars().take(max_len - 3).collect();
    format!("{}...", kept)
}

/// `1 commit`, `3 commits`.
pub fn pluralize(count: usize, singular: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}s", count, singular)
    }
}

/// `+3 -1`
pub fn line_stats((added, removed): (usize, usize)) -> String {
    format!("+{} -{}", added, removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello", 5), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("hello", 3), "...");
        assert_eq!(truncate_str("héllo wörld", 7), "héll...");
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize(0, "hunk"), "0 hunks");
        assert_eq!(pluralize(1, "hunk"), "1 hunk");
        assert_eq!(pluralize(4, "commit"), "4 commits");
    }

    #[test]
    fn test_line_stats() {
        assert_eq!(line_stats((3, 1)), "+3 -1");
    }
}
