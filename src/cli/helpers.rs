//! Shared helper functions for CLI commands

/// Truncate a string to max_len characters, adding "..." if truncated
///
/// Useful for table columns that need fixed-width output.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Yes/no column value
pub fn format_flag(value: bool) -> String {
    if value { "yes" } else { "no" }.to_string()
}

/// Escape a string for use inside a double-quoted DOT identifier or label
pub fn escape_dot(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
