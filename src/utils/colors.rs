/// ANSI color helper utilities for terminal output.
pub const RESET: &str = "\x1b[0m";

pub const GREY: &str = "\x1b[90m";

pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";

pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";

/// Greys out placeholder cells (empty or `--`), leaves the rest untouched.
///
/// Padding is preserved, so callers can format the width first.
pub fn colorize_optional(value: &str) -> String {
    let v = value.trim();
    if v.is_empty() || v == "--" {
        format!("{GREY}{value}{RESET}")
    } else {
        value.to_string()
    }
}
