//! Text helpers shared by the screen renderers.
//!
//! [`paragraphs`] is the one paragraph splitter used for lesson bodies:
//! blank (whitespace-only) lines separate paragraphs, lines inside a
//! paragraph are trimmed and joined with a single space, and empty
//! paragraphs are dropped.

use coursecraft_core::StageStatus;

/// Splits lesson text into display paragraphs.
///
/// # Example
///
/// ```rust
/// use coursecraft_report::paragraphs;
///
/// let text = "Rust is a systems language.\n  It is fast.\n\n\nIt is safe.";
/// assert_eq!(
///     paragraphs(text),
///     vec!["Rust is a systems language. It is fast.", "It is safe."]
/// );
/// ```
#[must_use]
pub fn paragraphs(text: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !current.is_empty() {
                result.push(current.join(" "));
                current.clear();
            }
        } else {
            current.push(trimmed);
        }
    }

    if !current.is_empty() {
        result.push(current.join(" "));
    }

    result
}

/// Icon for a stage status.
#[must_use]
pub const fn stage_icon(status: StageStatus) -> &'static str {
    match status {
        StageStatus::Completed => "✅",
        StageStatus::Running => "🔄",
        StageStatus::Error => "❌",
        StageStatus::Pending => "⏳",
    }
}

/// Formats `count` followed by `noun`, adding an "s" unless the count is 1.
#[must_use]
pub fn pluralize(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

/// Escapes text for a Markdown table cell.
///
/// Pipes would split the cell and newlines would end the row.
#[must_use]
pub fn escape_table_cell(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for ch in text.chars() {
        match ch {
            '|' => result.push_str("\\|"),
            '\n' => result.push_str("<br>"),
            '\r' => {}
            _ => result.push(ch),
        }
    }

    result
}

/// Truncates text to at most `max_chars` characters, adding an ellipsis if
/// anything was cut. Only the first line is kept.
#[must_use]
pub fn truncate(text: &str, max_chars: usize) -> String {
    let first_line = text.lines().next().unwrap_or("");

    match first_line.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &first_line[..cut]),
        None => first_line.to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================
