//! Response formatting: free text from the analysis service → display records.
//!
//! The service gives no schema guarantees, so formatting is total: every
//! input produces a (possibly empty) record list and unrecognised lines fall
//! through to [`DisplayRecord::Paragraph`].
//!
//! ## Rules (per line, in order)
//!
//! 1. Remove `*`, `_`, `#` and backticks, then trim. Empty lines are dropped.
//! 2. `<digits>.` prefix → [`DisplayRecord::SectionHeader`] with the prefix removed
//! 3. `-` prefix containing `:` → [`DisplayRecord::LabeledField`], split on the first `:`
//! 4. `-` prefix → [`DisplayRecord::Bullet`]
//! 5. anything else → [`DisplayRecord::Paragraph`]
//!
//! Rule 3 must run before rule 4. The checks are plain string predicates, not
//! regexes.

use serde::Serialize;

/// One structured unit of output, derived from one input line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisplayRecord {
    SectionHeader { title: String },
    LabeledField { label: String, value: String },
    Bullet { text: String },
    Paragraph { text: String },
}

/// Format analysis text into records, one per non-empty line, in line order.
pub fn format(text: &str) -> Vec<DisplayRecord> {
    text.lines().filter_map(format_line).collect()
}

fn format_line(raw: &str) -> Option<DisplayRecord> {
    let line = strip_emphasis(raw);
    if line.is_empty() {
        return None;
    }

    if let Some(title) = strip_numbered_prefix(&line) {
        return Some(DisplayRecord::SectionHeader {
            title: title.to_string(),
        });
    }

    if let Some(rest) = line.strip_prefix('-') {
        if let Some((label, value)) = rest.split_once(':') {
            return Some(DisplayRecord::LabeledField {
                label: label.trim().to_string(),
                value: value.trim().to_string(),
            });
        }
        return Some(DisplayRecord::Bullet {
            text: rest.trim().to_string(),
        });
    }

    Some(DisplayRecord::Paragraph { text: line })
}

fn strip_emphasis(line: &str) -> String {
    line.chars()
        .filter(|c| !matches!(c, '*' | '_' | '#' | '`'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// `"12. Title"` → `Some("Title")`; `None` unless the line opens with
/// one or more ASCII digits followed by a period.
fn strip_numbered_prefix(line: &str) -> Option<&str> {
    let rest = line.trim_start_matches(|c: char| c.is_ascii_digit());
    if rest.len() == line.len() {
        return None;
    }
    rest.strip_prefix('.').map(str::trim_start)
}
