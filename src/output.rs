//! CLI output formatting for every pass.
//!
//! Output leads with what a line is about (the `ORDER_ITEM` key of a design,
//! a label file name, an export name) and puts details on indented lines
//! below it.
//!
//! # Output Format
//!
//! ## Pass reports
//!
//! ```text
//! Export
//!     1997_2282 → 001A1S09j
//!     2150_2448 → 002A3F09j 002A3L09j 002A3R09j
//!     2150_2449 skipped
//!         already exported
//!     2150_2450 FAILED
//!         conversion failed: converter 'libembroidery-convert' failed …
//! 2 succeeded, 1 skipped, 1 failed
//! ```
//!
//! ## Decode
//!
//! ```text
//! 055A3F09j
//!     Folder order: 055
//!     Owner: A
//!     Faces: 3
//!     Position: front
//!     Exported: 09 October
//! ```
//!
//! ## Check
//!
//! ```text
//! Design files
//!     2150: 2 of 3 items
//!         missing items (guessed): 2172
//!         item 2448 missing faces: 2
//! Labels
//!     all orders complete
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::check::{CompletenessReport, OrderCompleteness};
use crate::naming::{DecodeError, FilenameParts};
use crate::report::{Outcome, RunReport};

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Folder orders print like they appear in names.
fn format_order(order: u32) -> String {
    format!("{order:03}")
}

fn join_ids<T: ToString>(ids: impl IntoIterator<Item = T>) -> String {
    ids.into_iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ============================================================================
// Pass reports
// ============================================================================

/// Format a pass report: one entry per subject, then the totals.
pub fn format_run_report(report: &RunReport) -> Vec<String> {
    let mut lines = vec![capitalize(report.pass)];
    for entry in &report.entries {
        match entry.outcome {
            Outcome::Succeeded => {
                lines.push(format!("{}{} \u{2192} {}", indent(1), entry.subject, entry.detail));
            }
            Outcome::Skipped | Outcome::Failed => {
                let status = if entry.outcome == Outcome::Failed {
                    "FAILED"
                } else {
                    "skipped"
                };
                lines.push(format!("{}{} {}", indent(1), entry.subject, status));
                lines.push(format!("{}{}", indent(2), entry.detail));
            }
        }
    }
    lines.push(report.to_string());
    lines
}

pub fn print_run_report(report: &RunReport) {
    for line in format_run_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Decode
// ============================================================================

/// Format the decoded fields of an export name, or why it doesn't decode.
pub fn format_decoded(name: &str, decoded: &Result<FilenameParts, DecodeError>) -> Vec<String> {
    let parts = match decoded {
        Ok(parts) => parts,
        Err(e) => return vec![name.to_string(), format!("{}{}", indent(1), e)],
    };
    let month = chrono::Month::try_from(parts.day.month())
        .map(|m| m.name())
        .unwrap_or_default();
    vec![
        name.to_string(),
        format!("{}Folder order: {}", indent(1), format_order(parts.folder_order)),
        format!("{}Owner: {}", indent(1), parts.owner),
        format!("{}Faces: {}", indent(1), parts.face_count),
        format!("{}Position: {}", indent(1), parts.position),
        format!("{}Exported: {:02} {}", indent(1), parts.day.day(), month),
    ]
}

pub fn print_decoded(name: &str, decoded: &Result<FilenameParts, DecodeError>) {
    for line in format_decoded(name, decoded) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

fn format_order_completeness(order: &OrderCompleteness) -> Vec<String> {
    let expected = order
        .expected_items
        .map(|n| format!(" of {n}"))
        .unwrap_or_default();
    let mut lines = vec![format!(
        "{}{}: {}{} items",
        indent(1),
        order.order_id,
        order.found_items.len(),
        expected
    )];
    if !order.missing_items.is_empty() {
        lines.push(format!(
            "{}missing items (guessed): {}",
            indent(2),
            join_ids(&order.missing_items)
        ));
    }
    for (item, faces) in &order.missing_faces {
        lines.push(format!(
            "{}item {} missing faces: {}",
            indent(2),
            item,
            join_ids(faces)
        ));
    }
    lines
}

/// Format the incomplete orders of both directories.
pub fn format_completeness(report: &CompletenessReport) -> Vec<String> {
    let mut lines = Vec::new();
    for (title, orders) in [("Design files", &report.designs), ("Labels", &report.labels)] {
        lines.push(title.to_string());
        let incomplete: Vec<&OrderCompleteness> =
            orders.iter().filter(|o| !o.is_complete()).collect();
        if incomplete.is_empty() {
            lines.push(format!("{}all orders complete ({})", indent(1), orders.len()));
        }
        for order in incomplete {
            lines.extend(format_order_completeness(order));
        }
    }
    lines
}

pub fn print_completeness(report: &CompletenessReport) {
    for line in format_completeness(report) {
        println!("{}", line);
    }
}
