//! Per-pass outcome collection.
//!
//! Every pass records one [`ReportEntry`] per unit of work (a design, a
//! label, an unreadable file) instead of stopping at the first problem. Only
//! corruption-class errors abort a pass; everything else ends up here and is
//! printed at the end.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Skipped,
    Failed,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Outcome::Succeeded => "ok",
            Outcome::Skipped => "skipped",
            Outcome::Failed => "failed",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    /// What the entry is about: `ORDER_ITEM`, a label file name, a path.
    pub subject: String,
    pub outcome: Outcome,
    /// Result summary for successes, the reason otherwise.
    pub detail: String,
}

/// Outcomes of one pass, in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub pass: &'static str,
    pub entries: Vec<ReportEntry>,
}

impl RunReport {
    pub fn new(pass: &'static str) -> Self {
        Self {
            pass,
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, subject: impl Into<String>, outcome: Outcome, detail: impl Into<String>) {
        self.entries.push(ReportEntry {
            subject: subject.into(),
            outcome,
            detail: detail.into(),
        });
    }

    pub fn succeeded(&mut self, subject: impl Into<String>, detail: impl Into<String>) {
        self.push(subject, Outcome::Succeeded, detail);
    }

    pub fn skipped(&mut self, subject: impl Into<String>, reason: impl Into<String>) {
        self.push(subject, Outcome::Skipped, reason);
    }

    pub fn failed(&mut self, subject: impl Into<String>, reason: impl Into<String>) {
        self.push(subject, Outcome::Failed, reason);
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.entries.iter().filter(|e| e.outcome == outcome).count()
    }

    pub fn with_outcome(&self, outcome: Outcome) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().filter(move |e| e.outcome == outcome)
    }

    pub fn has_failures(&self) -> bool {
        self.count(Outcome::Failed) > 0
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} succeeded, {} skipped, {} failed",
            self.count(Outcome::Succeeded),
            self.count(Outcome::Skipped),
            self.count(Outcome::Failed)
        )
    }
}
