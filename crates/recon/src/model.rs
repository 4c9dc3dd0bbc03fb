use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One dashboard tile: agency name and its spending amount, as displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgencySummaryRecord {
    pub agency_name: String,
    pub amount: String,
}

impl AgencySummaryRecord {
    /// Worksheet row for the "Agencies" sheet: `[name, amount]`.
    pub fn to_row(&self) -> Vec<String> {
        vec![self.agency_name.clone(), self.amount.clone()]
    }
}

/// One investments-table row, cells in column order.
///
/// Column A holds the UII and column C the investment title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvestmentRecord {
    pub cells: Vec<String>,
}

impl InvestmentRecord {
    pub fn new(cells: Vec<String>) -> Self {
        Self { cells }
    }
}

/// Fields recovered from one business-case PDF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentRecord {
    pub uii: String,
    pub title: String,
}

/// A worksheet row keyed by column label ("A", "B", ... or header text).
pub type TabularRecord = HashMap<String, String>;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReconOutcome {
    Matched { uii: String, title: String },
    Mismatched { uii: String, expected_title: String, actual_title: String },
    NotFound { uii: String },
}

impl ReconOutcome {
    pub fn uii(&self) -> &str {
        match self {
            Self::Matched { uii, .. } | Self::Mismatched { uii, .. } | Self::NotFound { uii } => uii,
        }
    }
}

/// Report line for this outcome, without the trailing newline.
///
/// `expected_title` is the document's title, `actual_title` the sheet's.
impl fmt::Display for ReconOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Matched { uii, title } => write!(f, "{uii}: Titles match to {title}"),
            Self::Mismatched { uii, expected_title, actual_title } => {
                write!(f, "{uii}: Titles unmatch --> {expected_title} != {actual_title}")
            }
            Self::NotFound { uii } => write!(f, "{uii}: Not found"),
        }
    }
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconSummary {
    pub total: usize,
    pub matched: usize,
    pub mismatched: usize,
    pub not_found: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub engine_version: String,
    pub run_at: String,
    pub key_column: String,
    pub title_column: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconReport {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub outcomes: Vec<ReconOutcome>,
}

impl ReconReport {
    /// Text artifact: one newline-terminated line per outcome.
    pub fn render(&self) -> String {
        crate::engine::render_report(&self.outcomes)
    }
}
