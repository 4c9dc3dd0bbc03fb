//! `itdash-recon` - normalization, document field extraction and
//! document-vs-spreadsheet reconciliation.
//!
//! Pure engine crate: receives pre-loaded records, returns classified results.
//! No browser, spreadsheet or filesystem dependencies.

pub mod engine;
pub mod error;
pub mod evidence;
pub mod extract;
pub mod model;
pub mod normalize;

pub use engine::{reconcile, render_report, run, KeyColumns};
pub use error::ReconError;
pub use extract::{extract_document, Extractor};
pub use model::{
    AgencySummaryRecord, DocumentRecord, InvestmentRecord, ReconOutcome, ReconReport, ReconSummary,
    TabularRecord,
};
