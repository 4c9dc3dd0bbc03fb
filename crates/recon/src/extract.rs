//! Business-case PDF field extraction.
//!
//! Works on per-page text (page 0 first). Both fields live on the second page
//! of the business-case documents, between a label and the heading that
//! follows it.

use regex::Regex;

use crate::error::ReconError;
use crate::model::DocumentRecord;

/// Page carrying the investment name and UII in business-case documents.
pub const FIELD_PAGE: usize = 1;

pub const TITLE_LABEL: &str = "Name of this Investment: ";
pub const TITLE_MARKER: &str = "2.";
pub const UII_LABEL: &str = "Unique Investment Identifier (UII): ";
pub const UII_MARKER: &str = "Section B";

/// Capture everything between `label` and the next `marker` after it, on the
/// same line. A field whose marker sits on a later line is not found.
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub name: &'static str,
    pattern: Regex,
}

impl FieldRule {
    pub fn new(name: &'static str, label: &str, marker: &str) -> Self {
        // Both sides are escaped literals; the pattern is always valid.
        let pattern = Regex::new(&format!(
            "{}(.*?){}",
            regex::escape(label),
            regex::escape(marker)
        ))
        .expect("escaped literal pattern");
        Self { name, pattern }
    }

    /// First match only.
    pub fn capture<'t>(&self, text: &'t str) -> Result<&'t str, ReconError> {
        self.pattern
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
            .ok_or_else(|| ReconError::FieldNotFound { field: self.name.to_string() })
    }
}

#[derive(Debug, Clone)]
pub struct Extractor {
    page: usize,
    title: FieldRule,
    uii: FieldRule,
    trim: bool,
}

impl Default for Extractor {
    fn default() -> Self {
        Self {
            page: FIELD_PAGE,
            title: FieldRule::new("title", TITLE_LABEL, TITLE_MARKER),
            uii: FieldRule::new("uii", UII_LABEL, UII_MARKER),
            trim: false,
        }
    }
}

impl Extractor {
    /// Trim surrounding whitespace off captures. Off by default so captures
    /// compare byte-for-byte with what the document contains.
    pub fn with_trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }

    pub fn extract(&self, pages: &[String]) -> Result<DocumentRecord, ReconError> {
        let text = pages.get(self.page).ok_or(ReconError::PageMissing {
            page: self.page,
            pages: pages.len(),
        })?;

        let title = self.title.capture(text)?;
        let uii = self.uii.capture(text)?;

        Ok(DocumentRecord {
            uii: self.finish(uii),
            title: self.finish(title),
        })
    }

    fn finish(&self, captured: &str) -> String {
        if self.trim {
            captured.trim().to_string()
        } else {
            captured.to_string()
        }
    }
}

/// Extract with the default rules (page 1, untrimmed).
pub fn extract_document(pages: &[String]) -> Result<DocumentRecord, ReconError> {
    Extractor::default().extract(pages)
}
