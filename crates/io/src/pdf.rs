// PDF text extraction via poppler's `pdftotext`
//
// pdftotext separates pages with a form feed (0x0C), so the stdout split on
// form feeds gives per-page text with page 0 first.

use std::fmt;
use std::path::Path;
use std::process::Command;

const PAGE_BREAK: char = '\u{000C}';

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// File missing or zero bytes (e.g. download never finished).
    Empty(String),
    /// pdftotext is not on PATH.
    ToolMissing,
    /// pdftotext failed or produced no text.
    Read(String),
}

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty(path) => write!(f, "document missing or empty: {path}"),
            Self::ToolMissing => write!(f, "pdftotext not installed (poppler-utils)"),
            Self::Read(msg) => write!(f, "cannot read document text: {msg}"),
        }
    }
}

impl std::error::Error for DocumentError {}

/// Source of per-page document text.
pub trait DocumentText {
    fn pages(&self, path: &Path) -> Result<Vec<String>, DocumentError>;
}

/// `pdftotext <file> -` in reading order (no `-layout`, which pads
/// labels with column spacing).
#[derive(Debug, Default, Clone, Copy)]
pub struct Pdftotext;

impl DocumentText for Pdftotext {
    fn pages(&self, path: &Path) -> Result<Vec<String>, DocumentError> {
        if !crate::fs::file_ready(path) {
            return Err(DocumentError::Empty(path.display().to_string()));
        }

        which::which("pdftotext").map_err(|_| DocumentError::ToolMissing)?;

        let output = Command::new("pdftotext")
            .arg(path)
            .arg("-")
            .output()
            .map_err(|e| DocumentError::Read(format!("failed to run pdftotext: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DocumentError::Read(format!(
                "pdftotext failed on {} (exit {}): {}",
                path.display(),
                output.status.code().unwrap_or(-1),
                stderr.trim(),
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout);
        if text.trim().is_empty() {
            return Err(DocumentError::Read(format!(
                "{} appears scanned/image-only, no text extracted",
                path.display()
            )));
        }

        log::debug!("extracted {} bytes of text from {}", text.len(), path.display());
        Ok(split_pages(&text))
    }
}

/// Split pdftotext output into pages. The trailing form feed after the last
/// page does not start a new page.
pub fn split_pages(text: &str) -> Vec<String> {
    let body = text.strip_suffix(PAGE_BREAK).unwrap_or(text);
    body.split(PAGE_BREAK).map(str::to_string).collect()
}
