// File I/O operations

pub mod fs;
pub mod pdf;
pub mod xlsx;

pub use pdf::{DocumentError, DocumentText, Pdftotext};
pub use xlsx::{HeaderMode, Workbook, WorkbookFormat};
