use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconError {
    /// Parallel tile sequences (agency names, amounts) differ in length.
    ShapeMismatch { names: usize, amounts: usize },
    /// A document lacks an expected labeled field.
    FieldNotFound { field: String },
    /// The document has fewer pages than the extraction page index needs.
    PageMissing { page: usize, pages: usize },
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShapeMismatch { names, amounts } => {
                write!(f, "tile shape mismatch: {names} agency name(s) vs {amounts} amount(s)")
            }
            Self::FieldNotFound { field } => write!(f, "field not found in document: {field}"),
            Self::PageMissing { page, pages } => {
                write!(f, "document has {pages} page(s), field page index {page} is missing")
            }
        }
    }
}

impl std::error::Error for ReconError {}
