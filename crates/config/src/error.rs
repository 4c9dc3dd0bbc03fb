use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum ConfigError {
    /// Settings file missing or unreadable.
    Read { path: PathBuf, message: String },
    /// Malformed JSON or wrong field types.
    Parse(String),
    /// Well-formed but unusable (missing target, zero thresholds, ...).
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, message } => {
                write!(f, "cannot read settings file {}: {message}", path.display())
            }
            Self::Parse(msg) => write!(f, "settings parse error: {msg}"),
            Self::Invalid(msg) => write!(f, "invalid settings: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}
