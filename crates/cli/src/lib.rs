//! `itdash` - scrape the IT dashboard, download business cases, reconcile.

pub mod browser;
pub mod exit_codes;
pub mod orchestrator;
pub mod poll;

use itdash_config::ConfigError;
use itdash_recon::ReconError;

use browser::BrowserError;
use exit_codes::{
    EXIT_BROWSER, EXIT_CONFIG, EXIT_DOCUMENTS_EXCLUDED, EXIT_REPORT, EXIT_SHAPE_MISMATCH, EXIT_STORE,
    EXIT_TABLE_TIMEOUT,
};

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn config(err: ConfigError) -> Self {
        let hint = match &err {
            ConfigError::Read { .. } => Some("create settings.json with {\"target\": \"<agency name>\"}".to_string()),
            _ => None,
        };
        Self { code: EXIT_CONFIG, message: err.to_string(), hint }
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self { code: EXIT_STORE, message: msg.into(), hint: None }
    }

    pub fn report(msg: impl Into<String>) -> Self {
        Self { code: EXIT_REPORT, message: msg.into(), hint: None }
    }

    pub fn load_timeout(rows_seen: usize, min_rows: usize, waited_secs: u64) -> Self {
        Self {
            code: EXIT_TABLE_TIMEOUT,
            message: format!(
                "investments table showed {rows_seen} row(s) after {waited_secs}s, expected at least {min_rows}"
            ),
            hint: Some("lower \"table.minRows\" if the target has fewer investments".to_string()),
        }
    }

    /// Tile names and amounts could not be paired.
    pub fn shape_mismatch(err: ReconError) -> Self {
        Self {
            code: EXIT_SHAPE_MISMATCH,
            message: err.to_string(),
            hint: Some("the dashboard tile layout may have changed".to_string()),
        }
    }

    pub fn excluded(count: usize, total: usize) -> Self {
        Self {
            code: EXIT_DOCUMENTS_EXCLUDED,
            message: format!("{count} of {total} document(s) excluded from reconciliation"),
            hint: Some("see the warnings above; re-run `itdash reconcile` once the files are fixed".to_string()),
        }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<BrowserError> for CliError {
    fn from(err: BrowserError) -> Self {
        let hint = match &err {
            BrowserError::Session(_) => Some("is a WebDriver (e.g. chromedriver) running at \"webdriver.url\"?".to_string()),
            _ => None,
        };
        Self { code: EXIT_BROWSER, message: err.to_string(), hint }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}
