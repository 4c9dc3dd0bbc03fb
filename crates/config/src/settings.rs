// Run settings
// Loaded from ./settings.json next to the working directory

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// Default settings file, relative to the working directory.
pub const DEFAULT_SETTINGS_FILE: &str = "settings.json";

/// How the reconciliation engine addresses the key and title columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnMode {
    /// Spreadsheet letters ("A", "B", ...). No header row is written.
    #[default]
    Positional,
    /// Header text from the table's first row.
    Named,
}

/// Which table columns hold the investment identifier and title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnSettings {
    pub mode: ColumnMode,
    pub key: String,
    pub title: String,
}

impl Default for ColumnSettings {
    fn default() -> Self {
        Self {
            mode: ColumnMode::Positional,
            key: "A".to_string(),
            title: "C".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Agency (or investment category) to drill into on the dashboard.
    pub target: String,

    // Site
    #[serde(rename = "site.url")]
    pub site_url: String,

    // Browser
    #[serde(rename = "webdriver.url")]
    pub webdriver_url: String,

    #[serde(rename = "webdriver.headless")]
    pub headless: bool,

    // Table readiness wait
    #[serde(rename = "table.minRows")]
    pub table_min_rows: usize,

    #[serde(rename = "table.timeoutSecs")]
    pub table_timeout_secs: u64,

    #[serde(rename = "table.initialBackoffMs")]
    pub table_initial_backoff_ms: u64,

    #[serde(rename = "table.maxBackoffMs")]
    pub table_max_backoff_ms: u64,

    // Download wait
    #[serde(rename = "download.attempts")]
    pub download_attempts: u32,

    #[serde(rename = "download.intervalSecs")]
    pub download_interval_secs: u64,

    // Extraction
    #[serde(rename = "extract.trimWhitespace")]
    pub trim_whitespace: bool,

    // Reconciliation
    #[serde(rename = "recon.columns")]
    pub columns: ColumnSettings,

    // Output
    #[serde(rename = "output.dir")]
    pub output_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            target: String::new(), // required, rejected by validate()
            site_url: "http://itdashboard.gov".to_string(),
            webdriver_url: "http://localhost:9515".to_string(),
            headless: true,
            table_min_rows: 11,
            table_timeout_secs: 120,
            table_initial_backoff_ms: 250,
            table_max_backoff_ms: 4000,
            download_attempts: 20,
            download_interval_secs: 3,
            trim_whitespace: false,
            columns: ColumnSettings::default(),
            output_dir: PathBuf::from("./output"),
        }
    }
}

impl Settings {
    /// Load and validate settings from `path`.
    ///
    /// Missing file, malformed JSON or a missing `target` are all fatal:
    /// there are no fallback defaults for the run target.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let settings = Self::from_json(&contents)?;
        log::debug!("loaded settings from {} (target: {})", path.display(), settings.target);
        Ok(settings)
    }

    /// Parse settings from a JSON string. Lines starting with `//` are comments.
    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");

        let settings: Settings =
            serde_json::from_str(&cleaned).map_err(|e| ConfigError::Parse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target.trim().is_empty() {
            return Err(ConfigError::Invalid("\"target\" is required and must not be empty".into()));
        }
        if self.table_min_rows == 0 {
            return Err(ConfigError::Invalid("\"table.minRows\" must be at least 1".into()));
        }
        if self.download_attempts == 0 {
            return Err(ConfigError::Invalid("\"download.attempts\" must be at least 1".into()));
        }
        if self.table_initial_backoff_ms > self.table_max_backoff_ms {
            return Err(ConfigError::Invalid(format!(
                "\"table.initialBackoffMs\" ({}) exceeds \"table.maxBackoffMs\" ({})",
                self.table_initial_backoff_ms, self.table_max_backoff_ms
            )));
        }
        if self.columns.key.is_empty() || self.columns.title.is_empty() {
            return Err(ConfigError::Invalid("\"recon.columns\" key and title must be set".into()));
        }
        if self.columns.mode == ColumnMode::Positional {
            for label in [&self.columns.key, &self.columns.title] {
                if !label.chars().all(|c| c.is_ascii_uppercase()) {
                    return Err(ConfigError::Invalid(format!(
                        "positional column '{label}' must be a column letter (A, B, ..., AA)"
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn table_timeout(&self) -> Duration {
        Duration::from_secs(self.table_timeout_secs)
    }

    pub fn download_interval(&self) -> Duration {
        Duration::from_secs(self.download_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_settings_use_defaults() {
        let s = Settings::from_json(r#"{"target": "Department of Commerce"}"#).unwrap();
        assert_eq!(s.target, "Department of Commerce");
        assert_eq!(s.site_url, "http://itdashboard.gov");
        assert_eq!(s.table_min_rows, 11);
        assert_eq!(s.download_attempts, 20);
        assert_eq!(s.download_interval(), Duration::from_secs(3));
        assert!(!s.trim_whitespace);
        assert_eq!(s.columns, ColumnSettings::default());
        assert_eq!(s.output_dir, PathBuf::from("./output"));
    }

    #[test]
    fn dotted_keys_and_comments() {
        let json = r#"{
    // which agency to open
    "target": "NASA",
    "table.minRows": 25,
    "download.intervalSecs": 1,
    "recon.columns": { "mode": "named", "key": "UII", "title": "Investment Title" }
}"#;
        let s = Settings::from_json(json).unwrap();
        assert_eq!(s.table_min_rows, 25);
        assert_eq!(s.download_interval_secs, 1);
        assert_eq!(s.columns.mode, ColumnMode::Named);
        assert_eq!(s.columns.key, "UII");
    }

    #[test]
    fn missing_target_is_invalid() {
        let err = Settings::from_json("{}").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("target"));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = Settings::from_json(r#"{"target": "#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn positional_columns_must_be_letters() {
        let err = Settings::from_json(
            r#"{"target": "NASA", "recon.columns": {"mode": "positional", "key": "uii", "title": "C"}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("uii"));
    }

    #[test]
    fn backoff_bounds_checked() {
        let err = Settings::from_json(
            r#"{"target": "NASA", "table.initialBackoffMs": 5000, "table.maxBackoffMs": 100}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn load_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(&dir.path().join("settings.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"target": "Department of Energy"}"#).unwrap();
        let s = Settings::load(&path).unwrap();
        assert_eq!(s.target, "Department of Energy");
    }
}
