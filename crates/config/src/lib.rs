// Configuration loading

pub mod error;
pub mod settings;

pub use error::ConfigError;
pub use settings::{ColumnMode, ColumnSettings, Settings, DEFAULT_SETTINGS_FILE};
