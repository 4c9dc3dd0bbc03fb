//! CLI Exit Code Registry
//!
//! Single source of truth for `itdash` exit codes. Scheduled runs and
//! wrapper scripts branch on these, so treat them as a contract.
//!
//! | Code | Meaning                                                        |
//! |------|----------------------------------------------------------------|
//! | 0    | Run finished, every document reconciled                        |
//! | 1    | General error (unspecified)                                    |
//! | 2    | Usage error (bad arguments)                                    |
//! | 3    | Settings file missing, malformed or invalid                    |
//! | 4    | Browser / navigation failure (element never visible, ...)      |
//! | 5    | Investments table never reached its page size in time          |
//! | 6    | Workbook create/read/write failure                             |
//! | 7    | Report written, but some documents could not be read           |
//! | 8    | Scraped page shape inconsistent (tile names vs amounts)        |
//! | 9    | Report artifact could not be written                           |

/// Success - run completed.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments.
pub const EXIT_USAGE: u8 = 2;

/// Settings error - fatal before any browser session opens.
pub const EXIT_CONFIG: u8 = 3;

/// Browser error - element not visible, navigation or WebDriver failure.
pub const EXIT_BROWSER: u8 = 4;

/// Table readiness wait exceeded its timeout.
pub const EXIT_TABLE_TIMEOUT: u8 = 5;

/// Workbook store failure.
pub const EXIT_STORE: u8 = 6;

/// One or more documents were excluded from reconciliation
/// (missing field, missing page, unreadable or never downloaded).
pub const EXIT_DOCUMENTS_EXCLUDED: u8 = 7;

/// Tile name and amount sequences differ in length.
pub const EXIT_SHAPE_MISMATCH: u8 = 8;

/// Report file write failure.
pub const EXIT_REPORT: u8 = 9;
