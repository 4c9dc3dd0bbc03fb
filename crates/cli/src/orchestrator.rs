//! Acquisition run: tiles → table → documents → reconciliation.
//!
//! Each stage takes the immutable [`RunContext`] plus whatever the previous
//! stage produced; the only accumulator is [`DocumentPaths`], filled while
//! links are discovered and consumed by reconciliation. The browser is held
//! through a [`Teardown`] guard for the whole run, so every session is closed
//! whether the run finishes or stops at the first failure.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use itdash_config::{ColumnMode, ColumnSettings, Settings};
use itdash_io::fs::{list_files, write_text};
use itdash_io::xlsx::{self, sheet_name_for, with_workbook, DEFAULT_SHEET};
use itdash_io::{DocumentText, HeaderMode, WorkbookFormat};
use itdash_recon::normalize::{rows_to_records, tiles_to_records, tiles_to_sheet_rows, to_sheet_rows};
use itdash_recon::{AgencySummaryRecord, DocumentRecord, Extractor, InvestmentRecord, KeyColumns, ReconSummary};

use crate::browser::{xpath_literal, Browser, Locator, Teardown, DEFAULT_VISIBLE_TIMEOUT};
use crate::poll::{wait_for_download, wait_for_table, DownloadWait, TableWait};
use crate::CliError;

// Page selectors
pub const DIVE_IN: &str = "//div/a[@href='#home-dive-in']";
pub const TILES_CONTAINER: &str = "agency-tiles-container";
pub const TILE_NAME: &str = "div a span:nth-of-type(1)";
pub const TILE_AMOUNT: &str = "div a span:nth-of-type(2)";
pub const INVESTMENTS_TABLE: &str = "investments-table-object";
pub const PAGE_SIZE_OPTION: &str = "#investments-table-object_length select > option:nth-child(4)";
pub const TABLE_ROWS: &str = "tbody > tr";
pub const TABLE_CELLS: &str = "td";
pub const TABLE_HEADER: &str = "thead > tr > th";
pub const DOCUMENT_LINKS: &str = "#investments-table-object tbody > tr td:nth-of-type(1) a";
pub const BUSINESS_CASE_LINK: &str = "#business-case-pdf > a";

// Artifacts
pub const WORKBOOK_FILE: &str = "Agencies.xlsx";
pub const REPORT_FILE: &str = "compare-pdf.txt";
pub const AGENCIES_SHEET: &str = "Agencies";

/// Locator for the dashboard entry whose text contains `target`.
pub fn target_locator(target: &str) -> Locator {
    Locator::xpath(format!("//span[contains(text(), {})]", xpath_literal(target)))
}

/// `{anchor text}.pdf`, with path separators replaced.
pub fn document_file_name(anchor_text: &str) -> String {
    let stem: String = anchor_text
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect();
    format!("{stem}.pdf")
}

// ============================================================================
// Run context
// ============================================================================

/// Everything a run needs to know, fixed at startup.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub site_url: String,
    pub target: String,
    pub output_dir: PathBuf,
    pub workbook_path: PathBuf,
    pub report_path: PathBuf,
    /// Worksheet holding the target's table (`target` made sheet-safe).
    pub target_sheet: String,
    pub table_wait: TableWait,
    pub download_wait: DownloadWait,
    pub columns: ColumnSettings,
    pub trim_whitespace: bool,
}

impl RunContext {
    /// `output_dir` should already exist and be absolute (see `fs::ensure_dir`).
    pub fn from_settings(settings: &Settings, output_dir: &Path) -> Self {
        Self {
            site_url: settings.site_url.clone(),
            target: settings.target.clone(),
            output_dir: output_dir.to_path_buf(),
            workbook_path: output_dir.join(WORKBOOK_FILE),
            report_path: output_dir.join(REPORT_FILE),
            target_sheet: sheet_name_for(&settings.target),
            table_wait: TableWait {
                min_rows: settings.table_min_rows,
                timeout: settings.table_timeout(),
                initial: Duration::from_millis(settings.table_initial_backoff_ms),
                max: Duration::from_millis(settings.table_max_backoff_ms),
            },
            download_wait: DownloadWait {
                attempts: settings.download_attempts,
                interval: settings.download_interval(),
            },
            columns: settings.columns.clone(),
            trim_whitespace: settings.trim_whitespace,
        }
    }

    fn header_mode(&self) -> HeaderMode {
        match self.columns.mode {
            ColumnMode::Positional => HeaderMode::Positional,
            ColumnMode::Named => HeaderMode::FirstRow,
        }
    }

    fn key_columns(&self) -> KeyColumns {
        KeyColumns::new(&self.columns.key, &self.columns.title)
    }
}

/// Downloaded document paths, in table order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentPaths(Vec<PathBuf>);

impl DocumentPaths {
    pub fn push(&mut self, path: PathBuf) {
        self.0.push(path);
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<PathBuf> for DocumentPaths {
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ============================================================================
// State + summary
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Start,
    TilesLoaded { tiles: usize },
    TableLoaded { target: String, rows: usize },
    DocumentsDownloading { index: usize, total: usize },
    Reconciled,
    Done,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::TilesLoaded { tiles } => write!(f, "tiles loaded ({tiles})"),
            Self::TableLoaded { target, rows } => write!(f, "table loaded ({target}, {rows} rows)"),
            Self::DocumentsDownloading { index, total } => {
                write!(f, "downloading document {}/{total}", index + 1)
            }
            Self::Reconciled => write!(f, "reconciled"),
            Self::Done => write!(f, "done"),
        }
    }
}

fn advance(state: &mut RunState, next: RunState) {
    log::info!("{state} -> {next}");
    *state = next;
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExcludedDocument {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub target: String,
    pub tiles: usize,
    pub table_rows: usize,
    pub documents: usize,
    pub reconciled: usize,
    pub excluded: Vec<ExcludedDocument>,
    pub outcomes: ReconSummary,
    pub workbook: PathBuf,
    pub report: PathBuf,
}

// ============================================================================
// Entry points
// ============================================================================

/// Full acquisition run against the live site.
pub fn run<B, D>(browser: &mut B, reader: &D, ctx: &RunContext) -> Result<RunSummary, CliError>
where
    B: Browser + ?Sized,
    D: DocumentText + ?Sized,
{
    let mut browser = Teardown::new(browser);
    let mut state = RunState::Start;

    let result = run_stages(&mut *browser, reader, ctx, &mut state);
    if let Err(e) = &result {
        log::error!("run stopped during '{state}': {e}");
    }
    advance(&mut state, RunState::Done);
    result
}

/// Re-run reconciliation over artifacts left by an earlier run: the target
/// sheet of the workbook and every PDF in the output directory, by file name.
pub fn reconcile_existing<D>(reader: &D, ctx: &RunContext) -> Result<RunSummary, CliError>
where
    D: DocumentText + ?Sized,
{
    let paths: DocumentPaths = list_files(&ctx.output_dir, "pdf")
        .map_err(CliError::store)?
        .into_iter()
        .collect();
    log::info!("found {} document(s) in {}", paths.len(), ctx.output_dir.display());

    let recon = reconcile_documents(reader, ctx, &paths)?;
    Ok(recon.into_summary(ctx, 0))
}

fn run_stages<B, D>(browser: &mut B, reader: &D, ctx: &RunContext, state: &mut RunState) -> Result<RunSummary, CliError>
where
    B: Browser + ?Sized,
    D: DocumentText + ?Sized,
{
    browser.set_download_directory(&ctx.output_dir)?;
    browser.open_site(&ctx.site_url)?;
    browser.click_when_visible(&Locator::xpath(DIVE_IN))?;

    xlsx::create_workbook(&ctx.workbook_path, WorkbookFormat::Xlsx).map_err(CliError::store)?;

    let tiles = scrape_tiles(browser)?;
    store_tiles(ctx, &tiles)?;
    advance(state, RunState::TilesLoaded { tiles: tiles.len() });

    browser.click(&target_locator(&ctx.target))?;
    let (header, rows) = scrape_table(browser, ctx)?;
    store_table(ctx, header, &rows)?;
    advance(state, RunState::TableLoaded { target: ctx.target.clone(), rows: rows.len() });

    let mut paths = DocumentPaths::default();
    let links = discover_documents(browser, ctx, &mut paths)?;
    download_documents(browser, ctx, &links, &paths, state)?;

    let recon = reconcile_documents(reader, ctx, &paths)?;
    advance(state, RunState::Reconciled);
    Ok(recon.into_summary(ctx, tiles.len()))
}

// ============================================================================
// Stages
// ============================================================================

fn scrape_tiles<B: Browser + ?Sized>(browser: &mut B) -> Result<Vec<AgencySummaryRecord>, CliError> {
    let container = browser.wait_until_visible(&Locator::id(TILES_CONTAINER), DEFAULT_VISIBLE_TIMEOUT)?;
    let names = browser.texts(&Locator::css(TILE_NAME), Some(&container))?;
    let amounts = browser.texts(&Locator::css(TILE_AMOUNT), Some(&container))?;
    tiles_to_records(names, amounts).map_err(CliError::shape_mismatch)
}

fn store_tiles(ctx: &RunContext, tiles: &[AgencySummaryRecord]) -> Result<(), CliError> {
    let rows = tiles_to_sheet_rows(tiles);
    with_workbook(&ctx.workbook_path, |wb| {
        wb.rename_sheet(DEFAULT_SHEET, AGENCIES_SHEET)?;
        wb.append_rows(AGENCIES_SHEET, &rows)
    })
    .map_err(CliError::store)
}

/// Switch the table to its larger page size, wait for it, read every row.
/// Named mode also returns the header cells.
fn scrape_table<B: Browser + ?Sized>(
    browser: &mut B,
    ctx: &RunContext,
) -> Result<(Option<Vec<String>>, Vec<InvestmentRecord>), CliError> {
    let table_locator = Locator::id(INVESTMENTS_TABLE);
    let rows_locator = Locator::css(TABLE_ROWS);

    browser.wait_until_visible(&table_locator, DEFAULT_VISIBLE_TIMEOUT)?;
    browser.click(&Locator::css(PAGE_SIZE_OPTION))?;
    let table = wait_for_table(browser, &table_locator, &rows_locator, &ctx.table_wait)?;

    let header = match ctx.columns.mode {
        ColumnMode::Named => Some(browser.texts(&Locator::css(TABLE_HEADER), Some(&table))?),
        ColumnMode::Positional => None,
    };

    let cells = Locator::css(TABLE_CELLS);
    let mut rows = Vec::new();
    for row in browser.find_elements(&rows_locator, Some(&table))? {
        rows.push(browser.texts(&cells, Some(&row))?);
    }
    Ok((header, rows_to_records(rows)))
}

fn store_table(ctx: &RunContext, header: Option<Vec<String>>, records: &[InvestmentRecord]) -> Result<(), CliError> {
    let mut rows: Vec<Vec<String>> = header.into_iter().collect();
    rows.extend(to_sheet_rows(records));
    xlsx::create_sheet(&ctx.workbook_path, &ctx.target_sheet, &rows).map_err(CliError::store)
}

/// Collect each row's document link; the expected download path goes into
/// `paths` in the same order.
fn discover_documents<B: Browser + ?Sized>(
    browser: &mut B,
    ctx: &RunContext,
    paths: &mut DocumentPaths,
) -> Result<Vec<String>, CliError> {
    let mut links = Vec::new();
    for anchor in browser.find_elements(&Locator::css(DOCUMENT_LINKS), None)? {
        let text = browser.text(&anchor)?;
        let Some(href) = browser.attribute(&anchor, "href")? else {
            log::warn!("document link '{text}' has no href, skipped");
            continue;
        };
        links.push(href);
        paths.push(ctx.output_dir.join(document_file_name(&text)));
    }
    log::info!("discovered {} document link(s)", links.len());
    Ok(links)
}

fn download_documents<B: Browser + ?Sized>(
    browser: &mut B,
    ctx: &RunContext,
    links: &[String],
    paths: &DocumentPaths,
    state: &mut RunState,
) -> Result<(), CliError> {
    let total = links.len();
    for (index, (link, path)) in links.iter().zip(paths.iter()).enumerate() {
        advance(state, RunState::DocumentsDownloading { index, total });
        browser.open_site(link)?;
        browser.click_when_visible(&Locator::css(BUSINESS_CASE_LINK))?;
        wait_for_download(path, &ctx.download_wait);
    }
    Ok(())
}

struct Reconciliation {
    documents: usize,
    table_rows: usize,
    reconciled: usize,
    excluded: Vec<ExcludedDocument>,
    outcomes: ReconSummary,
}

impl Reconciliation {
    fn into_summary(self, ctx: &RunContext, tiles: usize) -> RunSummary {
        RunSummary {
            target: ctx.target.clone(),
            tiles,
            table_rows: self.table_rows,
            documents: self.documents,
            reconciled: self.reconciled,
            excluded: self.excluded,
            outcomes: self.outcomes,
            workbook: ctx.workbook_path.clone(),
            report: ctx.report_path.clone(),
        }
    }
}

/// Extract every document, reconcile the readable ones against the target
/// sheet and write the report. Unreadable documents are excluded, not
/// reported as "Not found".
fn reconcile_documents<D>(reader: &D, ctx: &RunContext, paths: &DocumentPaths) -> Result<Reconciliation, CliError>
where
    D: DocumentText + ?Sized,
{
    let extractor = Extractor::default().with_trim(ctx.trim_whitespace);
    let mut documents: Vec<DocumentRecord> = Vec::with_capacity(paths.len());
    let mut excluded = Vec::new();

    for path in paths.iter() {
        let extracted = reader
            .pages(path)
            .map_err(|e| e.to_string())
            .and_then(|pages| extractor.extract(&pages).map_err(|e| e.to_string()));
        match extracted {
            Ok(doc) => documents.push(doc),
            Err(reason) => {
                log::warn!("excluding {}: {reason}", path.display());
                excluded.push(ExcludedDocument { path: path.clone(), reason });
            }
        }
    }

    let table = xlsx::read_sheet(&ctx.workbook_path, &ctx.target_sheet, ctx.header_mode())
        .map_err(CliError::store)?;
    let report = itdash_recon::run(&documents, &table, &ctx.key_columns());
    write_text(&ctx.report_path, &report.render()).map_err(CliError::report)?;
    log::info!("report written to {}", ctx.report_path.display());

    Ok(Reconciliation {
        documents: paths.len(),
        table_rows: table.len(),
        reconciled: documents.len(),
        excluded,
        outcomes: report.summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_from_anchor_text() {
        assert_eq!(document_file_name("005-000000001"), "005-000000001.pdf");
        assert_eq!(document_file_name("a/b\\c"), "a_b_c.pdf");
    }

    #[test]
    fn target_locator_quotes() {
        assert_eq!(
            target_locator("National Science Foundation").to_string(),
            "xpath://span[contains(text(), 'National Science Foundation')]"
        );
    }

    #[test]
    fn context_paths_and_waits() {
        let settings = Settings::from_json(
            r#"{"target": "Dept: of/Things", "table.minRows": 5, "download.attempts": 2}"#,
        )
        .unwrap();
        let ctx = RunContext::from_settings(&settings, Path::new("/tmp/out"));
        assert_eq!(ctx.workbook_path, PathBuf::from("/tmp/out/Agencies.xlsx"));
        assert_eq!(ctx.report_path, PathBuf::from("/tmp/out/compare-pdf.txt"));
        assert_eq!(ctx.target_sheet, "Dept_ of_Things");
        assert_eq!(ctx.table_wait.min_rows, 5);
        assert_eq!(ctx.table_wait.initial, Duration::from_millis(250));
        assert_eq!(ctx.download_wait.attempts, 2);
        assert_eq!(ctx.header_mode(), HeaderMode::Positional);
    }

    #[test]
    fn state_display() {
        assert_eq!(RunState::DocumentsDownloading { index: 0, total: 3 }.to_string(), "downloading document 1/3");
        assert_eq!(RunState::TableLoaded { target: "NSF".into(), rows: 11 }.to_string(), "table loaded (NSF, 11 rows)");
    }
}
