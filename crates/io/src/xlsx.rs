// Excel workbook store (xlsx only)
//
// calamine reads, rust_xlsxwriter writes. rust_xlsxwriter cannot edit an
// existing file, so every operation loads the whole workbook into memory,
// mutates it and writes it back. A `Workbook` value is one open handle:
// dropping it closes the workbook whether or not the operation succeeded.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use rust_xlsxwriter::Workbook as XlsxWorkbook;

use itdash_recon::TabularRecord;

/// Name of the single sheet a freshly created workbook carries.
pub const DEFAULT_SHEET: &str = "Sheet";

/// Excel's sheet-name length limit.
const MAX_SHEET_NAME: usize = 31;

/// Characters Excel rejects in sheet names.
const INVALID_SHEET_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkbookFormat {
    Xlsx,
}

impl WorkbookFormat {
    pub fn from_extension(ext: &str) -> Result<Self, String> {
        match ext.to_ascii_lowercase().as_str() {
            "xlsx" => Ok(Self::Xlsx),
            other => Err(format!("Unsupported workbook format: {other} (supported: xlsx)")),
        }
    }
}

/// How `read_sheet` labels the cells of each row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderMode {
    /// No header row: columns are labeled "A", "B", ... by position.
    #[default]
    Positional,
    /// First row holds column names; it is not returned as a record.
    FirstRow,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SheetData {
    name: String,
    rows: Vec<Vec<String>>,
}

/// An open workbook handle.
#[derive(Debug)]
pub struct Workbook {
    path: PathBuf,
    sheets: Vec<SheetData>,
    dirty: bool,
}

impl Workbook {
    /// Create a new workbook at `path` holding one empty sheet named "Sheet".
    /// An existing file is replaced.
    pub fn create(path: &Path, format: WorkbookFormat) -> Result<Self, String> {
        match format {
            WorkbookFormat::Xlsx => {}
        }

        let mut workbook = Self {
            path: path.to_path_buf(),
            sheets: vec![SheetData { name: DEFAULT_SHEET.to_string(), rows: Vec::new() }],
            dirty: true,
        };
        workbook.save()?;
        log::debug!("created workbook {}", path.display());
        Ok(workbook)
    }

    /// Open an existing workbook, loading every sheet.
    pub fn open(path: &Path) -> Result<Self, String> {
        let mut source: Sheets<_> = open_workbook_auto(path)
            .map_err(|e| format!("Failed to open Excel file {}: {}", path.display(), e))?;

        let sheet_names: Vec<String> = source.sheet_names().to_vec();
        let mut sheets = Vec::with_capacity(sheet_names.len());

        for name in sheet_names {
            let range = source
                .worksheet_range(&name)
                .map_err(|e| format!("Failed to read sheet '{}': {}", name, e))?;

            // Range start offset (data may not begin at A1)
            let (start_row, start_col) = range.start().unwrap_or((0, 0));

            let mut rows: Vec<Vec<String>> = vec![Vec::new(); start_row as usize];
            for data_row in range.rows() {
                let mut cells = vec![String::new(); start_col as usize];
                cells.extend(data_row.iter().map(cell_text));
                rows.push(cells);
            }

            sheets.push(SheetData { name, rows });
        }

        Ok(Self { path: path.to_path_buf(), sheets, dirty: false })
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    pub fn rename_sheet(&mut self, old: &str, new: &str) -> Result<(), String> {
        validate_sheet_name(new)?;
        if old != new && self.sheet(new).is_some() {
            return Err(format!("Sheet '{new}' already exists"));
        }
        let sheet = self.sheet_mut(old)?;
        sheet.name = new.to_string();
        self.dirty = true;
        Ok(())
    }

    /// Append rows after the last row of `sheet`.
    pub fn append_rows(&mut self, sheet: &str, rows: &[Vec<String>]) -> Result<(), String> {
        let data = self.sheet_mut(sheet)?;
        data.rows.extend(rows.iter().cloned());
        self.dirty = true;
        Ok(())
    }

    /// Add a sheet after the existing ones, filled with `rows` from A1.
    pub fn create_sheet(&mut self, name: &str, rows: &[Vec<String>]) -> Result<(), String> {
        validate_sheet_name(name)?;
        if self.sheet(name).is_some() {
            return Err(format!("Sheet '{name}' already exists"));
        }
        self.sheets.push(SheetData { name: name.to_string(), rows: rows.to_vec() });
        self.dirty = true;
        Ok(())
    }

    /// Rows of `name` as label → value maps.
    ///
    /// Positional labels cover every column up to the sheet's widest row, so
    /// short rows still carry every label (empty string for missing cells).
    pub fn read_sheet(&self, name: &str, header: HeaderMode) -> Result<Vec<TabularRecord>, String> {
        let sheet = self.sheet(name).ok_or_else(|| format!("Sheet '{name}' not found"))?;

        match header {
            HeaderMode::Positional => {
                let width = sheet.rows.iter().map(Vec::len).max().unwrap_or(0);
                let labels: Vec<String> = (0..width).map(col_to_letter).collect();
                Ok(sheet.rows.iter().map(|row| label_row(&labels, row)).collect())
            }
            HeaderMode::FirstRow => {
                let Some((head, body)) = sheet.rows.split_first() else {
                    return Ok(Vec::new());
                };
                let labels: Vec<String> = head
                    .iter()
                    .enumerate()
                    .map(|(i, h)| if h.is_empty() { col_to_letter(i) } else { h.clone() })
                    .collect();
                Ok(body.iter().map(|row| label_row(&labels, row)).collect())
            }
        }
    }

    /// Write the workbook back to its path.
    pub fn save(&mut self) -> Result<(), String> {
        let mut xlsx_workbook = XlsxWorkbook::new();

        for sheet in &self.sheets {
            let worksheet = xlsx_workbook
                .add_worksheet()
                .set_name(&sheet.name)
                .map_err(|e| format!("Failed to create sheet '{}': {}", sheet.name, e))?;

            for (r, row) in sheet.rows.iter().enumerate() {
                for (c, value) in row.iter().enumerate() {
                    if value.is_empty() {
                        continue;
                    }
                    worksheet
                        .write_string(r as u32, c as u16, value)
                        .map_err(|e| format!("Failed to write cell {}{}: {}", col_to_letter(c), r + 1, e))?;
                }
            }
        }

        xlsx_workbook
            .save(&self.path)
            .map_err(|e| format!("Failed to save XLSX file {}: {}", self.path.display(), e))?;

        self.dirty = false;
        Ok(())
    }

    fn sheet(&self, name: &str) -> Option<&SheetData> {
        self.sheets.iter().find(|s| s.name == name)
    }

    fn sheet_mut(&mut self, name: &str) -> Result<&mut SheetData, String> {
        self.sheets
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| format!("Sheet '{name}' not found"))
    }
}

impl Drop for Workbook {
    fn drop(&mut self) {
        if self.dirty {
            log::warn!("workbook {} closed with unsaved changes", self.path.display());
        }
    }
}

/// Open `path`, run `op`, save on success. The handle is closed either way.
pub fn with_workbook<T>(
    path: &Path,
    op: impl FnOnce(&mut Workbook) -> Result<T, String>,
) -> Result<T, String> {
    let mut workbook = Workbook::open(path)?;
    let out = op(&mut workbook)?;
    workbook.save()?;
    Ok(out)
}

// ============================================================================
// Path-level operations (open, act, close)
// ============================================================================

pub fn create_workbook(path: &Path, format: WorkbookFormat) -> Result<(), String> {
    Workbook::create(path, format).map(|_| ())
}

pub fn rename_sheet(path: &Path, old: &str, new: &str) -> Result<(), String> {
    with_workbook(path, |wb| wb.rename_sheet(old, new))
}

pub fn append_rows(path: &Path, sheet: &str, rows: &[Vec<String>]) -> Result<(), String> {
    with_workbook(path, |wb| wb.append_rows(sheet, rows))
}

pub fn create_sheet(path: &Path, name: &str, rows: &[Vec<String>]) -> Result<(), String> {
    with_workbook(path, |wb| wb.create_sheet(name, rows))
}

/// Read-only: nothing is written back.
pub fn read_sheet(path: &Path, name: &str, header: HeaderMode) -> Result<Vec<TabularRecord>, String> {
    Workbook::open(path)?.read_sheet(name, header)
}

// ============================================================================
// Helpers
// ============================================================================

/// Convert column index to Excel column letter (0 = A, 25 = Z, 26 = AA, etc.)
pub fn col_to_letter(col: usize) -> String {
    let mut result = String::new();
    let mut n = col;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

/// Make an arbitrary label usable as a sheet name: invalid characters become
/// '_' and the result is cut to 31 characters.
pub fn sheet_name_for(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .map(|c| if INVALID_SHEET_CHARS.contains(&c) { '_' } else { c })
        .take(MAX_SHEET_NAME)
        .collect();
    if cleaned.trim().is_empty() {
        DEFAULT_SHEET.to_string()
    } else {
        cleaned
    }
}

fn validate_sheet_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Sheet name must not be empty".to_string());
    }
    if name.chars().count() > MAX_SHEET_NAME {
        return Err(format!("Sheet name '{name}' exceeds {MAX_SHEET_NAME} characters"));
    }
    if name.contains(INVALID_SHEET_CHARS) {
        return Err(format!("Sheet name '{name}' contains one of []:*?/\\"));
    }
    Ok(())
}

fn label_row(labels: &[String], row: &[String]) -> TabularRecord {
    let mut record: TabularRecord = HashMap::with_capacity(labels.len());
    for (i, label) in labels.iter().enumerate() {
        let value = row.get(i).cloned().unwrap_or_default();
        // Duplicate header names: first column keeps the label.
        record.entry(label.clone()).or_insert(value);
    }
    record
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter().map(|r| r.iter().map(|s| s.to_string()).collect()).collect()
    }

    #[test]
    fn col_letters() {
        assert_eq!(col_to_letter(0), "A");
        assert_eq!(col_to_letter(2), "C");
        assert_eq!(col_to_letter(25), "Z");
        assert_eq!(col_to_letter(26), "AA");
        assert_eq!(col_to_letter(701), "ZZ");
    }

    #[test]
    fn sheet_names_sanitized() {
        assert_eq!(sheet_name_for("NASA"), "NASA");
        assert_eq!(sheet_name_for("A/B: C?"), "A_B_ C_");
        assert_eq!(
            sheet_name_for("Department of Housing and Urban Development"),
            "Department of Housing and Urban"
        );
        assert_eq!(sheet_name_for("   "), DEFAULT_SHEET);
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(WorkbookFormat::from_extension("XLSX").unwrap(), WorkbookFormat::Xlsx);
        assert!(WorkbookFormat::from_extension("ods").is_err());
    }

    #[test]
    fn create_then_read_default_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Agencies.xlsx");
        create_workbook(&path, WorkbookFormat::Xlsx).unwrap();
        let wb = Workbook::open(&path).unwrap();
        assert_eq!(wb.sheet_names(), vec![DEFAULT_SHEET.to_string()]);
        assert!(wb.read_sheet(DEFAULT_SHEET, HeaderMode::Positional).unwrap().is_empty());
    }

    #[test]
    fn rename_append_create_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Agencies.xlsx");
        create_workbook(&path, WorkbookFormat::Xlsx).unwrap();

        rename_sheet(&path, DEFAULT_SHEET, "Agencies").unwrap();
        append_rows(&path, "Agencies", &rows(&[&["NASA", "$1.8B"], &["Department of Energy", "$2.1B"]])).unwrap();
        create_sheet(&path, "NASA", &rows(&[&["UII-1", "NASA", "Cloud Migration"], &["UII-2", "", "Payroll"]]))
            .unwrap();

        let wb = Workbook::open(&path).unwrap();
        assert_eq!(wb.sheet_names(), vec!["Agencies".to_string(), "NASA".to_string()]);

        let tiles = read_sheet(&path, "Agencies", HeaderMode::Positional).unwrap();
        assert_eq!(tiles.len(), 2);
        assert_eq!(tiles[1]["A"], "Department of Energy");
        assert_eq!(tiles[1]["B"], "$2.1B");

        let table = read_sheet(&path, "NASA", HeaderMode::Positional).unwrap();
        assert_eq!(table[0]["A"], "UII-1");
        assert_eq!(table[0]["C"], "Cloud Migration");
        assert_eq!(table[1]["B"], "");
        assert_eq!(table[1]["C"], "Payroll");
    }

    #[test]
    fn append_goes_after_existing_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w.xlsx");
        create_workbook(&path, WorkbookFormat::Xlsx).unwrap();
        append_rows(&path, DEFAULT_SHEET, &rows(&[&["1"]])).unwrap();
        append_rows(&path, DEFAULT_SHEET, &rows(&[&["2"], &["3"]])).unwrap();
        let values: Vec<String> = read_sheet(&path, DEFAULT_SHEET, HeaderMode::Positional)
            .unwrap()
            .into_iter()
            .map(|r| r["A"].clone())
            .collect();
        assert_eq!(values, vec!["1", "2", "3"]);
    }

    #[test]
    fn leading_empty_column_keeps_positions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w.xlsx");
        create_workbook(&path, WorkbookFormat::Xlsx).unwrap();
        create_sheet(&path, "T", &rows(&[&["", "b", "c"]])).unwrap();
        let table = read_sheet(&path, "T", HeaderMode::Positional).unwrap();
        assert_eq!(table[0]["A"], "");
        assert_eq!(table[0]["B"], "b");
        assert_eq!(table[0]["C"], "c");
    }

    #[test]
    fn header_row_labels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w.xlsx");
        create_workbook(&path, WorkbookFormat::Xlsx).unwrap();
        create_sheet(
            &path,
            "T",
            &rows(&[&["UII", "", "Investment Title"], &["UII-1", "x", "Payroll"]]),
        )
        .unwrap();
        let table = read_sheet(&path, "T", HeaderMode::FirstRow).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table[0]["UII"], "UII-1");
        assert_eq!(table[0]["B"], "x");
        assert_eq!(table[0]["Investment Title"], "Payroll");
    }

    #[test]
    fn missing_sheet_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w.xlsx");
        create_workbook(&path, WorkbookFormat::Xlsx).unwrap();
        assert!(read_sheet(&path, "Nope", HeaderMode::Positional).unwrap_err().contains("not found"));
        assert!(append_rows(&path, "Nope", &[]).is_err());
    }

    #[test]
    fn duplicate_and_invalid_sheet_names_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w.xlsx");
        create_workbook(&path, WorkbookFormat::Xlsx).unwrap();
        assert!(create_sheet(&path, DEFAULT_SHEET, &[]).is_err());
        assert!(create_sheet(&path, "a/b", &[]).is_err());
        assert!(rename_sheet(&path, DEFAULT_SHEET, "").is_err());
    }

    #[test]
    fn failed_operation_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w.xlsx");
        create_workbook(&path, WorkbookFormat::Xlsx).unwrap();
        append_rows(&path, DEFAULT_SHEET, &rows(&[&["kept"]])).unwrap();

        let err = with_workbook(&path, |wb| {
            wb.append_rows(DEFAULT_SHEET, &rows(&[&["lost"]]))?;
            Err::<(), String>("boom".into())
        })
        .unwrap_err();
        assert_eq!(err, "boom");

        let table = read_sheet(&path, DEFAULT_SHEET, HeaderMode::Positional).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table[0]["A"], "kept");
    }

    #[test]
    fn open_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Workbook::open(&dir.path().join("absent.xlsx")).is_err());
    }
}
