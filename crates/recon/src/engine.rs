use crate::evidence::compute_summary;
use crate::model::{DocumentRecord, ReconMeta, ReconOutcome, ReconReport, TabularRecord};

/// Column labels holding the join key and the title in tabular records.
///
/// Positional labels ("A", "C") by default; header names when the sheet was
/// read with a header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyColumns {
    pub key: String,
    pub title: String,
}

impl Default for KeyColumns {
    fn default() -> Self {
        Self::new("A", "C")
    }
}

impl KeyColumns {
    pub fn new(key: &str, title: &str) -> Self {
        Self { key: key.to_string(), title: title.to_string() }
    }
}

/// Classify one document against the table.
///
/// Scans rows in order and stops at the first row whose key equals the UII:
/// that row alone decides Matched vs Mismatched. Later rows with the same key
/// are never consulted (first row wins). No row with the key gives NotFound.
/// A row missing the title column compares as an empty title.
pub fn classify(doc: &DocumentRecord, table: &[TabularRecord], columns: &KeyColumns) -> ReconOutcome {
    let hit = table
        .iter()
        .find(|row| row.get(&columns.key).is_some_and(|k| *k == doc.uii));

    match hit {
        None => ReconOutcome::NotFound { uii: doc.uii.clone() },
        Some(row) => {
            let sheet_title = row.get(&columns.title).map(String::as_str).unwrap_or("");
            if sheet_title == doc.title {
                ReconOutcome::Matched { uii: doc.uii.clone(), title: doc.title.clone() }
            } else {
                ReconOutcome::Mismatched {
                    uii: doc.uii.clone(),
                    expected_title: doc.title.clone(),
                    actual_title: sheet_title.to_string(),
                }
            }
        }
    }
}

/// One outcome per document, in document order.
pub fn reconcile(
    documents: &[DocumentRecord],
    table: &[TabularRecord],
    columns: &KeyColumns,
) -> Vec<ReconOutcome> {
    documents.iter().map(|doc| classify(doc, table, columns)).collect()
}

/// Concatenate outcome lines, each newline-terminated.
pub fn render_report(outcomes: &[ReconOutcome]) -> String {
    let mut out = String::new();
    for outcome in outcomes {
        out.push_str(&outcome.to_string());
        out.push('\n');
    }
    out
}

/// Reconcile and wrap the outcomes with summary + run metadata.
pub fn run(documents: &[DocumentRecord], table: &[TabularRecord], columns: &KeyColumns) -> ReconReport {
    let outcomes = reconcile(documents, table, columns);
    let summary = compute_summary(&outcomes);

    log::info!(
        "reconciled {} document(s) against {} row(s): {} matched, {} mismatched, {} not found",
        summary.total,
        table.len(),
        summary.matched,
        summary.mismatched,
        summary.not_found
    );

    ReconReport {
        meta: ReconMeta {
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            key_column: columns.key.clone(),
            title_column: columns.title.clone(),
        },
        summary,
        outcomes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[(&str, &str)]) -> TabularRecord {
        cells.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn doc(uii: &str, title: &str) -> DocumentRecord {
        DocumentRecord { uii: uii.into(), title: title.into() }
    }

    #[test]
    fn matched_line() {
        let table = vec![row(&[("A", "UII-100"), ("B", ""), ("C", "Cloud Migration")])];
        let out = classify(&doc("UII-100", "Cloud Migration"), &table, &KeyColumns::default());
        assert_eq!(out.to_string(), "UII-100: Titles match to Cloud Migration");
    }

    #[test]
    fn mismatched_line() {
        let table = vec![row(&[("A", "UII-100"), ("B", ""), ("C", "Cloud Migration")])];
        let out = classify(&doc("UII-100", "Cloud Migrate"), &table, &KeyColumns::default());
        assert_eq!(out.to_string(), "UII-100: Titles unmatch --> Cloud Migrate != Cloud Migration");
    }

    #[test]
    fn not_found_line() {
        let table = vec![row(&[("A", "UII-100"), ("C", "Cloud Migration")])];
        let out = classify(&doc("UII-999", "X"), &table, &KeyColumns::default());
        assert_eq!(out, ReconOutcome::NotFound { uii: "UII-999".into() });
        assert_eq!(out.to_string(), "UII-999: Not found");
    }

    #[test]
    fn first_row_with_key_wins() {
        let table = vec![
            row(&[("A", "UII-1"), ("C", "Old Title")]),
            row(&[("A", "UII-1"), ("C", "New Title")]),
        ];
        let out = classify(&doc("UII-1", "New Title"), &table, &KeyColumns::default());
        assert_eq!(
            out,
            ReconOutcome::Mismatched {
                uii: "UII-1".into(),
                expected_title: "New Title".into(),
                actual_title: "Old Title".into(),
            }
        );
    }

    #[test]
    fn first_row_match_shadows_later_mismatch() {
        let table = vec![
            row(&[("A", "UII-1"), ("C", "T")]),
            row(&[("A", "UII-1"), ("C", "Other")]),
        ];
        let out = classify(&doc("UII-1", "T"), &table, &KeyColumns::default());
        assert!(matches!(out, ReconOutcome::Matched { .. }));
    }

    #[test]
    fn missing_title_cell_is_empty() {
        let table = vec![row(&[("A", "UII-1")])];
        let out = classify(&doc("UII-1", ""), &table, &KeyColumns::default());
        assert!(matches!(out, ReconOutcome::Matched { .. }));
    }

    #[test]
    fn untrimmed_values_do_not_match() {
        let table = vec![row(&[("A", "UII-1"), ("C", "Title")])];
        let out = classify(&doc("UII-1 ", "Title"), &table, &KeyColumns::default());
        assert!(matches!(out, ReconOutcome::NotFound { .. }));
    }

    #[test]
    fn named_columns() {
        let table = vec![row(&[("UII", "UII-7"), ("Investment Title", "Payroll")])];
        let cols = KeyColumns::new("UII", "Investment Title");
        let out = classify(&doc("UII-7", "Payroll"), &table, &cols);
        assert!(matches!(out, ReconOutcome::Matched { .. }));
    }

    #[test]
    fn empty_inputs() {
        assert_eq!(render_report(&reconcile(&[], &[], &KeyColumns::default())), "");
        let outcomes = reconcile(&[doc("A", "B"), doc("C", "D")], &[], &KeyColumns::default());
        assert!(outcomes.iter().all(|o| matches!(o, ReconOutcome::NotFound { .. })));
    }

    #[test]
    fn report_lines_newline_terminated() {
        let table = vec![row(&[("A", "1"), ("C", "x")])];
        let outcomes = reconcile(&[doc("1", "x"), doc("2", "y")], &table, &KeyColumns::default());
        assert_eq!(render_report(&outcomes), "1: Titles match to x\n2: Not found\n");
    }

    #[test]
    fn run_fills_summary_and_meta() {
        let table = vec![row(&[("A", "1"), ("C", "x")])];
        let report = run(&[doc("1", "x"), doc("1", "z"), doc("9", "q")], &table, &KeyColumns::default());
        assert_eq!(report.summary.total, 3);
        assert_eq!(report.summary.matched, 1);
        assert_eq!(report.summary.mismatched, 1);
        assert_eq!(report.summary.not_found, 1);
        assert_eq!(report.meta.key_column, "A");
        assert_eq!(report.render().lines().count(), 3);
    }
}
