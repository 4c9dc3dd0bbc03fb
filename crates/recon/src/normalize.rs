//! Raw page shapes into records.
//!
//! Values pass through untouched: whatever text the browser reported is what
//! lands in the record. Source order is preserved.

use crate::error::ReconError;
use crate::model::{AgencySummaryRecord, InvestmentRecord};

/// Pair agency-name texts with amount texts, tile by tile.
///
/// The two sequences come from separate element queries over the same tile
/// container, so a length difference means the page shape changed under us.
/// That is reported instead of truncating to the shorter side.
pub fn tiles_to_records<N, A>(names: N, amounts: A) -> Result<Vec<AgencySummaryRecord>, ReconError>
where
    N: IntoIterator<Item = String>,
    A: IntoIterator<Item = String>,
{
    let names: Vec<String> = names.into_iter().collect();
    let amounts: Vec<String> = amounts.into_iter().collect();

    if names.len() != amounts.len() {
        return Err(ReconError::ShapeMismatch {
            names: names.len(),
            amounts: amounts.len(),
        });
    }

    Ok(names
        .into_iter()
        .zip(amounts)
        .map(|(agency_name, amount)| AgencySummaryRecord { agency_name, amount })
        .collect())
}

/// Table rows (cell texts per row) into investment records.
pub fn rows_to_records<R, C>(rows: R) -> Vec<InvestmentRecord>
where
    R: IntoIterator<Item = C>,
    C: IntoIterator<Item = String>,
{
    rows.into_iter()
        .map(|cells| InvestmentRecord::new(cells.into_iter().collect()))
        .collect()
}

/// Worksheet rows for a set of records, in order.
pub fn to_sheet_rows(records: &[InvestmentRecord]) -> Vec<Vec<String>> {
    records.iter().map(|r| r.cells.clone()).collect()
}

/// Worksheet rows for the tile sheet, in order.
pub fn tiles_to_sheet_rows(records: &[AgencySummaryRecord]) -> Vec<Vec<String>> {
    records.iter().map(AgencySummaryRecord::to_row).collect()
}
