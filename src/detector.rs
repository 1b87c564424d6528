use tracing::debug;

use crate::models::{ColumnMap, RawGrid};
use crate::report::ProcessingReport;

pub const DEFAULT_HEADER_SCAN_ROWS: usize = 5;

/// Where the data starts and which column holds which role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Structure {
    pub header_row_index: usize,
    pub data_start: usize,
    pub columns: ColumnMap,
}

/// Locate the column header row and resolve column roles.
///
/// The first of the leading `scan_rows` rows containing "date" or
/// "account" (case-insensitive) is the header row. Without a match row 0
/// is assumed and a warning is recorded. Returns `None` only for an empty
/// grid.
pub fn detect_structure(
    grid: &RawGrid,
    scan_rows: usize,
    report: &mut ProcessingReport,
) -> Option<Structure> {
    if grid.is_empty() {
        return None;
    }

    let found = (0..scan_rows.min(grid.row_count())).find(|&idx| {
        grid.row(idx).iter().any(|cell| {
            let text = cell.as_text().to_lowercase();
            text.contains("date") || text.contains("account")
        })
    });

    let header_row_index = match found {
        Some(idx) => idx,
        None => {
            report.warn("Could not detect header row, assuming first row");
            0
        }
    };

    let labels: Vec<String> = grid
        .row(header_row_index)
        .iter()
        .map(|c| c.as_text().to_lowercase())
        .collect();
    let columns = resolve_columns(&labels);
    debug!(header_row_index, ?columns, "detected GL structure");

    Some(Structure {
        header_row_index,
        data_start: header_row_index + 1,
        columns,
    })
}

/// Map lowercase header labels to column roles. Each label fills at most
/// one role, checked in the order date, account, description, debit,
/// credit; the first label to match a role keeps it. Unresolved roles
/// fall back to positions 0-4.
pub fn resolve_columns(labels: &[String]) -> ColumnMap {
    let (mut date, mut account, mut description, mut debit, mut credit) =
        (None, None, None, None, None);

    for (idx, label) in labels.iter().enumerate() {
        if label.contains("date") && date.is_none() {
            date = Some(idx);
        } else if label.contains("account") && account.is_none() {
            account = Some(idx);
        } else if ["description", "memo", "name"].iter().any(|k| label.contains(k))
            && description.is_none()
        {
            description = Some(idx);
        } else if label.contains("debit") && debit.is_none() {
            debit = Some(idx);
        } else if label.contains("credit") && credit.is_none() {
            credit = Some(idx);
        }
    }

    let fallback = ColumnMap::default();
    ColumnMap {
        date: date.unwrap_or(fallback.date),
        account: account.unwrap_or(fallback.account),
        description: description.unwrap_or(fallback.description),
        debit: debit.unwrap_or(fallback.debit),
        credit: credit.unwrap_or(fallback.credit),
    }
}
