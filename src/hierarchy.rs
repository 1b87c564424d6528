use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::cells::{parse_amount, parse_date};
use crate::detector::Structure;
use crate::models::{Cell, RawGrid};
use crate::report::ProcessingReport;

pub const FLAT_SEPARATOR: &str = " : ";

fn default_top_level_keywords() -> Vec<String> {
    ["assets", "liabilities", "equity", "income", "expenses", "revenue"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_indent_width() -> usize {
    4
}

/// Knobs for placing account header rows in the hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyConfig {
    /// Header labels containing one of these start a new top-level branch.
    #[serde(default = "default_top_level_keywords")]
    pub top_level_keywords: Vec<String>,
    /// Spaces per indentation level; a tab counts as one full level.
    #[serde(default = "default_indent_width")]
    pub indent_width: usize,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            top_level_keywords: default_top_level_keywords(),
            indent_width: default_indent_width(),
        }
    }
}

// ---------------------------------------------------------------------------
// Hierarchy state
// ---------------------------------------------------------------------------

/// Stack of currently active parent-account labels, outermost first.
/// Only header rows and blank rows change it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HierarchyState {
    segments: Vec<String>,
}

impl HierarchyState {
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Drop everything at `level` and below, then make `label` the innermost parent.
    pub fn enter(&mut self, level: usize, label: &str) {
        self.segments.truncate(level);
        self.segments.push(label.to_string());
    }

    pub fn reset(&mut self) {
        self.segments.clear();
    }

    /// `Parent : Sub : leaf`, skipping empty segments.
    pub fn flatten(&self, leaf: &str) -> String {
        self.segments
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(leaf))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(FLAT_SEPARATOR)
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    /// Introduces a parent account; carries no transaction.
    Header,
    Transaction,
    /// No account text; clears the active hierarchy.
    Blank,
}

/// Decide what a data row is. `account` is the trimmed account text.
///
/// | date | account   | debit = credit = 0 | kind        |
/// |------|-----------|--------------------|-------------|
/// | no   | non-empty | any                | Header      |
/// | yes  | non-empty | yes                | Header      |
/// | yes  | non-empty | no                 | Transaction |
/// | any  | empty     | any                | Blank       |
pub fn classify(account: &str, has_date: bool, debit: f64, credit: f64) -> RowKind {
    let zero_amounts = debit == 0.0 && credit == 0.0;
    match (account.is_empty(), has_date, zero_amounts) {
        (true, _, _) => RowKind::Blank,
        (false, false, _) => RowKind::Header,
        (false, true, true) => RowKind::Header,
        (false, true, false) => RowKind::Transaction,
    }
}

/// Nesting level for a header row. Explicit indentation wins, capped at
/// the current depth; otherwise top-level keywords reset to level 0;
/// otherwise the header nests one level below the current innermost parent.
pub fn header_level(raw_account: &str, depth: usize, config: &HierarchyConfig) -> usize {
    let width = config.indent_width.max(1);
    let leading: usize = raw_account
        .chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { width } else { 1 })
        .sum();
    if leading > 2 {
        return (leading / width).min(depth);
    }

    let lower = raw_account.to_lowercase();
    if config
        .top_level_keywords
        .iter()
        .any(|k| lower.contains(&k.to_lowercase()))
    {
        return 0;
    }

    depth
}

// ---------------------------------------------------------------------------
// Forward pass
// ---------------------------------------------------------------------------

/// A dated transaction row with its hierarchy resolved. Amount cells are
/// left untyped for the normalizer.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedRow {
    pub source_row: usize,
    pub date: NaiveDate,
    pub account_raw: String,
    pub account_flat: String,
    pub description: String,
    pub debit: Cell,
    pub credit: Cell,
}

/// Walk the data rows once, maintaining the hierarchy stack, and return
/// the transaction rows with their flattened account names.
///
/// Must run before anything drops undated rows: header rows have no date
/// but provide the parents for the transactions that follow them. Every
/// data row that is not returned is counted in `rows_with_invalid_dates`;
/// the column header and any preamble above it are not data rows.
pub fn build_hierarchy(
    grid: &RawGrid,
    structure: &Structure,
    config: &HierarchyConfig,
    report: &mut ProcessingReport,
) -> Vec<ClassifiedRow> {
    let cols = structure.columns;
    let mut state = HierarchyState::default();
    let mut rows = Vec::new();

    for idx in structure.data_start..grid.row_count() {
        let raw_account = grid.cell(idx, cols.account).as_text();
        let account = raw_account.trim();
        let date = parse_date(grid.cell(idx, cols.date));
        let debit = grid.cell(idx, cols.debit);
        let credit = grid.cell(idx, cols.credit);

        let kind = classify(account, date.is_some(), parse_amount(debit), parse_amount(credit));
        trace!(row = idx, ?kind, depth = state.depth(), "classified row");

        match (kind, date) {
            (RowKind::Header, _) => {
                let level = header_level(&raw_account, state.depth(), config);
                state.enter(level, account);
            }
            (RowKind::Blank, _) => state.reset(),
            (RowKind::Transaction, Some(date)) => rows.push(ClassifiedRow {
                source_row: idx,
                date,
                account_flat: state.flatten(account),
                account_raw: raw_account.clone(),
                description: grid.cell(idx, cols.description).as_text().trim().to_string(),
                debit: debit.clone(),
                credit: credit.clone(),
            }),
            (RowKind::Transaction, None) => {}
        }
    }

    let data_rows = grid.row_count().saturating_sub(structure.data_start);
    report.rows_with_invalid_dates = data_rows - rows.len();
    debug!(
        transactions = rows.len(),
        dropped = report.rows_with_invalid_dates,
        "hierarchy pass complete"
    );
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::{detect_structure, DEFAULT_HEADER_SCAN_ROWS};

    fn run(rows: Vec<Vec<&str>>) -> (Vec<ClassifiedRow>, ProcessingReport) {
        let grid = RawGrid::from_text_rows(rows);
        let mut report = ProcessingReport::new(grid.row_count());
        let structure = detect_structure(&grid, DEFAULT_HEADER_SCAN_ROWS, &mut report).unwrap();
        let rows = build_hierarchy(&grid, &structure, &HierarchyConfig::default(), &mut report);
        (rows, report)
    }

    fn flats(rows: &[ClassifiedRow]) -> Vec<&str> {
        rows.iter().map(|r| r.account_flat.as_str()).collect()
    }

    const HEADER: [&str; 5] = ["Date", "Account", "Description", "Debit", "Credit"];

    #[test]
    fn test_classify_decision_table() {
        assert_eq!(classify("Assets", false, 0.0, 0.0), RowKind::Header);
        assert_eq!(classify("Assets", false, 100.0, 0.0), RowKind::Header);
        assert_eq!(classify("Checking", true, 0.0, 0.0), RowKind::Header);
        assert_eq!(classify("Cash", true, 100.0, 0.0), RowKind::Transaction);
        assert_eq!(classify("Cash", true, 0.0, 50.0), RowKind::Transaction);
        assert_eq!(classify("", true, 100.0, 0.0), RowKind::Blank);
        assert_eq!(classify("", false, 0.0, 0.0), RowKind::Blank);
    }

    #[test]
    fn test_header_level_rules() {
        let cfg = HierarchyConfig::default();
        assert_eq!(header_level("Assets", 3, &cfg), 0);
        assert_eq!(header_level("Operating Expenses", 2, &cfg), 0);
        assert_eq!(header_level("Checking", 2, &cfg), 2);
        assert_eq!(header_level("        Petty Cash", 3, &cfg), 2);
        assert_eq!(header_level("        Petty Cash", 1, &cfg), 1);
        assert_eq!(header_level("\tPetty Cash", 3, &cfg), 1);
        // two spaces is not indentation
        assert_eq!(header_level("  Checking", 1, &cfg), 1);
        // indentation beats keywords
        assert_eq!(header_level("    Other Income", 2, &cfg), 1);
    }

    #[test]
    fn test_state_enter_truncates() {
        let mut state = HierarchyState::default();
        state.enter(0, "Assets");
        state.enter(1, "Current Assets");
        state.enter(2, "Bank");
        state.enter(1, "Fixed Assets");
        assert_eq!(state.depth(), 2);
        assert_eq!(state.flatten("Equipment"), "Assets : Fixed Assets : Equipment");
        state.reset();
        assert_eq!(state.flatten("Equipment"), "Equipment");
    }

    #[test]
    fn test_parent_header_prefixes_transaction() {
        let (rows, report) = run(vec![
            HEADER.to_vec(),
            vec!["", "Assets", "", "", ""],
            vec!["2024-01-15", "Cash", "Deposit", "1000", "0"],
        ]);
        assert_eq!(flats(&rows), vec!["Assets : Cash"]);
        assert_eq!(rows[0].source_row, 2);
        assert_eq!(rows[0].description, "Deposit");
        // "Assets" only; the column header is not a data row
        assert_eq!(report.rows_with_invalid_dates, 1);
    }

    #[test]
    fn test_nested_headers_and_siblings() {
        let (rows, _) = run(vec![
            HEADER.to_vec(),
            vec!["", "Assets", "", "", ""],
            vec!["", "Current Assets", "", "", ""],
            vec!["2024-01-15", "Cash", "Deposit", "1000", ""],
            vec!["2024-01-16", "Receivables", "Invoice", "500", ""],
            vec!["", "Liabilities", "", "", ""],
            vec!["2024-01-17", "Accounts Payable", "Bill", "", "1500"],
        ]);
        assert_eq!(
            flats(&rows),
            vec![
                "Assets : Current Assets : Cash",
                "Assets : Current Assets : Receivables",
                "Liabilities : Accounts Payable",
            ]
        );
    }

    #[test]
    fn test_indented_header_replaces_sibling() {
        let (rows, _) = run(vec![
            HEADER.to_vec(),
            vec!["", "Assets", "", "", ""],
            vec!["", "    Bank Accounts", "", "", ""],
            vec!["2024-01-15", "Checking", "", "10", ""],
            vec!["", "    Fixed", "", "", ""],
            vec!["2024-01-16", "Truck", "", "20", ""],
        ]);
        assert_eq!(
            flats(&rows),
            vec!["Assets : Bank Accounts : Checking", "Assets : Fixed : Truck"]
        );
    }

    #[test]
    fn test_blank_row_resets_hierarchy() {
        let (rows, report) = run(vec![
            HEADER.to_vec(),
            vec!["", "Assets", "", "", ""],
            vec!["2024-01-15", "Cash", "", "10", ""],
            vec!["", "", "", "", ""],
            vec!["2024-01-16", "Misc", "", "", "10"],
        ]);
        assert_eq!(flats(&rows), vec!["Assets : Cash", "Misc"]);
        assert_eq!(report.rows_with_invalid_dates, 2);
    }

    #[test]
    fn test_dated_zero_amount_row_is_header() {
        let (rows, _) = run(vec![
            HEADER.to_vec(),
            vec!["2024-01-01", "Checking", "Balance forward", "0", "0"],
            vec!["2024-01-15", "Deposit", "", "10", ""],
        ]);
        assert_eq!(flats(&rows), vec!["Checking : Deposit"]);
    }

    #[test]
    fn test_transactions_do_not_mutate_hierarchy() {
        let (rows, _) = run(vec![
            HEADER.to_vec(),
            vec!["", "Expenses", "", "", ""],
            vec!["2024-01-15", "Rent", "", "10", ""],
            vec!["2024-01-16", "Utilities", "", "20", ""],
        ]);
        assert_eq!(flats(&rows), vec!["Expenses : Rent", "Expenses : Utilities"]);
    }

    #[test]
    fn test_unparseable_dates_never_survive() {
        let (rows, report) = run(vec![
            HEADER.to_vec(),
            vec!["someday", "Cash", "", "10", ""],
            vec!["02/30/2024", "Cash", "", "10", ""],
            vec!["2024-02-29", "Cash", "", "10", ""],
        ]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(report.rows_with_invalid_dates, 2);
    }

    #[test]
    fn test_raw_account_keeps_source_text() {
        let (rows, _) = run(vec![
            HEADER.to_vec(),
            vec!["2024-01-15", "  Cash  ", "", "10", ""],
        ]);
        assert_eq!(rows[0].account_raw, "  Cash  ");
        assert_eq!(rows[0].account_flat, "Cash");
    }
}
