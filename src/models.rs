use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One untyped spreadsheet cell as it came out of the source reader.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Bool(bool),
}

impl Cell {
    /// Render the cell as text without trimming. Numbers use the shortest
    /// representation (`1000`, `12.5`), dates are ISO formatted.
    pub fn as_text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(n) => n.to_string(),
            Self::Date(d) => d.format("%Y-%m-%d").to_string(),
            Self::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            Self::Bool(b) => b.to_string(),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Self::Empty
        } else {
            Self::Text(s.to_string())
        }
    }
}

static EMPTY: Cell = Cell::Empty;

/// Rows x columns of cells with no assumed schema. Rows may be ragged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawGrid {
    rows: Vec<Vec<Cell>>,
}

impl RawGrid {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    /// Build a grid from text rows; empty strings become `Cell::Empty`.
    pub fn from_text_rows<R, S>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(|s| Cell::from(s.as_ref())).collect())
                .collect(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Widest row length.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn row(&self, idx: usize) -> &[Cell] {
        self.rows.get(idx).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Missing cells (short rows, out-of-range columns) read as empty.
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.row(row).get(col).unwrap_or(&EMPTY)
    }
}

/// Resolved 0-based column indices for the five GL roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnMap {
    pub date: usize,
    pub account: usize,
    pub description: usize,
    pub debit: usize,
    pub credit: usize,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            date: 0,
            account: 1,
            description: 2,
            debit: 3,
            credit: 4,
        }
    }
}

/// Provenance stamped onto every canonical row of one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMeta {
    pub entity: String,
    pub source_system: String,
    pub gl_source_file: String,
}

impl SourceMeta {
    pub fn new(entity: &str, source_system: &str, gl_source_file: &str) -> Self {
        Self {
            entity: entity.to_string(),
            source_system: source_system.to_string(),
            gl_source_file: gl_source_file.to_string(),
        }
    }
}

/// Column names of the canonical table, in output order.
pub const CANONICAL_COLUMNS: [&str; 11] = [
    "entity",
    "source_system",
    "gl_source_file",
    "row_id",
    "date",
    "account_name_raw",
    "account_name_flat",
    "description",
    "debit",
    "credit",
    "amount_net",
];

/// One normalized GL transaction. Field order is the canonical column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalTransaction {
    pub entity: String,
    pub source_system: String,
    pub gl_source_file: String,
    pub row_id: usize,
    pub date: NaiveDate,
    pub account_name_raw: String,
    pub account_name_flat: String,
    pub description: String,
    pub debit: f64,
    pub credit: f64,
    pub amount_net: f64,
}
