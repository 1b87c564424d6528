use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{GlError, Result};
use crate::models::{Cell, RawGrid};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Delimited(u8),
    #[cfg(feature = "xlsx")]
    Workbook,
}

impl SourceFormat {
    pub fn for_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "csv" | "txt" => Ok(Self::Delimited(b',')),
            "tsv" | "tab" => Ok(Self::Delimited(b'\t')),
            #[cfg(feature = "xlsx")]
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(Self::Workbook),
            #[cfg(not(feature = "xlsx"))]
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Err(GlError::UnsupportedFormat(format!(
                ".{ext} (built without workbook support)"
            ))),
            _ => Err(GlError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Read a source file into an untyped grid. `sheet` selects a workbook
/// sheet by name; the first sheet is used otherwise. Delimited files
/// ignore it.
pub fn read_grid(path: &Path, sheet: Option<&str>) -> Result<RawGrid> {
    let grid = match SourceFormat::for_path(path)? {
        SourceFormat::Delimited(delimiter) => read_delimited(path, delimiter)?,
        #[cfg(feature = "xlsx")]
        SourceFormat::Workbook => read_workbook(path, sheet)?,
    };
    #[cfg(not(feature = "xlsx"))]
    let _ = sheet;
    debug!(path = %path.display(), rows = grid.row_count(), cols = grid.width(), "read source grid");
    Ok(grid)
}

// ---------------------------------------------------------------------------
// Delimited text
// ---------------------------------------------------------------------------

fn read_delimited(path: &Path, delimiter: u8) -> Result<RawGrid> {
    let data = std::fs::read(path)?;
    parse_delimited(&data, delimiter)
}

/// Parse delimited text already in memory. Rows keep their own width;
/// invalid UTF-8 is replaced rather than rejected.
pub fn parse_delimited(data: &[u8], delimiter: u8) -> Result<RawGrid> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(data);
    let mut rows = Vec::new();
    for result in rdr.byte_records() {
        let record = result?;
        let row: Vec<Cell> = record
            .iter()
            .map(|field| Cell::from(String::from_utf8_lossy(field).as_ref()))
            .collect();
        rows.push(row);
    }
    strip_bom(&mut rows);
    Ok(RawGrid::new(rows))
}

fn strip_bom(rows: &mut [Vec<Cell>]) {
    if let Some(Cell::Text(first)) = rows.first_mut().and_then(|r| r.first_mut()) {
        if let Some(rest) = first.strip_prefix('\u{feff}') {
            *first = rest.to_string();
        }
    }
}

// ---------------------------------------------------------------------------
// Workbooks (feature-gated)
// ---------------------------------------------------------------------------

#[cfg(feature = "xlsx")]
fn read_workbook(path: &Path, sheet: Option<&str>) -> Result<RawGrid> {
    use calamine::Reader;

    let mut workbook = calamine::open_workbook_auto(path)
        .map_err(|e| GlError::Workbook(format!("failed to open {}: {e}", path.display())))?;

    let sheet_name = match sheet {
        Some(name) => {
            if !workbook.sheet_names().iter().any(|s| s == name) {
                return Err(GlError::SheetNotFound(name.to_string()));
            }
            name.to_string()
        }
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| GlError::Workbook(format!("{} has no sheets", path.display())))?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| GlError::Workbook(format!("failed to read sheet {sheet_name}: {e}")))?;

    // The range starts at the first used cell; pad back to A1 so row
    // indexes match what the user sees.
    let (row_offset, col_offset) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));
    let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); row_offset];
    for row in range.rows() {
        let mut cells = vec![Cell::Empty; col_offset];
        cells.extend(row.iter().map(workbook_cell));
        rows.push(cells);
    }
    Ok(RawGrid::new(rows))
}

#[cfg(feature = "xlsx")]
fn workbook_cell(data: &calamine::Data) -> Cell {
    use calamine::Data;

    use crate::cells::excel_serial_to_datetime;

    match data {
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::from(s.as_str()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            match excel_serial_to_datetime(serial) {
                Some(value) if serial.fract() == 0.0 => Cell::Date(value.date()),
                Some(value) => Cell::DateTime(value),
                None => Cell::Number(serial),
            }
        }
        _ => Cell::Empty,
    }
}

/// SHA-256 of the file contents, hex encoded.
pub fn file_checksum(path: &Path) -> Result<String> {
    let data = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}
