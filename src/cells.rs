use chrono::{NaiveDate, NaiveDateTime};

use crate::models::Cell;

// ---------------------------------------------------------------------------
// Amounts
// ---------------------------------------------------------------------------

/// Parse a text amount leniently. Thousands separators, quotes and `$` are
/// ignored, `(500.00)` is negative, and anything unparseable is zero.
pub fn parse_amount_text(raw: &str) -> f64 {
    let s = raw.replace([',', '"', '$'], "");
    let s = s.trim();
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return -finite_or_zero(inner.trim().parse::<f64>().unwrap_or(0.0));
    }
    finite_or_zero(s.parse().unwrap_or(0.0))
}

/// Numeric value of a debit/credit cell; non-numeric cells are zero.
pub fn parse_amount(cell: &Cell) -> f64 {
    match cell {
        Cell::Number(n) => finite_or_zero(*n),
        Cell::Text(s) => parse_amount_text(s),
        Cell::Empty | Cell::Bool(_) | Cell::Date(_) | Cell::DateTime(_) => 0.0,
    }
}

fn finite_or_zero(n: f64) -> f64 {
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d-%b-%Y",
    "%Y/%m/%d",
    "%m-%d-%Y",
    "%d %b %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Parse a date from free text. Accepts the formats GL exports commonly
/// mix: ISO, US slashes, day-month-name, and ISO datetimes. Impossible
/// calendar dates (Feb 30, month 13) are rejected.
pub fn parse_date_text(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() || !s.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    // Two-digit years would otherwise be read as the year 24 AD by %Y.
    if let Some(yy) = s.rsplit('/').next() {
        if yy.len() == 2 && s.matches('/').count() == 2 {
            return NaiveDate::parse_from_str(s, "%m/%d/%y").ok();
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            if plausible_year(d) {
                return Some(d);
            }
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            if plausible_year(dt.date()) {
                return Some(dt.date());
            }
        }
    }
    None
}

/// Date of a cell. Typed date cells pass through; plain numbers are never
/// treated as dates.
pub fn parse_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Date(d) => Some(*d),
        Cell::DateTime(dt) => Some(dt.date()),
        Cell::Text(s) => parse_date_text(s),
        Cell::Empty | Cell::Number(_) | Cell::Bool(_) => None,
    }
}

fn plausible_year(d: NaiveDate) -> bool {
    use chrono::Datelike;
    (1000..=9999).contains(&d.year())
}

/// Convert a workbook date serial to a datetime.
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    // Workbook epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    base.checked_add_signed(chrono::Duration::milliseconds(millis))
}
