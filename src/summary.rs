use std::ops::Range;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GlError, Result};
use crate::hierarchy::ClassifiedRow;
use crate::report::ProcessingReport;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_totals() -> Vec<String> {
    strings(&["total", "totals", "grand total", "period total", "period totals"])
}

fn default_subtotals() -> Vec<String> {
    strings(&["subtotal", "subtotals"])
}

fn default_opening_balance() -> Vec<String> {
    strings(&[
        "opening balance",
        "opening balances",
        "beginning balance",
        "beginning balances",
    ])
}

/// Keyword lists identifying summary rows, one list per removal pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryKeywords {
    #[serde(default = "default_totals")]
    pub totals: Vec<String>,
    #[serde(default = "default_subtotals")]
    pub subtotals: Vec<String>,
    #[serde(default = "default_opening_balance")]
    pub opening_balance: Vec<String>,
}

impl Default for SummaryKeywords {
    fn default() -> Self {
        Self {
            totals: default_totals(),
            subtotals: default_subtotals(),
            opening_balance: default_opening_balance(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryKind {
    Total,
    Subtotal,
    OpeningBalance,
}

/// Case-insensitive substring matcher for one keyword list.
#[derive(Debug, Clone)]
struct KeywordMatcher {
    re: Option<Regex>,
}

impl KeywordMatcher {
    fn new(keywords: &[String]) -> Result<Self> {
        let alternatives: Vec<String> = keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(regex::escape)
            .collect();
        if alternatives.is_empty() {
            return Ok(Self { re: None });
        }
        let re = RegexBuilder::new(&alternatives.join("|"))
            .case_insensitive(true)
            .build()
            .map_err(|e| GlError::Settings(format!("invalid summary keyword: {e}")))?;
        Ok(Self { re: Some(re) })
    }

    fn matches(&self, text: &str) -> bool {
        self.re.as_ref().is_some_and(|re| re.is_match(text))
    }

    fn spans(&self, text: &str) -> Vec<Range<usize>> {
        self.re
            .as_ref()
            .map(|re| re.find_iter(text).map(|m| m.range()).collect())
            .unwrap_or_default()
    }
}

/// Removes totals, subtotals and opening-balance rows in three ordered passes.
#[derive(Debug, Clone)]
pub struct SummaryFilter {
    totals: KeywordMatcher,
    subtotals: KeywordMatcher,
    opening_balance: KeywordMatcher,
}

impl SummaryFilter {
    pub fn new(keywords: &SummaryKeywords) -> Result<Self> {
        Ok(Self {
            totals: KeywordMatcher::new(&keywords.totals)?,
            subtotals: KeywordMatcher::new(&keywords.subtotals)?,
            opening_balance: KeywordMatcher::new(&keywords.opening_balance)?,
        })
    }

    /// A total keyword that only occurs inside a subtotal keyword
    /// ("Subtotal" contains "total") does not count.
    fn is_total(&self, text: &str) -> bool {
        let shadows = self.subtotals.spans(text);
        self.totals
            .spans(text)
            .iter()
            .any(|t| !shadows.iter().any(|s| s.start <= t.start && t.end <= s.end))
    }

    /// First pass whose keywords appear in the account or description text.
    pub fn kind_of(&self, account: &str, description: &str) -> Option<SummaryKind> {
        let fields = [account, description];
        if fields.iter().any(|t| self.is_total(t)) {
            Some(SummaryKind::Total)
        } else if fields.iter().any(|t| self.subtotals.matches(t)) {
            Some(SummaryKind::Subtotal)
        } else if fields.iter().any(|t| self.opening_balance.matches(t)) {
            Some(SummaryKind::OpeningBalance)
        } else {
            None
        }
    }

    /// Drop summary rows, counting each removed row once under the first
    /// pass it matches.
    pub fn apply(&self, mut rows: Vec<ClassifiedRow>, report: &mut ProcessingReport) -> Vec<ClassifiedRow> {
        let (mut totals, mut subtotals, mut opening) = (0, 0, 0);
        rows.retain(|r| match self.kind_of(&r.account_raw, &r.description) {
            None => true,
            Some(kind) => {
                match kind {
                    SummaryKind::Total => totals += 1,
                    SummaryKind::Subtotal => subtotals += 1,
                    SummaryKind::OpeningBalance => opening += 1,
                }
                false
            }
        });
        report.rows_removed_totals = totals;
        report.rows_removed_subtotals = subtotals;
        report.rows_removed_opening_balance = opening;
        debug!(totals, subtotals, opening, "summary rows removed");
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Cell;
    use chrono::NaiveDate;

    fn filter() -> SummaryFilter {
        SummaryFilter::new(&SummaryKeywords::default()).unwrap()
    }

    fn row(account: &str, description: &str) -> ClassifiedRow {
        ClassifiedRow {
            source_row: 0,
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            account_raw: account.to_string(),
            account_flat: account.to_string(),
            description: description.to_string(),
            debit: Cell::Number(1.0),
            credit: Cell::Empty,
        }
    }

    #[test]
    fn test_kind_of() {
        let f = filter();
        assert_eq!(f.kind_of("Total Revenue", ""), Some(SummaryKind::Total));
        assert_eq!(f.kind_of("Cash", "Grand Total"), Some(SummaryKind::Total));
        assert_eq!(f.kind_of("PERIOD TOTALS", ""), Some(SummaryKind::Total));
        assert_eq!(f.kind_of("Subtotal", ""), Some(SummaryKind::Subtotal));
        assert_eq!(f.kind_of("Expenses", "Subtotal Expenses"), Some(SummaryKind::Subtotal));
        assert_eq!(f.kind_of("Opening Balance", ""), Some(SummaryKind::OpeningBalance));
        assert_eq!(f.kind_of("Cash", "Beginning Balances"), Some(SummaryKind::OpeningBalance));
        assert_eq!(f.kind_of("Cash", "Deposit"), None);
    }

    #[test]
    fn test_keywords_match_inside_words() {
        let f = filter();
        assert_eq!(f.kind_of("Period_Total", ""), Some(SummaryKind::Total));
        assert_eq!(f.kind_of("YTDTotal", ""), Some(SummaryKind::Total));
        assert_eq!(f.kind_of("", "SUBTOTAL-Opex"), Some(SummaryKind::Subtotal));
        assert_eq!(f.kind_of("Subtotal", "Grand Total"), Some(SummaryKind::Total));
        assert_eq!(f.kind_of("", "FY24OpeningBalance"), None);
        assert_eq!(f.kind_of("", "FY24 opening balance"), Some(SummaryKind::OpeningBalance));
    }

    #[test]
    fn test_apply_counts_each_pass() {
        let f = filter();
        let mut report = ProcessingReport::default();
        let rows = vec![
            row("Cash", "Deposit"),
            row("Total", "Grand Total"),
            row("Subtotal", "Subtotal Expenses"),
            row("Opening Balance", "Beginning Balance"),
            row("Rent", "Office"),
        ];
        let kept = f.apply(rows, &mut report);
        assert_eq!(kept.len(), 2);
        assert_eq!(report.rows_removed_totals, 1);
        assert_eq!(report.rows_removed_subtotals, 1);
        assert_eq!(report.rows_removed_opening_balance, 1);
    }

    #[test]
    fn test_row_counted_once_by_first_pass() {
        let f = filter();
        let mut report = ProcessingReport::default();
        let kept = f.apply(vec![row("Total", "Opening Balance")], &mut report);
        assert!(kept.is_empty());
        assert_eq!(report.rows_removed_totals, 1);
        assert_eq!(report.rows_removed_opening_balance, 0);
    }

    #[test]
    fn test_custom_keywords() {
        let keywords = SummaryKeywords {
            totals: vec!["summe".into()],
            subtotals: vec![],
            opening_balance: vec!["saldovortrag".into()],
        };
        let f = SummaryFilter::new(&keywords).unwrap();
        assert_eq!(f.kind_of("Summe Konto", ""), Some(SummaryKind::Total));
        assert_eq!(f.kind_of("Total", ""), None);
        assert_eq!(f.kind_of("", "Saldovortrag"), Some(SummaryKind::OpeningBalance));
    }

    #[test]
    fn test_keywords_are_literal() {
        let keywords = SummaryKeywords {
            totals: vec!["total (usd)".into()],
            ..SummaryKeywords::default()
        };
        let f = SummaryFilter::new(&keywords).unwrap();
        assert_eq!(f.kind_of("Total (USD)", ""), Some(SummaryKind::Total));
        assert_eq!(f.kind_of("Total USD", ""), None);
    }
}
