use serde::{Deserialize, Serialize};
use tracing::warn;

/// Row accounting for one ingestion run. Built up step by step while the
/// source is processed and never touched again once handed back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingReport {
    pub total_rows_read: usize,
    pub header_row_index: Option<usize>,
    /// The column header row plus any preamble rows above it.
    #[serde(default)]
    pub structural_rows: usize,
    pub rows_with_invalid_dates: usize,
    pub rows_removed_totals: usize,
    pub rows_removed_subtotals: usize,
    pub rows_removed_opening_balance: usize,
    pub final_transaction_rows: usize,
    pub warnings: Vec<String>,
}

impl ProcessingReport {
    pub fn new(total_rows_read: usize) -> Self {
        Self {
            total_rows_read,
            ..Self::default()
        }
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{message}");
        self.warnings.push(message);
    }

    pub fn rows_removed_summary(&self) -> usize {
        self.rows_removed_totals + self.rows_removed_subtotals + self.rows_removed_opening_balance
    }

    /// Every row read ends up in exactly one bucket. Structural rows sit
    /// outside the data region, so they get their own bucket rather than
    /// counting as missing dates.
    pub fn is_partitioned(&self) -> bool {
        self.total_rows_read
            == self.structural_rows
                + self.final_transaction_rows
                + self.rows_with_invalid_dates
                + self.rows_removed_summary()
    }

    /// Rows that were expected to carry a date: everything except a
    /// detected column header row.
    pub fn rows_expected_to_have_dates(&self) -> i64 {
        let total = self.total_rows_read as i64;
        if self.header_row_index.is_some() {
            total - 1
        } else {
            total
        }
    }

    /// Label/value pairs for display.
    pub fn summary_lines(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Rows read", self.total_rows_read.to_string()),
            (
                "Header row",
                self.header_row_index
                    .map(|i| (i + 1).to_string())
                    .unwrap_or_else(|| "(none)".to_string()),
            ),
            ("Header and preamble rows", self.structural_rows.to_string()),
            ("Rows without valid dates", self.rows_with_invalid_dates.to_string()),
            ("Total rows removed", self.rows_removed_totals.to_string()),
            ("Subtotal rows removed", self.rows_removed_subtotals.to_string()),
            ("Opening balance rows removed", self.rows_removed_opening_balance.to_string()),
            ("Transactions", self.final_transaction_rows.to_string()),
        ]
    }
}
