use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::fmt::{money, percent};
use crate::models::CanonicalTransaction;
use crate::report::ProcessingReport;

/// Float noise allowance on top of the configured balance tolerance, so
/// 1500.00 vs 1499.99 is a difference of exactly 0.01 for the check.
const BALANCE_EPSILON: f64 = 1e-9;

fn default_min_transactions() -> usize {
    1
}

fn default_max_date_parse_failure_rate() -> f64 {
    0.10
}

fn default_debit_credit_tolerance() -> f64 {
    0.01
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default = "default_min_transactions")]
    pub min_transactions: usize,
    #[serde(default = "default_max_date_parse_failure_rate")]
    pub max_date_parse_failure_rate: f64,
    #[serde(default = "default_debit_credit_tolerance")]
    pub debit_credit_tolerance: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_transactions: default_min_transactions(),
            max_date_parse_failure_rate: default_max_date_parse_failure_rate(),
            debit_credit_tolerance: default_debit_credit_tolerance(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ValidationStatus {
    Pass,
    Fail,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyMetrics {
    pub total_transactions: usize,
    pub total_debits: f64,
    pub total_credits: f64,
    pub debit_credit_difference: f64,
    pub date_parse_failure_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub status: ValidationStatus,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub key_metrics: KeyMetrics,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.status == ValidationStatus::Pass
    }

    /// Combine per-file results into one. The reduction does not depend on
    /// input order: metrics are summed (the balance difference is taken
    /// from the summed totals, the failure rate from the summed report
    /// counters, or the worst per-file rate when no reports are given),
    /// messages are merged into a sorted, de-duplicated list,
    /// and the batch passes only if every file passed.
    pub fn consolidate<'a, I>(items: I) -> ValidationResult
    where
        I: IntoIterator<Item = (&'a ValidationResult, Option<&'a ProcessingReport>)>,
    {
        let mut metrics = KeyMetrics::default();
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut all_pass = true;
        let (mut invalid, mut expected) = (0i64, 0i64);
        let mut worst_rate = 0.0f64;
        let mut saw_report = false;

        for (result, report) in items {
            metrics.total_transactions += result.key_metrics.total_transactions;
            metrics.total_debits += result.key_metrics.total_debits;
            metrics.total_credits += result.key_metrics.total_credits;
            errors.extend(result.errors.iter().cloned());
            warnings.extend(result.warnings.iter().cloned());
            all_pass &= result.is_valid();
            worst_rate = worst_rate.max(result.key_metrics.date_parse_failure_rate);
            if let Some(report) = report {
                saw_report = true;
                invalid += report.rows_with_invalid_dates as i64;
                expected += report.rows_expected_to_have_dates().max(0);
            }
        }

        metrics.debit_credit_difference = (metrics.total_debits - metrics.total_credits).abs();
        metrics.date_parse_failure_rate = if !saw_report {
            worst_rate
        } else if expected > 0 {
            invalid as f64 / expected as f64
        } else {
            0.0
        };
        errors.sort();
        errors.dedup();
        warnings.sort();
        warnings.dedup();

        ValidationResult {
            status: if all_pass {
                ValidationStatus::Pass
            } else {
                ValidationStatus::Fail
            },
            errors,
            warnings,
            key_metrics: metrics,
        }
    }
}

/// Checks normalized GL data before anything downstream touches it.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Run every check. Only an empty table stops early; otherwise all
    /// checks run and the status is FAIL iff any of them produced an error.
    pub fn validate(
        &self,
        transactions: &[CanonicalTransaction],
        report: Option<&ProcessingReport>,
    ) -> ValidationResult {
        if transactions.is_empty() {
            info!(status = "FAIL", "no transactions to validate");
            return ValidationResult {
                status: ValidationStatus::Fail,
                errors: vec![no_transactions_message()],
                warnings: Vec::new(),
                key_metrics: KeyMetrics::default(),
            };
        }

        let total_debits: f64 = transactions.iter().map(|t| t.debit).sum();
        let total_credits: f64 = transactions.iter().map(|t| t.credit).sum();
        let key_metrics = KeyMetrics {
            total_transactions: transactions.len(),
            total_debits,
            total_credits,
            debit_credit_difference: (total_debits - total_credits).abs(),
            date_parse_failure_rate: report.map(date_parse_failure_rate).unwrap_or(0.0),
        };
        debug!(?key_metrics, "computed key metrics");

        let mut errors = Vec::new();
        errors.extend(self.check_balance(&key_metrics));
        errors.extend(self.check_transaction_count(key_metrics.total_transactions));
        errors.extend(self.check_date_failure_rate(key_metrics.date_parse_failure_rate));
        let warnings = check_negative_amounts(transactions);

        let status = if errors.is_empty() {
            ValidationStatus::Pass
        } else {
            ValidationStatus::Fail
        };
        info!(
            status = status.as_str(),
            errors = errors.len(),
            warnings = warnings.len(),
            "validation complete"
        );

        ValidationResult {
            status,
            errors,
            warnings,
            key_metrics,
        }
    }

    fn check_balance(&self, m: &KeyMetrics) -> Option<String> {
        if m.debit_credit_difference <= self.config.debit_credit_tolerance + BALANCE_EPSILON {
            return None;
        }
        Some(three_part(
            "Debits and credits don't balance",
            &format!(
                "Total debits are {} and total credits are {}, a difference of {}. \
                 Debits must equal credits (tolerance {}).",
                money(m.total_debits),
                money(m.total_credits),
                money(m.debit_credit_difference),
                self.config.debit_credit_tolerance,
            ),
            &[
                "The export is incomplete (missing transactions or date ranges)",
                "Rows were filtered out during processing (totals, subtotals, invalid dates)",
                "The file was cut off or edited after export",
            ],
            &[
                "Confirm the GL report balances in the accounting system before exporting",
                "Re-export the full General Ledger for the intended date range",
                "Do not add or delete rows in the exported file by hand",
            ],
        ))
    }

    fn check_transaction_count(&self, count: usize) -> Option<String> {
        if count >= self.config.min_transactions {
            return None;
        }
        Some(three_part(
            "Insufficient transaction data",
            &format!(
                "The file contains {count} transaction(s), but at least {} are required.",
                self.config.min_transactions
            ),
            &[
                "The selected date range is too narrow",
                "Account filters excluded most transactions",
                "A summary report was exported instead of transaction detail",
            ],
            &[
                "Re-export the General Ledger with a broader date range",
                "Remove account filters in the export",
                "Export detailed transactions rather than totals",
            ],
        ))
    }

    fn check_date_failure_rate(&self, rate: f64) -> Option<String> {
        if rate <= self.config.max_date_parse_failure_rate {
            return None;
        }
        Some(three_part(
            "Too many rows without a valid date",
            &format!(
                "{} of rows have missing or unreadable dates, above the allowed {}.",
                percent(rate),
                percent(self.config.max_date_parse_failure_rate)
            ),
            &[
                "Dates are formatted inconsistently or stored as text",
                "Account headers, totals or subtotals are mixed in with transactions",
                "The export format changed or the file is damaged",
            ],
            &[
                "Re-export the General Ledger using the standard report format",
                "Use one date format throughout (MM/DD/YYYY or YYYY-MM-DD)",
                "Remove merged cells and manual formatting from the sheet",
            ],
        ))
    }
}

/// Share of rows expected to carry a date that did not. Zero when there
/// is nothing to divide by.
pub fn date_parse_failure_rate(report: &ProcessingReport) -> f64 {
    let expected = report.rows_expected_to_have_dates();
    if expected <= 0 {
        return 0.0;
    }
    report.rows_with_invalid_dates as f64 / expected as f64
}

/// Negative amounts may be legitimate reversing entries, so they only warn.
fn check_negative_amounts(transactions: &[CanonicalTransaction]) -> Vec<String> {
    let negative_debits = transactions.iter().filter(|t| t.debit < 0.0).count();
    let negative_credits = transactions.iter().filter(|t| t.credit < 0.0).count();
    let mut warnings = Vec::new();
    if negative_debits > 0 {
        warnings.push(three_part(
            "Negative debits detected",
            &format!("{negative_debits} transaction(s) have negative debit amounts."),
            &[
                "Credit memos or refunds recorded as negative debits",
                "Reversing entries",
                "Credits entered in the debit column",
            ],
            &[
                "Review these transactions in the source system",
                "No action is needed for valid memos or reversals",
            ],
        ));
    }
    if negative_credits > 0 {
        warnings.push(three_part(
            "Negative credits detected",
            &format!("{negative_credits} transaction(s) have negative credit amounts."),
            &[
                "Debit memos or adjustments recorded as negative credits",
                "Reversing entries",
                "Debits entered in the credit column",
            ],
            &[
                "Review these transactions in the source system",
                "No action is needed for valid memos or reversals",
            ],
        ));
    }
    warnings
}

fn no_transactions_message() -> String {
    three_part(
        "No transactions found in the GL file",
        "The file is empty or none of its rows survived processing as transactions.",
        &[
            "The sheet is blank or contains only headers",
            "The layout does not match a General Ledger export",
            "Every row was filtered out as a total, subtotal or undated row",
        ],
        &[
            "Check that the file contains transaction detail",
            "Make sure it has date, account, debit and credit columns",
            "Re-export the General Ledger report",
        ],
    )
}

/// What failed / why it usually happens / what to do next.
fn three_part(title: &str, what: &str, causes: &[&str], remedies: &[&str]) -> String {
    let bullets = |items: &[&str]| {
        items
            .iter()
            .map(|i| format!("  - {i}"))
            .collect::<Vec<_>>()
            .join("\n")
    };
    format!(
        "{title}\n\nWhat failed: {what}\n\nWhy this usually happens:\n{}\n\nWhat to do next:\n{}",
        bullets(causes),
        bullets(remedies)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn txn(debit: f64, credit: f64) -> CanonicalTransaction {
        CanonicalTransaction {
            entity: "Acme".into(),
            source_system: "QuickBooks".into(),
            gl_source_file: "gl.csv".into(),
            row_id: 0,
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            account_name_raw: "Cash".into(),
            account_name_flat: "Cash".into(),
            description: String::new(),
            debit,
            credit,
            amount_net: debit - credit,
        }
    }

    fn with_tolerance(tolerance: f64) -> Validator {
        Validator::new(ValidationConfig {
            debit_credit_tolerance: tolerance,
            ..ValidationConfig::default()
        })
    }

    fn with_max_rate(rate: f64) -> Validator {
        Validator::new(ValidationConfig {
            max_date_parse_failure_rate: rate,
            ..ValidationConfig::default()
        })
    }

    #[test]
    fn test_empty_table_fails_with_zeroed_metrics() {
        let result = Validator::default().validate(&[], None);
        assert_eq!(result.status, ValidationStatus::Fail);
        assert_eq!(result.errors.len(), 1);
        assert!(result.warnings.is_empty());
        assert_eq!(result.key_metrics, KeyMetrics::default());
        assert_eq!(result.key_metrics.total_transactions, 0);
    }

    #[test]
    fn test_balanced_ledger_passes() {
        let result = Validator::default().validate(&[txn(100.0, 0.0), txn(0.0, 100.0)], None);
        assert!(result.is_valid());
        assert!(result.errors.is_empty());
        assert_eq!(result.key_metrics.total_transactions, 2);
        assert_eq!(result.key_metrics.total_debits, 100.0);
        assert_eq!(result.key_metrics.total_credits, 100.0);
        assert_eq!(result.key_metrics.debit_credit_difference, 0.0);
    }

    #[test]
    fn test_one_cent_difference_respects_tolerance() {
        let rows = [txn(1500.00, 0.0), txn(0.0, 1499.99)];
        assert!(with_tolerance(0.01).validate(&rows, None).is_valid());
        let strict = with_tolerance(0.001).validate(&rows, None);
        assert_eq!(strict.status, ValidationStatus::Fail);
        assert_eq!(strict.errors.len(), 1);
        assert!(strict.errors[0].contains("$1,500.00"));
        assert!(strict.errors[0].contains("$1,499.99"));
        assert!(strict.errors[0].contains("$0.01"));
    }

    #[test]
    fn test_minimum_transaction_count() {
        let validator = Validator::new(ValidationConfig {
            min_transactions: 3,
            ..ValidationConfig::default()
        });
        let result = validator.validate(&[txn(10.0, 0.0), txn(0.0, 10.0)], None);
        assert_eq!(result.status, ValidationStatus::Fail);
        assert!(result.errors[0].starts_with("Insufficient transaction data"));
    }

    fn report(total: usize, header: Option<usize>, invalid: usize) -> ProcessingReport {
        ProcessingReport {
            total_rows_read: total,
            header_row_index: header,
            rows_with_invalid_dates: invalid,
            ..ProcessingReport::default()
        }
    }

    #[test]
    fn test_date_failure_rate_excludes_header_row() {
        let r = report(100, Some(0), 20);
        assert!((date_parse_failure_rate(&r) - 20.0 / 99.0).abs() < 1e-12);
        let r = report(100, None, 20);
        assert_eq!(date_parse_failure_rate(&r), 0.2);
        let r = report(1, Some(0), 1);
        assert_eq!(date_parse_failure_rate(&r), 0.0);
        assert_eq!(date_parse_failure_rate(&ProcessingReport::default()), 0.0);
    }

    #[test]
    fn test_date_failure_rate_threshold() {
        let rows: Vec<_> = (0..40).map(|i| if i % 2 == 0 { txn(5.0, 0.0) } else { txn(0.0, 5.0) }).collect();
        let r = report(100, Some(0), 20);

        let strict = with_max_rate(0.10).validate(&rows, Some(&r));
        assert_eq!(strict.status, ValidationStatus::Fail);
        assert!((strict.key_metrics.date_parse_failure_rate - 0.202).abs() < 0.001);
        assert!(strict.errors[0].starts_with("Too many rows without a valid date"));

        assert!(with_max_rate(0.25).validate(&rows, Some(&r)).is_valid());
    }

    #[test]
    fn test_all_checks_run_after_a_failure() {
        let validator = Validator::new(ValidationConfig {
            min_transactions: 5,
            ..ValidationConfig::default()
        });
        let r = report(10, Some(0), 8);
        let result = validator.validate(&[txn(10.0, 0.0)], Some(&r));
        assert_eq!(result.errors.len(), 3);
    }

    #[test]
    fn test_negative_amounts_only_warn() {
        let rows = [txn(-50.0, 0.0), txn(-25.0, 0.0), txn(0.0, -75.0)];
        let result = Validator::default().validate(&rows, None);
        assert!(result.is_valid());
        assert_eq!(result.warnings.len(), 2);
        assert!(result.warnings[0].contains("2 transaction(s) have negative debit"));
        assert!(result.warnings[1].contains("1 transaction(s) have negative credit"));
    }

    #[test]
    fn test_messages_have_three_parts() {
        let result = with_tolerance(0.0).validate(&[txn(10.0, 0.0)], None);
        let msg = &result.errors[0];
        assert!(msg.contains("What failed:"));
        assert!(msg.contains("Why this usually happens:"));
        assert!(msg.contains("What to do next:"));
    }

    #[test]
    fn test_status_serializes_uppercase() {
        let result = Validator::default().validate(&[], None);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "FAIL");
        assert_eq!(json["key_metrics"]["total_transactions"], 0);
    }

    #[test]
    fn test_consolidate_is_order_independent() {
        let v = Validator::default();
        let ok = v.validate(&[txn(10.0, 0.0), txn(0.0, 10.0)], None);
        let bad = v.validate(&[txn(10.0, 0.0)], None);
        let r1 = report(3, Some(0), 0);
        let r2 = report(4, Some(0), 2);

        let a = ValidationResult::consolidate([(&ok, Some(&r1)), (&bad, Some(&r2))]);
        let b = ValidationResult::consolidate([(&bad, Some(&r2)), (&ok, Some(&r1))]);
        assert_eq!(a, b);
        assert_eq!(a.status, ValidationStatus::Fail);
        assert_eq!(a.key_metrics.total_transactions, 3);
        assert_eq!(a.key_metrics.total_debits, 20.0);
        assert_eq!(a.key_metrics.total_credits, 10.0);
        assert_eq!(a.key_metrics.debit_credit_difference, 10.0);
        assert!((a.key_metrics.date_parse_failure_rate - 2.0 / 5.0).abs() < 1e-12);
        assert_eq!(a.errors.len(), 1);
    }

    #[test]
    fn test_consolidate_all_pass() {
        let v = Validator::default();
        let ok = v.validate(&[txn(10.0, 0.0), txn(0.0, 10.0)], None);
        let merged = ValidationResult::consolidate([(&ok, None), (&ok, None)]);
        assert!(merged.is_valid());
        assert_eq!(merged.key_metrics.total_transactions, 4);
    }

    #[test]
    fn test_consolidate_without_reports_keeps_worst_rate() {
        let v = Validator::default();
        let rows = [txn(10.0, 0.0), txn(0.0, 10.0)];
        let clean = v.validate(&rows, Some(&report(3, Some(0), 0)));
        let messy = v.validate(&rows, Some(&report(5, Some(0), 1)));
        let merged = ValidationResult::consolidate([(&clean, None), (&messy, None)]);
        assert_eq!(merged.key_metrics.date_parse_failure_rate, 0.25);
    }
}
