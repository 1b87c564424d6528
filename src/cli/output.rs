use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::fmt::{money, percent};
use crate::models::CanonicalTransaction;
use crate::report::ProcessingReport;
use crate::validator::{ValidationResult, ValidationStatus};

pub fn print_report(report: &ProcessingReport) {
    let mut table = Table::new();
    table.set_header(vec!["Processing step", "Rows"]);
    for (label, value) in report.summary_lines() {
        table.add_row(vec![Cell::new(label), Cell::new(value)]);
    }
    println!("Processing report\n{table}");

    for warning in &report.warnings {
        println!("{} {warning}", "warning:".yellow().bold());
    }
}

pub fn print_preview(transactions: &[CanonicalTransaction], limit: usize) {
    if transactions.is_empty() || limit == 0 {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec!["Row", "Date", "Account", "Description", "Debit", "Credit", "Net"]);
    for t in transactions.iter().take(limit) {
        table.add_row(vec![
            Cell::new(t.row_id),
            Cell::new(t.date),
            Cell::new(&t.account_name_flat),
            Cell::new(&t.description),
            Cell::new(money(t.debit)),
            Cell::new(money(t.credit)),
            Cell::new(money(t.amount_net)),
        ]);
    }
    let more = transactions.len().saturating_sub(limit);
    println!("{table}");
    if more > 0 {
        println!("... and {more} more");
    }
}

pub fn status_label(status: ValidationStatus) -> colored::ColoredString {
    match status {
        ValidationStatus::Pass => status.as_str().green().bold(),
        ValidationStatus::Fail => status.as_str().red().bold(),
    }
}

pub fn print_validation(result: &ValidationResult) {
    let m = &result.key_metrics;
    let mut table = Table::new();
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec![Cell::new("Transactions"), Cell::new(m.total_transactions)]);
    table.add_row(vec![Cell::new("Total debits"), Cell::new(money(m.total_debits))]);
    table.add_row(vec![Cell::new("Total credits"), Cell::new(money(m.total_credits))]);
    table.add_row(vec![
        Cell::new("Difference"),
        Cell::new(money(m.debit_credit_difference)),
    ]);
    table.add_row(vec![
        Cell::new("Date parse failure rate"),
        Cell::new(percent(m.date_parse_failure_rate)),
    ]);
    println!("Validation: {}\n{table}", status_label(result.status));

    for error in &result.errors {
        println!("\n{} {error}", "error:".red().bold());
    }
    for warning in &result.warnings {
        println!("\n{} {warning}", "warning:".yellow().bold());
    }
}
