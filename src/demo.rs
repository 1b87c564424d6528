use std::collections::BTreeMap;
use std::path::Path;

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::error::Result;

pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_ENTRIES: usize = 250;

/// Chart of accounts: top-level group, sub-group, posting accounts.
const CHART: &[(&str, &str, &[&str])] = &[
    ("Assets", "Current Assets", &["Cash", "Accounts Receivable", "Prepaid Expenses"]),
    ("Assets", "Fixed Assets", &["Equipment", "Vehicles"]),
    ("Liabilities", "Current Liabilities", &["Accounts Payable", "Accrued Expenses"]),
    ("Liabilities", "Long-term Liabilities", &["Notes Payable"]),
    ("Equity", "Owner's Equity", &["Common Stock", "Retained Earnings"]),
    ("Revenue", "Operating Revenue", &["Service Revenue", "Consulting Fees", "Subscription Revenue"]),
    ("Expenses", "Operating Expenses", &["Rent Expense", "Salaries Expense", "Office Supplies", "Travel Expense"]),
    ("Expenses", "Other Expenses", &["Bank Fees", "Interest Expense"]),
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d-%b-%Y", "%Y/%m/%d", "%m-%d-%Y"];

const DATE_LABELS: &[&str] = &["Date", "Txn Date", "Posting Date", "DATE"];
const ACCOUNT_LABELS: &[&str] = &["Account", "Account Name", "ACCOUNT"];
const DESCRIPTION_LABELS: &[&str] = &["Description", "Memo", "Memo/Description"];
const DEBIT_LABELS: &[&str] = &["Debit", "Debit Amount", "DEBIT"];
const CREDIT_LABELS: &[&str] = &["Credit", "Credit Amount", "CREDIT"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct AccountRef {
    group: usize,
    leaf: usize,
}

impl AccountRef {
    fn top(&self) -> &'static str {
        CHART[self.group].0
    }

    fn name(&self) -> &'static str {
        CHART[self.group].2[self.leaf]
    }
}

#[derive(Debug, Clone)]
struct Line {
    date: NaiveDate,
    description: String,
    debit_cents: u64,
    credit_cents: u64,
}

/// A generated ledger export plus the totals it was built to hit.
#[derive(Debug, Clone)]
pub struct DemoLedger {
    pub rows: Vec<Vec<String>>,
    pub entries: usize,
    pub transaction_lines: usize,
    /// Debits over the real transaction lines; credits are equal.
    pub total_cents: u64,
}

/// Build a balanced but messy GL export: preamble lines above the column
/// header, group and sub-group header rows (sub-groups indented), blank
/// spacers, mixed date text and currency formats, plus subtotal, grand
/// total and opening balance rows that a clean load must drop.
pub fn generate(entries: usize, seed: u64) -> DemoLedger {
    let mut rng = StdRng::seed_from_u64(seed);
    let accounts: Vec<AccountRef> = CHART
        .iter()
        .enumerate()
        .flat_map(|(group, (_, _, leaves))| (0..leaves.len()).map(move |leaf| AccountRef { group, leaf }))
        .collect();
    let by_top = |top: &str| -> Vec<AccountRef> {
        accounts.iter().copied().filter(|a| a.top() == top).collect()
    };
    let (assets, liabilities, equity) = (by_top("Assets"), by_top("Liabilities"), by_top("Equity"));
    let (revenue, expenses) = (by_top("Revenue"), by_top("Expenses"));
    let cash = AccountRef { group: 0, leaf: 0 };

    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default();
    let mut ledger: BTreeMap<AccountRef, Vec<Line>> = BTreeMap::new();
    let mut total_cents = 0u64;

    for _ in 0..entries {
        let date = start + Duration::days(rng.gen_range(0..366));
        let cents = rng.gen_range(5_000u64..=2_500_000);
        let (debit, credit, memo) = match rng.gen_range(0..4) {
            0 => {
                let rev = pick(&mut rng, &revenue, cash);
                (cash, rev, format!("Payment received - {}", rev.name()))
            }
            1 => {
                let exp = pick(&mut rng, &expenses, cash);
                (exp, cash, format!("Payment - {}", exp.name()))
            }
            2 => {
                let from = pick(&mut rng, &assets, cash);
                let to = pick(&mut rng, &assets, cash);
                if from == to {
                    (from, pick(&mut rng, &equity, cash), "Owner contribution".to_string())
                } else {
                    (to, from, format!("Transfer from {}", from.name()))
                }
            }
            _ => {
                let asset = pick(&mut rng, &assets, cash);
                let liability = pick(&mut rng, &liabilities, cash);
                (asset, liability, "Financing".to_string())
            }
        };
        ledger.entry(debit).or_default().push(Line {
            date,
            description: memo.clone(),
            debit_cents: cents,
            credit_cents: 0,
        });
        ledger.entry(credit).or_default().push(Line {
            date,
            description: memo,
            debit_cents: 0,
            credit_cents: cents,
        });
        total_cents += cents;
    }

    let mut rows = vec![
        vec!["Northwind Consulting LLC".to_string()],
        vec!["General Ledger".to_string()],
        vec!["January through December 2024".to_string()],
        vec![
            choose(&mut rng, DATE_LABELS),
            choose(&mut rng, ACCOUNT_LABELS),
            choose(&mut rng, DESCRIPTION_LABELS),
            choose(&mut rng, DEBIT_LABELS),
            choose(&mut rng, CREDIT_LABELS),
        ],
        vec![
            fmt_date(&mut rng, start),
            "Opening Balance".to_string(),
            "Beginning balance".to_string(),
            fmt_amount(&mut rng, total_cents / 10),
            String::new(),
        ],
    ];

    let mut transaction_lines = 0;
    let mut last_top = None;
    let mut last_group = None;
    for (account, lines) in &mut ledger {
        lines.sort_by_key(|l| l.date);
        let (top, group, _) = CHART[account.group];
        if last_top != Some(top) {
            if last_top.is_some() {
                rows.push(vec![String::new(); 5]);
            }
            rows.push(header_row(top.to_string()));
            last_top = Some(top);
            last_group = None;
        }
        if last_group != Some(account.group) {
            let indent = if rng.gen_bool(0.5) { "    " } else { "\t" };
            rows.push(header_row(format!("{indent}{group}")));
            last_group = Some(account.group);
        }

        let name = account.name();
        for line in lines.iter() {
            let label = if rng.gen_bool(0.1) {
                format!("  {name}  ")
            } else {
                name.to_string()
            };
            rows.push(vec![
                fmt_date(&mut rng, line.date),
                label,
                line.description.clone(),
                amount_or_blank(&mut rng, line.debit_cents),
                amount_or_blank(&mut rng, line.credit_cents),
            ]);
        }
        transaction_lines += lines.len();

        let debits: u64 = lines.iter().map(|l| l.debit_cents).sum();
        let credits: u64 = lines.iter().map(|l| l.credit_cents).sum();
        let last_date = lines.last().map(|l| l.date).unwrap_or(start);
        rows.push(vec![
            fmt_date(&mut rng, last_date),
            name.to_string(),
            format!("Subtotal {name}"),
            fmt_amount(&mut rng, debits),
            fmt_amount(&mut rng, credits),
        ]);
    }

    rows.push(vec![String::new(); 5]);
    let end = start + Duration::days(365);
    rows.push(vec![
        fmt_date(&mut rng, end),
        "Total".to_string(),
        "Grand Total".to_string(),
        fmt_amount(&mut rng, total_cents),
        fmt_amount(&mut rng, total_cents),
    ]);

    DemoLedger {
        rows,
        entries,
        transaction_lines,
        total_cents,
    }
}

/// Generate and write the ledger as CSV.
pub fn write_demo_csv(path: &Path, entries: usize, seed: u64) -> Result<DemoLedger> {
    let ledger = generate(entries, seed);
    let mut wtr = csv::WriterBuilder::new().flexible(true).from_path(path)?;
    for row in &ledger.rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    info!(
        path = %path.display(),
        rows = ledger.rows.len(),
        transactions = ledger.transaction_lines,
        "wrote demo ledger"
    );
    Ok(ledger)
}

fn pick(rng: &mut StdRng, from: &[AccountRef], fallback: AccountRef) -> AccountRef {
    from.choose(rng).copied().unwrap_or(fallback)
}

fn choose(rng: &mut StdRng, from: &[&str]) -> String {
    from.choose(rng).copied().unwrap_or_default().to_string()
}

fn header_row(label: String) -> Vec<String> {
    vec![String::new(), label, String::new(), String::new(), String::new()]
}

fn fmt_date(rng: &mut StdRng, date: NaiveDate) -> String {
    let fmt = DATE_FORMATS.choose(rng).copied().unwrap_or("%Y-%m-%d");
    date.format(fmt).to_string()
}

fn fmt_amount(rng: &mut StdRng, cents: u64) -> String {
    let plain = format!("{}.{:02}", cents / 100, cents % 100);
    match rng.gen_range(0..10) {
        0..=5 => plain,
        6 | 7 => crate::fmt::money(cents as f64 / 100.0),
        _ => crate::fmt::money(cents as f64 / 100.0).replace('$', ""),
    }
}

fn amount_or_blank(rng: &mut StdRng, cents: u64) -> String {
    if cents == 0 {
        String::new()
    } else {
        fmt_amount(rng, cents)
    }
}
