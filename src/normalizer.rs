use crate::cells::parse_amount;
use crate::hierarchy::ClassifiedRow;
use crate::models::{CanonicalTransaction, SourceMeta};

/// Coerce surviving rows into the canonical schema.
///
/// Amounts that do not parse become zero without complaint. `row_id` is
/// assigned densely in source order, so identical input always yields
/// identical ids.
pub fn normalize(rows: Vec<ClassifiedRow>, meta: &SourceMeta) -> Vec<CanonicalTransaction> {
    rows.into_iter()
        .enumerate()
        .map(|(row_id, row)| {
            let debit = parse_amount(&row.debit);
            let credit = parse_amount(&row.credit);
            CanonicalTransaction {
                entity: meta.entity.clone(),
                source_system: meta.source_system.clone(),
                gl_source_file: meta.gl_source_file.clone(),
                row_id,
                date: row.date,
                account_name_raw: row.account_raw,
                account_name_flat: row.account_flat,
                description: row.description,
                debit,
                credit,
                amount_net: debit - credit,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Cell;
    use chrono::NaiveDate;

    fn row(source_row: usize, debit: Cell, credit: Cell) -> ClassifiedRow {
        ClassifiedRow {
            source_row,
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            account_raw: "Cash".into(),
            account_flat: "Assets : Cash".into(),
            description: String::new(),
            debit,
            credit,
        }
    }

    #[test]
    fn test_normalize_amounts_and_metadata() {
        let meta = SourceMeta::new("Acme", "QuickBooks", "gl.xlsx");
        let out = normalize(
            vec![
                row(4, Cell::Number(1000.0), Cell::Empty),
                row(7, Cell::Text("$1,250.50".into()), Cell::Text("(50.00)".into())),
                row(9, Cell::Text("N/A".into()), Cell::Number(300.0)),
            ],
            &meta,
        );
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].amount_net, 1000.0);
        assert_eq!(out[1].debit, 1250.5);
        assert_eq!(out[1].credit, -50.0);
        assert_eq!(out[1].amount_net, 1300.5);
        assert_eq!(out[2].debit, 0.0);
        assert_eq!(out[2].amount_net, -300.0);
        assert!(out.iter().all(|t| t.entity == "Acme" && t.gl_source_file == "gl.xlsx"));
    }

    #[test]
    fn test_row_ids_are_dense() {
        let meta = SourceMeta::new("Acme", "QuickBooks", "gl.csv");
        let out = normalize(
            vec![
                row(3, Cell::Number(1.0), Cell::Empty),
                row(10, Cell::Number(2.0), Cell::Empty),
                row(11, Cell::Number(3.0), Cell::Empty),
            ],
            &meta,
        );
        let ids: Vec<usize> = out.iter().map(|t| t.row_id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_empty_input_is_empty_table() {
        let meta = SourceMeta::new("Acme", "QuickBooks", "gl.csv");
        assert!(normalize(Vec::new(), &meta).is_empty());
    }
}
