//! Date decomposition and one-hot encoding.
//!
//! Fit mode encodes against the fixed column set (baseline levels dropped).
//! Apply mode emits every category explicitly and leaves alignment to the
//! canonical order, so the baseline disappears during reindexing.

use chrono::{Datelike, NaiveDate};

use crate::domain::{ItemType, OrderRecord, Status};

/// Numeric base columns in canonical order.
pub const BASE_COLUMNS: [&str; 14] = [
    "quantity",
    "customer",
    "country",
    "application",
    "thickness",
    "width",
    "product_ref",
    "item_year",
    "item_month",
    "item_dayofweek",
    "delivery_year",
    "delivery_month",
    "delivery_dayofweek",
    "delivery_lead_time",
];

/// Regression target column (kept beside the features during fit).
pub const TARGET_COLUMN: &str = "selling_price";

/// Derived calendar fields of one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateParts {
    pub year: i32,
    pub month: u32,
    /// 0 = Monday … 6 = Sunday.
    pub dayofweek: u32,
}

impl DateParts {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            dayofweek: date.weekday().num_days_from_monday(),
        }
    }
}

/// The 14 base values of a record, aligned to `BASE_COLUMNS`.
pub fn base_values(r: &OrderRecord) -> [f64; 14] {
    let item = DateParts::of(r.item_date);
    let delivery = DateParts::of(r.delivery_date);
    [
        r.quantity,
        r.customer as f64,
        r.country as f64,
        r.application as f64,
        r.thickness,
        r.width,
        r.product_ref as f64,
        item.year as f64,
        item.month as f64,
        item.dayofweek as f64,
        delivery.year as f64,
        delivery.month as f64,
        delivery.dayofweek as f64,
        r.delivery_lead_time() as f64,
    ]
}

/// Fit-mode column set: base columns, then one-hot columns minus each baseline.
pub fn fit_columns() -> Vec<String> {
    let mut cols: Vec<String> = BASE_COLUMNS.iter().map(|s| s.to_string()).collect();
    cols.extend(Status::ALL.iter().skip(1).map(|s| s.column()));
    cols.extend(ItemType::ALL.iter().skip(1).map(|t| t.column()));
    cols
}

/// Fit-mode row aligned to `fit_columns()`.
///
/// Rows whose status is a resolution (Won/Lost) have no stage and get all-zero
/// status indicators.
pub fn encode_drop_first(r: &OrderRecord) -> Vec<f64> {
    let mut row: Vec<f64> = base_values(r).to_vec();
    let stage = r.status.stage();
    row.extend(Status::ALL.iter().skip(1).map(|&s| indicator(stage == Some(s))));
    row.extend(ItemType::ALL.iter().skip(1).map(|&t| indicator(r.item_type == t)));
    row
}

/// Apply-mode encoding: every category gets an explicit named 0/1 column.
pub fn encode_all(r: &OrderRecord) -> Vec<(String, f64)> {
    let mut out: Vec<(String, f64)> = BASE_COLUMNS
        .iter()
        .zip(base_values(r))
        .map(|(name, v)| (name.to_string(), v))
        .collect();
    let stage = r.status.stage();
    out.extend(Status::ALL.iter().map(|&s| (s.column(), indicator(stage == Some(s)))));
    out.extend(ItemType::ALL.iter().map(|&t| (t.column(), indicator(r.item_type == t))));
    out
}

/// One-hot indicator columns are never skew-corrected.
pub fn is_indicator(column: &str) -> bool {
    column.starts_with("status_") || column.starts_with("item_type_")
}

fn indicator(on: bool) -> f64 {
    if on { 1.0 } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Outcome, StatusLabel};
    use crate::test_support::order as record;
    use crate::transform::frame::reindex;

    #[test]
    fn date_decomposition() {
        let v = base_values(&record());
        // 2024-01-15 is a Monday, 2024-01-25 a Thursday.
        assert_eq!(&v[7..14], &[2024.0, 1.0, 0.0, 2024.0, 1.0, 3.0, 10.0]);
    }

    #[test]
    fn fit_columns_drop_baselines() {
        let cols = fit_columns();
        assert_eq!(cols.len(), 14 + 5 + 4);
        assert!(!cols.contains(&"status_Not lost for AM".to_string()));
        assert!(!cols.contains(&"item_type_Others".to_string()));
        assert!(cols.contains(&"status_To be approved".to_string()));
    }

    #[test]
    fn apply_encoding_matches_fit_encoding_after_reindex() {
        let r = record();
        let fit_row = encode_drop_first(&r);
        let applied = reindex(&encode_all(&r), &fit_columns()).unwrap();
        assert_eq!(fit_row, applied);
    }

    #[test]
    fn resolved_rows_have_no_stage_indicator() {
        let mut r = record();
        r.status = StatusLabel::Resolved(Outcome::Won);
        let row = encode_drop_first(&r);
        assert!(row[14..19].iter().all(|&v| v == 0.0));
    }
}
