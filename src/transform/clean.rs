//! Fit-mode cleaning: imputation, IQR outlier removal, non-negativity.
//!
//! Each stage takes ownership of a record sequence and returns a new one;
//! nothing here mutates shared state. Imputation statistics are computed over
//! the fit dataset and discarded afterwards: inference never imputes.

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::domain::{DatasetRow, ItemType, OrderRecord, OutlierColumn, StatusLabel};
use crate::error::AppError;
use crate::math::{median, mode, quantile};

/// Fill values used for missing fields (one fit dataset's worth).
#[derive(Debug, Clone, PartialEq)]
pub struct Imputation {
    pub customer: i64,
    pub country: i64,
    pub status: StatusLabel,
    pub item_type: ItemType,
    pub application: i64,
    pub product_ref: i64,
    pub quantity: f64,
    pub thickness: f64,
    pub width: f64,
    pub selling_price: f64,
    pub item_date: NaiveDate,
    pub delivery_date: NaiveDate,
    /// Number of individual values that were filled.
    pub filled: usize,
}

/// Outcome of one IQR filtering step.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlierStep {
    pub column: OutlierColumn,
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
    pub dropped: usize,
}

/// Everything the cleaning stages produced.
#[derive(Debug, Clone)]
pub struct CleanOutput {
    pub records: Vec<OrderRecord>,
    pub imputation: Imputation,
    pub outlier_steps: Vec<OutlierStep>,
    pub dropped_negative: usize,
}

/// Run imputation, outlier removal (in `order`), then drop negative measures.
pub fn clean(rows: Vec<DatasetRow>, order: &[OutlierColumn]) -> Result<CleanOutput, AppError> {
    let (records, imputation) = impute(rows)?;
    info!(rows = records.len(), filled = imputation.filled, "imputed missing values");

    let (records, outlier_steps) = remove_outliers(records, order);
    for step in &outlier_steps {
        info!(
            column = step.column.name(),
            lower = step.lower,
            upper = step.upper,
            dropped = step.dropped,
            "IQR filter"
        );
    }

    let (records, dropped_negative) = drop_negative(records);
    if dropped_negative > 0 {
        debug!(dropped = dropped_negative, "dropped rows with negative quantity/thickness/width");
    }

    if records.is_empty() {
        return Err(AppError::new(3, "No rows remain after outlier removal."));
    }

    Ok(CleanOutput {
        records,
        imputation,
        outlier_steps,
        dropped_negative,
    })
}

/// Fill missing values: mode for categorical/integer/date fields, median for continuous ones.
pub fn impute(rows: Vec<DatasetRow>) -> Result<(Vec<OrderRecord>, Imputation), AppError> {
    if rows.is_empty() {
        return Err(AppError::new(3, "Dataset has no rows to clean."));
    }

    let missing = |field: &str| AppError::new(3, format!("Column `{field}` has no values to impute from."));

    let floats = |f: fn(&DatasetRow) -> Option<f64>| -> Vec<f64> { rows.iter().filter_map(f).collect() };

    let fill = Imputation {
        customer: mode(rows.iter().filter_map(|r| r.customer)).ok_or_else(|| missing("customer"))?,
        country: mode(rows.iter().filter_map(|r| r.country)).ok_or_else(|| missing("country"))?,
        status: mode(rows.iter().filter_map(|r| r.status)).ok_or_else(|| missing("status"))?,
        item_type: mode(rows.iter().filter_map(|r| r.item_type)).ok_or_else(|| missing("item type"))?,
        application: mode(rows.iter().filter_map(|r| r.application)).ok_or_else(|| missing("application"))?,
        product_ref: mode(rows.iter().filter_map(|r| r.product_ref)).ok_or_else(|| missing("product_ref"))?,
        quantity: median(&floats(|r| r.quantity)).ok_or_else(|| missing("quantity tons"))?,
        thickness: median(&floats(|r| r.thickness)).ok_or_else(|| missing("thickness"))?,
        width: median(&floats(|r| r.width)).ok_or_else(|| missing("width"))?,
        selling_price: median(&floats(|r| r.selling_price)).ok_or_else(|| missing("selling_price"))?,
        item_date: mode(rows.iter().filter_map(|r| r.item_date)).ok_or_else(|| missing("item_date"))?,
        delivery_date: mode(rows.iter().filter_map(|r| r.delivery_date))
            .ok_or_else(|| missing("delivery date"))?,
        filled: 0,
    };

    let mut filled = 0usize;
    let mut records = Vec::with_capacity(rows.len());
    for r in rows {
        let n = &mut filled;
        records.push(OrderRecord {
            quantity: or_fill(r.quantity, fill.quantity, n),
            customer: or_fill(r.customer, fill.customer, n),
            country: or_fill(r.country, fill.country, n),
            status: or_fill(r.status, fill.status, n),
            item_type: or_fill(r.item_type, fill.item_type, n),
            application: or_fill(r.application, fill.application, n),
            thickness: or_fill(r.thickness, fill.thickness, n),
            width: or_fill(r.width, fill.width, n),
            product_ref: or_fill(r.product_ref, fill.product_ref, n),
            item_date: or_fill(r.item_date, fill.item_date, n),
            delivery_date: or_fill(r.delivery_date, fill.delivery_date, n),
            selling_price: Some(or_fill(r.selling_price, fill.selling_price, n)),
            id: r.id,
        });
    }

    Ok((records, Imputation { filled, ..fill }))
}

fn or_fill<T>(value: Option<T>, fill: T, filled: &mut usize) -> T {
    match value {
        Some(v) => v,
        None => {
            *filled += 1;
            fill
        }
    }
}

/// Sequential IQR filtering. Each column's fences are computed on the rows
/// that survived the previous columns, so `order` changes the result.
pub fn remove_outliers(
    mut records: Vec<OrderRecord>,
    order: &[OutlierColumn],
) -> (Vec<OrderRecord>, Vec<OutlierStep>) {
    let mut steps = Vec::with_capacity(order.len());
    for &column in order {
        let values: Vec<f64> = records.iter().map(|r| column.value(r)).collect();
        let (Some(q1), Some(q3)) = (quantile(&values, 0.25), quantile(&values, 0.75)) else {
            continue;
        };
        let iqr = q3 - q1;
        let lower = q1 - 1.5 * iqr;
        let upper = q3 + 1.5 * iqr;

        let before = records.len();
        records.retain(|r| {
            let v = column.value(r);
            v >= lower && v <= upper
        });
        steps.push(OutlierStep {
            column,
            q1,
            q3,
            lower,
            upper,
            dropped: before - records.len(),
        });
    }
    (records, steps)
}

/// Enforce quantity, thickness and width `>= 0`.
pub fn drop_negative(mut records: Vec<OrderRecord>) -> (Vec<OrderRecord>, usize) {
    let before = records.len();
    records.retain(|r| r.quantity >= 0.0 && r.thickness >= 0.0 && r.width >= 0.0);
    let dropped = before - records.len();
    (records, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DEFAULT_OUTLIER_ORDER, Outcome, Status};
    use crate::test_support::{dataset_row, order};

    fn with(price: f64, quantity: f64, thickness: f64) -> OrderRecord {
        OrderRecord {
            selling_price: Some(price),
            quantity,
            thickness,
            ..order()
        }
    }

    /// Price-first filtering keeps 6 of these rows, thickness-first keeps 8.
    fn order_sensitive() -> Vec<OrderRecord> {
        vec![
            with(10.0, 1.0, 1.0),
            with(10.0, 1.0, 1.0),
            with(10.0, 1.0, 1.0),
            with(10.0, 1.0, 1.0),
            with(10.0, 1.0, 1.0),
            with(10.0, 1.0, 1.0),
            with(10.0, 1.0, 2.0),
            with(10.0, 1.0, 2.0),
            with(100.0, 1.0, 2.0),
        ]
    }

    #[test]
    fn outlier_removal_documented_order() {
        let (kept, steps) = remove_outliers(order_sensitive(), &DEFAULT_OUTLIER_ORDER);
        // Price fence is [10, 10]: the 100 row goes. Thickness quartiles on the
        // remaining 8 rows are [1, 1.25], fence [0.625, 1.625]: both 2.0 rows go.
        assert_eq!(steps[0].dropped, 1);
        assert_eq!(steps[2].dropped, 2);
        assert_eq!(kept.len(), 6);
    }

    #[test]
    fn outlier_removal_is_order_sensitive() {
        let (a, _) = remove_outliers(order_sensitive(), &DEFAULT_OUTLIER_ORDER);
        let reordered = [OutlierColumn::Thickness, OutlierColumn::Quantity, OutlierColumn::SellingPrice];
        let (b, steps) = remove_outliers(order_sensitive(), &reordered);
        // Thickness first: quartiles over all 9 rows are [1, 2], fence [-0.5, 3.5],
        // nothing dropped; then the price fence drops only the 100 row.
        assert_eq!(steps[0].dropped, 0);
        assert_eq!(b.len(), 8);
        assert_ne!(a.len(), b.len());
    }

    #[test]
    fn imputation_uses_mode_and_median() {
        let rows = vec![
            DatasetRow {
                customer: Some(7),
                thickness: Some(1.0),
                ..dataset_row("a")
            },
            DatasetRow {
                customer: Some(7),
                thickness: Some(3.0),
                ..dataset_row("b")
            },
            DatasetRow {
                customer: Some(9),
                thickness: Some(10.0),
                status: Some(StatusLabel::Resolved(Outcome::Won)),
                ..dataset_row("c")
            },
            DatasetRow {
                customer: None,
                thickness: None,
                status: None,
                item_type: None,
                ..dataset_row("d")
            },
        ];
        let (records, fill) = impute(rows).unwrap();
        assert_eq!(fill.customer, 7);
        assert_eq!(fill.thickness, 3.0);
        assert_eq!(fill.filled, 4);
        let d = &records[3];
        assert_eq!(d.customer, 7);
        assert_eq!(d.thickness, 3.0);
        assert_eq!(d.status, StatusLabel::Stage(Status::Offered));
        assert_eq!(d.item_type, ItemType::W);
    }

    #[test]
    fn column_with_no_values_is_fatal() {
        let rows = vec![DatasetRow {
            selling_price: None,
            ..dataset_row("a")
        }];
        let err = impute(rows).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn negative_measures_are_dropped() {
        let (kept, dropped) = drop_negative(vec![with(1.0, -1.0, 1.0), with(1.0, 1.0, 1.0)]);
        assert_eq!(dropped, 1);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn everything_filtered_is_fatal() {
        let rows = vec![DatasetRow {
            quantity: Some(-1.0),
            ..dataset_row("a")
        }];
        assert_eq!(clean(rows, &DEFAULT_OUTLIER_ORDER).unwrap_err().exit_code(), 3);
    }
}
