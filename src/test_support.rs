//! Fixtures shared by unit tests across modules.

use chrono::{Duration, NaiveDate};

use crate::domain::{
    COUNTRY_CODES, DatasetRow, ItemType, OrderRecord, Outcome, RawOrderRecord, Status, StatusLabel,
};

pub(crate) fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// The reference order: India, Offerable, W, 2024-01-15 (Mon) to 2024-01-25 (Thu).
pub(crate) fn order() -> OrderRecord {
    OrderRecord {
        id: "ref".to_string(),
        quantity: 1.0,
        customer: 10000,
        country: 25,
        status: StatusLabel::Stage(Status::Offerable),
        item_type: ItemType::W,
        application: 3,
        thickness: 2.5,
        width: 1000.0,
        product_ref: 150000,
        item_date: ymd(2024, 1, 15),
        delivery_date: ymd(2024, 1, 25),
        selling_price: None,
    }
}

pub(crate) fn raw_order() -> RawOrderRecord {
    RawOrderRecord {
        id: None,
        ..RawOrderRecord::from(&order())
    }
}

/// A complete training row.
pub(crate) fn dataset_row(id: &str) -> DatasetRow {
    DatasetRow {
        id: id.to_string(),
        quantity: Some(20.0),
        customer: Some(30_156_308),
        country: Some(28),
        status: Some(StatusLabel::Stage(Status::Offered)),
        item_type: Some(ItemType::W),
        application: Some(10),
        thickness: Some(2.0),
        width: Some(1500.0),
        product_ref: Some(1_670_798_778),
        item_date: Some(ymd(2021, 4, 1)),
        delivery_date: Some(ymd(2021, 7, 1)),
        selling_price: Some(800.0),
    }
}

/// Deterministic, varied training records.
///
/// Every 50th row carries a very large quantity so that column is skewed, and
/// every 4th row is resolved (alternating Won/Lost).
pub(crate) fn training_records(n: usize) -> Vec<OrderRecord> {
    let start = ymd(2021, 1, 1);
    (0..n)
        .map(|i| {
            let thickness = 0.5 + (i % 9) as f64 * 0.6;
            let item_type = ItemType::ALL[i % 5];
            let quantity = if i % 50 == 0 {
                400.0
            } else {
                1.0 + (i % 17) as f64 * 3.7
            };
            let status = if i % 4 == 0 {
                StatusLabel::Resolved(if i % 8 == 0 { Outcome::Won } else { Outcome::Lost })
            } else {
                StatusLabel::Stage(Status::ALL[i % 6])
            };
            let item_date = start + Duration::days((i % 300) as i64);
            let delivery_date = item_date + Duration::days((i % 40) as i64 - 5);
            let price = 500.0 + 30.0 * thickness + 25.0 * (i % 5) as f64 + (i % 13) as f64 * 4.0;
            OrderRecord {
                id: format!("T{i:04}"),
                quantity,
                customer: 30_000_000 + (i % 7) as i64,
                country: COUNTRY_CODES[i % COUNTRY_CODES.len()].1,
                status,
                item_type,
                application: [10, 15, 41][i % 3],
                thickness,
                width: 900.0 + (i % 11) as f64 * 50.0,
                product_ref: [611_993, 164_141_591, 1_670_798_778][i % 3],
                item_date,
                delivery_date,
                selling_price: Some(price),
            }
        })
        .collect()
}

/// A small bundle trained on `training_records(160)`, no files touched.
pub(crate) fn trained_bundle() -> crate::io::bundle::ModelBundle {
    use crate::app::pipeline::fit_bundle;
    use crate::domain::{DEFAULT_OUTLIER_ORDER, TrainConfig};
    use crate::io::ingest::IngestedData;
    use crate::models::GbdtConfig;
    use crate::transform::clean::clean;

    let rows: Vec<DatasetRow> = training_records(160).iter().map(DatasetRow::from).collect();
    let ingest = IngestedData {
        rows: rows.clone(),
        row_errors: Vec::new(),
        rows_read: rows.len(),
    };
    let cleaned = clean(rows, &DEFAULT_OUTLIER_ORDER).unwrap();
    let config = TrainConfig {
        data_path: "unused.csv".into(),
        out_dir: "unused".into(),
        outlier_order: DEFAULT_OUTLIER_ORDER.to_vec(),
        boost: GbdtConfig {
            n_trees: 15,
            max_depth: 3,
            ..GbdtConfig::default()
        },
        holdout: 0.0,
        seed: 1,
    };
    fit_bundle(&config, &ingest, &cleaned).unwrap()
}
