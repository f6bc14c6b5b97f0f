//! Synthetic copper order dataset.
//!
//! Produces rows in the training schema with the quirks of the real export:
//! right-skewed quantities and thicknesses, blank fields, resolved Won/Lost
//! statuses next to open pipeline stages, and a sprinkling of extreme values.
//! Prices follow a smooth function of the order plus log-normal noise, and
//! the chance of a win falls as the quoted price rises above that function.

use chrono::Duration;
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::{LogNormal, Normal};

use crate::domain::{
    COUNTRY_CODES, DatasetRow, ItemType, Outcome, SampleConfig, Status, StatusLabel,
};
use crate::error::AppError;

const APPLICATIONS: [i64; 12] = [2, 3, 4, 5, 10, 15, 20, 22, 25, 41, 56, 59];

const PRODUCT_REFS: [i64; 12] = [
    611_728,
    611_993,
    628_377,
    640_665,
    164_141_591,
    164_336_407,
    929_423_819,
    1_282_007_633,
    1_332_077_137,
    1_665_572_374,
    1_670_798_778,
    1_693_867_550,
];

/// Relative frequency of each item type, aligned to `ItemType::ALL`.
const ITEM_TYPE_WEIGHTS: [f64; 5] = [0.04, 0.06, 0.35, 0.52, 0.03];

const CUSTOMER_POOL: i64 = 60;

pub fn generate_dataset(config: &SampleConfig) -> Result<Vec<DatasetRow>, AppError> {
    if config.rows == 0 {
        return Err(AppError::new(2, "Sample row count must be > 0."));
    }
    for (name, p) in [
        ("missing rate", config.missing_rate),
        ("resolved rate", config.resolved_rate),
        ("outlier rate", config.outlier_rate),
    ] {
        if !(0.0..=1.0).contains(&p) {
            return Err(AppError::new(2, format!("Sample {name} must be in [0, 1].")));
        }
    }

    let dist_err = |e: &dyn std::fmt::Display| AppError::new(4, format!("Sample distribution error: {e}"));
    let quantity_dist = LogNormal::<f64>::new(2.8, 1.1).map_err(|e| dist_err(&e))?;
    let thickness_dist = LogNormal::<f64>::new(0.6, 0.55).map_err(|e| dist_err(&e))?;
    let width_dist = Normal::<f64>::new(1250.0, 220.0).map_err(|e| dist_err(&e))?;
    let lead_dist = Normal::<f64>::new(70.0, 45.0).map_err(|e| dist_err(&e))?;
    let noise = Normal::<f64>::new(0.0, 0.06).map_err(|e| dist_err(&e))?;
    let item_type_dist = WeightedIndex::new(ITEM_TYPE_WEIGHTS).map_err(|e| dist_err(&e))?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut rows = Vec::with_capacity(config.rows);

    for i in 0..config.rows {
        let mut quantity: f64 = quantity_dist.sample(&mut rng);
        let mut thickness: f64 = thickness_dist.sample(&mut rng);
        let width: f64 = width_dist.sample(&mut rng).clamp(700.0, 1980.0).round();
        let item_type = ItemType::ALL[item_type_dist.sample(&mut rng)];
        let country = COUNTRY_CODES[rng.gen_range(0..COUNTRY_CODES.len())].1;
        let customer = 30_150_000 + rng.gen_range(0..CUSTOMER_POOL) * 37;
        let application = APPLICATIONS[rng.gen_range(0..APPLICATIONS.len())];
        let product_ref = PRODUCT_REFS[rng.gen_range(0..PRODUCT_REFS.len())];

        let item_date = config.start_date + Duration::days(rng.gen_range(0..365));
        let lead_days = lead_dist.sample(&mut rng).round() as i64;
        let delivery_date = item_date + Duration::days(lead_days);

        let fair = fair_price(thickness, width, item_type, country, application);
        let mut price = fair * noise.sample(&mut rng).exp();

        let status = if rng.gen_bool(config.resolved_rate) {
            // Cheaper quotes win more often.
            let premium = (price - fair) / fair;
            let p_win = 1.0 / (1.0 + (premium * 25.0 - 0.5).exp());
            StatusLabel::Resolved(if rng.gen_bool(p_win) { Outcome::Won } else { Outcome::Lost })
        } else {
            StatusLabel::Stage(Status::ALL[rng.gen_range(0..Status::ALL.len())])
        };

        if rng.gen_bool(config.outlier_rate) {
            match rng.gen_range(0..3) {
                0 => price *= 12.0,
                1 => quantity *= 80.0,
                _ => thickness *= 15.0,
            }
        }

        let blank = |rng: &mut StdRng| rng.gen_bool(config.missing_rate);
        let mut row = DatasetRow {
            id: format!("S{:07}", i + 1),
            ..DatasetRow::default()
        };
        row.quantity = keep(blank(&mut rng), round_to(quantity, 2));
        row.customer = keep(blank(&mut rng), customer);
        row.country = keep(blank(&mut rng), country);
        row.status = keep(blank(&mut rng), status);
        row.item_type = keep(blank(&mut rng), item_type);
        row.application = keep(blank(&mut rng), application);
        row.thickness = keep(blank(&mut rng), round_to(thickness, 2));
        row.width = keep(blank(&mut rng), width);
        row.product_ref = keep(blank(&mut rng), product_ref);
        row.item_date = keep(blank(&mut rng), item_date);
        row.delivery_date = keep(blank(&mut rng), delivery_date);
        row.selling_price = keep(blank(&mut rng), round_to(price, 2));
        rows.push(row);
    }

    Ok(rows)
}

/// Expected price per ton for an order.
fn fair_price(thickness: f64, width: f64, item_type: ItemType, country: i64, application: i64) -> f64 {
    let type_premium = match item_type {
        ItemType::Others => 40.0,
        ItemType::Pl => 90.0,
        ItemType::S => 60.0,
        ItemType::W => 0.0,
        ItemType::Wi => 120.0,
    };
    let country_premium = (country % 7) as f64 * 12.0;
    let application_premium = if application >= 40 { 35.0 } else { 0.0 };
    let gauge = -110.0 * thickness.max(0.1).ln();
    (780.0 + type_premium + country_premium + application_premium + gauge + width * 0.04).max(150.0)
}

fn keep<T>(blank: bool, value: T) -> Option<T> {
    if blank { None } else { Some(value) }
}

fn round_to(v: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (v * scale).round() / scale
}
