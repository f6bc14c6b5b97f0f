//! Shared domain types.
//!
//! Records move through three shapes:
//!
//! - `DatasetRow`: one parsed training row, any field may be missing
//! - `OrderRecord`: a complete, validated order (after imputation or boundary checks)
//! - `RawOrderRecord`: what an inference caller hands in (JSON/CLI/TUI form)

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::catalog::{ItemType, Outcome, Status, StatusLabel};
use crate::error::TransformError;
use crate::models::GbdtConfig;

/// One row of the historical dataset after parsing, before imputation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetRow {
    pub id: String,
    pub quantity: Option<f64>,
    pub customer: Option<i64>,
    pub country: Option<i64>,
    pub status: Option<StatusLabel>,
    pub item_type: Option<ItemType>,
    pub application: Option<i64>,
    pub thickness: Option<f64>,
    pub width: Option<f64>,
    pub product_ref: Option<i64>,
    pub item_date: Option<NaiveDate>,
    pub delivery_date: Option<NaiveDate>,
    pub selling_price: Option<f64>,
}

impl From<&OrderRecord> for DatasetRow {
    fn from(r: &OrderRecord) -> Self {
        Self {
            id: r.id.clone(),
            quantity: Some(r.quantity),
            customer: Some(r.customer),
            country: Some(r.country),
            status: Some(r.status),
            item_type: Some(r.item_type),
            application: Some(r.application),
            thickness: Some(r.thickness),
            width: Some(r.width),
            product_ref: Some(r.product_ref),
            item_date: Some(r.item_date),
            delivery_date: Some(r.delivery_date),
            selling_price: r.selling_price,
        }
    }
}

/// A complete order with every categorical field validated.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRecord {
    pub id: String,
    /// Tons.
    pub quantity: f64,
    pub customer: i64,
    pub country: i64,
    pub status: StatusLabel,
    pub item_type: ItemType,
    pub application: i64,
    /// Millimetres.
    pub thickness: f64,
    /// Millimetres.
    pub width: f64,
    pub product_ref: i64,
    pub item_date: NaiveDate,
    pub delivery_date: NaiveDate,
    /// Present for training rows only.
    pub selling_price: Option<f64>,
}

impl OrderRecord {
    pub fn outcome(&self) -> Option<Outcome> {
        self.status.outcome()
    }

    /// Days from item date to delivery date; negative when delivery precedes the item date.
    pub fn delivery_lead_time(&self) -> i64 {
        (self.delivery_date - self.item_date).num_days()
    }
}

/// An order as supplied by an inference caller.
///
/// Categorical fields stay as text until `validate` so the boundary can name
/// the offending value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawOrderRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub quantity: Option<f64>,
    pub customer: Option<i64>,
    pub country: Option<i64>,
    pub status: Option<String>,
    pub item_type: Option<String>,
    pub application: Option<i64>,
    pub thickness: Option<f64>,
    pub width: Option<f64>,
    pub product_ref: Option<i64>,
    pub item_date: Option<NaiveDate>,
    pub delivery_date: Option<NaiveDate>,
    /// Ignored at inference.
    #[serde(default)]
    pub selling_price: Option<f64>,
}

impl RawOrderRecord {
    /// Check completeness, catalog membership and that measures are `>= 0`.
    /// No defaults are substituted.
    pub fn validate(&self) -> Result<OrderRecord, TransformError> {
        fn req<T: Copy>(v: Option<T>, field: &'static str) -> Result<T, TransformError> {
            v.ok_or(TransformError::IncompleteRecord { field })
        }

        let status_text = self
            .status
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or(TransformError::IncompleteRecord { field: "status" })?;
        let item_type_text = self
            .item_type
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or(TransformError::IncompleteRecord { field: "item_type" })?;

        let quantity = req(self.quantity, "quantity")?;
        let customer = req(self.customer, "customer")?;
        let country = req(self.country, "country")?;
        let status = Status::parse(status_text)?;
        let item_type = ItemType::parse(item_type_text)?;
        let application = req(self.application, "application")?;
        let thickness = req(self.thickness, "thickness")?;
        let width = req(self.width, "width")?;
        let product_ref = req(self.product_ref, "product_ref")?;
        let item_date = req(self.item_date, "item_date")?;
        let delivery_date = req(self.delivery_date, "delivery_date")?;

        for (field, v) in [("quantity", quantity), ("thickness", thickness), ("width", width)] {
            if !(v.is_finite() && v >= 0.0) {
                return Err(TransformError::InvalidValue { field, value: v });
            }
        }

        Ok(OrderRecord {
            id: self.id.clone().unwrap_or_default(),
            quantity,
            customer,
            country,
            status: StatusLabel::Stage(status),
            item_type,
            application,
            thickness,
            width,
            product_ref,
            item_date,
            delivery_date,
            selling_price: None,
        })
    }
}

impl From<&OrderRecord> for RawOrderRecord {
    fn from(r: &OrderRecord) -> Self {
        Self {
            id: Some(r.id.clone()),
            quantity: Some(r.quantity),
            customer: Some(r.customer),
            country: Some(r.country),
            status: Some(r.status.label().to_string()),
            item_type: Some(r.item_type.label().to_string()),
            application: Some(r.application),
            thickness: Some(r.thickness),
            width: Some(r.width),
            product_ref: Some(r.product_ref),
            item_date: Some(r.item_date),
            delivery_date: Some(r.delivery_date),
            selling_price: r.selling_price,
        }
    }
}

/// Columns subject to IQR outlier filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum OutlierColumn {
    SellingPrice,
    Quantity,
    Thickness,
}

impl OutlierColumn {
    pub fn name(self) -> &'static str {
        match self {
            OutlierColumn::SellingPrice => "selling_price",
            OutlierColumn::Quantity => "quantity",
            OutlierColumn::Thickness => "thickness",
        }
    }

    pub fn value(self, r: &OrderRecord) -> f64 {
        match self {
            OutlierColumn::SellingPrice => r.selling_price.unwrap_or(f64::NAN),
            OutlierColumn::Quantity => r.quantity,
            OutlierColumn::Thickness => r.thickness,
        }
    }
}

/// Filtering order used by training. Later columns see the already-thinned data.
pub const DEFAULT_OUTLIER_ORDER: [OutlierColumn; 3] = [
    OutlierColumn::SellingPrice,
    OutlierColumn::Quantity,
    OutlierColumn::Thickness,
];

/// A full training run's configuration, derived from CLI flags.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub data_path: PathBuf,
    pub out_dir: PathBuf,
    pub outlier_order: Vec<OutlierColumn>,
    pub boost: GbdtConfig,
    /// Share of rows held out for evaluation; `0` disables evaluation.
    pub holdout: f64,
    pub seed: u64,
}

/// Settings for the synthetic dataset generator.
#[derive(Debug, Clone)]
pub struct SampleConfig {
    pub rows: usize,
    pub seed: u64,
    /// Probability that any one imputable field is blank.
    pub missing_rate: f64,
    /// Probability that a row's status is a resolution (Won/Lost).
    pub resolved_rate: f64,
    /// Probability that a row carries an extreme price/quantity/thickness.
    pub outlier_rate: f64,
    pub start_date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> RawOrderRecord {
        RawOrderRecord {
            id: None,
            quantity: Some(1.0),
            customer: Some(10000),
            country: Some(25),
            status: Some("Offerable".to_string()),
            item_type: Some("W".to_string()),
            application: Some(3),
            thickness: Some(2.5),
            width: Some(1000.0),
            product_ref: Some(150000),
            item_date: NaiveDate::from_ymd_opt(2024, 1, 15),
            delivery_date: NaiveDate::from_ymd_opt(2024, 1, 25),
            selling_price: None,
        }
    }

    #[test]
    fn validate_complete_record() {
        let rec = raw().validate().unwrap();
        assert_eq!(rec.status, StatusLabel::Stage(Status::Offerable));
        assert_eq!(rec.item_type, ItemType::W);
        assert_eq!(rec.delivery_lead_time(), 10);
    }

    #[test]
    fn missing_delivery_date_is_incomplete() {
        let mut r = raw();
        r.delivery_date = None;
        assert_eq!(
            r.validate().unwrap_err(),
            TransformError::IncompleteRecord { field: "delivery_date" }
        );
    }

    #[test]
    fn resolved_status_rejected_at_inference() {
        let mut r = raw();
        r.status = Some("Won".to_string());
        assert!(matches!(
            r.validate().unwrap_err(),
            TransformError::UnknownCategory { field: "status", .. }
        ));
    }

    #[test]
    fn negative_measures_are_rejected() {
        let mut r = raw();
        r.thickness = Some(-0.5);
        assert_eq!(
            r.validate().unwrap_err(),
            TransformError::InvalidValue {
                field: "thickness",
                value: -0.5
            }
        );

        let mut r = raw();
        r.quantity = Some(f64::NAN);
        assert!(matches!(
            r.validate().unwrap_err(),
            TransformError::InvalidValue { field: "quantity", .. }
        ));

        let mut r = raw();
        r.width = Some(0.0);
        assert!(r.validate().is_ok());
    }

    #[test]
    fn negative_lead_time_is_preserved() {
        let mut r = raw();
        r.delivery_date = NaiveDate::from_ymd_opt(2024, 1, 10);
        assert_eq!(r.validate().unwrap().delivery_lead_time(), -5);
    }
}
