//! Dataset CSV export.
//!
//! Written in the same schema `ingest` reads, so a cleaned export or a
//! synthetic dataset can be fed straight back into `copper train`.

use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;

use crate::domain::DatasetRow;
use crate::error::AppError;

pub const DATASET_HEADER: [&str; 14] = [
    "id",
    "item_date",
    "quantity tons",
    "customer",
    "country",
    "status",
    "item type",
    "application",
    "thickness",
    "width",
    "material_ref",
    "product_ref",
    "delivery date",
    "selling_price",
];

/// Serialise rows to CSV bytes. Missing values are written as empty fields.
pub fn dataset_csv_bytes(rows: &[DatasetRow]) -> Result<Vec<u8>, AppError> {
    let mut buf = Vec::new();
    write_dataset(&mut buf, rows)?;
    Ok(buf)
}

pub fn write_dataset<W: Write>(out: W, rows: &[DatasetRow]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(out);
    writer
        .write_record(DATASET_HEADER)
        .map_err(|e| AppError::new(2, format!("Failed to write dataset CSV header: {e}")))?;

    for r in rows {
        writer
            .write_record([
                r.id.clone(),
                opt(r.item_date.map(fmt_date)),
                opt(r.quantity),
                opt(r.customer),
                opt(r.country),
                opt(r.status.map(|s| s.label())),
                opt(r.item_type.map(|t| t.label())),
                opt(r.application),
                opt(r.thickness),
                opt(r.width),
                String::new(),
                opt(r.product_ref),
                opt(r.delivery_date.map(fmt_date)),
                opt(r.selling_price),
            ])
            .map_err(|e| AppError::new(2, format!("Failed to write dataset CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush dataset CSV: {e}")))?;
    Ok(())
}

/// Write rows to `path` (created or truncated).
pub fn write_dataset_csv(path: &Path, rows: &[DatasetRow]) -> Result<(), AppError> {
    let bytes = dataset_csv_bytes(rows)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", parent.display())))?;
    }
    std::fs::write(path, bytes)
        .map_err(|e| AppError::new(2, format!("Failed to write CSV '{}': {e}", path.display())))
}

fn fmt_date(d: NaiveDate) -> String {
    d.format("%Y%m%d").to_string()
}

fn opt<T: ToString>(v: Option<T>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::ingest::read_dataset;
    use crate::test_support::dataset_row;

    #[test]
    fn export_is_readable_by_ingest() {
        let rows = vec![
            dataset_row("a"),
            DatasetRow {
                thickness: None,
                item_date: None,
                ..dataset_row("b")
            },
        ];
        let bytes = dataset_csv_bytes(&rows).unwrap();
        let back = read_dataset(bytes.as_slice()).unwrap();
        assert!(back.row_errors.is_empty());
        assert_eq!(back.rows, rows);
    }
}
