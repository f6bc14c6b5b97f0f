//! CSV and workbook ingest for the historical dataset, CSV for order batches.
//!
//! The training dataset is parsed leniently: values that fail to parse become
//! missing (and are imputed later), while rows without an `id` or with a
//! categorical value outside the catalog are skipped and reported as row
//! errors. Nothing here imputes, filters outliers or encodes.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use chrono::NaiveDate;
use csv::StringRecord;
use tracing::{info, warn};

use crate::domain::{DatasetRow, ItemType, RawOrderRecord, StatusLabel};
use crate::error::AppError;

/// Columns the training dataset must carry (`material_ref` is accepted and ignored).
pub const REQUIRED_COLUMNS: [&str; 13] = [
    "id",
    "customer",
    "country",
    "status",
    "item type",
    "application",
    "thickness",
    "width",
    "product_ref",
    "quantity tons",
    "item_date",
    "delivery date",
    "selling_price",
];

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub id: Option<String>,
    pub message: String,
}

/// Parsed dataset rows plus what was skipped.
#[derive(Debug, Clone)]
pub struct IngestedData {
    pub rows: Vec<DatasetRow>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

/// Sheet read from `.xlsx`/`.xls` exports; the first sheet is used when absent.
pub const WORKBOOK_SHEET: &str = "Result 1";

/// Load the training dataset from a CSV file or a spreadsheet workbook,
/// chosen by file extension.
pub fn load_dataset(path: &Path) -> Result<IngestedData, AppError> {
    let data = if is_workbook(path) {
        read_workbook(path)?
    } else {
        let file = File::open(path)
            .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
        read_dataset(file)?
    };
    info!(
        path = %path.display(),
        rows_read = data.rows_read,
        rows_used = data.rows.len(),
        row_errors = data.row_errors.len(),
        "dataset loaded"
    );
    Ok(data)
}

pub fn read_dataset<R: Read>(input: R) -> Result<IngestedData, AppError> {
    let mut reader = csv_reader(input);
    let header_map = read_header_map(&mut reader)?;
    let records = reader
        .into_records()
        .map(|result| result.map_err(|e| format!("CSV parse error: {e}")));
    parse_dataset(&header_map, records)
}

/// Read the dataset sheet of a workbook. Cells are rendered to text and go
/// through the same row parser as CSV input.
pub fn read_workbook(path: &Path) -> Result<IngestedData, AppError> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| AppError::new(2, format!("Failed to open workbook '{}': {e}", path.display())))?;
    let names = workbook.sheet_names();
    let sheet = names
        .iter()
        .find(|n| n.as_str() == WORKBOOK_SHEET)
        .or_else(|| names.first())
        .cloned()
        .ok_or_else(|| AppError::new(2, format!("Workbook '{}' has no sheets.", path.display())))?;
    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| AppError::new(2, format!("Failed to read sheet '{sheet}': {e}")))?;

    let mut rows = range.rows();
    let header = rows
        .next()
        .map(cells_to_record)
        .ok_or_else(|| AppError::new(2, format!("Sheet '{sheet}' is empty.")))?;
    let header_map = build_header_map(&header);
    parse_dataset(&header_map, rows.map(|cells| Ok(cells_to_record(cells))))
}

fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("xlsx") || e.eq_ignore_ascii_case("xls"))
}

fn cells_to_record(cells: &[Data]) -> StringRecord {
    StringRecord::from(cells.iter().map(cell_text).collect::<Vec<_>>())
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
        Data::Float(v) => v.to_string(),
        Data::Int(v) => v.to_string(),
        Data::Bool(v) => v.to_string(),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| d.date().format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
    }
}

fn parse_dataset<I>(header_map: &HashMap<String, usize>, records: I) -> Result<IngestedData, AppError>
where
    I: Iterator<Item = Result<StringRecord, String>>,
{
    ensure_required_columns_exist(header_map)?;

    let mut rows = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in records.enumerate() {
        // Header is line 1.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(message) => {
                row_errors.push(RowError { line, id: None, message });
                continue;
            }
        };

        match parse_row(&record, header_map) {
            Ok(row) => rows.push(row),
            Err(message) => row_errors.push(RowError {
                line,
                id: get_optional(&record, header_map, "id").map(str::to_string),
                message,
            }),
        }
    }

    if !row_errors.is_empty() {
        warn!(count = row_errors.len(), "skipped dataset rows");
    }
    if rows.is_empty() {
        return Err(AppError::new(3, "No valid rows in the dataset."));
    }

    Ok(IngestedData {
        rows,
        row_errors,
        rows_read,
    })
}

/// Load orders for batch prediction. Absent or unparsable fields stay `None`
/// so that validation reports them per record.
pub fn load_orders(path: &Path) -> Result<(Vec<RawOrderRecord>, Vec<RowError>), AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_orders(file)
}

pub fn read_orders<R: Read>(input: R) -> Result<(Vec<RawOrderRecord>, Vec<RowError>), AppError> {
    let mut reader = csv_reader(input);
    let header_map = read_header_map(&mut reader)?;

    let mut orders = Vec::new();
    let mut row_errors = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    id: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };
        let get = |names: &[&str]| names.iter().find_map(|n| get_optional(&record, &header_map, n));
        orders.push(RawOrderRecord {
            id: get(&["id"]).map(str::to_string),
            quantity: parse_opt_f64(get(&["quantity tons", "quantity"])),
            customer: parse_opt_i64(get(&["customer"])),
            country: parse_opt_i64(get(&["country"])),
            status: get(&["status"]).map(str::to_string),
            item_type: get(&["item type", "item_type"]).map(str::to_string),
            application: parse_opt_i64(get(&["application"])),
            thickness: parse_opt_f64(get(&["thickness"])),
            width: parse_opt_f64(get(&["width"])),
            product_ref: parse_opt_i64(get(&["product_ref"])),
            item_date: get(&["item_date"]).and_then(|s| parse_date(s).ok()),
            delivery_date: get(&["delivery date", "delivery_date"]).and_then(|s| parse_date(s).ok()),
            selling_price: None,
        });
    }
    Ok((orders, row_errors))
}

fn csv_reader<R: Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input)
}

fn read_header_map<R: Read>(reader: &mut csv::Reader<R>) -> Result<HashMap<String, usize>, AppError> {
    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?;
    Ok(build_header_map(headers))
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports may prefix the first header with a BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn ensure_required_columns_exist(header_map: &HashMap<String, usize>) -> Result<(), AppError> {
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|c| !header_map.contains_key(*c))
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    Err(AppError::new(
        2,
        format!("Missing required column(s): {}", missing.iter().map(|c| format!("`{c}`")).collect::<Vec<_>>().join(", ")),
    ))
}

fn parse_row(record: &StringRecord, header_map: &HashMap<String, usize>) -> Result<DatasetRow, String> {
    let id = get_required(record, header_map, "id")?.to_string();

    let status = get_optional(record, header_map, "status")
        .map(StatusLabel::parse)
        .transpose()
        .map_err(|e| e.to_string())?;
    let item_type = get_optional(record, header_map, "item type")
        .map(ItemType::parse)
        .transpose()
        .map_err(|e| e.to_string())?;

    Ok(DatasetRow {
        id,
        quantity: parse_opt_f64(get_optional(record, header_map, "quantity tons")),
        customer: parse_opt_i64(get_optional(record, header_map, "customer")),
        country: parse_opt_i64(get_optional(record, header_map, "country")),
        status,
        item_type,
        application: parse_opt_i64(get_optional(record, header_map, "application")),
        thickness: parse_opt_f64(get_optional(record, header_map, "thickness")),
        width: parse_opt_f64(get_optional(record, header_map, "width")),
        product_ref: parse_opt_i64(get_optional(record, header_map, "product_ref")),
        item_date: get_optional(record, header_map, "item_date").and_then(|s| parse_date(s).ok()),
        delivery_date: get_optional(record, header_map, "delivery date").and_then(|s| parse_date(s).ok()),
        selling_price: parse_opt_f64(get_optional(record, header_map, "selling_price")),
    })
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    get_optional(record, header_map, name).ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

/// Parse a dataset date.
///
/// The historical export stores dates as `YYYYMMDD` numbers (often with a
/// trailing `.0`); ISO and `DD/MM/YYYY` are accepted as well.
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    let s = s.trim();
    let compact = s.strip_suffix(".0").unwrap_or(s);
    if compact.len() == 8 && compact.bytes().all(|b| b.is_ascii_digit()) {
        return NaiveDate::parse_from_str(compact, "%Y%m%d").map_err(|e| format!("Invalid date '{s}': {e}"));
    }
    const FMTS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    Err(format!(
        "Invalid date '{s}'. Expected one of: YYYYMMDD, YYYY-MM-DD, DD/MM/YYYY, DD-MM-YYYY, YYYY/MM/DD."
    ))
}

fn parse_opt_f64(s: Option<&str>) -> Option<f64> {
    let v = s?.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

/// Integer codes are often exported as floats (`30156308.0`).
fn parse_opt_i64(s: Option<&str>) -> Option<i64> {
    let s = s?;
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    let v = parse_opt_f64(Some(s))?;
    if v.fract() == 0.0 && v.abs() < 9.0e15 {
        Some(v as i64)
    } else {
        None
    }
}
