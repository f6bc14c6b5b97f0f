//! Debug dump for inspecting how one order flows through the transform.

use std::fmt::Write as _;
use std::fs::{create_dir_all, write};
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::app::service::Prediction;
use crate::domain::RawOrderRecord;
use crate::error::AppError;
use crate::io::bundle::ModelBundle;
use crate::transform::AppliedRow;

/// Write a markdown dump of `raw`, its transform intermediates and the
/// prediction into `dir`. Returns the file path.
pub fn write_debug_dump(
    dir: &Path,
    bundle: &ModelBundle,
    raw: &RawOrderRecord,
    applied: &AppliedRow,
    prediction: &Prediction,
) -> Result<PathBuf, AppError> {
    create_dir_all(dir).map_err(|e| AppError::new(4, format!("Failed to create debug dir: {e}")))?;

    let ts = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("copper_debug_{ts}.md"));
    write(&path, render(bundle, raw, applied, prediction))
        .map_err(|e| AppError::new(4, format!("Failed to write debug file '{}': {e}", path.display())))?;
    Ok(path)
}

fn render(bundle: &ModelBundle, raw: &RawOrderRecord, applied: &AppliedRow, prediction: &Prediction) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(out, "# copper debug dump");
    let _ = writeln!(out, "- generated: {}", Local::now().to_rfc3339());
    let _ = writeln!(out, "- bundle created: {}", bundle.created_at.to_rfc3339());
    let _ = writeln!(out, "- columns: {}", applied.columns.len());

    let _ = writeln!(out, "\n## Order");
    let _ = writeln!(out, "| field | value |");
    let _ = writeln!(out, "| - | - |");
    let fields = [
        ("quantity", fmt_opt(raw.quantity)),
        ("customer", fmt_opt(raw.customer)),
        ("country", fmt_opt(raw.country)),
        ("status", fmt_opt(raw.status.as_deref())),
        ("item_type", fmt_opt(raw.item_type.as_deref())),
        ("application", fmt_opt(raw.application)),
        ("thickness", fmt_opt(raw.thickness)),
        ("width", fmt_opt(raw.width)),
        ("product_ref", fmt_opt(raw.product_ref)),
        ("item_date", fmt_opt(raw.item_date)),
        ("delivery_date", fmt_opt(raw.delivery_date)),
    ];
    for (name, value) in fields {
        let _ = writeln!(out, "| {name} | {value} |");
    }

    let _ = writeln!(out, "\n## Prediction");
    let _ = writeln!(out, "- price: {:.4}", prediction.price);
    let _ = writeln!(out, "- outcome: {}", prediction.outcome.display_name());
    let _ = writeln!(out, "- win probability: {:.4}", prediction.win_probability);

    let _ = writeln!(out, "\n## Feature vector");
    let _ = writeln!(out, "| column | encoded | skew-corrected | scaled | mean | std |");
    let _ = writeln!(out, "| - | - | - | - | - | - |");
    let scaler = &bundle.transform.scaler;
    for (j, column) in applied.columns.iter().enumerate() {
        let _ = writeln!(
            out,
            "| {column} | {:.6} | {:.6} | {:.6} | {:.6} | {:.6} |",
            applied.encoded[j], applied.corrected[j], applied.scaled[j], scaler.means[j], scaler.stds[j]
        );
    }

    let _ = writeln!(out, "\n## Skew correction");
    let _ = writeln!(out, "| column | skewness | corrected | shift |");
    let _ = writeln!(out, "| - | - | - | - |");
    for e in bundle.transform.skew.entries.iter().chain([&bundle.transform.target_skew]) {
        let _ = writeln!(out, "| {} | {:.4} | {} | {:.4} |", e.column, e.skewness, e.corrected, e.shift);
    }
    out
}

fn fmt_opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}
