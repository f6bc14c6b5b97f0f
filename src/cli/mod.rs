//! Command-line parsing for the copper price/outcome models.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! pipeline and model code.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::domain::{DEFAULT_OUTLIER_ORDER, OutlierColumn, country_code, month_number};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "copper", version, about = "Industrial copper selling-price and Won/NotWin models")]
pub struct Cli {
    /// Log at debug level (RUST_LOG overrides).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Clean a training CSV, fit the transform and both models, and write a bundle.
    Train(TrainArgs),
    /// Predict price and outcome for one order (flags) or many (CSV).
    Predict(PredictArgs),
    /// Write a synthetic training CSV.
    Sample(SampleArgs),
    /// Download a training CSV over HTTP.
    Fetch(FetchArgs),
    /// Launch the interactive order form.
    Tui(TuiArgs),
}

#[derive(Debug, Args, Clone)]
pub struct BundleArg {
    /// Bundle directory written by `copper train`.
    #[arg(short = 'b', long = "bundle", env = "COPPER_BUNDLE_DIR", default_value = "artifacts")]
    pub dir: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct TrainArgs {
    /// Training CSV.
    #[arg(short = 'd', long, value_name = "CSV")]
    pub data: PathBuf,

    /// Output directory for bundle.json, expected_columns.txt and cleaned_data.csv.
    #[arg(short = 'o', long, env = "COPPER_BUNDLE_DIR", default_value = "artifacts")]
    pub out: PathBuf,

    /// Order in which the IQR outlier filter visits columns.
    #[arg(long, value_enum, value_delimiter = ',', default_values_t = DEFAULT_OUTLIER_ORDER.to_vec())]
    pub outlier_order: Vec<OutlierColumn>,

    /// Boosting rounds per model.
    #[arg(long, default_value_t = 100)]
    pub n_trees: usize,

    #[arg(long, default_value_t = 6)]
    pub max_depth: usize,

    #[arg(long, default_value_t = 0.3)]
    pub learning_rate: f64,

    /// L2 penalty on leaf weights.
    #[arg(long, default_value_t = 1.0)]
    pub lambda: f64,

    /// Minimum hessian sum per child.
    #[arg(long, default_value_t = 1.0)]
    pub min_child_weight: f64,

    /// Histogram bins per feature.
    #[arg(long, default_value_t = 256)]
    pub max_bins: usize,

    /// Fraction of rows held out for evaluation (0 disables it).
    #[arg(long, default_value_t = 0.2)]
    pub holdout: f64,

    /// Seed for the holdout split.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// One order given on the command line. Every field is required unless `--csv` is used.
#[derive(Debug, Args, Clone, Default)]
pub struct OrderArgs {
    #[arg(long)]
    pub id: Option<String>,

    /// Quantity in tons.
    #[arg(long)]
    pub quantity: Option<f64>,

    #[arg(long)]
    pub customer: Option<i64>,

    /// Country name (e.g. India) or numeric code.
    #[arg(long, value_parser = parse_country)]
    pub country: Option<i64>,

    /// Pipeline stage, e.g. "Offerable".
    #[arg(long)]
    pub status: Option<String>,

    /// Item type: Others, PL, S, W, WI.
    #[arg(long)]
    pub item_type: Option<String>,

    #[arg(long)]
    pub application: Option<i64>,

    #[arg(long)]
    pub thickness: Option<f64>,

    #[arg(long)]
    pub width: Option<f64>,

    #[arg(long)]
    pub product_ref: Option<i64>,

    /// YYYY-MM-DD, YYYYMMDD or "15 January 2024".
    #[arg(long, value_parser = parse_cli_date)]
    pub item_date: Option<NaiveDate>,

    /// YYYY-MM-DD, YYYYMMDD or "25 January 2024".
    #[arg(long, value_parser = parse_cli_date)]
    pub delivery_date: Option<NaiveDate>,
}

#[derive(Debug, Args, Clone)]
pub struct PredictArgs {
    #[command(flatten)]
    pub bundle: BundleArg,

    /// CSV of orders (one prediction per row); replaces the single-order flags.
    #[arg(long, value_name = "CSV", conflicts_with_all = ["quantity", "customer", "country", "status", "item_type"])]
    pub csv: Option<PathBuf>,

    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub order: OrderArgs,
}

#[derive(Debug, Args, Clone)]
pub struct SampleArgs {
    /// Output CSV.
    #[arg(short = 'o', long, default_value = "data/sample.csv")]
    pub out: PathBuf,

    #[arg(short = 'n', long, default_value_t = 5000)]
    pub rows: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Share of cells left blank.
    #[arg(long, default_value_t = 0.01)]
    pub missing_rate: f64,

    /// Share of rows with a Won/Lost status.
    #[arg(long, default_value_t = 0.6)]
    pub resolved_rate: f64,

    /// Share of rows with one extreme value.
    #[arg(long, default_value_t = 0.02)]
    pub outlier_rate: f64,

    /// First item date.
    #[arg(long, value_parser = parse_cli_date, default_value = "2020-07-01")]
    pub start_date: NaiveDate,
}

#[derive(Debug, Args, Clone)]
pub struct FetchArgs {
    /// Dataset URL.
    #[arg(long, env = "COPPER_DATA_URL")]
    pub url: String,

    /// Output CSV.
    #[arg(short = 'o', long, default_value = "data/copper.csv")]
    pub out: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct TuiArgs {
    #[command(flatten)]
    pub bundle: BundleArg,
}

/// Accept a country name from the catalog or a bare numeric code.
pub fn parse_country(s: &str) -> Result<i64, String> {
    if let Ok(code) = s.trim().parse::<i64>() {
        return Ok(code);
    }
    country_code(s).map_err(|e| e.to_string())
}

/// Dataset date formats, plus `D Month YYYY`.
pub fn parse_cli_date(s: &str) -> Result<NaiveDate, String> {
    if let Ok(d) = crate::io::ingest::parse_date(s) {
        return Ok(d);
    }
    let parts: Vec<&str> = s.split_whitespace().collect();
    if let [day, month, year] = parts.as_slice() {
        let day: u32 = day.parse().map_err(|_| format!("invalid day in '{s}'"))?;
        let month = month_number(month).map_err(|e| e.to_string())?;
        let year: i32 = year.parse().map_err(|_| format!("invalid year in '{s}'"))?;
        return NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| format!("no such date '{s}'"));
    }
    Err(format!("unrecognised date '{s}'"))
}
