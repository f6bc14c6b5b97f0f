//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and loads `.env`
//! - installs logging for the non-interactive commands
//! - dispatches to training, inference, sample generation, download or the TUI

use clap::Parser;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, FetchArgs, PredictArgs, SampleArgs, TrainArgs};
use crate::domain::{RawOrderRecord, SampleConfig, TrainConfig};
use crate::error::AppError;
use crate::models::GbdtConfig;

pub mod pipeline;
pub mod service;

/// Entry point for the `copper` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    // `copper` and `copper -b DIR` behave like `copper tui ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    // The TUI owns the terminal; log lines would draw over it.
    if !matches!(cli.command, Command::Tui(_)) {
        init_logging(cli.verbose);
    }

    match cli.command {
        Command::Train(args) => handle_train(&args),
        Command::Predict(args) => handle_predict(&args),
        Command::Sample(args) => handle_sample(&args),
        Command::Fetch(args) => handle_fetch(&args),
        Command::Tui(args) => crate::tui::run(&args.bundle.dir),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_train(args: &TrainArgs) -> Result<(), AppError> {
    let config = train_config_from_args(args);
    let run = pipeline::run_training(&config)?;

    if !run.ingest.row_errors.is_empty() {
        eprintln!("Skipped {} rows:", run.ingest.row_errors.len());
        eprint!("{}", crate::report::format_row_errors(&run.ingest.row_errors, 20));
    }
    println!("{}", crate::report::format_training_summary(&run));
    Ok(())
}

fn handle_predict(args: &PredictArgs) -> Result<(), AppError> {
    let service = service::InferenceService::load(&args.bundle.dir)?;

    let orders: Vec<RawOrderRecord> = match &args.csv {
        Some(path) => {
            let (orders, errors) = crate::io::ingest::load_orders(path)?;
            if !errors.is_empty() {
                eprintln!("Skipped {} unreadable rows:", errors.len());
                eprint!("{}", crate::report::format_row_errors(&errors, 20));
            }
            orders
        }
        None => {
            let raw = order_from_args(args);
            // A single order must be valid; surface the transform error as the exit status.
            raw.validate()?;
            vec![raw]
        }
    };

    let results: Vec<(String, _)> = orders
        .iter()
        .zip(service.predict_batch(&orders))
        .enumerate()
        .map(|(i, (raw, result))| {
            let id = raw.id.clone().unwrap_or_else(|| format!("#{}", i + 1));
            (id, result)
        })
        .collect();

    if args.json {
        let items: Vec<serde_json::Value> = results
            .iter()
            .map(|(id, result)| match result {
                Ok(p) => json!({
                    "id": id,
                    "price": p.price,
                    "outcome": p.outcome.display_name(),
                    "win_probability": p.win_probability,
                }),
                Err(e) => json!({ "id": id, "error": e.to_string() }),
            })
            .collect();
        let text = serde_json::to_string_pretty(&items)
            .map_err(|e| AppError::new(4, format!("Failed to serialise predictions: {e}")))?;
        println!("{text}");
    } else {
        print!("{}", crate::report::format_predictions(&results));
    }
    Ok(())
}

fn handle_sample(args: &SampleArgs) -> Result<(), AppError> {
    let config = SampleConfig {
        rows: args.rows,
        seed: args.seed,
        missing_rate: args.missing_rate,
        resolved_rate: args.resolved_rate,
        outlier_rate: args.outlier_rate,
        start_date: args.start_date,
    };
    let rows = crate::data::generate_dataset(&config)?;
    crate::io::export::write_dataset_csv(&args.out, &rows)?;
    println!("Wrote {} rows to {}", rows.len(), args.out.display());
    Ok(())
}

fn handle_fetch(args: &FetchArgs) -> Result<(), AppError> {
    let bytes = crate::data::download_dataset(&args.url, &args.out)?;
    println!("Saved {bytes} bytes to {}", args.out.display());
    Ok(())
}

pub fn train_config_from_args(args: &TrainArgs) -> TrainConfig {
    TrainConfig {
        data_path: args.data.clone(),
        out_dir: args.out.clone(),
        outlier_order: args.outlier_order.clone(),
        boost: GbdtConfig {
            n_trees: args.n_trees,
            max_depth: args.max_depth,
            learning_rate: args.learning_rate,
            lambda: args.lambda,
            min_child_weight: args.min_child_weight,
            max_bins: args.max_bins,
        },
        holdout: args.holdout,
        seed: args.seed,
    }
}

fn order_from_args(args: &PredictArgs) -> RawOrderRecord {
    let o = &args.order;
    RawOrderRecord {
        id: o.id.clone(),
        quantity: o.quantity,
        customer: o.customer,
        country: o.country,
        status: o.status.clone(),
        item_type: o.item_type.clone(),
        application: o.application,
        thickness: o.thickness,
        width: o.width,
        product_ref: o.product_ref,
        item_date: o.item_date,
        delivery_date: o.delivery_date,
        selling_price: None,
    }
}

/// Rewrite argv so `copper` defaults to `copper tui`.
///
/// Rules:
/// - `copper`                     -> `copper tui`
/// - `copper -b DIR ...`          -> `copper tui -b DIR ...`
/// - `copper --help/--version/-h` -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "train" | "predict" | "sample" | "fetch" | "tui");
    if is_subcommand {
        return argv;
    }

    // A leading global flag still belongs to the top level.
    if matches!(arg1.as_str(), "-v" | "--verbose") {
        let rest = rewrite_args(std::iter::once(argv[0].clone()).chain(argv[2..].iter().cloned()).collect());
        return std::iter::once(rest[0].clone())
            .chain(std::iter::once(arg1))
            .chain(rest[1..].iter().cloned())
            .collect();
    }

    // Any other flag is a TUI flag.
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_opens_tui() {
        assert_eq!(rewrite_args(args(&["copper"])), args(&["copper", "tui"]));
        assert_eq!(
            rewrite_args(args(&["copper", "-b", "out"])),
            args(&["copper", "tui", "-b", "out"])
        );
        assert_eq!(rewrite_args(args(&["copper", "-v"])), args(&["copper", "-v", "tui"]));
    }

    #[test]
    fn subcommands_pass_through() {
        let argv = args(&["copper", "train", "-d", "x.csv"]);
        assert_eq!(rewrite_args(argv.clone()), argv);
        assert_eq!(rewrite_args(args(&["copper", "--help"])), args(&["copper", "--help"]));
    }

    #[test]
    fn train_flags_reach_config() {
        let cli = crate::cli::Cli::parse_from(["copper", "train", "-d", "x.csv", "--n-trees", "7", "--holdout", "0"]);
        let Command::Train(train) = cli.command else {
            panic!("expected train");
        };
        let config = train_config_from_args(&train);
        assert_eq!(config.boost.n_trees, 7);
        assert_eq!(config.holdout, 0.0);
        assert_eq!(config.data_path, std::path::PathBuf::from("x.csv"));
    }
}
