//! Formatted terminal output.
//!
//! Formatting lives here so the pipeline and model code stay free of
//! presentation concerns, and output changes are localized.

use crate::app::pipeline::TrainingRun;
use crate::app::service::Prediction;
use crate::error::TransformError;
use crate::io::ingest::RowError;
use crate::models::Evaluation;

/// Summary printed after `copper train`.
pub fn format_training_summary(run: &TrainingRun) -> String {
    let mut out = String::new();
    let summary = &run.bundle.training;
    let transform = &run.bundle.transform;

    out.push_str("=== copper - price regression + Won/NotWin classification ===\n");
    out.push_str(&format!(
        "Rows: read={} | row errors={} | imputed values={} | kept={}\n",
        summary.rows_read,
        summary.row_errors,
        summary.imputed_values,
        run.clean.records.len()
    ));

    out.push_str("\nOutlier filter (IQR, sequential):\n");
    for step in &run.clean.outlier_steps {
        out.push_str(&format!(
            "  {:<14} q1={:>12.3} q3={:>12.3} keep=[{:.3}, {:.3}] dropped={}\n",
            step.column.name(),
            step.q1,
            step.q3,
            step.lower,
            step.upper,
            step.dropped
        ));
    }
    out.push_str(&format!("  negative values dropped={}\n", summary.negative_dropped));

    let corrected = transform.skew.corrected_columns();
    out.push_str(&format!("\nFeatures: {} columns\n", transform.width()));
    out.push_str(&format!(
        "Skew-corrected: {}\n",
        if corrected.is_empty() { "(none)".to_string() } else { corrected.join(", ") }
    ));
    out.push_str(&format!(
        "Target skew: {:.3} ({})\n",
        transform.target_skew.skewness,
        if transform.target_skew.corrected { "log-corrected" } else { "as is" }
    ));

    out.push_str(&format!(
        "\nModels: regression rows={} | classification rows={} | trees={} depth={} lr={}\n",
        summary.regression_rows,
        summary.classification_rows,
        summary.boost.n_trees,
        summary.boost.max_depth,
        summary.boost.learning_rate
    ));
    match &summary.evaluation {
        Some(eval) => out.push_str(&format_evaluation(eval)),
        None => out.push_str("Holdout: skipped\n"),
    }

    out.push_str("\nArtifacts:\n");
    for path in [
        &run.artifacts.bundle,
        &run.artifacts.regressor,
        &run.artifacts.classifier,
        &run.artifacts.columns,
        &run.artifacts.cleaned,
    ] {
        out.push_str(&format!("- {}\n", path.display()));
    }
    out
}

pub fn format_evaluation(eval: &Evaluation) -> String {
    let accuracy = match eval.accuracy {
        Some(a) => format!("{:.1}% on {} rows", a * 100.0, eval.clf_test_rows),
        None => "n/a".to_string(),
    };
    format!(
        "Holdout: train={} test={} | RMSE={:.3} R2={:.4} | accuracy={accuracy}\n",
        eval.train_rows, eval.test_rows, eval.rmse, eval.r2
    )
}

/// First `limit` row errors, plus a count of the rest.
pub fn format_row_errors(errors: &[RowError], limit: usize) -> String {
    let mut out = String::new();
    for e in errors.iter().take(limit) {
        out.push_str(&format!(
            "  line {:>6} {:<12} {}\n",
            e.line,
            truncate(e.id.as_deref().unwrap_or("-"), 12),
            e.message
        ));
    }
    if errors.len() > limit {
        out.push_str(&format!("  ... and {} more\n", errors.len() - limit));
    }
    out
}

/// One line per order; failed orders show their error in place of a result.
pub fn format_predictions(rows: &[(String, Result<Prediction, TransformError>)]) -> String {
    let mut out = String::new();
    out.push_str(format!("{:<16} {:>12} {:<8} {:>8}", "id", "price", "outcome", "p(win)").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<16} {:-<12} {:-<8} {:-<8}", "", "", "", "").trim_end());
    out.push('\n');

    for (id, result) in rows {
        let line = match result {
            Ok(p) => format!(
                "{:<16} {:>12.2} {:<8} {:>8.3}",
                truncate(id, 16),
                p.price,
                p.outcome.display_name(),
                p.win_probability
            ),
            Err(e) => format!("{:<16} error: {e}", truncate(id, 16)),
        };
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
