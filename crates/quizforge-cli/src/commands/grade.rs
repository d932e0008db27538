//! The `quizforge grade` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use quizforge_core::config::load_config_from;
use quizforge_core::grading::{evaluate_graphic_payload, GraphicEvaluation};
use quizforge_core::parser;
use quizforge_core::report::GradingReport;

pub fn execute(
    reference_path: PathBuf,
    submission_path: PathBuf,
    config_path: Option<PathBuf>,
    format: String,
    output: Option<PathBuf>,
) -> Result<()> {
    anyhow::ensure!(
        matches!(format.as_str(), "text" | "json"),
        "unknown format '{format}', expected text or json"
    );

    let config = load_config_from(config_path.as_deref())?;
    let reference = parser::load_annotations(&reference_path)?;
    tracing::debug!(
        count = reference.len(),
        "loaded reference annotations from {}",
        reference_path.display()
    );

    let submission = parser::load_submissions(&submission_path)?;
    let evaluation = evaluate_graphic_payload(&reference, &submission, &config.grading);

    let report = GradingReport::new(reference.len(), evaluation);

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&report.evaluation)?);
    } else {
        print_summary(&report.evaluation);
    }

    if let Some(path) = output {
        report.save_json(&path)?;
        eprintln!("Report saved to: {}", path.display());
    }

    Ok(())
}

fn print_summary(eval: &GraphicEvaluation) {
    let mut table = Table::new();
    table.set_header(vec![
        "#", "Reference", "Label", "IoU", "Boundary", "Presence", "Label match", "Score",
    ]);

    for (i, detail) in eval.detail.iter().enumerate() {
        match detail {
            Some(m) => {
                table.add_row(vec![
                    Cell::new(i + 1),
                    Cell::new(&m.reference_label),
                    Cell::new(&m.user_label),
                    Cell::new(format!("{:.3}", m.metrics.iou)),
                    Cell::new(format!("{:.3}", m.metrics.boundary_match)),
                    Cell::new(format!("{:.3}", m.metrics.presence_score)),
                    Cell::new(format!("{:.1}", m.metrics.label_match)),
                    Cell::new(format!("{:.3}", m.score)),
                ]);
            }
            None => {
                let reason = eval
                    .failures
                    .iter()
                    .find(|f| f.index == i)
                    .map(|f| f.failure.to_string())
                    .unwrap_or_default();
                table.add_row(vec![
                    Cell::new(i + 1),
                    Cell::new("-"),
                    Cell::new(reason),
                    Cell::new("-"),
                    Cell::new("-"),
                    Cell::new("-"),
                    Cell::new("-"),
                    Cell::new(format!("{:.3}", 0.0)),
                ]);
            }
        }
    }

    println!("{table}");
    if let Some(reason) = &eval.invalid_payload {
        println!("Submission rejected: {reason}");
    }
    println!(
        "Score: {:.3} ({}/{} contours correct)",
        eval.comprehensive_score, eval.correct_count, eval.total_contours
    );
    println!(
        "Breakdown: iou {:.3}, boundary {:.3}, presence {:.3}, label {:.3}",
        eval.breakdown.iou, eval.breakdown.boundary, eval.breakdown.presence, eval.breakdown.label
    );
}
