//! The `quizforge generate` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};
use rand::rngs::StdRng;
use rand::SeedableRng;

use quizforge_core::config::load_config_from;
use quizforge_core::parser;
use quizforge_core::report::VariantReport;
use quizforge_core::variants::{generate_variants, BankScope, VariantBatch};

#[allow(clippy::too_many_arguments)]
pub fn execute(
    bank_path: PathBuf,
    test_path: PathBuf,
    count: usize,
    seed: Option<u64>,
    owner: Option<u64>,
    config_path: Option<PathBuf>,
    format: String,
    output: Option<PathBuf>,
) -> Result<()> {
    anyhow::ensure!(
        matches!(format.as_str(), "text" | "json"),
        "unknown format '{format}', expected text or json"
    );

    let config = load_config_from(config_path.as_deref())?;
    let bank = parser::parse_bank(&bank_path)?;
    let test = parser::parse_test(&test_path)?;

    tracing::debug!(
        questions = bank.questions().len(),
        slots = test.structure.len(),
        "loaded bank and test"
    );

    let scope = match owner {
        Some(user_id) => BankScope::Owner { user_id },
        None => BankScope::Elevated,
    };
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    let batch = generate_variants(
        &test.structure,
        count,
        &bank.scoped(scope),
        &mut rng,
        &config.variants,
    )?;

    let report = VariantReport::new(&test, count, seed, batch);

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&report.batch)?);
    } else {
        println!("Test: {} ({} slots)", test.name, test.structure.len());
        print_variants(&report.batch);
    }

    if let Some(path) = output {
        report.save_json(&path)?;
        eprintln!("Report saved to: {}", path.display());
    }

    Ok(())
}

fn print_variants(batch: &VariantBatch) {
    if !batch.variants.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Variant", "Questions"]);
        for (i, variant) in batch.variants.iter().enumerate() {
            let ids: Vec<String> = variant.questions.iter().map(u64::to_string).collect();
            table.add_row(vec![Cell::new(i + 1), Cell::new(ids.join(", "))]);
        }
        println!("{table}");
    }

    for message in batch.error_messages() {
        println!("  ERROR: {message}");
    }

    println!(
        "\n{} variant(s) generated, {} failed.",
        batch.variants.len(),
        batch.errors.len()
    );
}
