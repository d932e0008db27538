//! The `quizforge validate` command.

use std::path::PathBuf;

use anyhow::Result;

use quizforge_core::config::{load_config_from, validate_config};
use quizforge_core::parser::{self, ValidationWarning};

pub fn execute(
    config_path: Option<PathBuf>,
    bank_path: Option<PathBuf>,
    test_path: Option<PathBuf>,
) -> Result<()> {
    anyhow::ensure!(
        config_path.is_some() || bank_path.is_some() || test_path.is_some(),
        "nothing to validate; pass --config, --bank or --test"
    );

    let mut total_warnings = 0;

    if let Some(path) = &config_path {
        let config = load_config_from(Some(path.as_path()))?;
        println!("Config: {}", path.display());
        for w in validate_config(&config) {
            println!("  [{}] WARNING: {}", w.key, w.message);
            total_warnings += 1;
        }
    }

    let bank = match &bank_path {
        Some(path) => {
            let bank = parser::parse_bank(path)?;
            println!("Question bank: {} ({} questions)", path.display(), bank.questions().len());
            total_warnings += print_warnings(&parser::validate_bank(&bank));
            Some(bank)
        }
        None => None,
    };

    if let Some(path) = &test_path {
        let test = parser::parse_test(path)?;
        println!("Test: {} ({} slots)", test.name, test.structure.len());
        total_warnings += print_warnings(&parser::validate_test(&test, bank.as_ref()));
    }

    if total_warnings == 0 {
        println!("All files valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}

fn print_warnings(warnings: &[ValidationWarning]) -> usize {
    for w in warnings {
        let prefix = w
            .subject
            .as_ref()
            .map(|s| format!("  [{s}]"))
            .unwrap_or_else(|| "  ".to_string());
        println!("{prefix} WARNING: {}", w.message);
    }
    warnings.len()
}
