//! The `quizforge init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    write_if_missing(Path::new("quizforge.toml"), SAMPLE_CONFIG)?;

    std::fs::create_dir_all("quizzes")?;
    write_if_missing(Path::new("quizzes/bank.toml"), SAMPLE_BANK)?;
    write_if_missing(Path::new("quizzes/test.toml"), SAMPLE_TEST)?;

    println!("\nNext steps:");
    println!("  1. Add your questions to quizzes/bank.toml");
    println!("  2. Run: quizforge validate --bank quizzes/bank.toml --test quizzes/test.toml");
    println!("  3. Run: quizforge generate --bank quizzes/bank.toml --test quizzes/test.toml --count 5");

    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!("{} already exists, skipping.", path.display());
    } else {
        std::fs::write(path, content)?;
        println!("Created {}", path.display());
    }
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# quizforge configuration

[grading]
correct_threshold = 0.5
unknown_label = "unknown"

[grading.weights]
iou = 0.4
boundary = 0.3
presence = 0.2
label = 0.1

[grading.label]
overlap_ratio = 0.9
area_tolerance = 0.1

[grading.raster]
resolution = 256
margin_cells = 2

[variants]
max_batch = 50
"#;

const SAMPLE_BANK: &str = r#"[[questions]]
id = 1
topic_id = "anatomy"
question_type = "graphic"
creator_id = 1
text = "Outline the liver on the CT slice"

[[questions]]
id = 2
topic_id = "anatomy"
question_type = "graphic"
creator_id = 1
text = "Outline both kidneys"

[[questions]]
id = 3
topic_id = "anatomy"
question_type = "open"
creator_id = 1
text = "Name the largest artery in the body"
correct_answer = "aorta"

[[questions]]
id = 4
topic_id = "physiology"
question_type = "open"
creator_id = 2
text = "Which organ produces insulin?"
correct_answer = "pancreas"
"#;

const SAMPLE_TEST: &str = r#"[test]
id = "sample"
name = "Sample Test"
description = "Two anatomy questions and one physiology question"

[[test.structure]]
topic_id = "anatomy"
question_type = "graphic"

[[test.structure]]
topic_id = "anatomy"
question_type = "open"

[[test.structure]]
topic_id = "physiology"
question_type = "open"
"#;
