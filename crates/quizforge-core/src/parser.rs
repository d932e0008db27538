//! Loaders for question banks, test definitions, reference annotations and
//! submissions.
//!
//! Banks and tests are TOML; annotations and submissions are JSON, the way
//! the drawing canvas and annotation importers hand them over.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::SubmissionError;
use crate::grading::{Submission, SubmittedContour};
use crate::model::{Annotation, Question, QuestionType, TestDefinition};
use crate::variants::{InMemoryBank, QuestionBank};

#[derive(Debug, Deserialize)]
struct TomlBankFile {
    #[serde(default)]
    questions: Vec<Question>,
}

#[derive(Debug, Deserialize)]
struct TomlTestFile {
    test: TestDefinition,
}

/// Annotation files are either a bare list or wrapped in an object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AnnotationFile {
    List(Vec<Annotation>),
    Wrapped { annotations: Vec<Annotation> },
}

/// Parse a question bank TOML file.
pub fn parse_bank(path: &Path) -> Result<InMemoryBank> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read question bank: {}", path.display()))?;
    parse_bank_str(&content, path)
}

/// Parse a question bank from a TOML string.
pub fn parse_bank_str(content: &str, source_path: &Path) -> Result<InMemoryBank> {
    let parsed: TomlBankFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;
    Ok(InMemoryBank::new(parsed.questions))
}

/// Parse a test definition TOML file.
pub fn parse_test(path: &Path) -> Result<TestDefinition> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read test definition: {}", path.display()))?;
    parse_test_str(&content, path)
}

/// Parse a test definition from a TOML string.
pub fn parse_test_str(content: &str, source_path: &Path) -> Result<TestDefinition> {
    let parsed: TomlTestFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;
    Ok(parsed.test)
}

/// Load a reference annotation set from a JSON file.
pub fn load_annotations(path: &Path) -> Result<Vec<Annotation>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read annotations: {}", path.display()))?;
    parse_annotations_str(&content)
        .with_context(|| format!("failed to parse annotations: {}", path.display()))
}

/// Parse a reference annotation set from JSON.
pub fn parse_annotations_str(content: &str) -> Result<Vec<Annotation>> {
    let file: AnnotationFile = serde_json::from_str(content)?;
    Ok(match file {
        AnnotationFile::List(list) => list,
        AnnotationFile::Wrapped { annotations } => annotations,
    })
}

/// Decode a graphic-answer payload.
///
/// The payload must be a JSON array. Entries that do not decode as a
/// contour become [`Submission::Malformed`] so they are scored and reported
/// individually instead of failing the whole answer.
pub fn parse_submissions(raw: &str) -> Result<Vec<Submission>, SubmissionError> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| SubmissionError::InvalidJson(e.to_string()))?;
    let serde_json::Value::Array(entries) = value else {
        return Err(SubmissionError::NotAList);
    };

    Ok(entries
        .into_iter()
        .map(|entry| match serde_json::from_value::<SubmittedContour>(entry) {
            Ok(contour) => Submission::Contour(contour),
            Err(e) => Submission::Malformed {
                reason: e.to_string(),
            },
        })
        .collect())
}

/// Load and decode a graphic-answer payload from a file.
///
/// I/O errors are reported through `anyhow`; a readable file with bad
/// content yields the inner [`SubmissionError`].
pub fn load_submissions(path: &Path) -> Result<Result<Vec<Submission>, SubmissionError>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read submission: {}", path.display()))?;
    Ok(parse_submissions(&content))
}

/// A warning from bank or test validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// What the warning is about (a question id or slot number).
    pub subject: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Validate a question bank for common issues.
pub fn validate_bank(bank: &InMemoryBank) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    let mut seen_ids = HashSet::new();
    for q in bank.questions() {
        if !seen_ids.insert(q.id) {
            warnings.push(ValidationWarning {
                subject: Some(format!("question {}", q.id)),
                message: format!("duplicate question ID: {}", q.id),
            });
        }
    }

    for q in bank.questions() {
        if q.text.trim().is_empty() {
            warnings.push(ValidationWarning {
                subject: Some(format!("question {}", q.id)),
                message: "question text is empty".into(),
            });
        }
        if q.question_type == QuestionType::Open
            && q.correct_answer.as_deref().map_or(true, |a| a.trim().is_empty())
        {
            warnings.push(ValidationWarning {
                subject: Some(format!("question {}", q.id)),
                message: "open question has no correct_answer".into(),
            });
        }
    }

    warnings
}

/// Validate a test definition, optionally against the bank it draws from.
pub fn validate_test(test: &TestDefinition, bank: Option<&InMemoryBank>) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if test.structure.is_empty() {
        warnings.push(ValidationWarning {
            subject: None,
            message: "structure is empty; no variants can be generated".into(),
        });
    }

    for (i, slot) in test.structure.iter().enumerate() {
        let subject = Some(format!("slot {}", i + 1));
        if slot.topic_id.trim().is_empty() {
            warnings.push(ValidationWarning {
                subject: subject.clone(),
                message: "topic_id is empty".into(),
            });
        }
        if slot.parsed_type().is_none() {
            warnings.push(ValidationWarning {
                subject: subject.clone(),
                message: format!("unknown question type: '{}'", slot.question_type),
            });
        }
        if let Some(bank) = bank {
            if bank.candidates(slot).is_empty() {
                warnings.push(ValidationWarning {
                    subject,
                    message: format!(
                        "no questions in bank for topic {}, type {}",
                        slot.topic_id, slot.question_type
                    ),
                });
            }
        }
    }

    warnings
}
