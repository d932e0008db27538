//! Run reports with JSON persistence.
//!
//! Reports wrap a core result with an id and timestamp so collaborators can
//! store or diff them; the core itself never writes files on its own.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::grading::GraphicEvaluation;
use crate::model::TestDefinition;
use crate::variants::VariantBatch;

/// Report of one graphic-answer grading run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingReport {
    /// Unique report identifier.
    pub id: Uuid,
    /// When the report was created.
    pub created_at: DateTime<Utc>,
    /// Number of reference annotations graded against.
    pub reference_count: usize,
    /// The evaluation itself.
    pub evaluation: GraphicEvaluation,
}

impl GradingReport {
    pub fn new(reference_count: usize, evaluation: GraphicEvaluation) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            reference_count,
            evaluation,
        }
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        save_json(self, path)
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        load_json(path)
    }
}

/// Summary of a test definition (without its structure).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSummary {
    pub id: String,
    pub name: String,
    pub slot_count: usize,
}

impl From<&TestDefinition> for TestSummary {
    fn from(test: &TestDefinition) -> Self {
        Self {
            id: test.id.clone(),
            name: test.name.clone(),
            slot_count: test.structure.len(),
        }
    }
}

/// Report of one variant batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantReport {
    /// Unique report identifier.
    pub id: Uuid,
    /// When the report was created.
    pub created_at: DateTime<Utc>,
    /// The test the variants were generated for.
    pub test: TestSummary,
    /// Number of variants requested.
    pub requested: usize,
    /// Seed used for sampling, if one was fixed.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Generated variants and errors.
    pub batch: VariantBatch,
}

impl VariantReport {
    pub fn new(test: &TestDefinition, requested: usize, seed: Option<u64>, batch: VariantBatch) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            test: TestSummary::from(test),
            requested,
            seed,
            batch,
        }
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        save_json(self, path)
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        load_json(path)
    }
}

fn save_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize report")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, json)
        .with_context(|| format!("failed to write report to {}", path.display()))?;
    Ok(())
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read report from {}", path.display()))?;
    serde_json::from_str(&content).context("failed to parse report JSON")
}
