//! Configuration for grading and variant generation.
//!
//! Every entry point takes its configuration explicitly; this module only
//! defines the values, their defaults, and how to load them from TOML.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::geometry::RasterSettings;
use crate::metrics::LabelThresholds;
use crate::scoring::ScoringWeights;

/// Settings for the graphic grading path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingConfig {
    /// Metric weights for the comprehensive score.
    #[serde(default)]
    pub weights: ScoringWeights,
    /// Label-match thresholds.
    #[serde(default)]
    pub label: LabelThresholds,
    /// Score at or above which a contour counts as correct.
    #[serde(default = "default_correct_threshold")]
    pub correct_threshold: f64,
    /// Label assumed when a submission carries none.
    #[serde(default = "default_unknown_label")]
    pub unknown_label: String,
    /// Overlap rasterization grid.
    #[serde(default)]
    pub raster: RasterSettings,
}

fn default_correct_threshold() -> f64 {
    0.5
}

fn default_unknown_label() -> String {
    "unknown".to_string()
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            label: LabelThresholds::default(),
            correct_threshold: default_correct_threshold(),
            unknown_label: default_unknown_label(),
            raster: RasterSettings::default(),
        }
    }
}

/// Settings for the variant generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantConfig {
    /// Largest number of variants one batch may request.
    #[serde(default = "default_max_batch")]
    pub max_batch: usize,
}

fn default_max_batch() -> usize {
    50
}

impl Default for VariantConfig {
    fn default() -> Self {
        Self {
            max_batch: default_max_batch(),
        }
    }
}

/// Top-level quizforge configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuizforgeConfig {
    #[serde(default)]
    pub grading: GradingConfig,
    #[serde(default)]
    pub variants: VariantConfig,
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `quizforge.toml` in the current directory
/// 2. `~/.config/quizforge/config.toml`
///
/// Falls back to defaults when neither exists.
pub fn load_config() -> Result<QuizforgeConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<QuizforgeConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("quizforge.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let config = parse_config_str(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            tracing::debug!("loaded config from {}", path.display());
            Ok(config)
        }
        None => Ok(QuizforgeConfig::default()),
    }
}

/// Parse a TOML configuration string.
pub fn parse_config_str(content: &str) -> Result<QuizforgeConfig> {
    Ok(toml::from_str(content)?)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("quizforge"))
}

/// A warning from configuration validation.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    /// Dotted path of the offending key.
    pub key: String,
    /// Warning message.
    pub message: String,
}

/// Check a configuration for values that make scores misleading.
pub fn validate_config(config: &QuizforgeConfig) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();
    let mut warn = |key: &str, message: String| {
        warnings.push(ConfigWarning {
            key: key.to_string(),
            message,
        })
    };

    let grading = &config.grading;
    let weights = [
        ("grading.weights.iou", grading.weights.iou),
        ("grading.weights.boundary", grading.weights.boundary),
        ("grading.weights.presence", grading.weights.presence),
        ("grading.weights.label", grading.weights.label),
    ];
    for (key, value) in weights {
        if value < 0.0 {
            warn(key, format!("weight is negative ({value})"));
        }
    }
    let sum = grading.weights.sum();
    if sum > 1.0 + 1e-9 {
        warn(
            "grading.weights",
            format!("weights sum to {sum:.3}; scores will be clamped at 1.0"),
        );
    }

    let unit_values = [
        ("grading.label.overlap_ratio", grading.label.overlap_ratio),
        ("grading.label.area_tolerance", grading.label.area_tolerance),
        ("grading.correct_threshold", grading.correct_threshold),
    ];
    for (key, value) in unit_values {
        if !(0.0..=1.0).contains(&value) {
            warn(key, format!("value {value} is outside [0, 1]"));
        }
    }

    if grading.raster.resolution <= grading.raster.margin_cells.saturating_mul(2) {
        warn(
            "grading.raster.resolution",
            format!(
                "resolution {} leaves no room inside a margin of {} cells; margin reduced to {}",
                grading.raster.resolution,
                grading.raster.margin_cells,
                grading.raster.effective_margin()
            ),
        );
    }

    if config.variants.max_batch == 0 {
        warn(
            "variants.max_batch",
            "max_batch is 0; every batch will be rejected".into(),
        );
    }

    warnings
}
