//! Weighted aggregation of contour metrics into one 0–1 score.

use serde::{Deserialize, Serialize};

use crate::metrics::MetricBundle;

/// Weights of the metrics that feed the comprehensive score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    #[serde(default = "default_iou")]
    pub iou: f64,
    #[serde(default = "default_boundary")]
    pub boundary: f64,
    #[serde(default = "default_presence")]
    pub presence: f64,
    #[serde(default = "default_label")]
    pub label: f64,
}

fn default_iou() -> f64 {
    0.4
}
fn default_boundary() -> f64 {
    0.3
}
fn default_presence() -> f64 {
    0.2
}
fn default_label() -> f64 {
    0.1
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            iou: default_iou(),
            boundary: default_boundary(),
            presence: default_presence(),
            label: default_label(),
        }
    }
}

impl ScoringWeights {
    pub fn sum(&self) -> f64 {
        self.iou + self.boundary + self.presence + self.label
    }
}

/// Combine a metric bundle into a single score in `[0, 1]`.
///
/// The result is clamped even when the weights sum past 1; NaN maps to 0.
pub fn comprehensive_score(metrics: &MetricBundle, weights: &ScoringWeights) -> f64 {
    let score = metrics.iou * weights.iou
        + metrics.boundary_match * weights.boundary
        + metrics.presence_score * weights.presence
        + metrics.label_match * weights.label;
    clamp_unit(score)
}

pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Per-metric share of a question score, for explainability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub iou: f64,
    pub boundary: f64,
    pub presence: f64,
    pub label: f64,
}

impl ScoreBreakdown {
    /// Split `score` by the configured weights.
    pub fn from_score(score: f64, weights: &ScoringWeights) -> Self {
        Self {
            iou: score * weights.iou,
            boundary: score * weights.boundary,
            presence: score * weights.presence,
            label: score * weights.label,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle(iou: f64, boundary: f64, presence: f64, label: f64) -> MetricBundle {
        MetricBundle {
            iou,
            chamfer_distance: 0.0,
            hausdorff_distance: 0.0,
            area_similarity: 0.0,
            perimeter_similarity: 0.0,
            boundary_match: boundary,
            presence_score: presence,
            label_match: label,
            submitted_area: 0.0,
            reference_area: 0.0,
        }
    }

    #[test]
    fn default_weights_sum_to_one() {
        assert!((ScoringWeights::default().sum() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn perfect_metrics_score_one() {
        let score = comprehensive_score(&bundle(1.0, 1.0, 1.0, 1.0), &ScoringWeights::default());
        assert!((score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn weighted_sum() {
        let score = comprehensive_score(&bundle(0.5, 0.0, 1.0, 0.3), &ScoringWeights::default());
        // 0.2 + 0 + 0.2 + 0.03
        assert!((score - 0.43).abs() < 1e-12);
    }

    #[test]
    fn score_is_clamped() {
        let heavy = ScoringWeights {
            iou: 2.0,
            boundary: 2.0,
            presence: 2.0,
            label: 2.0,
        };
        assert_eq!(comprehensive_score(&bundle(1.0, 1.0, 1.0, 1.0), &heavy), 1.0);

        let negative = ScoringWeights {
            iou: -1.0,
            ..ScoringWeights::default()
        };
        assert_eq!(comprehensive_score(&bundle(1.0, 0.0, 0.0, 0.0), &negative), 0.0);
        assert_eq!(
            comprehensive_score(&bundle(f64::NAN, 0.0, 0.0, 0.0), &ScoringWeights::default()),
            0.0
        );
    }

    #[test]
    fn breakdown_splits_by_weight() {
        let b = ScoreBreakdown::from_score(0.5, &ScoringWeights::default());
        assert!((b.iou - 0.2).abs() < 1e-12);
        assert!((b.boundary - 0.15).abs() < 1e-12);
        assert!((b.presence - 0.1).abs() < 1e-12);
        assert!((b.label - 0.05).abs() < 1e-12);
    }
}
