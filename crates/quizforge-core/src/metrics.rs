//! Shape-similarity metrics between a submitted and a reference contour.
//!
//! [`calculate_metrics`] builds a [`MetricBundle`] from the geometry
//! primitives. Only IoU, boundary match, presence and label match feed the
//! comprehensive score; the remaining fields are diagnostic.

use serde::{Deserialize, Serialize};

use crate::geometry::{self, NearestPoint, RasterSettings};
use crate::model::Point;

/// Thresholds for the tiered label-match rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelThresholds {
    /// Minimum IoU for a correctly labelled contour to earn more than
    /// partial credit.
    #[serde(default = "default_overlap_ratio")]
    pub overlap_ratio: f64,
    /// Maximum relative area difference for full credit.
    #[serde(default = "default_area_tolerance")]
    pub area_tolerance: f64,
}

fn default_overlap_ratio() -> f64 {
    0.9
}

fn default_area_tolerance() -> f64 {
    0.1
}

impl Default for LabelThresholds {
    fn default() -> Self {
        Self {
            overlap_ratio: default_overlap_ratio(),
            area_tolerance: default_area_tolerance(),
        }
    }
}

/// Result of comparing one submitted contour with one reference contour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricBundle {
    pub iou: f64,
    pub chamfer_distance: f64,
    pub hausdorff_distance: f64,
    pub area_similarity: f64,
    pub perimeter_similarity: f64,
    pub boundary_match: f64,
    pub presence_score: f64,
    pub label_match: f64,
    /// Area of the submitted contour.
    pub submitted_area: f64,
    /// Area of the reference contour.
    pub reference_area: f64,
}

/// Compare a submitted contour against a reference contour.
pub fn calculate_metrics(
    submitted: &[Point],
    reference: &[Point],
    expected_label: Option<&str>,
    user_label: Option<&str>,
    thresholds: &LabelThresholds,
    raster: &RasterSettings,
) -> MetricBundle {
    let iou = geometry::rasterized_overlap(submitted, reference, raster).iou();
    let chamfer = chamfer_distance(submitted, reference);
    let hausdorff = hausdorff_distance(submitted, reference);

    let area1 = geometry::area(submitted);
    let area2 = geometry::area(reference);
    let perimeter1 = geometry::perimeter(submitted);
    let perimeter2 = geometry::perimeter(reference);

    let label_match = match (expected_label, user_label) {
        (Some(expected), Some(user)) => {
            label_match(expected, user, iou, area_difference(area1, area2), thresholds)
        }
        _ => 0.0,
    };

    MetricBundle {
        iou,
        chamfer_distance: chamfer,
        hausdorff_distance: hausdorff,
        area_similarity: ratio_similarity(area1, area2),
        perimeter_similarity: ratio_similarity(perimeter1, perimeter2),
        boundary_match: boundary_match(chamfer, area1, area2),
        presence_score: presence_score(submitted, reference, area1, area2),
        label_match,
        submitted_area: area1,
        reference_area: area2,
    }
}

/// Intersection over union of the rasterized polygons.
pub fn iou(a: &[Point], b: &[Point], raster: &RasterSettings) -> f64 {
    geometry::rasterized_overlap(a, b, raster).iou()
}

/// Nearest-vertex distance from every point of `from` into `to`.
fn directed_distances<'a, I>(from: &'a [Point], to: &'a I) -> impl Iterator<Item = f64> + 'a
where
    I: NearestPoint + ?Sized,
{
    from.iter().filter_map(move |p| to.nearest_distance(p))
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

/// Symmetric Chamfer distance: the mean nearest-vertex distance in each
/// direction, summed.
pub fn chamfer_distance(a: &[Point], b: &[Point]) -> f64 {
    mean(directed_distances(a, b)) + mean(directed_distances(b, a))
}

/// Largest nearest-vertex distance from `from` into `to`.
pub fn directed_hausdorff(from: &[Point], to: &[Point]) -> f64 {
    directed_distances(from, to).fold(0.0, f64::max)
}

/// Symmetric Hausdorff distance.
pub fn hausdorff_distance(a: &[Point], b: &[Point]) -> f64 {
    directed_hausdorff(a, b).max(directed_hausdorff(b, a))
}

/// `min / max`, or 0 when both are zero.
pub fn ratio_similarity(a: f64, b: f64) -> f64 {
    let hi = a.max(b);
    if hi > 0.0 {
        a.min(b) / hi
    } else {
        0.0
    }
}

/// Relative area difference `|a - b| / max(a, b)`.
pub fn area_difference(a: f64, b: f64) -> f64 {
    let hi = a.max(b);
    if hi > 0.0 {
        (a - b).abs() / hi
    } else {
        0.0
    }
}

/// Chamfer distance normalized by the larger shape's linear size, inverted
/// to a 0–1 similarity.
pub fn boundary_match(chamfer: f64, area1: f64, area2: f64) -> f64 {
    let hi = area1.max(area2);
    if hi <= 0.0 {
        return 0.0;
    }
    (1.0 - chamfer / hi.sqrt()).max(0.0)
}

/// How close the two centroids are relative to the average shape size.
pub fn presence_score(a: &[Point], b: &[Point], area1: f64, area2: f64) -> f64 {
    if area1 <= 0.0 || area2 <= 0.0 {
        return 0.0;
    }
    let (Some(c1), Some(c2)) = (geometry::centroid(a), geometry::centroid(b)) else {
        return 0.0;
    };
    let avg_area = (area1 + area2) / 2.0;
    let normalized = c1.distance(&c2) / avg_area.sqrt();
    (1.0 - normalized / 2.0).max(0.0)
}

/// Tiered label credit.
///
/// Labels are compared case-insensitively. Overlap is checked before area
/// tolerance, so a well-overlapping contour with the wrong size gets 0.5
/// and a poorly overlapping one gets 0.3 whatever its size. Empty labels
/// count as absent.
pub fn label_match(
    expected: &str,
    user: &str,
    iou: f64,
    area_difference: f64,
    thresholds: &LabelThresholds,
) -> f64 {
    if expected.is_empty() || user.is_empty() {
        return 0.0;
    }
    if expected.to_lowercase() != user.to_lowercase() {
        return 0.0;
    }
    if iou >= thresholds.overlap_ratio {
        if area_difference <= thresholds.area_tolerance {
            1.0
        } else {
            0.5
        }
    } else {
        0.3
    }
}
