//! Geometry primitives over point sequences.
//!
//! Everything here treats a contour as a closed polygon and never panics on
//! degenerate input: empty contours have zero area and perimeter, and
//! rasterizing fewer than three points produces an empty mask.

use serde::{Deserialize, Serialize};

use crate::model::{Point, MIN_POLYGON_POINTS};

/// Areas below this are treated as zero.
const AREA_EPSILON: f64 = 1e-12;

/// Signed polygon area via the shoelace formula.
///
/// Positive for counter-clockwise winding in a y-up frame.
pub fn signed_area(contour: &[Point]) -> f64 {
    if contour.len() < MIN_POLYGON_POINTS {
        return 0.0;
    }
    let twice: f64 = closed_edges(contour)
        .map(|(p, q)| p.x * q.y - q.x * p.y)
        .sum();
    twice / 2.0
}

/// Absolute polygon area.
pub fn area(contour: &[Point]) -> f64 {
    signed_area(contour).abs()
}

/// Length of the closed path through all points.
pub fn perimeter(contour: &[Point]) -> f64 {
    if contour.len() < 2 {
        return 0.0;
    }
    closed_edges(contour).map(|(p, q)| p.distance(q)).sum()
}

/// Area-weighted polygon centroid.
///
/// Falls back to the vertex average when the polygon has zero area, and
/// returns `None` only for an empty contour.
pub fn centroid(contour: &[Point]) -> Option<Point> {
    if contour.is_empty() {
        return None;
    }

    let a = signed_area(contour);
    if a.abs() <= AREA_EPSILON {
        let n = contour.len() as f64;
        let (sx, sy) = contour
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        return Some(Point::new(sx / n, sy / n));
    }

    let (mut cx, mut cy) = (0.0, 0.0);
    for (p, q) in closed_edges(contour) {
        let cross = p.x * q.y - q.x * p.y;
        cx += (p.x + q.x) * cross;
        cy += (p.y + q.y) * cross;
    }
    let factor = 1.0 / (6.0 * a);
    Some(Point::new(cx * factor, cy * factor))
}

/// Iterate over the edges of a closed polygon, including the closing edge.
fn closed_edges(contour: &[Point]) -> impl Iterator<Item = (&Point, &Point)> {
    contour
        .iter()
        .zip(contour.iter().cycle().skip(1))
        .take(contour.len())
}

// ---------------------------------------------------------------------------
// Bounding boxes
// ---------------------------------------------------------------------------

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    /// Bounding box of a set of points, or `None` if there are none.
    pub fn of<'a>(points: impl IntoIterator<Item = &'a Point>) -> Option<Self> {
        points.into_iter().fold(None, |acc, p| {
            Some(match acc {
                None => Bounds {
                    min_x: p.x,
                    min_y: p.y,
                    max_x: p.x,
                    max_y: p.y,
                },
                Some(b) => Bounds {
                    min_x: b.min_x.min(p.x),
                    min_y: b.min_y.min(p.y),
                    max_x: b.max_x.max(p.x),
                    max_y: b.max_y.max(p.y),
                },
            })
        })
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

// ---------------------------------------------------------------------------
// Rasterized overlap
// ---------------------------------------------------------------------------

/// Resolution of the shared grid used for overlap computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RasterSettings {
    /// Number of cells along the longer side of the grid, margins included.
    #[serde(default = "default_resolution")]
    pub resolution: usize,
    /// Empty cells padded around the shared bounding box on every side.
    #[serde(default = "default_margin_cells")]
    pub margin_cells: usize,
}

fn default_resolution() -> usize {
    256
}

fn default_margin_cells() -> usize {
    2
}

impl RasterSettings {
    /// Margin actually applied, capped so at least one inner cell remains
    /// and the grid never exceeds `resolution + 1` cells per side.
    pub fn effective_margin(&self) -> usize {
        self.margin_cells.min(self.resolution.saturating_sub(1) / 2)
    }
}

impl Default for RasterSettings {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
            margin_cells: default_margin_cells(),
        }
    }
}

/// Pixel counts from rasterizing two polygons onto one grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overlap {
    pub intersection: u64,
    pub union: u64,
}

impl Overlap {
    /// Intersection over union, 0 when the union is empty.
    pub fn iou(&self) -> f64 {
        if self.union == 0 {
            0.0
        } else {
            self.intersection as f64 / self.union as f64
        }
    }
}

/// Rasterize both contours on a shared grid and count overlapping cells.
///
/// The grid is fitted to the joint bounding box of both contours (plus a
/// margin) and has a fixed resolution, so memory use does not depend on
/// coordinate magnitude. Only one row per contour is held at a time.
pub fn rasterized_overlap(a: &[Point], b: &[Point], settings: &RasterSettings) -> Overlap {
    let Some(bounds) = Bounds::of(a.iter().chain(b.iter())) else {
        return Overlap::default();
    };

    let extent = bounds.width().max(bounds.height());
    if !extent.is_finite() || extent <= 0.0 {
        return Overlap::default();
    }

    let margin = settings.effective_margin();
    let inner = settings.resolution.saturating_sub(2 * margin).max(1);
    let cell = extent / inner as f64;
    let origin_x = bounds.min_x - margin as f64 * cell;
    let origin_y = bounds.min_y - margin as f64 * cell;
    let cols = (bounds.width() / cell).ceil() as usize + 2 * margin + 1;
    let rows = (bounds.height() / cell).ceil() as usize + 2 * margin + 1;

    let fill_a = a.len() >= MIN_POLYGON_POINTS;
    let fill_b = b.len() >= MIN_POLYGON_POINTS;

    let mut row_a = vec![false; cols];
    let mut row_b = vec![false; cols];
    let mut crossings = Vec::new();
    let mut overlap = Overlap::default();

    for j in 0..rows {
        let y = origin_y + (j as f64 + 0.5) * cell;

        row_a.fill(false);
        row_b.fill(false);
        if fill_a {
            fill_scanline(a, y, origin_x, cell, &mut crossings, &mut row_a);
        }
        if fill_b {
            fill_scanline(b, y, origin_x, cell, &mut crossings, &mut row_b);
        }

        for (&in_a, &in_b) in row_a.iter().zip(row_b.iter()) {
            if in_a && in_b {
                overlap.intersection += 1;
            }
            if in_a || in_b {
                overlap.union += 1;
            }
        }
    }

    overlap
}

/// Mark the cells of one grid row whose centres fall inside the polygon
/// (even-odd rule).
fn fill_scanline(
    polygon: &[Point],
    y: f64,
    origin_x: f64,
    cell: f64,
    crossings: &mut Vec<f64>,
    row: &mut [bool],
) {
    crossings.clear();
    for (p, q) in closed_edges(polygon) {
        if (p.y <= y) != (q.y <= y) {
            let t = (y - p.y) / (q.y - p.y);
            crossings.push(p.x + t * (q.x - p.x));
        }
    }
    crossings.sort_by(|l, r| l.total_cmp(r));

    let cols = row.len() as f64;
    let to_index = |x: f64| ((x - origin_x) / cell - 0.5).ceil().clamp(0.0, cols) as usize;

    for span in crossings.chunks_exact(2) {
        let start = to_index(span[0]);
        let end = to_index(span[1]);
        if start < end {
            row[start..end].fill(true);
        }
    }
}

// ---------------------------------------------------------------------------
// Nearest-point queries
// ---------------------------------------------------------------------------

/// Nearest-vertex lookup against a fixed point set.
///
/// The metric calculator only talks to this trait, so a spatial index can
/// replace the brute-force slice implementation for large contours.
pub trait NearestPoint {
    /// Distance from `point` to the closest vertex, or `None` if the set is
    /// empty.
    fn nearest_distance(&self, point: &Point) -> Option<f64>;
}

impl NearestPoint for [Point] {
    fn nearest_distance(&self, point: &Point) -> Option<f64> {
        self.iter()
            .map(|v| point.distance(v))
            .min_by(|l, r| l.total_cmp(r))
    }
}

/// Minimum distance from a point to any vertex of a contour.
///
/// Vertex-to-vertex only; edges are not considered.
pub fn nearest_point_distance(point: &Point, contour: &[Point]) -> Option<f64> {
    contour.nearest_distance(point)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f64, y: f64, side: f64) -> Vec<Point> {
        vec![
            Point::new(x, y),
            Point::new(x + side, y),
            Point::new(x + side, y + side),
            Point::new(x, y + side),
        ]
    }

    #[test]
    fn area_of_square_ignores_winding() {
        let ccw = square(0.0, 0.0, 10.0);
        let mut cw = ccw.clone();
        cw.reverse();
        assert!((area(&ccw) - 100.0).abs() < 1e-9);
        assert!((area(&cw) - 100.0).abs() < 1e-9);
        assert!(signed_area(&ccw) > 0.0);
        assert!(signed_area(&cw) < 0.0);
    }

    #[test]
    fn area_of_degenerate_contours_is_zero() {
        assert_eq!(area(&[]), 0.0);
        assert_eq!(area(&[Point::new(1.0, 1.0), Point::new(2.0, 2.0)]), 0.0);
        let collinear = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(2.0, 2.0),
        ];
        assert!(area(&collinear).abs() < 1e-12);
    }

    #[test]
    fn perimeter_is_closed() {
        assert!((perimeter(&square(5.0, 5.0, 10.0)) - 40.0).abs() < 1e-9);
        assert_eq!(perimeter(&[Point::new(0.0, 0.0)]), 0.0);
        // Two points: out and back.
        let seg = [Point::new(0.0, 0.0), Point::new(3.0, 4.0)];
        assert!((perimeter(&seg) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn centroid_is_area_weighted() {
        // Extra vertices along one edge shift the vertex average but not
        // the area centroid.
        let mut poly = square(0.0, 0.0, 10.0);
        poly.insert(1, Point::new(2.0, 0.0));
        poly.insert(2, Point::new(4.0, 0.0));
        let c = centroid(&poly).unwrap();
        assert!((c.x - 5.0).abs() < 1e-9);
        assert!((c.y - 5.0).abs() < 1e-9);
    }

    #[test]
    fn centroid_falls_back_to_vertex_average() {
        let line = vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(4.0, 0.0),
        ];
        let c = centroid(&line).unwrap();
        assert!((c.x - 2.0).abs() < 1e-12);
        assert_eq!(c.y, 0.0);
        assert!(centroid(&[]).is_none());
    }

    #[test]
    fn overlap_of_identical_squares_is_full() {
        let sq = square(0.0, 0.0, 10.0);
        let overlap = rasterized_overlap(&sq, &sq, &RasterSettings::default());
        assert!(overlap.union > 0);
        assert_eq!(overlap.intersection, overlap.union);
        assert_eq!(overlap.iou(), 1.0);
    }

    #[test]
    fn overlap_of_disjoint_squares_is_empty() {
        let a = square(0.0, 0.0, 10.0);
        let b = square(100.0, 100.0, 10.0);
        let overlap = rasterized_overlap(&a, &b, &RasterSettings::default());
        assert_eq!(overlap.intersection, 0);
        assert!(overlap.union > 0);
    }

    #[test]
    fn overlap_of_half_shifted_squares() {
        let a = square(0.0, 0.0, 10.0);
        let b = square(5.0, 0.0, 10.0);
        let iou = rasterized_overlap(&a, &b, &RasterSettings::default()).iou();
        // Exact value is 50 / 150.
        assert!((iou - 1.0 / 3.0).abs() < 0.02, "got {iou}");
    }

    #[test]
    fn overlap_memory_does_not_grow_with_coordinates() {
        let a = square(1.0e9, 1.0e9, 5.0e8);
        let b = square(1.2e9, 1.2e9, 5.0e8);
        let settings = RasterSettings::default();
        let overlap = rasterized_overlap(&a, &b, &settings);
        let max_cells = ((settings.resolution + 1) * (settings.resolution + 1)) as u64;
        assert!(overlap.union <= max_cells);
        assert!(overlap.iou() > 0.0 && overlap.iou() < 1.0);
    }

    #[test]
    fn oversized_margin_is_capped() {
        let a = square(0.0, 0.0, 10.0);
        let b = square(5.0, 0.0, 10.0);
        for margin_cells in [1_000_000, usize::MAX / 2 + 1, usize::MAX] {
            let settings = RasterSettings {
                resolution: 256,
                margin_cells,
            };
            assert_eq!(settings.effective_margin(), 127);
            let overlap = rasterized_overlap(&a, &b, &settings);
            assert!(overlap.union > 0 && overlap.union <= 257 * 257);
            assert!((0.0..=1.0).contains(&overlap.iou()));
        }

        let tiny = RasterSettings {
            resolution: 0,
            margin_cells: usize::MAX,
        };
        assert_eq!(tiny.effective_margin(), 0);
        assert!(rasterized_overlap(&a, &b, &tiny).union <= 4);
    }

    #[test]
    fn overlap_with_degenerate_input() {
        let sq = square(0.0, 0.0, 10.0);
        let two = vec![Point::new(0.0, 0.0), Point::new(5.0, 5.0)];
        let overlap = rasterized_overlap(&sq, &two, &RasterSettings::default());
        assert_eq!(overlap.intersection, 0);
        assert_eq!(rasterized_overlap(&[], &[], &RasterSettings::default()).iou(), 0.0);
        let p = vec![Point::new(3.0, 3.0); 3];
        assert_eq!(rasterized_overlap(&p, &p, &RasterSettings::default()).union, 0);
    }

    #[test]
    fn nearest_point_is_vertex_to_vertex() {
        let sq = square(0.0, 0.0, 10.0);
        // Midpoint of an edge is 5 away from the nearest vertex, not 0.
        let d = nearest_point_distance(&Point::new(5.0, 0.0), &sq).unwrap();
        assert!((d - 5.0).abs() < 1e-12);
        assert!(nearest_point_distance(&Point::new(0.0, 0.0), &[]).is_none());
    }
}
