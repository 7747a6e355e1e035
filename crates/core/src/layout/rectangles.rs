//! Rectangle detection by corner matching.
//!
//! Any two intersection points that are not axis-aligned with each other can
//! be opposite corners of a rectangle. The remaining two corners are probed in
//! a rounded point lookup, within `±rect_tolerance` on each axis. Accepted
//! rectangles are deduplicated by their corner set and then pruned so that
//! only the outermost rectangles survive.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, info};

use crate::params::LayoutParams;
use crate::utils::{Point, bbox_contains, round_to};

use super::types::{IntersectionSet, KeyPoint, RawRectangle, key_point};

/// Approximate point lookup keyed by coordinates rounded to 0.1.
struct PointIndex {
    points: FxHashMap<KeyPoint, Point>,
    tolerance: f64,
}

impl PointIndex {
    fn new(points: &[Point], tolerance: f64) -> Self {
        let mut index = FxHashMap::default();
        for &(x, y) in points {
            index.insert(key_point(round_to(x, 1), round_to(y, 1)), (x, y));
        }
        Self {
            points: index,
            tolerance,
        }
    }

    /// Nearest stored point in the 3×3 probe grid around the target.
    ///
    /// Equal distances resolve to the first hit in scan order.
    fn probe(&self, x: f64, y: f64) -> Option<Point> {
        let offsets = [-self.tolerance, 0.0, self.tolerance];
        let mut best: Option<(f64, Point)> = None;
        for dx in offsets {
            for dy in offsets {
                let key = key_point(round_to(x + dx, 1), round_to(y + dy, 1));
                let Some(&p) = self.points.get(&key) else {
                    continue;
                };
                let dist = (p.0 - x).hypot(p.1 - y);
                if best.is_none_or(|(d, _)| dist < d) {
                    best = Some((dist, p));
                }
            }
        }
        best.map(|(_, p)| p)
    }
}

type CornerKey = [KeyPoint; 4];

fn corner_key(corners: [Point; 4]) -> CornerKey {
    let mut key = corners.map(|(x, y)| key_point(round_to(x, 2), round_to(y, 2)));
    key.sort();
    key
}

/// Detect rectangles from a page's intersection points.
pub fn detect_rectangles(points: &IntersectionSet, params: &LayoutParams) -> Vec<RawRectangle> {
    let pts = points.to_vec();
    let tol = params.rect_tolerance;
    let index = PointIndex::new(&pts, tol);

    let mut seen: FxHashSet<CornerKey> = FxHashSet::default();
    let mut rectangles = Vec::new();

    for (i, &(x1, y1)) in pts.iter().enumerate() {
        for &(x2, y2) in &pts[i + 1..] {
            let width = (x2 - x1).abs();
            let height = (y2 - y1).abs();
            if width <= tol || height <= tol {
                continue;
            }
            if width > params.max_width || height > params.max_height {
                continue;
            }
            if width < params.min_width || height < params.min_height {
                continue;
            }

            let (Some(p3), Some(p4)) = (index.probe(x1, y2), index.probe(x2, y1)) else {
                continue;
            };
            if !seen.insert(corner_key([(x1, y1), (x2, y2), p3, p4])) {
                continue;
            }
            rectangles.push(RawRectangle::from_bbox((
                x1.min(x2),
                y1.min(y2),
                x1.max(x2),
                y1.max(y2),
            )));
        }
    }

    let raw = rectangles.len();
    let rectangles = remove_contained(rectangles);
    info!(
        "detected {} raw rectangles, {} after containment pruning",
        raw,
        rectangles.len()
    );
    rectangles
}

/// Drop every rectangle that lies inside another one.
///
/// Shared edges count as containment. Of several rectangles with an identical
/// bbox only the first is kept.
pub fn remove_contained(rectangles: Vec<RawRectangle>) -> Vec<RawRectangle> {
    let contained: Vec<bool> = rectangles
        .iter()
        .enumerate()
        .map(|(i, rect)| {
            rectangles.iter().enumerate().any(|(j, other)| {
                i != j
                    && bbox_contains(other.bbox, rect.bbox)
                    && (other.bbox != rect.bbox || j < i)
            })
        })
        .collect();

    rectangles
        .into_iter()
        .zip(contained)
        .filter_map(|(rect, inside)| {
            if inside {
                debug!("pruning contained rectangle {:?}", rect.bbox);
                None
            } else {
                Some(rect)
            }
        })
        .collect()
}
