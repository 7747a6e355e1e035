//! Intersection points between horizontal and vertical lines.
//!
//! Every horizontal line is tested against every vertical line as a true
//! segment intersection, so slightly slanted lines still meet where they
//! geometrically cross. Only H×V pairs are tested; parallel lines of the same
//! orientation never contribute.

use geo::algorithm::line_intersection::{LineIntersection, line_intersection};
use geo::{Coord, Line};
use tracing::{info, warn};

use crate::utils::{Point, bbox_overlaps, round_to};

use super::types::{IntersectionSet, LineRecord};

fn to_segment(line: &LineRecord) -> Option<Line<f64>> {
    let (x0, y0, x1, y1) = line.bbox;
    if ![x0, y0, x1, y1].iter().all(|v| v.is_finite()) {
        return None;
    }
    Some(Line::new(Coord { x: x0, y: y0 }, Coord { x: x1, y: y1 }))
}

/// Intersection of two line records, rounded to three decimals.
///
/// A crossing yields one point; a collinear overlap yields both ends of the
/// shared piece (one point when the overlap is a single point).
pub fn intersect_segments(a: &LineRecord, b: &LineRecord) -> Vec<Point> {
    let (Some(p), Some(q)) = (to_segment(a), to_segment(b)) else {
        return Vec::new();
    };
    let round = |c: Coord<f64>| (round_to(c.x, 3), round_to(c.y, 3));
    match line_intersection(p, q) {
        Some(LineIntersection::SinglePoint { intersection, .. }) => vec![round(intersection)],
        Some(LineIntersection::Collinear { intersection }) => {
            let start = round(intersection.start);
            let end = round(intersection.end);
            if start == end {
                vec![start]
            } else {
                vec![start, end]
            }
        }
        None => Vec::new(),
    }
}

/// Intersection points of one page plus the number of unusable lines.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct IntersectionReport {
    pub points: IntersectionSet,
    pub skipped: usize,
}

/// Compute all unique intersection points between the two line sets.
pub fn compute_intersections(horizontal: &[LineRecord], vertical: &[LineRecord]) -> IntersectionReport {
    let mut skipped = 0usize;
    let mut usable = |lines: &'_ [LineRecord], label: &str| {
        let mut out = Vec::with_capacity(lines.len());
        for line in lines {
            if to_segment(line).is_some() {
                out.push(line.clone());
            } else {
                warn!("skipping {label} line with non-finite bbox {:?}", line.bbox);
                skipped += 1;
            }
        }
        out
    };
    let h_lines = usable(horizontal, "horizontal");
    let v_lines = usable(vertical, "vertical");

    let mut points = IntersectionSet::new();
    for h in &h_lines {
        for v in &v_lines {
            if !bbox_overlaps(h.bbox, v.bbox) {
                continue;
            }
            for (x, y) in intersect_segments(h, v) {
                points.insert(x, y);
            }
        }
    }

    info!("found {} unique intersections", points.len());
    IntersectionReport { points, skipped }
}
