//! Primitive classification: raw `line`/`curve` primitives to axis-aligned lines.
//!
//! Straight lines are accepted when they are long on one axis and thin on the
//! other. Curves are either collapsed whole into a single synthetic line
//! (hand-drawn jitter is averaged out) or scanned pair by pair for short
//! straight runs. Every accepted line is deduplicated by its bbox rounded to
//! 0.1, regardless of which primitive produced it.

use rustc_hash::FxHashSet;
use tracing::{debug, warn};

use crate::params::LayoutParams;
use crate::utils::{Point, Rect, normalize_bbox, parse_bbox, parse_points, round_to};

use super::types::{LineRecord, Orientation, RawCurve, RawLine};

/// Dedup state for accepted lines.
///
/// Owned by the caller so that each page can be classified independently.
#[derive(Debug, Default, Clone)]
pub struct LineDedup {
    seen: FxHashSet<String>,
}

impl LineDedup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a key, returning false if it was already present.
    fn register(&mut self, key: String) -> bool {
        self.seen.insert(key)
    }

    /// Forget every key, keeping the allocation.
    pub fn clear(&mut self) {
        self.seen.clear();
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Horizontal and vertical lines of one page.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ClassifiedLines {
    pub horizontal: Vec<LineRecord>,
    pub vertical: Vec<LineRecord>,
    /// Primitives dropped because their coordinates could not be parsed.
    pub skipped: usize,
}

impl ClassifiedLines {
    fn push(&mut self, record: LineRecord, seen: &mut LineDedup) {
        if !seen.register(record.key()) {
            return;
        }
        match record.orientation {
            Orientation::Horizontal => self.horizontal.push(record),
            Orientation::Vertical => self.vertical.push(record),
        }
    }
}

/// Classify one page's line and curve primitives.
pub fn classify_primitives(
    lines: &[RawLine],
    curves: &[RawCurve],
    params: &LayoutParams,
    seen: &mut LineDedup,
) -> ClassifiedLines {
    let mut out = ClassifiedLines::default();

    for line in lines {
        let bbox = match parse_bbox(&line.bbox) {
            Ok(bbox) => normalize_bbox(bbox),
            Err(e) => {
                warn!("skipping line primitive: {e}");
                out.skipped += 1;
                continue;
            }
        };
        if let Some(record) = classify_line(bbox, params) {
            out.push(record, seen);
        }
    }

    for curve in curves {
        let points = match parse_points(&curve.pts) {
            Ok(points) => points,
            Err(e) => {
                warn!("skipping curve primitive: {e}");
                out.skipped += 1;
                continue;
            }
        };

        if let Some(record) = collapse_curve(&points, params) {
            out.push(record, seen);
            continue;
        }

        for pair in points.windows(2) {
            if let Some(record) = classify_segment(pair[0], pair[1], params) {
                out.push(record, seen);
            }
        }
    }

    debug!(
        horizontal = out.horizontal.len(),
        vertical = out.vertical.len(),
        skipped = out.skipped,
        "classified primitives"
    );
    out
}

/// Classify a straight `line` primitive by its (normalized) bbox.
pub fn classify_line(bbox: Rect, params: &LayoutParams) -> Option<LineRecord> {
    let (x0, y0, x1, y1) = bbox;
    let dx = (x1 - x0).abs();
    let dy = (y1 - y0).abs();

    if dx >= params.min_segment_length && dy < params.line_max_deviation {
        Some(LineRecord {
            length: round_to(dx, 4),
            bbox,
            orientation: Orientation::Horizontal,
        })
    } else if dy >= params.min_segment_length && dx < params.line_max_deviation {
        Some(LineRecord {
            length: round_to(dy, 4),
            bbox,
            orientation: Orientation::Vertical,
        })
    } else {
        None
    }
}

/// Orientation of a whole curve whose points all fit in a thin box.
pub fn line_like_orientation(points: &[Point], params: &LayoutParams) -> Option<Orientation> {
    if points.len() < 2 {
        return None;
    }
    let (min_x, max_x, min_y, max_y) = extents(points);
    let dx = max_x - min_x;
    let dy = max_y - min_y;

    if dx >= params.min_segment_length && dy < params.horizontal_tolerance {
        Some(Orientation::Horizontal)
    } else if dy >= params.min_segment_length && dx < params.vertical_tolerance {
        Some(Orientation::Vertical)
    } else {
        None
    }
}

/// Collapse a globally line-like curve to one line at the mean short-axis
/// coordinate.
fn collapse_curve(points: &[Point], params: &LayoutParams) -> Option<LineRecord> {
    let orientation = line_like_orientation(points, params)?;
    let (min_x, max_x, min_y, max_y) = extents(points);
    let n = points.len() as f64;

    let record = match orientation {
        Orientation::Horizontal => {
            let y = round_to(points.iter().map(|p| p.1).sum::<f64>() / n, 3);
            LineRecord {
                length: round_to(max_x - min_x, 4),
                bbox: (round_to(min_x, 3), y, round_to(max_x, 3), y),
                orientation,
            }
        }
        Orientation::Vertical => {
            let x = round_to(points.iter().map(|p| p.0).sum::<f64>() / n, 3);
            LineRecord {
                length: round_to(max_y - min_y, 4),
                bbox: (x, round_to(min_y, 3), x, round_to(max_y, 3)),
                orientation,
            }
        }
    };
    (record.length >= params.min_segment_length).then_some(record)
}

/// Classify the segment between two consecutive curve points.
fn classify_segment(a: Point, b: Point, params: &LayoutParams) -> Option<LineRecord> {
    let dx = (b.0 - a.0).abs();
    let dy = (b.1 - a.1).abs();

    if dx >= params.min_segment_length && dy < params.horizontal_tolerance {
        let y = round_to((a.1 + b.1) / 2.0, 3);
        Some(LineRecord {
            length: round_to(dx, 4),
            bbox: (round_to(a.0.min(b.0), 3), y, round_to(a.0.max(b.0), 3), y),
            orientation: Orientation::Horizontal,
        })
    } else if dy >= params.min_segment_length && dx < params.vertical_tolerance {
        let x = round_to((a.0 + b.0) / 2.0, 3);
        Some(LineRecord {
            length: round_to(dy, 4),
            bbox: (x, round_to(a.1.min(b.1), 3), x, round_to(a.1.max(b.1), 3)),
            orientation: Orientation::Vertical,
        })
    } else {
        None
    }
}

fn extents(points: &[Point]) -> (f64, f64, f64, f64) {
    points.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY),
        |(min_x, max_x, min_y, max_y), &(x, y)| {
            (min_x.min(x), max_x.max(x), min_y.min(y), max_y.max(y))
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(bbox: &str) -> RawLine {
        RawLine {
            bbox: bbox.to_string(),
        }
    }

    fn curve(pts: &str) -> RawCurve {
        RawCurve {
            pts: pts.to_string(),
        }
    }

    fn classify(lines: &[RawLine], curves: &[RawCurve]) -> ClassifiedLines {
        classify_primitives(lines, curves, &LayoutParams::default(), &mut LineDedup::new())
    }

    #[test]
    fn test_straight_lines_by_extent() {
        let out = classify(
            &[
                line("0,10,100,10.5"),
                line("20,0,21,80"),
                line("0,0,1,1"),
                line("0,0,50,50"),
            ],
            &[],
        );
        assert_eq!(out.horizontal.len(), 1);
        assert_eq!(out.horizontal[0].length, 100.0);
        assert_eq!(out.vertical.len(), 1);
        assert_eq!(out.vertical[0].length, 80.0);
    }

    #[test]
    fn test_line_like_curve_uses_mean_short_axis() {
        let out = classify(&[], &[curve("0,10,50,10.6,100,10.2")]);
        assert_eq!(out.horizontal.len(), 1);
        let h = &out.horizontal[0];
        assert_eq!(h.bbox, (0.0, 10.267, 100.0, 10.267));
        assert_eq!(h.length, 100.0);
        assert!(out.vertical.is_empty());
    }

    #[test]
    fn test_curve_segments_scanned_when_not_line_like() {
        // An open box drawn as one path: right, down, left.
        let out = classify(&[], &[curve("0,0,40,0,40,30,0,30")]);
        assert_eq!(out.horizontal.len(), 2);
        assert_eq!(out.vertical.len(), 1);
        assert_eq!(out.vertical[0].bbox, (40.0, 0.0, 40.0, 30.0));
    }

    #[test]
    fn test_dedup_across_line_and_curve() {
        let out = classify(&[line("0,10,100,10")], &[curve("0,10.02,100,10.04")]);
        assert_eq!(out.horizontal.len(), 1);
    }

    #[test]
    fn test_malformed_primitives_are_skipped() {
        let out = classify(
            &[line("0,10,abc,10"), line("0,10,100,10")],
            &[curve("1,2,3"), curve("0,0,0,50")],
        );
        assert_eq!(out.skipped, 2);
        assert_eq!(out.horizontal.len(), 1);
        assert_eq!(out.vertical.len(), 1);
    }

    #[test]
    fn test_classification_is_repeatable() {
        let lines = vec![line("0,0,100,0"), line("0,0,0,50"), line("0,0,100,0.01")];
        let curves = vec![curve("100,0,100,50"), curve("0,50,100,50")];
        let first = classify(&lines, &curves);
        let second = classify(&lines, &curves);
        assert_eq!(first, second);
        assert_eq!(first.horizontal.len(), 2);
        assert_eq!(first.vertical.len(), 2);
    }
}
