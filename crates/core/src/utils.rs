//! Geometry and formatting helpers shared by every stage.
//!
//! Bounding boxes are plain `(x0, y0, x1, y1)` tuples with `x1 >= x0` and
//! `y1 >= y0`. Everything that reads coordinates from the upstream extractor
//! goes through [`parse_bbox`] / [`parse_points`] so malformed input is
//! reported the same way everywhere.

use std::borrow::Cow;

use crate::error::{LayoutError, Result};

/// A 2D point (x, y).
pub type Point = (f64, f64);

/// A rectangle defined by (x0, y0, x1, y1).
pub type Rect = (f64, f64, f64, f64);

/// Anything that occupies an axis-aligned box on the page.
pub trait HasBBox {
    fn bbox(&self) -> Rect;

    fn x0(&self) -> f64 {
        self.bbox().0
    }

    fn y0(&self) -> f64 {
        self.bbox().1
    }

    fn x1(&self) -> f64 {
        self.bbox().2
    }

    fn y1(&self) -> f64 {
        self.bbox().3
    }

    fn width(&self) -> f64 {
        self.x1() - self.x0()
    }

    fn height(&self) -> f64 {
        self.y1() - self.y0()
    }

    fn area(&self) -> f64 {
        bbox_area(self.bbox())
    }
}

impl HasBBox for Rect {
    fn bbox(&self) -> Rect {
        *self
    }
}

/// Rounds `v` to `decimals` decimal places (half away from zero).
#[inline]
pub fn round_to(v: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    let rounded = (v * scale).round() / scale;
    // Normalize -0.0 so rounded keys hash identically.
    if rounded == 0.0 { 0.0 } else { rounded }
}

/// Parses a comma-separated `"x0,y0,x1,y1"` string.
pub fn parse_bbox(s: &str) -> Result<Rect> {
    let mut vals = [0.0f64; 4];
    let mut count = 0usize;
    for part in s.trim().split(',') {
        if count == 4 {
            return Err(LayoutError::MalformedBBox(s.to_string()));
        }
        let v: f64 = part
            .trim()
            .parse()
            .map_err(|_| LayoutError::MalformedBBox(s.to_string()))?;
        if !v.is_finite() {
            return Err(LayoutError::MalformedBBox(s.to_string()));
        }
        vals[count] = v;
        count += 1;
    }
    if count != 4 {
        return Err(LayoutError::MalformedBBox(s.to_string()));
    }
    Ok((vals[0], vals[1], vals[2], vals[3]))
}

/// Parses a flat `"x,y,x,y,..."` point list.
pub fn parse_points(s: &str) -> Result<Vec<Point>> {
    let vals = s
        .trim()
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<std::result::Result<Vec<f64>, _>>()
        .map_err(|_| LayoutError::MalformedPoints(s.to_string()))?;
    if vals.len() % 2 != 0 || vals.iter().any(|v| !v.is_finite()) {
        return Err(LayoutError::MalformedPoints(s.to_string()));
    }
    Ok(vals.chunks_exact(2).map(|c| (c[0], c[1])).collect())
}

/// Orders each coordinate pair so that `x0 <= x1` and `y0 <= y1`.
pub fn normalize_bbox(bbox: Rect) -> Rect {
    let (x0, y0, x1, y1) = bbox;
    (x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
}

/// Formats a bounding box with three decimals per coordinate.
pub fn bbox2str(bbox: Rect) -> String {
    let (x0, y0, x1, y1) = bbox;
    format!("{:.3},{:.3},{:.3},{:.3}", x0, y0, x1, y1)
}

/// Dedup key for a bbox: each coordinate rounded to one decimal.
pub fn rounded_bbox_key(bbox: Rect) -> String {
    let (x0, y0, x1, y1) = bbox;
    format!("{:.1},{:.1},{:.1},{:.1}", x0, y0, x1, y1)
}

pub fn bbox_area(bbox: Rect) -> f64 {
    let (x0, y0, x1, y1) = bbox;
    ((x1 - x0) * (y1 - y0)).abs()
}

pub fn bbox_center(bbox: Rect) -> Point {
    let (x0, y0, x1, y1) = bbox;
    ((x0 + x1) / 2.0, (y0 + y1) / 2.0)
}

/// Inclusive point-in-box test.
pub fn bbox_contains_point(bbox: Rect, x: f64, y: f64) -> bool {
    let (x0, y0, x1, y1) = bbox;
    x0 <= x && x <= x1 && y0 <= y && y <= y1
}

/// True if `inner` lies entirely within `outer` (shared edges allowed).
pub fn bbox_contains(outer: Rect, inner: Rect) -> bool {
    outer.0 <= inner.0 && outer.1 <= inner.1 && outer.2 >= inner.2 && outer.3 >= inner.3
}

/// True if the boxes share at least one point (touching counts).
pub fn bbox_overlaps(a: Rect, b: Rect) -> bool {
    a.0 <= b.2 && b.0 <= a.2 && a.1 <= b.3 && b.1 <= a.3
}

/// Intersection of two boxes, `None` when they are disjoint.
pub fn bbox_intersection(a: Rect, b: Rect) -> Option<Rect> {
    let x0 = a.0.max(b.0);
    let y0 = a.1.max(b.1);
    let x1 = a.2.min(b.2);
    let y1 = a.3.min(b.3);
    if x0 <= x1 && y0 <= y1 {
        Some((x0, y0, x1, y1))
    } else {
        None
    }
}

/// Bounding union of a set of boxes, `None` for an empty set.
pub fn bbox_union<I: IntoIterator<Item = Rect>>(boxes: I) -> Option<Rect> {
    boxes.into_iter().fold(None, |acc, b| match acc {
        None => Some(b),
        Some(u) => Some((u.0.min(b.0), u.1.min(b.1), u.2.max(b.2), u.3.max(b.3))),
    })
}

/// Encodes a string for XML by escaping special characters.
///
/// Returns `Cow::Borrowed` if no escaping needed (zero allocation),
/// or `Cow::Owned` with escaped string (single allocation).
pub fn enc(x: &str) -> Cow<'_, str> {
    html_escape::encode_quoted_attribute(x)
}

/// Python-style `str.isdigit()` on an already trimmed string.
pub fn is_numeric_label(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}
