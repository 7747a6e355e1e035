//! Page margin lines.
//!
//! Drawings carry a frame just inside the sheet border. Its longest lines
//! bound the titleblock, which sits against the bottom and right frame edges.

use tracing::{debug, warn};

use crate::error::{LayoutError, Result};
use crate::params::LayoutParams;
use crate::utils::{Rect, normalize_bbox, parse_bbox};

use super::types::{LineRecord, Orientation, RawLine};

/// Lines kept by [`filter_lines`] for one orientation.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MarginFilter {
    /// The two longest lines.
    pub margin: Vec<LineRecord>,
    /// Lines that start inside the inset page area, excluding `margin`.
    pub filtered: Vec<LineRecord>,
}

impl MarginFilter {
    /// Filtered lines followed by the margin lines.
    pub fn into_lines(self) -> Vec<LineRecord> {
        let mut lines = self.filtered;
        lines.extend(self.margin);
        lines
    }
}

/// Split one orientation's lines into margin lines and interior lines.
pub fn filter_lines(
    lines: &[LineRecord],
    orientation: Orientation,
    page_width: f64,
    page_height: f64,
    params: &LayoutParams,
) -> MarginFilter {
    let mut order: Vec<usize> = (0..lines.len()).collect();
    // Stable, so equal lengths keep input order.
    order.sort_by(|&a, &b| lines[b].length.total_cmp(&lines[a].length));
    let margin_idx: Vec<usize> = order.into_iter().take(2).collect();

    let inset = params.margin_filter_inset;
    let filtered = lines
        .iter()
        .enumerate()
        .filter(|(i, _)| !margin_idx.contains(i))
        .map(|(_, l)| l)
        .filter(|l| l.length >= params.margin_filter_min_length)
        .filter(|l| {
            let (start, extent) = match orientation {
                Orientation::Horizontal => (l.bbox.0, page_width),
                Orientation::Vertical => (l.bbox.1, page_height),
            };
            inset < start && start < extent - inset
        })
        .cloned()
        .collect();

    MarginFilter {
        margin: margin_idx.iter().map(|&i| lines[i].clone()).collect(),
        filtered,
    }
}

/// Bottom and right frame lines of a page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarginLines {
    pub bottom: Rect,
    pub right: Rect,
}

/// Find the page's longest horizontal and vertical frame lines.
///
/// Only straight `line` primitives are considered. Lines spanning nearly the
/// whole page are the sheet border and are ignored.
pub fn detect_margin_lines(
    lines: &[RawLine],
    page_width: f64,
    page_height: f64,
    page: u32,
    params: &LayoutParams,
) -> Result<MarginLines> {
    let eps = params.margin_line_epsilon;
    let min_len = params.margin_line_min_length;
    let mut bottom: Option<(f64, Rect)> = None;
    let mut right: Option<(f64, Rect)> = None;

    for line in lines {
        let bbox = match parse_bbox(&line.bbox) {
            Ok(bbox) => normalize_bbox(bbox),
            Err(e) => {
                warn!("ignoring margin line candidate: {e}");
                continue;
            }
        };
        let (x0, y0, x1, y1) = bbox;
        let (slot, length, limit) = if y1 - y0 < eps {
            (&mut bottom, x1 - x0, params.margin_line_max_fraction * page_width)
        } else if x1 - x0 < eps {
            (&mut right, y1 - y0, params.margin_line_max_fraction * page_height)
        } else {
            continue;
        };
        if length < min_len || length > limit {
            continue;
        }
        if slot.is_none_or(|(best, _)| length > best) {
            *slot = Some((length, bbox));
        }
    }

    match (bottom, right) {
        (Some((_, bottom)), Some((_, right))) => {
            debug!(page, ?bottom, ?right, "detected margin lines");
            Ok(MarginLines { bottom, right })
        }
        _ => Err(LayoutError::MissingMarginLines { page }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(bbox: Rect, orientation: Orientation) -> LineRecord {
        let length = match orientation {
            Orientation::Horizontal => bbox.2 - bbox.0,
            Orientation::Vertical => bbox.3 - bbox.1,
        };
        LineRecord {
            length,
            bbox,
            orientation,
        }
    }

    fn raw(bbox: &str) -> RawLine {
        RawLine {
            bbox: bbox.to_string(),
        }
    }

    #[test]
    fn test_filter_lines_keeps_two_longest_and_interior() {
        let h = Orientation::Horizontal;
        let lines = vec![
            record((20.0, 10.0, 980.0, 10.0), h),
            record((60.0, 100.0, 200.0, 100.0), h),
            record((20.0, 990.0, 970.0, 990.0), h),
            record((10.0, 500.0, 300.0, 500.0), h),
            record((100.0, 600.0, 105.0, 600.0), h),
        ];
        let out = filter_lines(&lines, h, 1000.0, 1000.0, &LayoutParams::default());
        assert_eq!(out.margin, vec![lines[0].clone(), lines[2].clone()]);
        assert_eq!(out.filtered, vec![lines[1].clone()]);
        assert_eq!(out.into_lines().len(), 3);
    }

    #[test]
    fn test_detect_margin_lines() {
        let lines = vec![
            raw("0,0,1000,0"),
            raw("20,950,900,950.5"),
            raw("20,900,400,900"),
            raw("950,20,950,900"),
            raw("bogus"),
        ];
        let margins = detect_margin_lines(&lines, 1000.0, 1000.0, 1, &LayoutParams::default())
            .unwrap();
        assert_eq!(margins.bottom, (20.0, 950.0, 900.0, 950.5));
        assert_eq!(margins.right, (950.0, 20.0, 950.0, 900.0));
    }

    #[test]
    fn test_missing_margin_lines_is_an_error() {
        let lines = vec![raw("20,950,900,950")];
        let err = detect_margin_lines(&lines, 1000.0, 1000.0, 3, &LayoutParams::default())
            .unwrap_err();
        assert!(matches!(err, LayoutError::MissingMarginLines { page: 3 }));
    }
}
