//! Layout reconstruction parameters.
//!
//! Contains [`LayoutParams`], the tunable heuristics used by every stage.

use serde::{Deserialize, Serialize};

use crate::error::{LayoutError, Result};

// Default constants
pub(crate) const DEFAULT_AXIS_TOLERANCE: f64 = 1.5;
pub(crate) const DEFAULT_MIN_SEGMENT_LENGTH: f64 = 2.0;
pub(crate) const DEFAULT_LINE_MAX_DEVIATION: f64 = 5.0;
pub(crate) const DEFAULT_RECT_TOLERANCE: f64 = 1.5;
pub(crate) const DEFAULT_MERGE_AREA_RATIO: f64 = 0.98;

/// Parameters for layout reconstruction.
///
/// Controls how primitives become lines, how corners are matched into
/// rectangles, and how overlapping rectangles are merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutParams {
    /// A curve (or a pair of consecutive curve points) spanning less than this
    /// vertically is treated as horizontal.
    pub horizontal_tolerance: f64,

    /// A curve (or a pair of consecutive curve points) spanning less than this
    /// horizontally is treated as vertical.
    pub vertical_tolerance: f64,

    /// Minimum extent along the long axis for a primitive to become a line.
    pub min_segment_length: f64,

    /// Maximum short-axis extent of a straight `line` primitive.
    pub line_max_deviation: f64,

    /// Corner matching tolerance. Two points closer than this on either axis
    /// cannot be opposite corners, and missing corners are probed at
    /// `±rect_tolerance` on each axis.
    pub rect_tolerance: f64,

    pub min_width: f64,
    pub min_height: f64,
    pub max_width: f64,
    pub max_height: f64,

    /// An overlapping rectangle whose area is below this fraction of the
    /// current rectangle's area is left out of the merge group.
    pub merge_area_ratio: f64,

    /// Fraction of the page height at the top and bottom treated as margin.
    pub margin_label_fraction: f64,

    /// Upper bound on the text count of a margin label rectangle.
    pub margin_label_max_texts: usize,

    /// Exclude numeric margin labels from merging.
    pub suppress_margin_labels: bool,

    /// Restrict intersection candidates to the margin-filtered line set.
    pub filter_margin_lines: bool,

    pub margin_filter_min_length: f64,

    /// Inset from the page edges that filtered lines must start inside.
    pub margin_filter_inset: f64,

    /// Maximum short-axis extent of a margin line candidate.
    pub margin_line_epsilon: f64,

    pub margin_line_min_length: f64,

    /// Margin line candidates longer than this fraction of the page extent
    /// are ignored (they are the sheet border itself).
    pub margin_line_max_fraction: f64,

    /// Rounding step used to band titleblock cell texts by their top edge.
    pub cell_text_y_tolerance: f64,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            horizontal_tolerance: DEFAULT_AXIS_TOLERANCE,
            vertical_tolerance: DEFAULT_AXIS_TOLERANCE,
            min_segment_length: DEFAULT_MIN_SEGMENT_LENGTH,
            line_max_deviation: DEFAULT_LINE_MAX_DEVIATION,
            rect_tolerance: DEFAULT_RECT_TOLERANCE,
            min_width: 10.0,
            min_height: 10.0,
            max_width: 1500.0,
            max_height: 1000.0,
            merge_area_ratio: DEFAULT_MERGE_AREA_RATIO,
            margin_label_fraction: 0.05,
            margin_label_max_texts: 20,
            suppress_margin_labels: true,
            filter_margin_lines: false,
            margin_filter_min_length: 10.0,
            margin_filter_inset: 50.0,
            margin_line_epsilon: 2.0,
            margin_line_min_length: 10.0,
            margin_line_max_fraction: 0.95,
            cell_text_y_tolerance: 0.5,
        }
    }
}

impl LayoutParams {
    /// Loads parameters from a JSON document; missing fields keep defaults.
    pub fn from_json(s: &str) -> Result<Self> {
        let params: Self = serde_json::from_str(s)?;
        params.validate()?;
        Ok(params)
    }

    /// Checks that every tolerance and bound is usable.
    pub fn validate(&self) -> Result<()> {
        let non_negative = [
            ("horizontal_tolerance", self.horizontal_tolerance),
            ("vertical_tolerance", self.vertical_tolerance),
            ("min_segment_length", self.min_segment_length),
            ("line_max_deviation", self.line_max_deviation),
            ("rect_tolerance", self.rect_tolerance),
            ("min_width", self.min_width),
            ("min_height", self.min_height),
            ("margin_label_fraction", self.margin_label_fraction),
            ("margin_filter_min_length", self.margin_filter_min_length),
            ("margin_filter_inset", self.margin_filter_inset),
            ("margin_line_epsilon", self.margin_line_epsilon),
            ("margin_line_min_length", self.margin_line_min_length),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(LayoutError::InvalidParams(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        if self.min_width > self.max_width {
            return Err(LayoutError::InvalidParams(format!(
                "min_width {} exceeds max_width {}",
                self.min_width, self.max_width
            )));
        }
        if self.min_height > self.max_height {
            return Err(LayoutError::InvalidParams(format!(
                "min_height {} exceeds max_height {}",
                self.min_height, self.max_height
            )));
        }
        if !(self.merge_area_ratio > 0.0 && self.merge_area_ratio <= 1.0) {
            return Err(LayoutError::InvalidParams(format!(
                "merge_area_ratio must be in (0, 1], got {}",
                self.merge_area_ratio
            )));
        }
        if !(self.margin_line_max_fraction > 0.0 && self.margin_line_max_fraction <= 1.0) {
            return Err(LayoutError::InvalidParams(format!(
                "margin_line_max_fraction must be in (0, 1], got {}",
                self.margin_line_max_fraction
            )));
        }
        if !(self.cell_text_y_tolerance > 0.0) {
            return Err(LayoutError::InvalidParams(format!(
                "cell_text_y_tolerance must be positive, got {}",
                self.cell_text_y_tolerance
            )));
        }
        Ok(())
    }
}
