//! Layout reconstruction types.

use std::collections::BTreeSet;

use ordered_float::OrderedFloat;

use crate::utils::{HasBBox, Point, Rect, bbox_area, round_to, rounded_bbox_key};

// Key types for ordered float maps
pub(crate) type KeyF64 = OrderedFloat<f64>;
pub(crate) type KeyPoint = (KeyF64, KeyF64);

pub(crate) fn key_f64(v: f64) -> KeyF64 {
    OrderedFloat(v)
}

pub(crate) fn key_point(x: f64, y: f64) -> KeyPoint {
    (OrderedFloat(x), OrderedFloat(y))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// A straight `line` primitive as delivered by the extractor.
#[derive(Clone, Debug, PartialEq)]
pub struct RawLine {
    /// `"x0,y0,x1,y1"`, unparsed.
    pub bbox: String,
}

/// A `curve` primitive as delivered by the extractor.
#[derive(Clone, Debug, PartialEq)]
pub struct RawCurve {
    /// `"x,y,x,y,..."`, unparsed.
    pub pts: String,
}

/// A text item with its page-space box.
#[derive(Clone, Debug, PartialEq)]
pub struct TextFragment {
    pub bbox: Rect,
    pub text: String,
    pub page_number: u32,
}

impl TextFragment {
    pub fn new(bbox: Rect, text: impl Into<String>, page_number: u32) -> Self {
        Self {
            bbox,
            text: text.into(),
            page_number,
        }
    }

    /// Identity of a fragment inside a text set: exact box plus content.
    pub(crate) fn key(&self) -> TextKey {
        (bbox_key(&self.bbox), self.text.clone())
    }
}

impl HasBBox for TextFragment {
    fn bbox(&self) -> Rect {
        self.bbox
    }
}

/// All primitives of a single page.
#[derive(Clone, Debug, Default)]
pub struct PageInput {
    pub page_number: u32,
    pub width: f64,
    pub height: f64,
    pub lines: Vec<RawLine>,
    pub curves: Vec<RawCurve>,
    pub texts: Vec<TextFragment>,
}

/// An axis-aligned line produced by the primitive classifier.
#[derive(Clone, Debug, PartialEq)]
pub struct LineRecord {
    pub length: f64,
    pub bbox: Rect,
    pub orientation: Orientation,
}

impl LineRecord {
    /// Dedup identity: bbox rounded to 0.1.
    pub fn key(&self) -> String {
        rounded_bbox_key(self.bbox)
    }
}

impl HasBBox for LineRecord {
    fn bbox(&self) -> Rect {
        self.bbox
    }
}

/// Set of intersection points, rounded to three decimals.
///
/// Iteration order is the sorted `(x, y)` order, which every later stage
/// relies on for deterministic output.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IntersectionSet {
    points: BTreeSet<KeyPoint>,
}

impl IntersectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a point after rounding it to three decimals.
    pub fn insert(&mut self, x: f64, y: f64) -> bool {
        self.points.insert(key_point(round_to(x, 3), round_to(y, 3)))
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.points
            .contains(&key_point(round_to(x, 3), round_to(y, 3)))
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Point> + '_ {
        self.points.iter().map(|(x, y)| (x.into_inner(), y.into_inner()))
    }

    pub fn to_vec(&self) -> Vec<Point> {
        self.iter().collect()
    }
}

impl FromIterator<Point> for IntersectionSet {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        let mut set = Self::new();
        for (x, y) in iter {
            set.insert(x, y);
        }
        set
    }
}

/// A rectangle inferred by corner matching.
#[derive(Clone, Debug, PartialEq)]
pub struct RawRectangle {
    pub bbox: Rect,
    /// Corners in the order top-left, top-right, bottom-right, bottom-left
    /// of the normalized bbox.
    pub coords: [Point; 4],
}

impl RawRectangle {
    pub fn from_bbox(bbox: Rect) -> Self {
        let (x0, y0, x1, y1) = bbox;
        Self {
            bbox,
            coords: [(x0, y0), (x1, y0), (x1, y1), (x0, y1)],
        }
    }
}

impl HasBBox for RawRectangle {
    fn bbox(&self) -> Rect {
        self.bbox
    }
}

/// A rectangle annotated with the text fragments whose centers it contains.
#[derive(Clone, Debug, PartialEq)]
pub struct MappedRectangle {
    pub bbox: Rect,
    pub coords: [Point; 4],
    pub area: f64,
    pub texts: Vec<TextFragment>,
    /// Index of each entry of `texts` in the page's text list.
    pub sources: Vec<usize>,
}

impl MappedRectangle {
    /// Builds a mapped rectangle directly from a box and its texts, as when
    /// reading a serialized rectangle set back in.
    pub fn new(bbox: Rect, texts: Vec<TextFragment>) -> Self {
        let raw = RawRectangle::from_bbox(bbox);
        Self {
            bbox,
            coords: raw.coords,
            area: bbox_area(bbox),
            sources: (0..texts.len()).collect(),
            texts,
        }
    }
}

impl HasBBox for MappedRectangle {
    fn bbox(&self) -> Rect {
        self.bbox
    }

    fn area(&self) -> f64 {
        self.area
    }
}

/// Where a merged region came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegionKind {
    /// Union of one or more overlapping rectangles.
    Merged,
    /// Texts that sat in the overlap of two merged rectangles.
    Shared,
}

/// Output of the rectangle merger.
#[derive(Clone, Debug, PartialEq)]
pub struct MergedRegion {
    pub bbox: Rect,
    pub texts: Vec<TextFragment>,
    pub kind: RegionKind,
}

impl HasBBox for MergedRegion {
    fn bbox(&self) -> Rect {
        self.bbox
    }
}

// BBox key for hashing
#[derive(Hash, Eq, PartialEq, Clone, Copy, Debug, PartialOrd, Ord)]
pub(crate) struct BBoxKey(pub u64, pub u64, pub u64, pub u64);

pub(crate) fn bbox_key(b: &Rect) -> BBoxKey {
    BBoxKey(b.0.to_bits(), b.1.to_bits(), b.2.to_bits(), b.3.to_bits())
}

pub(crate) type TextKey = (BBoxKey, String);
