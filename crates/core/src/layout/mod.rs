//! Layout reconstruction: primitives to merged rectangular regions.
//!
//! The stages run strictly in order:
//! - [`classify_primitives`]: line/curve primitives to horizontal and vertical lines
//! - [`compute_intersections`]: H×V intersection points
//! - [`detect_rectangles`]: corner matching and containment pruning
//! - [`map_texts`]: text fragments into rectangles by center point
//! - [`merge_rectangles`]: overlap merging, shared texts, dedup
//!
//! [`margins`] holds the frame-line helpers used by the structurer.

mod intersections;
mod mapper;
pub mod margins;
mod merger;
mod primitives;
mod rectangles;
pub mod types;

pub use intersections::{IntersectionReport, compute_intersections, intersect_segments};
pub use mapper::map_texts;
pub use margins::{MarginFilter, MarginLines, detect_margin_lines, filter_lines};
pub use merger::{MergeOutcome, TextDedup, is_margin_label, merge_rectangles};
pub use primitives::{
    ClassifiedLines, LineDedup, classify_line, classify_primitives, line_like_orientation,
};
pub use rectangles::{detect_rectangles, remove_contained};
pub use types::{
    IntersectionSet, LineRecord, MappedRectangle, MergedRegion, Orientation, PageInput, RawCurve,
    RawLine, RawRectangle, RegionKind, TextFragment,
};
