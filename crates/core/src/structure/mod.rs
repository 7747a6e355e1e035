//! Grid and table structuring of merged regions.
//!
//! Turns a page's merged regions into a [`Document`]: every region gets its
//! cells from the intersection points inside it, then becomes a table, a
//! titleblock, or is discarded. Text merge passes tidy the result.

pub mod cells;
pub mod cleanup;
pub mod document;
pub mod table;

pub use cells::{assign_texts_to_cells, classify_region, infer_cells, local_points};
pub use cleanup::{merge_cell_texts_by_y0, merge_column_texts};
pub use document::{Document, Node, NodeId, NodeKind};
pub use table::{StructureReport, TableShape, extract_header, overlaps_margin_lines, structure_regions};

use tracing::info;

use crate::error::Result;
use crate::layout::MarginLines;
use crate::layout::types::{IntersectionSet, MergedRegion};
use crate::params::LayoutParams;

/// Build the structured document for one page.
pub fn build_document(
    regions: &[MergedRegion],
    points: &IntersectionSet,
    margins: &MarginLines,
    params: &LayoutParams,
) -> Result<(Document, StructureReport)> {
    let mut doc = Document::from_regions(regions);
    for region in doc.children_of_kind(doc.root(), NodeKind::Region) {
        classify_region(&mut doc, region, points)?;
    }

    let report = structure_regions(&mut doc, margins)?;
    merge_column_texts(&mut doc)?;
    merge_cell_texts_by_y0(&mut doc, params.cell_text_y_tolerance)?;

    info!(
        "structured {} regions: {} tables, {} titleblocks, {} discarded",
        regions.len(),
        report.tables.len(),
        report.titleblocks,
        report.discarded
    );
    Ok((doc, report))
}
