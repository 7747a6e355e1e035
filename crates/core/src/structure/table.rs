//! Table structuring and titleblock reclassification.
//!
//! A region touching both the bottom and right frame lines is the drawing's
//! titleblock and keeps its raw cells. Any other region needs at least two
//! cells to become a table; its cells are grouped into rows by their rounded
//! top edge and ordered left to right within a row. Leftover texts above the
//! grid become the table header.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::Result;
use crate::layout::MarginLines;
use crate::layout::types::{KeyF64, key_f64};
use crate::utils::{Rect, round_to};

use super::document::{Document, NodeId, NodeKind};

/// True if the region spans the bottom frame line vertically and the right
/// frame line horizontally.
pub fn overlaps_margin_lines(bbox: Rect, margins: &MarginLines) -> bool {
    let (rx0, ry0, rx1, ry1) = bbox;
    let (_, by0, _, by1) = margins.bottom;
    let (vx0, _, vx1, _) = margins.right;
    let overlaps_bottom = ry1 >= by0 && ry0 <= by1;
    let overlaps_right = rx1 >= vx0 && rx0 <= vx1;
    overlaps_bottom && overlaps_right
}

/// Row and column counts of one structured table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableShape {
    pub id: String,
    pub rows: usize,
    /// Width of the widest row.
    pub cols: usize,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StructureReport {
    pub tables: Vec<TableShape>,
    pub titleblocks: usize,
    pub discarded: usize,
}

/// Classify every `Region` under the document root as a table, a titleblock,
/// or nothing.
pub fn structure_regions(doc: &mut Document, margins: &MarginLines) -> Result<StructureReport> {
    let mut report = StructureReport::default();

    for region in doc.children_of_kind(doc.root(), NodeKind::Region) {
        let Some(bbox) = doc.node(region).bbox else {
            doc.detach(region);
            report.discarded += 1;
            continue;
        };

        if overlaps_margin_lines(bbox, margins) {
            debug!(?bbox, "region reclassified as titleblock");
            doc.node_mut(region).kind = NodeKind::TitleBlock;
            report.titleblocks += 1;
            continue;
        }

        let cells = doc.children_of_kind(region, NodeKind::Cell);
        if cells.len() < 2 {
            debug!(?bbox, cells = cells.len(), "discarding region with too few cells");
            doc.detach(region);
            report.discarded += 1;
            continue;
        }

        let id = format!("t{}", report.tables.len());
        let node = doc.node_mut(region);
        node.kind = NodeKind::Table;
        node.id = Some(id.clone());

        let (rows, cols) = structure_rows(doc, region, &id, cells)?;
        extract_header(doc, region)?;
        report.tables.push(TableShape { id, rows, cols });
    }

    Ok(report)
}

fn x0_of(doc: &Document, id: NodeId) -> f64 {
    doc.node(id).bbox.map_or(0.0, |b| b.0)
}

/// Regroup a table's cells into `row` / `column` nodes.
///
/// Rows are ordered by descending top edge, columns by ascending left edge.
fn structure_rows(
    doc: &mut Document,
    table: NodeId,
    table_id: &str,
    cells: Vec<NodeId>,
) -> Result<(usize, usize)> {
    let mut by_top: BTreeMap<KeyF64, Vec<NodeId>> = BTreeMap::new();
    for cell in cells {
        let top = doc.node(cell).bbox.map_or(0.0, |b| round_to(b.1, 1));
        by_top.entry(key_f64(top)).or_default().push(cell);
    }

    let rows = by_top.len();
    let mut cols = 0;
    for (row_index, (_, mut row_cells)) in by_top.into_iter().rev().enumerate() {
        row_cells.sort_by(|&a, &b| x0_of(doc, a).total_cmp(&x0_of(doc, b)));
        cols = cols.max(row_cells.len());

        let row_id = format!("{table_id}_r{row_index}");
        let bbox = doc.union_bbox(&row_cells);
        let row = doc.append(table, NodeKind::Row, bbox, None);
        doc.node_mut(row).id = Some(row_id.clone());

        for (col_index, cell) in row_cells.into_iter().enumerate() {
            let node = doc.node_mut(cell);
            node.kind = NodeKind::Column;
            node.id = Some(format!("{row_id}_c{col_index}"));
            doc.move_node(cell, row)?;
        }
    }

    Ok((rows, cols))
}

/// Pull the table's loose texts that reach into the grid's top band into a
/// single `header` node placed first.
pub fn extract_header(doc: &mut Document, table: NodeId) -> Result<Option<NodeId>> {
    let Some(min_top) = doc
        .descendants_of_kind(table, NodeKind::Column)
        .into_iter()
        .filter_map(|c| doc.node(c).bbox.map(|b| b.1))
        .min_by(f64::total_cmp)
    else {
        return Ok(None);
    };

    let mut candidates: Vec<NodeId> = doc
        .children_of_kind(table, NodeKind::Text)
        .into_iter()
        .filter(|&t| doc.node(t).bbox.is_some_and(|b| b.3 > min_top))
        .collect();
    if candidates.is_empty() {
        return Ok(None);
    }
    candidates.sort_by(|&a, &b| x0_of(doc, a).total_cmp(&x0_of(doc, b)));

    let words: Vec<&str> = candidates
        .iter()
        .map(|&t| doc.text_of(t).trim())
        .filter(|s| !s.is_empty())
        .collect();
    if words.is_empty() {
        return Ok(None);
    }
    let text = words.join(" ");
    let bbox = doc.union_bbox(&candidates);

    let header = doc.create(NodeKind::Header, bbox, Some(text));
    doc.move_node_at(header, table, 0)?;
    for t in candidates {
        doc.detach(t);
    }
    Ok(Some(header))
}
