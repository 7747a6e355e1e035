//! Text merge passes run after structuring. Both passes are idempotent.

use indexmap::IndexMap;
use itertools::Itertools;

use crate::error::Result;
use crate::layout::types::{KeyF64, key_f64};

use super::document::{Document, NodeId, NodeKind};

/// Replace `texts` under `parent` with a single node joining them left to
/// right.
fn replace_with_joined(doc: &mut Document, parent: NodeId, mut texts: Vec<NodeId>) -> Result<()> {
    texts.sort_by(|&a, &b| {
        let ax = doc.node(a).bbox.map_or(0.0, |r| r.0);
        let bx = doc.node(b).bbox.map_or(0.0, |r| r.0);
        ax.total_cmp(&bx)
    });
    let joined = texts
        .iter()
        .map(|&t| doc.text_of(t).trim())
        .filter(|s| !s.is_empty())
        .join(" ");
    let bbox = doc.union_bbox(&texts);
    for &t in &texts {
        doc.detach(t);
    }
    let merged = doc.create(NodeKind::Text, bbox, Some(joined));
    doc.move_node(merged, parent)
}

/// Join every column's texts into one. Returns the number of columns changed.
pub fn merge_column_texts(doc: &mut Document) -> Result<usize> {
    let mut changed = 0;
    for column in doc.descendants_of_kind(doc.root(), NodeKind::Column) {
        let texts = doc.children_of_kind(column, NodeKind::Text);
        if texts.len() <= 1 {
            continue;
        }
        replace_with_joined(doc, column, texts)?;
        changed += 1;
    }
    Ok(changed)
}

/// Join the texts of each cell that share a top edge, banded by `y_tol`.
///
/// Bands keep the order in which they first appear. Returns the number of
/// cells changed.
pub fn merge_cell_texts_by_y0(doc: &mut Document, y_tol: f64) -> Result<usize> {
    let mut changed = 0;
    for cell in doc.descendants_of_kind(doc.root(), NodeKind::Cell) {
        let texts = doc.children_of_kind(cell, NodeKind::Text);
        if texts.len() <= 1 {
            continue;
        }

        let mut bands: IndexMap<KeyF64, Vec<NodeId>> = IndexMap::new();
        for &t in &texts {
            let y0 = doc.node(t).bbox.map_or(0.0, |r| r.1);
            let band = (y0 / y_tol).round() * y_tol;
            bands.entry(key_f64(band)).or_default().push(t);
        }
        if bands.len() == texts.len() {
            continue;
        }

        for group in bands.into_values() {
            replace_with_joined(doc, cell, group)?;
        }
        changed += 1;
    }
    Ok(changed)
}
