//! Grid cells inside a region.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::Result;
use crate::layout::types::{IntersectionSet, KeyF64, key_f64};
use crate::utils::{Point, Rect, bbox_contains, bbox_contains_point};

use super::document::{Document, NodeId, NodeKind};

/// Intersection points inside `bbox`, edges included, in sorted order.
pub fn local_points(points: &IntersectionSet, bbox: Rect) -> Vec<Point> {
    points
        .iter()
        .filter(|&(x, y)| bbox_contains_point(bbox, x, y))
        .collect()
}

/// Candidate cells spanned by a point, its nearest right neighbour on the
/// same y and its nearest lower neighbour on the same x.
pub fn infer_cells(points: &[Point]) -> Vec<Rect> {
    let mut by_y: BTreeMap<KeyF64, Vec<f64>> = BTreeMap::new();
    let mut by_x: BTreeMap<KeyF64, Vec<f64>> = BTreeMap::new();
    for &(x, y) in points {
        by_y.entry(key_f64(y)).or_default().push(x);
        by_x.entry(key_f64(x)).or_default().push(y);
    }

    let next_above = |values: Option<&Vec<f64>>, v: f64| {
        values.and_then(|vs| {
            vs.iter()
                .copied()
                .filter(|&o| o > v)
                .min_by(f64::total_cmp)
        })
    };

    points
        .iter()
        .filter_map(|&(x0, y0)| {
            let right = next_above(by_y.get(&key_f64(y0)), x0)?;
            let below = next_above(by_x.get(&key_f64(x0)), y0)?;
            Some((x0, y0, right, below))
        })
        .collect()
}

/// Move each direct text of `region` into the first candidate cell that
/// fully contains it.
///
/// Only cells that receive at least one text become `Cell` nodes. Returns
/// the number of cells created.
pub fn assign_texts_to_cells(doc: &mut Document, region: NodeId, cells: &[Rect]) -> Result<usize> {
    let mut pending = doc.children_of_kind(region, NodeKind::Text);
    let mut created = 0;

    for &cell in cells {
        let (inside, rest): (Vec<NodeId>, Vec<NodeId>) = pending
            .into_iter()
            .partition(|&t| doc.node(t).bbox.is_some_and(|b| bbox_contains(cell, b)));
        pending = rest;
        if inside.is_empty() {
            continue;
        }

        let cell_node = doc.append(region, NodeKind::Cell, Some(cell), None);
        for text in inside {
            doc.move_node(text, cell_node)?;
        }
        created += 1;
    }

    debug!(cells = created, "assigned texts to cells");
    Ok(created)
}

/// Attach a region's grid: infer its cells from the intersection points
/// inside it and move its texts into them.
pub fn classify_region(doc: &mut Document, region: NodeId, points: &IntersectionSet) -> Result<usize> {
    let Some(bbox) = doc.node(region).bbox else {
        return Ok(0);
    };
    let local = local_points(points, bbox);
    let cells = infer_cells(&local);
    assign_texts_to_cells(doc, region, &cells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::types::TextFragment;

    fn grid(xs: &[f64], ys: &[f64]) -> IntersectionSet {
        xs.iter()
            .flat_map(|&x| ys.iter().map(move |&y| (x, y)))
            .collect()
    }

    #[test]
    fn test_infer_cells_on_grid() {
        let points = grid(&[0.0, 50.0, 100.0], &[0.0, 20.0]).to_vec();
        let cells = infer_cells(&points);
        assert_eq!(cells, vec![(0.0, 0.0, 50.0, 20.0), (50.0, 0.0, 100.0, 20.0)]);
    }

    #[test]
    fn test_local_points_include_edges() {
        let points = grid(&[0.0, 50.0, 200.0], &[0.0, 20.0]);
        assert_eq!(local_points(&points, (0.0, 0.0, 50.0, 20.0)).len(), 4);
    }

    #[test]
    fn test_texts_move_into_first_containing_cell() {
        let mut doc = Document::new();
        let root = doc.root();
        let region = doc.append(root, NodeKind::Region, Some((0.0, 0.0, 100.0, 20.0)), None);
        let a = doc.append_text(region, &TextFragment::new((5.0, 5.0, 15.0, 15.0), "a", 1));
        let b = doc.append_text(region, &TextFragment::new((55.0, 5.0, 65.0, 15.0), "b", 1));
        let wide = doc.append_text(region, &TextFragment::new((40.0, 5.0, 60.0, 15.0), "w", 1));

        let points = grid(&[0.0, 50.0, 100.0], &[0.0, 20.0]);
        let created = classify_region(&mut doc, region, &points).unwrap();
        assert_eq!(created, 2);

        let cells = doc.children_of_kind(region, NodeKind::Cell);
        assert_eq!(doc.children(cells[0]), &[a]);
        assert_eq!(doc.children(cells[1]), &[b]);
        assert_eq!(doc.children_of_kind(region, NodeKind::Text), vec![wide]);
    }
}
