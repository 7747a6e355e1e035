//! Text-to-rectangle mapping.

use rstar::{AABB, RTree, RTreeObject};
use tracing::info;

use crate::utils::{bbox_area, bbox_center};

use super::types::{MappedRectangle, RawRectangle, TextFragment};

#[derive(Clone)]
struct RectNode {
    index: usize,
    envelope: AABB<[f64; 2]>,
}

impl RectNode {
    fn new(index: usize, rect: &RawRectangle) -> Self {
        let (x0, y0, x1, y1) = rect.bbox;
        Self {
            index,
            envelope: AABB::from_corners([x0, y0], [x1, y1]),
        }
    }
}

impl RTreeObject for RectNode {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Assign every non-empty text to each rectangle containing its center.
///
/// Rectangles are returned in input order; those that receive no text are
/// dropped. A fragment may land in several overlapping rectangles.
pub fn map_texts(rects: &[RawRectangle], texts: &[TextFragment]) -> Vec<MappedRectangle> {
    let tree = RTree::bulk_load(
        rects
            .iter()
            .enumerate()
            .map(|(i, r)| RectNode::new(i, r))
            .collect(),
    );

    let mut slots: Vec<(Vec<TextFragment>, Vec<usize>)> = vec![(Vec::new(), Vec::new()); rects.len()];
    for (t_idx, text) in texts.iter().enumerate() {
        if text.text.trim().is_empty() {
            continue;
        }
        let (cx, cy) = bbox_center(text.bbox);
        if !(cx.is_finite() && cy.is_finite()) {
            continue;
        }
        for node in tree.locate_in_envelope_intersecting(&AABB::from_point([cx, cy])) {
            let (slot_texts, sources) = &mut slots[node.index];
            slot_texts.push(text.clone());
            sources.push(t_idx);
        }
    }

    let mapped: Vec<MappedRectangle> = rects
        .iter()
        .zip(slots)
        .filter(|(_, (slot_texts, _))| !slot_texts.is_empty())
        .map(|(rect, (slot_texts, sources))| MappedRectangle {
            bbox: rect.bbox,
            coords: rect.coords,
            area: bbox_area(rect.bbox),
            texts: slot_texts,
            sources,
        })
        .collect();

    info!(
        "mapped texts into {} of {} rectangles",
        mapped.len(),
        rects.len()
    );
    mapped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(bbox: (f64, f64, f64, f64), s: &str) -> TextFragment {
        TextFragment::new(bbox, s, 1)
    }

    #[test]
    fn test_center_inside_is_assigned() {
        let rects = vec![RawRectangle::from_bbox((0.0, 0.0, 100.0, 50.0))];
        let texts = vec![
            text((10.0, 10.0, 20.0, 20.0), "A"),
            text((145.0, 145.0, 155.0, 155.0), "B"),
        ];
        let mapped = map_texts(&rects, &texts);
        assert_eq!(mapped.len(), 1);
        assert_eq!(mapped[0].texts.len(), 1);
        assert_eq!(mapped[0].texts[0].text, "A");
        assert_eq!(mapped[0].sources, vec![0]);
        assert_eq!(mapped[0].area, 5000.0);
    }

    #[test]
    fn test_fragment_lands_in_every_overlapping_rectangle() {
        let rects = vec![
            RawRectangle::from_bbox((0.0, 0.0, 100.0, 50.0)),
            RawRectangle::from_bbox((90.0, 0.0, 200.0, 50.0)),
            RawRectangle::from_bbox((300.0, 0.0, 400.0, 50.0)),
        ];
        let texts = vec![text((92.0, 10.0, 98.0, 20.0), "shared")];
        let mapped = map_texts(&rects, &texts);
        assert_eq!(mapped.len(), 2);
        assert_eq!(mapped[0].bbox, (0.0, 0.0, 100.0, 50.0));
        assert_eq!(mapped[1].bbox, (90.0, 0.0, 200.0, 50.0));
    }

    #[test]
    fn test_center_on_edge_counts() {
        let rects = vec![RawRectangle::from_bbox((0.0, 0.0, 100.0, 50.0))];
        let texts = vec![text((95.0, 45.0, 105.0, 55.0), "edge")];
        assert_eq!(map_texts(&rects, &texts).len(), 1);
    }

    #[test]
    fn test_blank_texts_are_ignored() {
        let rects = vec![RawRectangle::from_bbox((0.0, 0.0, 100.0, 50.0))];
        let texts = vec![text((10.0, 10.0, 20.0, 20.0), "   ")];
        assert!(map_texts(&rects, &texts).is_empty());
    }
}
