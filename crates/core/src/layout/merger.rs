//! Merging of overlapping mapped rectangles into regions.
//!
//! Rectangles are visited in order. Each unused rectangle starts a merge group
//! and absorbs every later unused rectangle it overlaps, except those that are
//! markedly smaller than itself. Texts lying in the overlap of two merged
//! rectangles are pulled out into a separate shared region. Groups whose text
//! was already emitted by an earlier group are dropped, and finally merged
//! regions nested in a merged region that already carries their texts are
//! removed.

use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use tracing::{debug, info};

use crate::params::LayoutParams;
use crate::utils::{HasBBox, bbox_contains, bbox_intersection, bbox_overlaps, bbox_union, is_numeric_label};

use super::types::{MappedRectangle, MergedRegion, RegionKind, TextFragment, TextKey};

/// Trimmed text strings already emitted by an earlier merge group.
///
/// Passed in by the caller so that its lifetime (one page, one run) is
/// explicit.
#[derive(Debug, Default, Clone)]
pub struct TextDedup {
    seen: FxHashSet<String>,
}

impl TextDedup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, text: &str) -> bool {
        self.seen.contains(text.trim())
    }

    pub fn insert(&mut self, text: &str) -> bool {
        self.seen.insert(text.trim().to_string())
    }

    /// Forget every key, keeping the allocation.
    pub fn clear(&mut self) {
        self.seen.clear();
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Result of merging one page's rectangles.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MergeOutcome {
    pub regions: Vec<MergedRegion>,
    pub margin_labels: usize,
    pub duplicates_removed: usize,
    pub contained_removed: usize,
}

/// True for a small rectangle of page-number style labels near the top or
/// bottom page edge.
pub fn is_margin_label(rect: &MappedRectangle, page_height: f64, params: &LayoutParams) -> bool {
    let n = rect.texts.len();
    if n == 0 || n > params.margin_label_max_texts {
        return false;
    }
    let top = params.margin_label_fraction * page_height;
    let bottom = (1.0 - params.margin_label_fraction) * page_height;
    if !(rect.y0() < top || rect.y1() > bottom) {
        return false;
    }
    rect.texts.iter().all(|t| is_numeric_label(t.text.trim()))
}

fn significantly_smaller(r1: &MappedRectangle, r2: &MappedRectangle, ratio: f64) -> bool {
    let (a1, a2) = (r1.area(), r2.area());
    a2 < a1 && a1 > 0.0 && a2 / a1 < ratio
}

type TextSet = IndexMap<TextKey, TextFragment>;

fn region_from(kind: RegionKind, bbox: (f64, f64, f64, f64), texts: TextSet) -> MergedRegion {
    MergedRegion {
        bbox,
        texts: texts.into_values().collect(),
        kind,
    }
}

/// Merge a page's mapped rectangles.
///
/// `page_height` enables margin-label suppression when
/// `params.suppress_margin_labels` is set.
pub fn merge_rectangles(
    rects: &[MappedRectangle],
    page_height: Option<f64>,
    params: &LayoutParams,
    seen: &mut TextDedup,
) -> MergeOutcome {
    let mut outcome = MergeOutcome::default();

    let margin: Vec<bool> = rects
        .iter()
        .map(|r| match page_height {
            Some(h) if params.suppress_margin_labels => is_margin_label(r, h, params),
            _ => false,
        })
        .collect();
    for (rect, _) in rects.iter().zip(&margin).filter(|(_, m)| **m) {
        debug!("suppressing margin label rectangle {:?}", rect.bbox);
        outcome.margin_labels += 1;
    }

    let mut used = vec![false; rects.len()];
    let mut regions = Vec::new();

    for (i, r1) in rects.iter().enumerate() {
        if used[i] || margin[i] {
            continue;
        }
        used[i] = true;

        let mut boxes = vec![r1.bbox];
        let mut own: TextSet = r1.texts.iter().map(|t| (t.key(), t.clone())).collect();
        let mut shared = TextSet::new();

        for (j, r2) in rects.iter().enumerate().skip(i + 1) {
            if used[j] || margin[j] || !bbox_overlaps(r1.bbox, r2.bbox) {
                continue;
            }
            if significantly_smaller(r1, r2, params.merge_area_ratio) {
                continue;
            }
            let Some(overlap) = bbox_intersection(r1.bbox, r2.bbox) else {
                continue;
            };
            for text in &r2.texts {
                if bbox_contains(overlap, text.bbox) {
                    shared.entry(text.key()).or_insert_with(|| text.clone());
                } else {
                    own.entry(text.key()).or_insert_with(|| text.clone());
                }
            }
            boxes.push(r2.bbox);
            used[j] = true;
        }

        for key in shared.keys() {
            own.shift_remove(key);
        }

        if !own.is_empty() {
            if own.values().all(|t| seen.contains(&t.text)) {
                debug!("dropping duplicate merge group at {:?}", r1.bbox);
                outcome.duplicates_removed += 1;
            } else {
                for t in own.values() {
                    seen.insert(&t.text);
                }
                if let Some(bbox) = bbox_union(boxes) {
                    regions.push(region_from(RegionKind::Merged, bbox, own));
                }
            }
        }

        if let Some(bbox) = bbox_union(shared.values().map(|t| t.bbox)) {
            regions.push(region_from(RegionKind::Shared, bbox, shared));
        }
    }

    let before = regions.len();
    outcome.regions = remove_contained_regions(regions);
    outcome.contained_removed = before - outcome.regions.len();

    info!(
        "merged {} rectangles into {} regions ({} margin labels, {} duplicates, {} contained)",
        rects.len(),
        outcome.regions.len(),
        outcome.margin_labels,
        outcome.duplicates_removed,
        outcome.contained_removed
    );
    outcome
}

/// Drop merged regions lying inside another merged region that already
/// holds every one of their texts.
///
/// A nested region with a text the container lacks is kept, so texts are
/// never lost to the filter. Shared regions are neither dropped nor used as
/// containers.
fn remove_contained_regions(regions: Vec<MergedRegion>) -> Vec<MergedRegion> {
    let keys: Vec<FxHashSet<TextKey>> = regions
        .iter()
        .map(|r| r.texts.iter().map(TextFragment::key).collect())
        .collect();
    let contained: Vec<bool> = regions
        .iter()
        .enumerate()
        .map(|(i, r)| {
            r.kind == RegionKind::Merged
                && regions.iter().enumerate().any(|(j, other)| {
                    i != j
                        && other.kind == RegionKind::Merged
                        && bbox_contains(other.bbox, r.bbox)
                        && (other.bbox != r.bbox || j < i)
                        && keys[i].is_subset(&keys[j])
                })
        })
        .collect();

    regions
        .into_iter()
        .zip(contained)
        .filter_map(|(region, inside)| {
            if inside {
                debug!("dropping contained region {:?}", region.bbox);
                None
            } else {
                Some(region)
            }
        })
        .collect()
}
