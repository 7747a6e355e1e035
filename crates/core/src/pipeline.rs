//! Page orchestration.
//!
//! [`process_page`] runs the layout stages on one page, [`structure_page`]
//! turns the merged regions into a document, and [`process_pages`] runs
//! both over many pages on a rayon pool.

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::error::{LayoutError, Result};
use crate::layout::{
    ClassifiedLines, IntersectionSet, LineDedup, MappedRectangle, MergeOutcome, MergedRegion,
    Orientation, PageInput, RawRectangle, TextDedup, classify_primitives, compute_intersections,
    detect_margin_lines, detect_rectangles, filter_lines, map_texts, merge_rectangles,
};
use crate::params::LayoutParams;
use crate::stats::RunStats;
use crate::structure::{Document, StructureReport, build_document};

/// Output of the layout stages for one page.
#[derive(Debug, Clone)]
pub struct PageLayout {
    pub page_number: u32,
    pub width: f64,
    pub height: f64,
    pub lines: ClassifiedLines,
    pub intersections: IntersectionSet,
    pub rectangles: Vec<RawRectangle>,
    pub mapped: Vec<MappedRectangle>,
    pub merge: MergeOutcome,
}

impl PageLayout {
    pub fn regions(&self) -> &[MergedRegion] {
        &self.merge.regions
    }

    pub fn stats(&self, skipped_lines: usize) -> RunStats {
        let mut stats = RunStats {
            pages: 1,
            intersections: self.intersections.len(),
            rect_init: self.rectangles.len(),
            rect_merged: self.merge.regions.len(),
            margin_labels: self.merge.margin_labels,
            duplicates_removed: self.merge.duplicates_removed,
            contained_removed: self.merge.contained_removed,
            skipped_primitives: self.lines.skipped + skipped_lines,
            ..RunStats::default()
        };
        stats.add_line_counts(self.lines.horizontal.len(), self.lines.vertical.len());
        stats
    }
}

/// Structured document for one page.
#[derive(Debug, Clone)]
pub struct PageStructure {
    pub document: Document,
    pub report: StructureReport,
}

impl PageStructure {
    fn add_to(&self, stats: &mut RunStats) {
        for table in &self.report.tables {
            stats.add_table(table.rows, table.cols);
        }
        stats.titleblocks += self.report.titleblocks;
        stats.discarded_regions += self.report.discarded;
    }
}

/// Run the layout stages on one page.
///
/// `lines` and `texts` hold the dedup state and are not cleared here.
pub fn process_page(
    page: &PageInput,
    params: &LayoutParams,
    lines: &mut LineDedup,
    texts: &mut TextDedup,
) -> (PageLayout, usize) {
    let classified = classify_primitives(&page.lines, &page.curves, params, lines);

    let report = if params.filter_margin_lines {
        let horizontal = filter_lines(
            &classified.horizontal,
            Orientation::Horizontal,
            page.width,
            page.height,
            params,
        )
        .into_lines();
        let vertical = filter_lines(
            &classified.vertical,
            Orientation::Vertical,
            page.width,
            page.height,
            params,
        )
        .into_lines();
        compute_intersections(&horizontal, &vertical)
    } else {
        compute_intersections(&classified.horizontal, &classified.vertical)
    };

    let rectangles = detect_rectangles(&report.points, params);
    let mapped = map_texts(&rectangles, &page.texts);
    let merge = merge_rectangles(&mapped, Some(page.height), params, texts);

    info!(
        page = page.page_number,
        h_lines = classified.horizontal.len(),
        v_lines = classified.vertical.len(),
        intersections = report.points.len(),
        rectangles = rectangles.len(),
        merged = merge.regions.len(),
        "processed page layout"
    );

    let layout = PageLayout {
        page_number: page.page_number,
        width: page.width,
        height: page.height,
        lines: classified,
        intersections: report.points,
        rectangles,
        mapped,
        merge,
    };
    (layout, report.skipped)
}

/// Structure one page's merged regions.
///
/// Margin lines come from the page's raw `line` primitives; a page without
/// them fails with [`LayoutError::MissingMarginLines`].
pub fn structure_page(
    page: &PageInput,
    regions: &[MergedRegion],
    points: &IntersectionSet,
    params: &LayoutParams,
) -> Result<PageStructure> {
    let margins =
        detect_margin_lines(&page.lines, page.width, page.height, page.page_number, params)?;
    let (document, report) = build_document(regions, points, &margins, params)?;
    Ok(PageStructure { document, report })
}

/// Everything produced for one page by [`process_pages`].
#[derive(Debug)]
pub struct PageOutput {
    pub layout: PageLayout,
    pub structure: Option<PageStructure>,
    /// Why structuring was skipped, when it was requested and failed.
    pub failure: Option<LayoutError>,
}

#[derive(Debug)]
pub struct RunOutput {
    /// In input page order.
    pub pages: Vec<PageOutput>,
    pub stats: RunStats,
}

fn run_page(
    page: &PageInput,
    params: &LayoutParams,
    structure: bool,
    dedup: &mut (LineDedup, TextDedup),
) -> (PageOutput, RunStats) {
    dedup.0.clear();
    dedup.1.clear();
    let (layout, skipped) = process_page(page, params, &mut dedup.0, &mut dedup.1);
    let mut stats = layout.stats(skipped);

    let mut output = PageOutput {
        layout,
        structure: None,
        failure: None,
    };
    if structure {
        match structure_page(page, output.layout.regions(), &output.layout.intersections, params) {
            Ok(s) => {
                s.add_to(&mut stats);
                output.structure = Some(s);
            }
            Err(e) => {
                warn!("page {}: structuring skipped: {e}", page.page_number);
                stats.pages_failed += 1;
                output.failure = Some(e);
            }
        }
    }
    (output, stats)
}

/// Process every page in parallel.
///
/// `threads` bounds the pool; `None` uses rayon's default. When `structure`
/// is set each page is also structured; a page failing there keeps its
/// layout output and records the failure.
pub fn process_pages(
    pages: &[PageInput],
    params: &LayoutParams,
    structure: bool,
    threads: Option<usize>,
) -> Result<RunOutput> {
    params.validate()?;
    let pool = ThreadPoolBuilder::new()
        .num_threads(threads.unwrap_or(0))
        .build()
        .map_err(|e| LayoutError::ThreadPool(e.to_string()))?;

    let mut results: Vec<(usize, PageOutput, RunStats)> = pool.install(|| {
        pages
            .par_iter()
            .enumerate()
            .map_init(
                || (LineDedup::new(), TextDedup::new()),
                |dedup, (idx, page)| {
                    let (output, stats) = run_page(page, params, structure, dedup);
                    (idx, output, stats)
                },
            )
            .collect()
    });

    results.sort_by_key(|(idx, _, _)| *idx);
    let mut outputs = Vec::with_capacity(results.len());
    let mut per_page = Vec::with_capacity(results.len());
    for (_, output, stats) in results {
        outputs.push(output);
        per_page.push(stats);
    }
    let stats: RunStats = per_page.into_iter().sum();

    info!(
        pages = stats.pages,
        tables = stats.tables,
        failed = stats.pages_failed,
        "run complete"
    );
    Ok(RunOutput {
        pages: outputs,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{RawLine, TextFragment};

    fn grid_page(page_number: u32) -> PageInput {
        let line = |s: &str| RawLine { bbox: s.to_string() };
        PageInput {
            page_number,
            width: 1000.0,
            height: 1000.0,
            lines: vec![
                line("0,0,100,0"),
                line("0,50,100,50"),
                line("0,0,0,50"),
                line("100,0,100,50"),
            ],
            curves: vec![],
            texts: vec![TextFragment::new((10.0, 10.0, 20.0, 20.0), "A1", page_number)],
        }
    }

    #[test]
    fn test_process_page_counts() {
        let page = grid_page(1);
        let (layout, skipped) = process_page(
            &page,
            &LayoutParams::default(),
            &mut LineDedup::new(),
            &mut TextDedup::new(),
        );
        assert_eq!(skipped, 0);
        let stats = layout.stats(skipped);
        assert_eq!((stats.h_lines, stats.v_lines), (2, 2));
        assert_eq!(stats.intersections, 4);
        assert_eq!(stats.rect_init, 1);
        assert_eq!(stats.rect_merged, 1);
    }

    #[test]
    fn test_pages_are_independent() {
        let pages = vec![grid_page(1), grid_page(2), grid_page(3)];
        let run = process_pages(&pages, &LayoutParams::default(), false, Some(2)).unwrap();
        assert_eq!(run.pages.len(), 3);
        let numbers: Vec<u32> = run.pages.iter().map(|p| p.layout.page_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        // The same text on every page survives because dedup is per page.
        assert!(run.pages.iter().all(|p| p.layout.regions().len() == 1));
        assert_eq!(run.stats.pages, 3);
        assert_eq!(run.stats.rect_merged, 3);
    }

    #[test]
    fn test_missing_margin_lines_is_reported() {
        let mut page = grid_page(1);
        // Every line is shorter than the minimum margin line length.
        page.lines = vec![RawLine { bbox: "0,0,5,0".into() }];
        let run = process_pages(&[page], &LayoutParams::default(), true, Some(1)).unwrap();
        assert!(run.pages[0].structure.is_none());
        assert!(matches!(
            run.pages[0].failure,
            Some(LayoutError::MissingMarginLines { page: 1 })
        ));
        assert_eq!(run.stats.pages_failed, 1);
    }

    #[test]
    fn test_margin_filter_drops_lines_near_the_border() {
        let line = |s: &str| RawLine { bbox: s.to_string() };
        let page = PageInput {
            page_number: 1,
            width: 1000.0,
            height: 1000.0,
            lines: vec![
                // Frame.
                line("10,10,990,10"),
                line("10,990,990,990"),
                line("10,10,10,990"),
                line("990,10,990,990"),
                // Table outline.
                line("100,100,300,100"),
                line("100,150,300,150"),
                line("100,100,100,150"),
                line("300,100,300,150"),
                // Strays starting inside the border inset.
                line("20,120,300,120"),
                line("200,20,200,150"),
            ],
            curves: vec![],
            texts: vec![],
        };
        let run = |filter_margin_lines: bool| {
            let params = LayoutParams {
                filter_margin_lines,
                ..LayoutParams::default()
            };
            process_page(&page, &params, &mut LineDedup::new(), &mut TextDedup::new()).0
        };

        let filtered = run(true);
        assert_eq!(
            filtered.intersections.to_vec(),
            vec![
                (10.0, 10.0),
                (10.0, 990.0),
                (100.0, 100.0),
                (100.0, 150.0),
                (300.0, 100.0),
                (300.0, 150.0),
                (990.0, 10.0),
                (990.0, 990.0),
            ]
        );
        // Classification itself still sees every line.
        assert_eq!((filtered.lines.horizontal.len(), filtered.lines.vertical.len()), (5, 5));

        let unfiltered = run(false);
        assert_eq!(unfiltered.intersections.len(), 13);
        assert!(unfiltered.intersections.contains(200.0, 120.0));
    }
}
