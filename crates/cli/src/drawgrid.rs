//! drawgrid - reconstruct tables and titleblocks from engineering drawings
//!
//! Reads the pdfminer-style XML of one or more drawings and writes, per page,
//! the merged rectangle set, the intersection points and the structured
//! table/titleblock document.

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, ValueEnum};
use drawgrid_core::converter::XmlWriter;
use drawgrid_core::input::{read_intersections, read_pages, read_rectangles};
use drawgrid_core::layout::PageInput;
use drawgrid_core::{LayoutError, LayoutParams, RunStats, process_pages, structure_page};
use memmap2::Mmap;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Which stages to run.
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
enum Stage {
    /// Stages 1-5: write rectangle and intersection sets
    Layout,
    /// Stage 6 from previously written rectangle and intersection sets
    Structure,
    /// Every stage in memory
    #[default]
    Full,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SummaryFormat {
    Csv,
    Json,
}

/// Reconstruct tables and titleblocks from pdfminer XML.
#[derive(Parser, Debug)]
#[command(name = "drawgrid")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// One or more pdfminer XML files
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Use debug logging level
    #[arg(short = 'd', long, action = ArgAction::SetTrue)]
    debug: bool,

    /// Directory for per-page output
    #[arg(short = 'o', long = "output-dir", default_value = "drawgrid_output")]
    output_dir: PathBuf,

    /// Stages to run
    #[arg(long, value_enum, default_value = "full")]
    stage: Stage,

    /// JSON file with layout parameters
    #[arg(long)]
    config: Option<PathBuf>,

    /// Corner matching tolerance
    #[arg(long = "rect-tolerance")]
    rect_tolerance: Option<f64>,

    /// Area ratio below which an overlapping rectangle is not merged
    #[arg(long = "merge-area-ratio")]
    merge_area_ratio: Option<f64>,

    /// Number of worker threads (default: all cores)
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Keep numeric margin label rectangles
    #[arg(long = "no-margin-labels", action = ArgAction::SetTrue)]
    no_margin_labels: bool,

    /// Remove control characters from XML output
    #[arg(short = 'S', long = "strip-control", action = ArgAction::SetTrue)]
    strip_control: bool,

    /// Write a run summary to the output directory
    #[arg(long, value_enum)]
    summary: Option<SummaryFormat>,
}

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Build layout parameters from the config file and overrides.
fn build_params(args: &Args) -> Result<LayoutParams> {
    let mut params = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            LayoutParams::from_json(&json)?
        }
        None => LayoutParams::default(),
    };
    if let Some(tol) = args.rect_tolerance {
        params.rect_tolerance = tol;
    }
    if let Some(ratio) = args.merge_area_ratio {
        params.merge_area_ratio = ratio;
    }
    if args.no_margin_labels {
        params.suppress_margin_labels = false;
    }
    params.validate()?;
    Ok(params)
}

fn load_pages(path: &Path) -> Result<Vec<PageInput>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    // SAFETY: the mapping is read-only and dropped before returning.
    let mmap = unsafe { Mmap::map(&file) }?;
    let xml = std::str::from_utf8(&mmap)
        .with_context(|| format!("{} is not valid UTF-8", path.display()))?;
    Ok(read_pages(xml)?)
}

/// File stem per page: `pNNNN` from the page number, with the 1-based
/// position appended when a number repeats within one input.
fn page_stems(pages: &[PageInput]) -> Vec<String> {
    let mut seen = HashSet::new();
    pages
        .iter()
        .enumerate()
        .map(|(i, page)| {
            let number = page.page_number;
            if seen.insert(number) {
                format!("p{number:04}")
            } else {
                let stem = format!("p{number:04}_{}", i + 1);
                warn!("page number {number} repeats at position {}, writing {stem}", i + 1);
                stem
            }
        })
        .collect()
}

fn page_path(dir: &Path, stem: &str, label: &str) -> PathBuf {
    dir.join(format!("{stem}_{label}.xml"))
}

fn create_writer(path: &Path, strip_control: bool) -> Result<XmlWriter<BufWriter<File>>> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    Ok(XmlWriter::with_options(BufWriter::new(file), strip_control))
}

fn output_dir_for(args: &Args, input: &Path) -> Result<PathBuf> {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_string());
    let dir = args.output_dir.join(stem);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    Ok(dir)
}

/// Run the layout stages, and structuring for `Stage::Full`.
fn run_in_memory(args: &Args, params: &LayoutParams, input: &Path) -> Result<RunStats> {
    let pages = load_pages(input)?;
    info!("loaded {} pages from {}", pages.len(), input.display());
    let dir = output_dir_for(args, input)?;

    let full = args.stage == Stage::Full;
    let run = process_pages(&pages, params, full, args.threads)?;
    let stems = page_stems(&pages);

    for (page, stem) in run.pages.iter().zip(&stems) {
        let number = page.layout.page_number;
        let mut w = create_writer(&page_path(&dir, stem, "rectangles"), args.strip_control)?;
        w.write_regions(page.layout.regions())?;
        w.flush()?;

        let mut w = create_writer(&page_path(&dir, stem, "intersections"), false)?;
        w.write_intersections(&page.layout.intersections)?;
        w.flush()?;

        if let Some(structure) = &page.structure {
            let mut w = create_writer(&page_path(&dir, stem, "structured"), args.strip_control)?;
            w.write_document(&structure.document)?;
            w.flush()?;
        }
        if let Some(e) = &page.failure {
            error!("page {number} of {}: {e}", input.display());
        }
    }
    Ok(run.stats)
}

/// Structure pages from rectangle and intersection sets written earlier.
fn run_structure(args: &Args, params: &LayoutParams, input: &Path) -> Result<RunStats> {
    let pages = load_pages(input)?;
    let dir = output_dir_for(args, input)?;
    let mut stats = RunStats::default();

    for (page, stem) in pages.iter().zip(page_stems(&pages)) {
        let number = page.page_number;
        let rect_path = page_path(&dir, &stem, "rectangles");
        let point_path = page_path(&dir, &stem, "intersections");
        if !rect_path.exists() || !point_path.exists() {
            warn!("no layout output for page {number} in {}", dir.display());
            continue;
        }
        stats.pages += 1;

        let regions = read_rectangles(&std::fs::read_to_string(&rect_path)?, number)?;
        let points = read_intersections(&std::fs::read_to_string(&point_path)?)?;
        stats.rect_merged += regions.len();
        stats.intersections += points.len();

        match structure_page(page, &regions, &points, params) {
            Ok(structure) => {
                for table in &structure.report.tables {
                    stats.add_table(table.rows, table.cols);
                }
                stats.titleblocks += structure.report.titleblocks;
                stats.discarded_regions += structure.report.discarded;

                let mut w =
                    create_writer(&page_path(&dir, &stem, "structured"), args.strip_control)?;
                w.write_document(&structure.document)?;
                w.flush()?;
            }
            Err(e @ LayoutError::MissingMarginLines { .. }) => {
                error!("page {number} of {}: {e}", input.display());
                stats.pages_failed += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(stats)
}

fn write_summary(args: &Args, format: SummaryFormat, stats: &RunStats) -> Result<()> {
    let summary = stats.summary();
    match format {
        SummaryFormat::Csv => {
            let path = args.output_dir.join("summary.csv");
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            summary.write_csv(BufWriter::new(file))?;
        }
        SummaryFormat::Json => {
            let path = args.output_dir.join("summary.json");
            std::fs::write(&path, summary.to_json()?)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
    }

    let mut out = std::io::stdout().lock();
    writeln!(out, "Pipeline summary:")?;
    for (metric, value) in summary.rows() {
        writeln!(out, "  {metric}: {value}")?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug);

    let params = build_params(&args)?;
    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("failed to create {}", args.output_dir.display()))?;

    let mut stats = RunStats::default();
    for path in &args.files {
        if !path.exists() {
            bail!("file not found: {}", path.display());
        }
        let file_stats = match args.stage {
            Stage::Layout | Stage::Full => run_in_memory(&args, &params, path),
            Stage::Structure => run_structure(&args, &params, path),
        }
        .with_context(|| format!("error processing {}", path.display()))?;
        stats.merge(file_stats);
    }

    if let Some(format) = args.summary {
        write_summary(&args, format, &stats)?;
    }
    info!(
        "processed {} pages: {} tables, {} titleblocks",
        stats.pages, stats.tables, stats.titleblocks
    );
    Ok(())
}
