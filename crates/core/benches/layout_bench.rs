use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use drawgrid_core::layout::{LineDedup, PageInput, RawLine, TextDedup, TextFragment};
use drawgrid_core::{LayoutParams, process_page, process_pages};

/// Coordinate jitter of up to ±0.1, seeded per page.
fn jitter(rng: &mut StdRng) -> f64 {
    rng.random_range(-0.1..0.1)
}

/// A page holding a `rows` × `cols` grid of 40×20 cells, one text per cell,
/// plus a frame for margin detection.
fn grid_page(page_number: u32, rows: usize, cols: usize) -> PageInput {
    let mut rng = StdRng::seed_from_u64(u64::from(page_number));
    let (x0, y0, cw, ch) = (50.0, 50.0, 40.0, 20.0);
    let x1 = x0 + cw * cols as f64;
    let y1 = y0 + ch * rows as f64;

    let mut lines = Vec::with_capacity(rows + cols + 4);
    for r in 0..=rows {
        let y = y0 + ch * r as f64 + jitter(&mut rng);
        lines.push(RawLine {
            bbox: format!("{x0:.3},{y:.3},{x1:.3},{y:.3}"),
        });
    }
    for c in 0..=cols {
        let x = x0 + cw * c as f64 + jitter(&mut rng);
        lines.push(RawLine {
            bbox: format!("{x:.3},{y0:.3},{x:.3},{y1:.3}"),
        });
    }
    lines.push(RawLine { bbox: "20,20,1170,20".into() });
    lines.push(RawLine { bbox: "1170,20,1170,820".into() });

    let mut texts = Vec::with_capacity(rows * cols);
    for r in 0..rows {
        for c in 0..cols {
            let tx = x0 + cw * c as f64 + 5.0;
            let ty = y0 + ch * r as f64 + 5.0;
            texts.push(TextFragment::new(
                (tx, ty, tx + 20.0, ty + 10.0),
                format!("R{r}C{c}"),
                page_number,
            ));
        }
    }

    PageInput {
        page_number,
        width: 1190.0,
        height: 842.0,
        lines,
        curves: Vec::new(),
        texts,
    }
}

fn bench_process_page(c: &mut Criterion) {
    let params = LayoutParams::default();
    let mut group = c.benchmark_group("layout_process_page");
    for &n in &[4usize, 8, 16] {
        let page = grid_page(1, n, n);
        group.throughput(Throughput::Elements((n * n) as u64));
        group.bench_with_input(BenchmarkId::new("grid", n), &page, |b, page| {
            b.iter(|| {
                let (layout, _) =
                    process_page(page, &params, &mut LineDedup::new(), &mut TextDedup::new());
                black_box(layout.regions().len());
            })
        });
    }
    group.finish();
}

fn bench_process_pages(c: &mut Criterion) {
    let params = LayoutParams::default();
    let pages: Vec<PageInput> = (1..=16).map(|p| grid_page(p, 10, 10)).collect();
    let mut group = c.benchmark_group("layout_process_pages");
    group.throughput(Throughput::Elements(pages.len() as u64));
    group.bench_function("full_16_pages", |b| {
        b.iter(|| {
            let run = process_pages(&pages, &params, true, None).expect("run");
            black_box(run.stats.tables);
        })
    });
    group.finish();
}

criterion_group!(benches, bench_process_page, bench_process_pages);
criterion_main!(benches);
