//! Aggregate run statistics.
//!
//! Each page produces its own [`RunStats`]; a run sums them.

use std::io::Write;
use std::iter::Sum;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::utils::round_to;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub pages: usize,
    pub h_lines: usize,
    pub v_lines: usize,
    pub intersections: usize,
    pub rect_init: usize,
    pub rect_merged: usize,
    pub margin_labels: usize,
    pub duplicates_removed: usize,
    pub contained_removed: usize,
    /// Malformed primitives and unusable lines.
    pub skipped_primitives: usize,
    pub tables: usize,
    pub titleblocks: usize,
    pub discarded_regions: usize,
    /// Pages whose structuring failed.
    pub pages_failed: usize,
    pub row_counts: Vec<usize>,
    pub col_counts: Vec<usize>,
}

impl RunStats {
    pub fn add_line_counts(&mut self, h: usize, v: usize) {
        self.h_lines += h;
        self.v_lines += v;
    }

    pub fn add_table(&mut self, rows: usize, cols: usize) {
        self.tables += 1;
        self.row_counts.push(rows);
        self.col_counts.push(cols);
    }

    pub fn merge(&mut self, other: RunStats) {
        self.pages += other.pages;
        self.h_lines += other.h_lines;
        self.v_lines += other.v_lines;
        self.intersections += other.intersections;
        self.rect_init += other.rect_init;
        self.rect_merged += other.rect_merged;
        self.margin_labels += other.margin_labels;
        self.duplicates_removed += other.duplicates_removed;
        self.contained_removed += other.contained_removed;
        self.skipped_primitives += other.skipped_primitives;
        self.tables += other.tables;
        self.titleblocks += other.titleblocks;
        self.discarded_regions += other.discarded_regions;
        self.pages_failed += other.pages_failed;
        self.row_counts.extend(other.row_counts);
        self.col_counts.extend(other.col_counts);
    }

    pub fn avg_rows(&self) -> f64 {
        mean(&self.row_counts)
    }

    pub fn avg_cols(&self) -> f64 {
        mean(&self.col_counts)
    }

    pub fn summary(&self) -> Summary {
        Summary {
            pages: self.pages,
            h_lines: self.h_lines,
            v_lines: self.v_lines,
            intersections: self.intersections,
            rect_init: self.rect_init,
            rect_merged: self.rect_merged,
            margin_labels: self.margin_labels,
            duplicates_removed: self.duplicates_removed,
            contained_removed: self.contained_removed,
            skipped_primitives: self.skipped_primitives,
            tables: self.tables,
            titleblocks: self.titleblocks,
            discarded_regions: self.discarded_regions,
            pages_failed: self.pages_failed,
            avg_rows: self.avg_rows(),
            avg_cols: self.avg_cols(),
        }
    }
}

impl Sum for RunStats {
    fn sum<I: Iterator<Item = RunStats>>(iter: I) -> Self {
        iter.fold(RunStats::default(), |mut acc, s| {
            acc.merge(s);
            acc
        })
    }
}

/// Mean rounded to two decimals, 0 for an empty list.
fn mean(values: &[usize]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let total: usize = values.iter().sum();
    round_to(total as f64 / values.len() as f64, 2)
}

/// Report-ready view of [`RunStats`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub pages: usize,
    pub h_lines: usize,
    pub v_lines: usize,
    pub intersections: usize,
    pub rect_init: usize,
    pub rect_merged: usize,
    pub margin_labels: usize,
    pub duplicates_removed: usize,
    pub contained_removed: usize,
    pub skipped_primitives: usize,
    pub tables: usize,
    pub titleblocks: usize,
    pub discarded_regions: usize,
    pub pages_failed: usize,
    pub avg_rows: f64,
    pub avg_cols: f64,
}

impl Summary {
    /// `(metric, value)` rows in report order.
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Pages processed", self.pages.to_string()),
            ("Total lines", format!("{} / {}", self.h_lines, self.v_lines)),
            ("Intersections", self.intersections.to_string()),
            ("Rectangles initial", self.rect_init.to_string()),
            ("Rectangles retained", self.rect_merged.to_string()),
            ("Margin labels suppressed", self.margin_labels.to_string()),
            ("Duplicate tables removed", self.duplicates_removed.to_string()),
            ("Contained rectangles removed", self.contained_removed.to_string()),
            ("Skipped primitives", self.skipped_primitives.to_string()),
            ("Tables", self.tables.to_string()),
            ("Titleblocks", self.titleblocks.to_string()),
            ("Regions discarded", self.discarded_regions.to_string()),
            ("Pages failed", self.pages_failed.to_string()),
            ("Avg rows per table", self.avg_rows.to_string()),
            ("Avg cols per table", self.avg_cols.to_string()),
        ]
    }

    /// Write `Metric,Value` CSV.
    pub fn write_csv<W: Write>(&self, out: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(out);
        wtr.write_record(["Metric", "Value"])?;
        for (metric, value) in self.rows() {
            wtr.write_record([metric, value.as_str()])?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_and_averages() {
        let mut a = RunStats {
            pages: 1,
            ..RunStats::default()
        };
        a.add_table(3, 2);
        a.add_line_counts(10, 4);
        let mut b = RunStats {
            pages: 1,
            ..RunStats::default()
        };
        b.add_table(2, 2);
        b.add_table(2, 3);

        let total: RunStats = vec![a, b].into_iter().sum();
        assert_eq!(total.pages, 2);
        assert_eq!(total.tables, 3);
        assert_eq!(total.h_lines, 10);
        assert_eq!(total.avg_rows(), 2.33);
        assert_eq!(total.avg_cols(), 2.33);
    }

    #[test]
    fn test_no_tables_average_zero() {
        let stats = RunStats::default();
        assert_eq!(stats.summary().avg_rows, 0.0);
    }

    #[test]
    fn test_summary_csv() {
        let mut stats = RunStats {
            pages: 2,
            ..RunStats::default()
        };
        stats.add_line_counts(7, 5);
        stats.add_table(4, 2);

        let mut out = Vec::new();
        stats.summary().write_csv(&mut out).unwrap();
        let csv = String::from_utf8(out).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("Metric,Value"));
        assert_eq!(lines.next(), Some("Pages processed,2"));
        assert_eq!(lines.next(), Some("Total lines,7 / 5"));
        assert!(csv.contains("Avg rows per table,4\n"));
    }

    #[test]
    fn test_summary_reports_skip_counts() {
        let a = RunStats {
            pages: 1,
            margin_labels: 3,
            discarded_regions: 1,
            ..RunStats::default()
        };
        let b = RunStats {
            pages: 1,
            margin_labels: 1,
            discarded_regions: 2,
            ..RunStats::default()
        };
        let summary = vec![a, b].into_iter().sum::<RunStats>().summary();
        assert_eq!((summary.margin_labels, summary.discarded_regions), (4, 3));

        let rows = summary.rows();
        assert!(rows.contains(&("Margin labels suppressed", "4".to_string())));
        assert!(rows.contains(&("Regions discarded", "3".to_string())));

        let json = summary.to_json().unwrap();
        assert!(json.contains("\"margin_labels\": 4"));
        assert!(json.contains("\"discarded_regions\": 3"));
    }
}
