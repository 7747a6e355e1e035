//! drawgrid - table and titleblock reconstruction from engineering drawings.
//!
//! Works on the vector primitives and text boxes a PDF extractor emits for
//! each page: lines and curves become axis-aligned rules, rule crossings
//! become rectangles, texts are mapped into rectangles, overlapping
//! rectangles are merged, and the merged regions are structured into tables
//! and titleblocks.

pub mod converter;
pub mod error;
pub mod input;
pub mod layout;
pub mod params;
pub mod pipeline;
pub mod stats;
pub mod structure;
pub mod utils;

pub use error::{LayoutError, Result};
pub use params::LayoutParams;
pub use pipeline::{
    PageLayout, PageOutput, PageStructure, RunOutput, process_page, process_pages, structure_page,
};
pub use stats::{RunStats, Summary};
