//! Input readers.
//!
//! - [`read_pages`]: pdfminer-style page XML from the PDF extractor
//! - [`read_rectangles`] / [`read_intersections`]: saved layout stage output

mod pdfminer;
mod rectangles;

pub use pdfminer::read_pages;
pub use rectangles::{read_intersections, read_rectangles};
