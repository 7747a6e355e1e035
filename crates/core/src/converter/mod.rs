//! Output writers.
//!
//! - [`XmlWriter`]: rectangle sets, intersection sets and structured documents

mod xml;

pub use xml::{XmlWriter, document_to_string, intersections_to_string, regions_to_string};
