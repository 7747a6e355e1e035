//! Error types for drawgrid layout reconstruction.

use thiserror::Error;

/// Primary error type for layout reconstruction.
#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed bbox: {0:?}")]
    MalformedBBox(String),

    #[error("malformed point list: {0:?}")]
    MalformedPoints(String),

    #[error("no horizontal or vertical margin line candidates on page {page}")]
    MissingMarginLines { page: u32 },

    #[error("invalid layout parameters: {0}")]
    InvalidParams(String),

    #[error("thread pool error: {0}")]
    ThreadPool(String),

    #[error("invalid document: {0}")]
    InvalidDocument(String),
}

/// Convenience Result type alias for LayoutError.
pub type Result<T> = std::result::Result<T, LayoutError>;
