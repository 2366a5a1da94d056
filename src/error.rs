//! Structured error types for sheetview.
//!
//! One crate-wide taxonomy: acquisition-time validation, parse-time decode
//! failure, and missing-strategy dispatch all surface as typed failures.

/// All errors that can occur while loading and decoding spreadsheet input.
#[derive(Debug, thiserror::Error)]
pub enum SheetviewError {
    /// Input rejected before decoding: empty buffer, unsupported extension,
    /// or a file over the configured size ceiling.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// No registered format strategy claims the file's extension.
    #[error("No parser found for file: {0}")]
    NoStrategy(String),

    /// Malformed container or decode failure inside a format strategy.
    #[error("Parse error: {0}")]
    Parse(String),

    /// XML parsing error from quick-xml.
    #[error("XML parsing: {0}")]
    Xml(#[from] quick_xml::Error),

    /// ZIP archive error.
    #[error("ZIP archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// CSV record decoding error.
    #[error("CSV decoding: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SheetviewError>;
