//! Parsing strategy layer.
//!
//! A registry dispatches `(bytes, file name)` to the first registered
//! strategy whose `can_parse` claims the extension. Every decode runs
//! through one fixed template: start notification, empty-input check,
//! strategy decode, post-process hook, metadata + completion notification.
//! Any failure aborts the whole parse (no partial workbook is ever
//! returned) and emits exactly one `parse:error` notification.

mod csv;
mod styles;
mod xlsx;

pub use csv::CsvStrategy;
pub use xlsx::XlsxStrategy;

use log::debug;

use crate::error::{Result, SheetviewError};
use crate::events::{EventBus, ViewerEvent};
use crate::types::{ParseMetadata, ParseResult, WorkbookRecord};

/// Milliseconds since an arbitrary per-thread origin. Used for parse timing
/// and as the host-facing clock for debounce deadlines.
#[must_use]
pub fn now_ms() -> f64 {
    use std::time::Instant;
    thread_local! {
        static START: Instant = Instant::now();
    }
    START.with(|s| s.elapsed().as_secs_f64() * 1000.0)
}

/// A format-specific decoder.
///
/// `decode` is a pure function of the input bytes; `post_process` is an
/// overridable hook with an identity default.
pub trait FormatStrategy {
    /// Whether this strategy handles the given file name (by extension).
    fn can_parse(&self, file_name: &str) -> bool;

    /// Decode the raw bytes into a canonical workbook.
    fn decode(&self, data: &[u8]) -> Result<WorkbookRecord>;

    /// Hook between decode and metadata; identity by default.
    fn post_process(&self, workbook: WorkbookRecord) -> Result<WorkbookRecord> {
        Ok(workbook)
    }
}

/// Ordered strategy registry; first match wins.
pub struct ParserRegistry {
    strategies: Vec<Box<dyn FormatStrategy>>,
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::with_default_strategies()
    }
}

impl ParserRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// A registry with the built-in container and delimited-text decoders.
    #[must_use]
    pub fn with_default_strategies() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(XlsxStrategy));
        registry.register(Box::new(CsvStrategy));
        registry
    }

    /// Append a strategy; registration order is dispatch order.
    pub fn register(&mut self, strategy: Box<dyn FormatStrategy>) {
        self.strategies.push(strategy);
    }

    /// First registered strategy claiming the file name, if any.
    #[must_use]
    pub fn strategy_for(&self, file_name: &str) -> Option<&dyn FormatStrategy> {
        self.strategies
            .iter()
            .map(AsRef::as_ref)
            .find(|s| s.can_parse(file_name))
    }

    /// Dispatch and run the parse template.
    ///
    /// Fails with `NoStrategy` before the template starts when no handler
    /// claims the extension (no lifecycle notifications in that case, as
    /// dispatch never reached a parser).
    pub fn parse(
        &self,
        data: &[u8],
        file_name: &str,
        bus: &mut EventBus,
    ) -> Result<ParseResult> {
        let Some(strategy) = self.strategy_for(file_name) else {
            return Err(SheetviewError::NoStrategy(file_name.to_string()));
        };
        run_template(strategy, data, file_name, bus)
    }
}

impl std::fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParserRegistry")
            .field("strategies", &self.strategies.len())
            .finish()
    }
}

/// The fixed parse lifecycle shared by every strategy.
fn run_template(
    strategy: &dyn FormatStrategy,
    data: &[u8],
    file_name: &str,
    bus: &mut EventBus,
) -> Result<ParseResult> {
    let start = now_ms();
    bus.emit(&ViewerEvent::ParseStart {
        file_name: file_name.to_string(),
    });

    match decode_stages(strategy, data) {
        Ok(workbook) => {
            let metadata = ParseMetadata {
                file_name: file_name.to_string(),
                file_size: data.len(),
                sheet_count: workbook.sheets.len(),
                parse_time_ms: now_ms() - start,
            };
            debug!(
                "parsed {} ({} bytes, {} sheets) in {:.1}ms",
                metadata.file_name,
                metadata.file_size,
                metadata.sheet_count,
                metadata.parse_time_ms
            );
            bus.emit(&ViewerEvent::ParseComplete {
                metadata: metadata.clone(),
            });
            Ok(ParseResult { workbook, metadata })
        }
        Err(error) => {
            bus.emit(&ViewerEvent::ParseError {
                message: error.to_string(),
            });
            Err(error)
        }
    }
}

fn decode_stages(strategy: &dyn FormatStrategy, data: &[u8]) -> Result<WorkbookRecord> {
    if data.is_empty() {
        return Err(SheetviewError::Validation("Empty file".to_string()));
    }
    let workbook = strategy.decode(data)?;
    strategy.post_process(workbook)
}
