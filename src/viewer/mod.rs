//! Viewer facade and interaction controllers.
//!
//! `SheetViewer` coordinates the pieces a host needs: the instance-owned
//! event bus, the parser registry, acquisition-time validation, and the
//! current workbook (replaced wholesale on every load, last-writer-wins).

mod scroll;
mod selection;

pub use scroll::{ScrollState, ViewportController, VisibleRange, SCROLL_DEBOUNCE_MS};
pub use selection::{CellFormatter, SelectionController, SelectionPhase};

use crate::error::{Result, SheetviewError};
use crate::events::{EventBus, EventCallback, EventKind, SubscriptionId, ViewerEvent};
use crate::parser::ParserRegistry;
use crate::types::{ParseResult, SheetRecord, WorkbookRecord};

/// Acquisition-time validation settings.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Lowercased extension allow-list, leading dot included.
    pub supported_extensions: Vec<String>,
    /// Size ceiling in bytes.
    pub max_file_size: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            supported_extensions: vec![
                ".xlsx".to_string(),
                ".xls".to_string(),
                ".csv".to_string(),
            ],
            max_file_size: 50 * 1024 * 1024,
        }
    }
}

/// Top-level coordinator: bus, registry, validation, current workbook.
#[derive(Debug)]
pub struct SheetViewer {
    bus: EventBus,
    registry: ParserRegistry,
    config: LoaderConfig,
    current: Option<ParseResult>,
}

impl Default for SheetViewer {
    fn default() -> Self {
        Self::new()
    }
}

impl SheetViewer {
    /// A viewer with the default strategies and loader settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(LoaderConfig::default())
    }

    #[must_use]
    pub fn with_config(config: LoaderConfig) -> Self {
        Self {
            bus: EventBus::new(),
            registry: ParserRegistry::with_default_strategies(),
            config,
            current: None,
        }
    }

    /// Validate a file name and size against the acquisition settings.
    ///
    /// Failures emit `file:error` and return a `Validation` error.
    pub fn validate_file(&mut self, file_name: &str, file_size: usize) -> Result<()> {
        let lower = file_name.to_ascii_lowercase();
        let supported = self
            .config
            .supported_extensions
            .iter()
            .any(|ext| lower.ends_with(ext.as_str()));
        if !supported {
            let message = format!(
                "Unsupported file format. Supported formats: {}",
                self.config.supported_extensions.join(", ")
            );
            self.bus.emit(&ViewerEvent::FileError {
                message: message.clone(),
            });
            return Err(SheetviewError::Validation(message));
        }

        if file_size > self.config.max_file_size {
            let message = format!(
                "File size exceeds the limit ({} bytes)",
                self.config.max_file_size
            );
            self.bus.emit(&ViewerEvent::FileError {
                message: message.clone(),
            });
            return Err(SheetviewError::Validation(message));
        }

        Ok(())
    }

    /// Validate, parse, and store the result as the current workbook.
    pub fn load_file(&mut self, data: &[u8], file_name: &str) -> Result<&ParseResult> {
        self.validate_file(file_name, data.len())?;
        self.bus.emit(&ViewerEvent::FileLoaded {
            file_name: file_name.to_string(),
        });

        let result = self.registry.parse(data, file_name, &mut self.bus)?;
        // Wholesale replacement: last writer wins, never partial
        Ok(self.current.insert(result))
    }

    /// The current parse result, if a load has succeeded.
    #[must_use]
    pub fn parse_result(&self) -> Option<&ParseResult> {
        self.current.as_ref()
    }

    /// The current workbook, if a load has succeeded.
    #[must_use]
    pub fn workbook(&self) -> Option<&WorkbookRecord> {
        self.current.as_ref().map(|r| &r.workbook)
    }

    /// The active sheet of the current workbook.
    #[must_use]
    pub fn active_sheet(&self) -> Option<&SheetRecord> {
        self.workbook().and_then(WorkbookRecord::active_sheet)
    }

    /// Switch the active sheet; emits `sheet:change`.
    pub fn set_active_sheet(&mut self, index: usize) -> Result<()> {
        let Some(result) = self.current.as_mut() else {
            return Err(SheetviewError::Validation(
                "no workbook loaded".to_string(),
            ));
        };
        if index >= result.workbook.sheets.len() {
            return Err(SheetviewError::Validation(format!(
                "sheet index {index} out of range"
            )));
        }
        result.workbook.active_sheet_index = index;
        self.bus.emit(&ViewerEvent::SheetChange { index });
        Ok(())
    }

    /// Subscribe to one event kind.
    pub fn on(&mut self, kind: EventKind, callback: EventCallback) -> SubscriptionId {
        self.bus.on(kind, callback)
    }

    /// Subscribe to every event kind.
    pub fn on_any(&mut self, callback: EventCallback) -> SubscriptionId {
        self.bus.on_any(callback)
    }

    /// Unsubscribe.
    pub fn off(&mut self, id: SubscriptionId) -> bool {
        self.bus.off(id)
    }

    /// The bus, for controllers that emit through this viewer.
    pub fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    /// The strategy registry, for registering additional formats.
    pub fn registry_mut(&mut self) -> &mut ParserRegistry {
        &mut self.registry
    }
}
