//! Typed notification channel.
//!
//! The bus is an instance-owned subscriber registry: it is constructed and
//! torn down with the component that owns it, never a process-wide
//! singleton. Events are a closed enum so subscribers match exhaustively.

use crate::types::ParseMetadata;
use crate::viewer::VisibleRange;
use std::cell::RefCell;
use std::rc::Rc;

/// Discriminant used for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    FileLoaded,
    FileError,
    ParseStart,
    ParseComplete,
    ParseError,
    SheetChange,
    CellSelect,
    Scroll,
    Zoom,
}

/// Notifications produced by the core components.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerEvent {
    /// Acquisition accepted a file for parsing.
    FileLoaded { file_name: String },
    /// Acquisition rejected a file (unsupported extension, size ceiling).
    FileError { message: String },
    /// The parse template started on a file.
    ParseStart { file_name: String },
    /// A parse finished; the workbook itself travels in the call result.
    ParseComplete { metadata: ParseMetadata },
    /// A parse failed. Emitted exactly once per failed attempt.
    ParseError { message: String },
    /// The active sheet index changed.
    SheetChange { index: usize },
    /// A cell became the selection anchor (0-indexed grid coordinates).
    CellSelect { row: u32, col: u32 },
    /// The debounced visible range was recomputed.
    Scroll { visible_range: VisibleRange },
    /// Zoom input pass-through; no geometry effect in this core.
    Zoom { delta: f64 },
}

impl ViewerEvent {
    /// The kind tag of this event.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            ViewerEvent::FileLoaded { .. } => EventKind::FileLoaded,
            ViewerEvent::FileError { .. } => EventKind::FileError,
            ViewerEvent::ParseStart { .. } => EventKind::ParseStart,
            ViewerEvent::ParseComplete { .. } => EventKind::ParseComplete,
            ViewerEvent::ParseError { .. } => EventKind::ParseError,
            ViewerEvent::SheetChange { .. } => EventKind::SheetChange,
            ViewerEvent::CellSelect { .. } => EventKind::CellSelect,
            ViewerEvent::Scroll { .. } => EventKind::Scroll,
            ViewerEvent::Zoom { .. } => EventKind::Zoom,
        }
    }
}

/// Callback type for receiving events.
pub type EventCallback = Box<dyn FnMut(&ViewerEvent)>;

/// Handle returned by subscription; used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

struct Subscriber {
    id: SubscriptionId,
    /// `None` subscribes to every event kind.
    filter: Option<EventKind>,
    callback: EventCallback,
}

/// Instance-owned publish/subscribe registry.
#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    subscribers: Vec<Subscriber>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to one event kind.
    pub fn on(&mut self, kind: EventKind, callback: EventCallback) -> SubscriptionId {
        self.subscribe(Some(kind), callback)
    }

    /// Subscribe to every event kind.
    pub fn on_any(&mut self, callback: EventCallback) -> SubscriptionId {
        self.subscribe(None, callback)
    }

    fn subscribe(&mut self, filter: Option<EventKind>, callback: EventCallback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push(Subscriber {
            id,
            filter,
            callback,
        });
        id
    }

    /// Unsubscribe. Returns `false` when the id was already gone.
    pub fn off(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    /// Deliver an event to every matching subscriber, in subscription order.
    pub fn emit(&mut self, event: &ViewerEvent) {
        let kind = event.kind();
        for subscriber in &mut self.subscribers {
            if subscriber.filter.is_none() || subscriber.filter == Some(kind) {
                (subscriber.callback)(event);
            }
        }
    }

    /// Number of subscribers that would receive the given kind.
    #[must_use]
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscribers
            .iter()
            .filter(|s| s.filter.is_none() || s.filter == Some(kind))
            .count()
    }

    /// Drop all subscribers.
    pub fn clear(&mut self) {
        self.subscribers.clear();
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

/// Records every delivered event; for tests and diagnostics.
#[derive(Debug, Clone, Default)]
pub struct EventCollector {
    events: Rc<RefCell<Vec<ViewerEvent>>>,
}

impl EventCollector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A callback that appends every event to this collector.
    #[must_use]
    pub fn handle(&self) -> EventCallback {
        let events = Rc::clone(&self.events);
        Box::new(move |event| events.borrow_mut().push(event.clone()))
    }

    /// Snapshot of collected events.
    #[must_use]
    pub fn events(&self) -> Vec<ViewerEvent> {
        self.events.borrow().clone()
    }

    /// Kinds of collected events, in delivery order.
    #[must_use]
    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.borrow().iter().map(ViewerEvent::kind).collect()
    }

    /// Number of collected events of one kind.
    #[must_use]
    pub fn count_of(&self, kind: EventKind) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|e| e.kind() == kind)
            .count()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}
