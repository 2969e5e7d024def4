//! Seam for the calendar and document-database adapters.
//!
//! The core only ever sees canonical `Event` lists through these traits. The
//! bundled implementation, `ProviderProcess`, talks to an external executable;
//! tests plug in in-memory fakes.

mod process;
pub mod protocol;

pub use process::ProviderProcess;

use async_trait::async_trait;

use crate::date_range::DateRange;
use crate::error::CalNoteResult;
use crate::event::Event;

/// Original page size limit of the document API; also used for the calendar.
pub const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone)]
pub struct FetchFilter {
    pub window: DateRange,
    pub page_size: usize,
    /// Calendar sync token; when set, the window is ignored and only records
    /// changed since the token are returned
    pub cursor: Option<String>,
}

impl Default for FetchFilter {
    fn default() -> Self {
        FetchFilter {
            window: DateRange::default(),
            page_size: DEFAULT_PAGE_SIZE,
            cursor: None,
        }
    }
}

impl FetchFilter {
    pub fn with_cursor(&self, cursor: Option<String>) -> Self {
        FetchFilter {
            cursor,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CalendarPage {
    pub events: Vec<Event>,
    pub next_cursor: Option<String>,
}

/// Per-event writes against one service.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Create the event and return it carrying the newly assigned identifier.
    async fn create_event(&self, event: &Event) -> CalNoteResult<Event>;

    /// Replace the stored record with `event` (full replacement).
    async fn update_event(&self, event: &Event) -> CalNoteResult<()>;

    async fn delete_event(&self, event: &Event) -> CalNoteResult<()>;
}

#[async_trait]
pub trait CalendarProvider: EventSink {
    async fn fetch(&self, filter: &FetchFilter) -> CalNoteResult<CalendarPage>;
}

/// Deletes archive the page rather than removing it.
#[async_trait]
pub trait DocumentProvider: EventSink {
    async fn fetch(&self, filter: &FetchFilter) -> CalNoteResult<Vec<Event>>;
}
