//! Single-event decision for webhook-driven passes.
//!
//! A webhook pass only sees the calendar records that changed since the last
//! sync token, so there is no cache to compare against. Each changed record is
//! matched with its document record (if any) and decided on its own.

use crate::event::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SingleDecision {
    /// Create the document record
    New,
    /// Archive the document record
    Deleted,
    /// Replace the document record with the calendar content
    Updated,
    Ignore,
}

pub fn decide_single(calendar: Option<&Event>, document: Option<&Event>) -> SingleDecision {
    match (calendar, document) {
        (Some(c), Some(_)) if c.deleted => SingleDecision::Deleted,
        (Some(_), Some(_)) => SingleDecision::Updated,
        (Some(c), None) if !c.deleted => SingleDecision::New,
        _ => SingleDecision::Ignore,
    }
}
