use std::fmt;

use serde::{Deserialize, Serialize};

use crate::diff::DiffKind;
use crate::event::{Event, Side};

/// One write against one side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDiff {
    pub kind: DiffKind,
    pub target: Side,
    /// Payload: the event to create, the full replacement for an update, or
    /// the target's record for a delete
    pub event: Event,
    /// The target's current record, for updates
    pub previous: Option<Event>,
    /// Cache entry for this event, carried forward if the write fails
    pub cached: Option<Event>,
}

impl fmt::Display for EventDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.event)
    }
}

impl EventDiff {
    pub fn create(target: Side, event: Event, cached: Option<Event>) -> Self {
        EventDiff {
            kind: DiffKind::Create,
            target,
            event,
            previous: None,
            cached,
        }
    }

    pub fn update(target: Side, event: Event, previous: Event, cached: Option<Event>) -> Self {
        EventDiff {
            kind: DiffKind::Update,
            target,
            event,
            previous: Some(previous),
            cached,
        }
    }

    pub fn delete(target: Side, event: Event, cached: Option<Event>) -> Self {
        EventDiff {
            kind: DiffKind::Delete,
            target,
            event,
            previous: None,
            cached,
        }
    }

    /// An update that only rewrites cross-references, not content.
    pub fn is_link_only(&self) -> bool {
        self.kind == DiffKind::Update && self.previous.as_ref() == Some(&self.event)
    }
}
