//! Provider-neutral event types.
//!
//! Both providers convert their records into `Event`, and the diff engine and
//! orchestrator work exclusively with it. `RawEvent` is the wire form the
//! provider executables speak: the title still carries its `[tag]` prefix and
//! dates are whatever the provider reported.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::normalize::{join_tag, milestone_end, normalize_date, normalize_text, parse_tag};

/// The two services being kept in sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Calendar,
    Document,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Calendar => Side::Document,
            Side::Document => Side::Calendar,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Calendar => write!(f, "calendar"),
            Side::Document => write!(f, "document"),
        }
    }
}

/// A canonical event (provider-neutral)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Event {
    /// Identifier assigned by the calendar; empty until created there
    #[serde(default)]
    pub id: String,
    /// Identifier assigned by the document database; empty until created there
    #[serde(default)]
    pub page_id: String,
    pub title: String,
    #[serde(default)]
    pub tag: String,
    pub start: String,
    #[serde(default)]
    pub end: String,
    #[serde(default)]
    pub is_milestone: bool,
    /// Soft-deletion marker reported by the calendar (cancelled events)
    #[serde(default)]
    pub deleted: bool,
    /// Last edit time reported by the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
}

/// Sync equality: content only. Identifiers, flags and timestamps are ignored.
impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.title == other.title
            && self.tag == other.tag
            && self.start == other.start
            && self.end == other.end
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", join_tag(&self.title, &self.tag))
    }
}

impl Event {
    /// Build a normalized event from provider output.
    pub fn from_raw(raw: RawEvent) -> Event {
        let (tag, title) = parse_tag(&raw.title);
        let start = normalize_date(&raw.start);
        let end = if raw.is_milestone {
            milestone_end(&start)
        } else {
            normalize_date(&raw.end)
        };

        Event {
            id: normalize_text(&raw.id),
            page_id: normalize_text(&raw.page_id),
            title,
            tag,
            start,
            end,
            is_milestone: raw.is_milestone,
            deleted: raw.deleted,
            updated: raw.updated,
        }
    }

    /// Provider-bound form, with the tag folded back into the title.
    pub fn to_raw(&self) -> RawEvent {
        RawEvent {
            id: self.id.clone(),
            page_id: self.page_id.clone(),
            title: join_tag(&self.title, &self.tag),
            start: self.start.clone(),
            end: self.end.clone(),
            is_milestone: self.is_milestone,
            deleted: self.deleted,
            updated: self.updated,
        }
    }

    /// The identifier this side assigned, or an empty string.
    pub fn id_on(&self, side: Side) -> &str {
        match side {
            Side::Calendar => &self.id,
            Side::Document => &self.page_id,
        }
    }

    pub fn is_linked(&self) -> bool {
        !self.id.is_empty() && !self.page_id.is_empty()
    }

    /// This event's content carried under the given identifiers.
    pub fn with_ids(&self, id: &str, page_id: &str) -> Event {
        Event {
            id: id.to_string(),
            page_id: page_id.to_string(),
            ..self.clone()
        }
    }

    /// Label for logs: whichever identifiers are known.
    pub fn key(&self) -> String {
        match (self.id.is_empty(), self.page_id.is_empty()) {
            (false, false) => format!("{}/{}", self.id, self.page_id),
            (false, true) => self.id.clone(),
            (true, false) => format!("page:{}", self.page_id),
            (true, true) => "(unidentified)".to_string(),
        }
    }
}

/// Event as exchanged with provider executables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub page_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
    #[serde(default)]
    pub is_milestone: bool,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
}
