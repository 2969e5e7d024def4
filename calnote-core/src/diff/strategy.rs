//! Knobs that select a reconciliation variant.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::event::Side;

/// Which sides may be written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    #[default]
    TwoWay,
    /// Mirror the calendar onto the document database
    CalendarToDocument,
    /// Mirror the document database onto the calendar
    DocumentToCalendar,
}

impl Direction {
    /// The mirrored side in one-way mode.
    pub fn origin(&self) -> Option<Side> {
        match self {
            Direction::TwoWay => None,
            Direction::CalendarToDocument => Some(Side::Calendar),
            Direction::DocumentToCalendar => Some(Side::Document),
        }
    }

    pub fn writes(&self, side: Side) -> bool {
        self.origin() != Some(side)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::TwoWay => write!(f, "two-way"),
            Direction::CalendarToDocument => write!(f, "calendar-to-document"),
            Direction::DocumentToCalendar => write!(f, "document-to-calendar"),
        }
    }
}

/// Who wins when both sides changed the same event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Authority {
    /// Newer `updated` timestamp wins; the document wins ties and unknowns
    #[default]
    LastEdited,
    Document,
    Calendar,
}

/// What the live sides are compared against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Baseline {
    /// Three-way against the last converged snapshot
    #[default]
    Cache,
    /// Calendar against document only
    Pairwise,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Strategy {
    pub direction: Direction,
    pub authority: Authority,
    pub baseline: Baseline,
}

impl Strategy {
    /// The side whose list seeds the cache on the first run.
    pub fn source_of_truth(&self) -> Side {
        if let Some(origin) = self.direction.origin() {
            return origin;
        }
        match self.authority {
            Authority::Calendar => Side::Calendar,
            Authority::LastEdited | Authority::Document => Side::Document,
        }
    }
}
