//! Per-event results of applying a plan.

use crate::diff::{DiffKind, EventDiff};
use crate::event::Event;

#[derive(Debug, Clone)]
pub enum OutcomeStatus {
    /// The write went through; `result` is what the snapshot should now hold.
    Applied { result: Event },
    /// The record was created but the new identifier couldn't be written
    /// back to the other side. The next pass repairs the link.
    Unlinked { result: Event, reason: String },
    Failed { reason: String },
}

#[derive(Debug, Clone)]
pub struct Outcome {
    pub diff: EventDiff,
    pub status: OutcomeStatus,
}

impl Outcome {
    pub fn applied(diff: &EventDiff, result: Event) -> Self {
        Outcome {
            diff: diff.clone(),
            status: OutcomeStatus::Applied { result },
        }
    }

    pub fn unlinked(diff: &EventDiff, result: Event, reason: impl Into<String>) -> Self {
        Outcome {
            diff: diff.clone(),
            status: OutcomeStatus::Unlinked {
                result,
                reason: reason.into(),
            },
        }
    }

    pub fn failed(diff: &EventDiff, reason: impl Into<String>) -> Self {
        Outcome {
            diff: diff.clone(),
            status: OutcomeStatus::Failed {
                reason: reason.into(),
            },
        }
    }

    /// True when the target service accepted the write.
    pub fn is_written(&self) -> bool {
        !matches!(self.status, OutcomeStatus::Failed { .. })
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Applied { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match &self.status {
            OutcomeStatus::Applied { .. } => None,
            OutcomeStatus::Unlinked { reason, .. } | OutcomeStatus::Failed { reason } => {
                Some(reason)
            }
        }
    }

    /// The event to record in the next snapshot, if this outcome adds one.
    pub fn committed(&self) -> Option<&Event> {
        if self.diff.kind == DiffKind::Delete {
            return None;
        }
        match &self.status {
            OutcomeStatus::Applied { result } | OutcomeStatus::Unlinked { result, .. } => {
                Some(result)
            }
            OutcomeStatus::Failed { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Side;

    fn event() -> Event {
        Event {
            id: "g1".to_string(),
            page_id: "p1".to_string(),
            title: "Review".to_string(),
            start: "2024-01-01".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_delete_commits_nothing() {
        let diff = EventDiff::delete(Side::Document, event(), Some(event()));
        let outcome = Outcome::applied(&diff, event());
        assert!(outcome.is_success());
        assert!(outcome.committed().is_none());
    }

    #[test]
    fn test_unlinked_create_still_commits() {
        let diff = EventDiff::create(Side::Document, event().with_ids("g1", ""), None);
        let outcome = Outcome::unlinked(&diff, event(), "timeout");
        assert!(outcome.is_written());
        assert!(!outcome.is_success());
        assert_eq!(outcome.reason(), Some("timeout"));
        assert_eq!(outcome.committed().map(|e| e.page_id.as_str()), Some("p1"));
    }

    #[test]
    fn test_failed_commits_nothing() {
        let diff = EventDiff::update(Side::Calendar, event(), event(), None);
        let outcome = Outcome::failed(&diff, "rate limited");
        assert!(!outcome.is_written());
        assert!(outcome.committed().is_none());
    }
}
