//! Summary of one sync pass.

use std::time::Duration;

use crate::diff::{DiffKind, Direction, SyncPlan};
use crate::event::Side;
use crate::sync::Outcome;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SideCounts {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
}

impl SideCounts {
    pub fn total(&self) -> usize {
        self.created + self.updated + self.deleted
    }
}

/// A write that didn't fully go through.
#[derive(Debug, Clone)]
pub struct Failure {
    pub target: Side,
    pub kind: DiffKind,
    pub event: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub direction: Direction,
    /// The pass only seeded the snapshot
    pub bootstrapped: bool,
    pub calendar: SideCounts,
    pub document: SideCounts,
    /// What the pass set out to write
    pub plan: SyncPlan,
    pub unchanged: usize,
    pub purged: usize,
    pub failures: Vec<Failure>,
    /// Number of events in the committed snapshot, if one was committed
    pub committed: Option<usize>,
    pub duration: Duration,
}

impl SyncReport {
    pub fn bootstrap(direction: Direction, seeded: usize) -> Self {
        SyncReport {
            direction,
            bootstrapped: true,
            committed: Some(seeded),
            ..Default::default()
        }
    }

    /// Tally written outcomes per side and collect the ones that failed.
    pub fn record(&mut self, outcomes: &[Outcome]) {
        for outcome in outcomes {
            if outcome.is_written() {
                let counts = match outcome.diff.target {
                    Side::Calendar => &mut self.calendar,
                    Side::Document => &mut self.document,
                };
                match outcome.diff.kind {
                    DiffKind::Create => counts.created += 1,
                    DiffKind::Update => counts.updated += 1,
                    DiffKind::Delete => counts.deleted += 1,
                }
            }

            if let Some(reason) = outcome.reason() {
                self.failures.push(Failure {
                    target: outcome.diff.target,
                    kind: outcome.diff.kind,
                    event: outcome.diff.event.to_string(),
                    reason: reason.to_string(),
                });
            }
        }
    }

    pub fn counts(&self, side: Side) -> SideCounts {
        match side {
            Side::Calendar => self.calendar,
            Side::Document => self.document,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn writes(&self) -> usize {
        self.calendar.total() + self.document.total()
    }
}
