//! Reconciliation: classify events from both services and the cache into
//! create/update/delete operations per side.

mod diff_kind;
mod engine;
mod event_diff;
mod single;
mod strategy;

pub use diff_kind::DiffKind;
pub use engine::{DiffEngine, SyncPlan};
pub use event_diff::EventDiff;
pub use single::{SingleDecision, decide_single};
pub use strategy::{Authority, Baseline, Direction, Strategy};
