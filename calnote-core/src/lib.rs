//! Reconciliation core for calnote.
//!
//! This crate keeps a calendar service and a document database in agreement:
//! - `event` and `normalize` define the canonical event shape
//! - `store` and `snapshot` hold the converged cache, run lock and sync cursor
//! - `diff` classifies events into create/update/delete operations per side
//! - `sync` sequences fetch, diff, apply, back-propagation and cache commit
//! - `provider` is the seam the calendar and document adapters plug into

pub mod config;
pub mod date_range;
pub mod diff;
pub mod error;
pub mod event;
pub mod normalize;
pub mod provider;
pub mod snapshot;
pub mod store;
pub mod sync;

pub use event::{Event, RawEvent, Side};
