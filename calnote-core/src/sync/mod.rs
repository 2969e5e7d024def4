//! Sync passes: fetch both services, diff against the snapshot, apply the
//! plan and commit the next snapshot.
//!
//! Every write pass holds the run lock. Writes are applied in phases
//! (deletes, then updates, then creates). Within a phase, per-event requests
//! run concurrently and the whole phase is joined before the next one starts.
//! A single failed write never aborts the pass. A failed fetch does, and
//! nothing is committed.

mod outcome;
mod report;

pub use outcome::{Outcome, OutcomeStatus};
pub use report::{Failure, SideCounts, SyncReport};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use futures_util::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::diff::{
    Baseline, DiffEngine, DiffKind, EventDiff, SingleDecision, Strategy, SyncPlan, decide_single,
};
use crate::error::{CalNoteError, CalNoteResult};
use crate::event::{Event, Side};
use crate::provider::{CalendarPage, CalendarProvider, DocumentProvider, FetchFilter};
use crate::snapshot::{Snapshot, SnapshotCache};
use crate::store::{KeyValueStore, RunLock, Slots, SyncCursor};

pub const DEFAULT_CONCURRENCY: usize = 8;

pub struct Orchestrator {
    calendar: Arc<dyn CalendarProvider>,
    document: Arc<dyn DocumentProvider>,
    cache: SnapshotCache,
    lock: RunLock,
    cursor: SyncCursor,
    strategy: Strategy,
    filter: FetchFilter,
    concurrency: usize,
}

impl Orchestrator {
    pub fn new(
        calendar: Arc<dyn CalendarProvider>,
        document: Arc<dyn DocumentProvider>,
        store: Arc<dyn KeyValueStore>,
        slots: &Slots,
    ) -> Self {
        Orchestrator {
            calendar,
            document,
            cache: SnapshotCache::new(store.clone(), slots.snapshot.as_str()),
            lock: RunLock::new(store.clone(), slots.lock.as_str()),
            cursor: SyncCursor::new(store, slots.cursor.as_str()),
            strategy: Strategy::default(),
            filter: FetchFilter::default(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_filter(mut self, filter: FetchFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    pub fn lock(&self) -> &RunLock {
        &self.lock
    }

    pub fn cursor(&self) -> &SyncCursor {
        &self.cursor
    }

    fn engine(&self) -> DiffEngine {
        DiffEngine::new(self.strategy).with_window(self.filter.window.clone())
    }

    /// Compute what a full pass would do without writing anything.
    ///
    /// Returns `None` when there is no snapshot yet and the next pass would
    /// only bootstrap.
    pub async fn plan(&self) -> CalNoteResult<Option<SyncPlan>> {
        let (page, document) = self.fetch_both().await?;
        let calendar = page.events;

        let snapshot = self.cache.get()?;
        if snapshot.is_none() && self.strategy.baseline == Baseline::Cache {
            return Ok(None);
        }

        Ok(Some(self.engine().diff(&calendar, &document, snapshot.as_ref())))
    }

    /// Full reconciliation pass.
    pub async fn sync(&self) -> CalNoteResult<SyncReport> {
        let started = Instant::now();
        let guard = self.lock.acquire()?;

        info!(
            direction = %self.strategy.direction,
            window = %self.filter.window,
            "Starting sync pass"
        );

        let (page, document) = self.fetch_both().await?;
        if let Some(next) = &page.next_cursor {
            self.cursor.save(next)?;
        }
        let calendar = page.events;

        let snapshot = match self.strategy.baseline {
            Baseline::Cache => self.cache.get()?,
            Baseline::Pairwise => None,
        };

        if snapshot.is_none() && self.strategy.baseline == Baseline::Cache {
            let source = self.strategy.source_of_truth();
            let seed: Vec<Event> = match source {
                Side::Calendar => calendar,
                Side::Document => document,
            }
            .into_iter()
            .filter(|e| !e.deleted)
            .collect();

            info!(%source, events = seed.len(), "No snapshot, seeding without writes");
            let seeded = seed.len();
            self.cache.put(&Snapshot::new(seed))?;
            guard.release()?;

            let mut report = SyncReport::bootstrap(self.strategy.direction, seeded);
            report.duration = started.elapsed();
            return Ok(report);
        }

        let plan = self.engine().diff(&calendar, &document, snapshot.as_ref());
        let (c, u, d) = plan.counts(Side::Calendar);
        debug!(create = c, update = u, delete = d, "Planned calendar writes");
        let (c, u, d) = plan.counts(Side::Document);
        debug!(create = c, update = u, delete = d, "Planned document writes");

        let outcomes = self.apply(&plan).await;
        let next = fold_outcomes(&plan.unchanged, &outcomes);

        let mut report = SyncReport {
            direction: self.strategy.direction,
            unchanged: plan.unchanged.len(),
            purged: plan.purged.len(),
            committed: Some(next.len()),
            plan,
            ..Default::default()
        };
        report.record(&outcomes);

        self.cache.put(&Snapshot::new(next))?;
        guard.release()?;

        report.duration = started.elapsed();
        info!(
            writes = report.writes(),
            failures = report.failures.len(),
            elapsed_ms = report.duration.as_millis() as u64,
            "Sync pass finished"
        );

        Ok(report)
    }

    /// Webhook pass: apply only the calendar records changed since the stored
    /// sync token, writing to the document side.
    ///
    /// The returned token is persisted as soon as the fetch succeeds, whatever
    /// happens to the writes.
    pub async fn sync_changed(&self) -> CalNoteResult<SyncReport> {
        if !self.strategy.direction.writes(Side::Document) {
            return Err(CalNoteError::Config(format!(
                "Webhook passes write to the document side, but direction is {}",
                self.strategy.direction
            )));
        }

        let started = Instant::now();
        let guard = self.lock.acquire()?;

        let token = self.cursor.load()?;
        debug!(has_token = token.is_some(), "Fetching changed calendar events");

        let page = self.calendar.fetch(&self.filter.with_cursor(token)).await?;
        if let Some(next) = &page.next_cursor {
            self.cursor.save(next)?;
        }

        let mut report = SyncReport {
            direction: self.strategy.direction,
            ..Default::default()
        };

        if page.events.is_empty() {
            guard.release()?;
            report.duration = started.elapsed();
            return Ok(report);
        }

        info!(changed = page.events.len(), "Applying changed calendar events");

        let document = self.document.fetch(&self.filter).await?;
        let snapshot = self.cache.get()?;

        let plan = SyncPlan {
            to_document: changed_diffs(&page.events, &document, snapshot.as_ref()),
            ..Default::default()
        };

        let outcomes = self.apply(&plan).await;
        report.record(&outcomes);
        report.plan = plan;

        // Without a snapshot the next full pass bootstraps from scratch.
        if let Some(snapshot) = snapshot {
            let next = merge_changed(snapshot.events, &outcomes);
            report.committed = Some(next.len());
            self.cache.put(&Snapshot::new(next))?;
        }

        guard.release()?;
        report.duration = started.elapsed();

        Ok(report)
    }

    async fn fetch_both(&self) -> CalNoteResult<(CalendarPage, Vec<Event>)> {
        let (page, document) = futures_util::try_join!(
            self.calendar.fetch(&self.filter),
            self.document.fetch(&self.filter)
        )?;

        debug!(
            calendar = page.events.len(),
            document = document.len(),
            "Fetched events"
        );

        Ok((page, document))
    }

    async fn apply(&self, plan: &SyncPlan) -> Vec<Outcome> {
        let mut outcomes = Vec::new();

        for kind in [DiffKind::Delete, DiffKind::Update, DiffKind::Create] {
            let diffs: Vec<&EventDiff> = plan
                .to_calendar
                .iter()
                .chain(&plan.to_document)
                .filter(|diff| diff.kind == kind)
                .collect();

            if diffs.is_empty() {
                continue;
            }

            debug!(%kind, count = diffs.len(), "Applying phase");

            let phase: Vec<Outcome> = stream::iter(diffs)
                .map(|diff| self.apply_one(diff))
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

            outcomes.extend(phase);
        }

        outcomes
    }

    async fn apply_one(&self, diff: &EventDiff) -> Outcome {
        let outcome = match diff.kind {
            DiffKind::Delete => match self.delete_on(diff.target, &diff.event).await {
                Ok(()) => Outcome::applied(diff, diff.event.clone()),
                Err(e) => Outcome::failed(diff, e.to_string()),
            },
            DiffKind::Update => match self.update_on(diff.target, &diff.event).await {
                Ok(()) => Outcome::applied(diff, diff.event.clone()),
                Err(e) => Outcome::failed(diff, e.to_string()),
            },
            DiffKind::Create => self.create_and_link(diff).await,
        };

        match outcome.reason() {
            Some(reason) => warn!(target_side = %diff.target, event = %diff.event.key(), %reason, "{}", diff),
            None => debug!(target_side = %diff.target, event = %diff.event.key(), "{}", diff),
        }

        outcome
    }

    /// Create the record, then write the assigned identifier back to the side
    /// the event came from.
    async fn create_and_link(&self, diff: &EventDiff) -> Outcome {
        let created = match self.create_on(diff.target, &diff.event).await {
            Ok(created) => created,
            Err(e) => return Outcome::failed(diff, e.to_string()),
        };

        let assigned = created.id_on(diff.target);
        if assigned.is_empty() {
            return Outcome::failed(diff, format!("{} returned no identifier", diff.target));
        }

        let linked = match diff.target {
            Side::Calendar => diff.event.with_ids(assigned, &diff.event.page_id),
            Side::Document => diff.event.with_ids(&diff.event.id, assigned),
        };

        let source = diff.target.other();
        if linked.id_on(source).is_empty() || !self.strategy.direction.writes(source) {
            return Outcome::applied(diff, linked);
        }

        match self.update_on(source, &linked).await {
            Ok(()) => Outcome::applied(diff, linked),
            Err(e) => Outcome::unlinked(diff, linked, format!("linking back failed: {e}")),
        }
    }

    async fn create_on(&self, side: Side, event: &Event) -> CalNoteResult<Event> {
        match side {
            Side::Calendar => self.calendar.create_event(event).await,
            Side::Document => self.document.create_event(event).await,
        }
    }

    async fn update_on(&self, side: Side, event: &Event) -> CalNoteResult<()> {
        match side {
            Side::Calendar => self.calendar.update_event(event).await,
            Side::Document => self.document.update_event(event).await,
        }
    }

    async fn delete_on(&self, side: Side, event: &Event) -> CalNoteResult<()> {
        match side {
            Side::Calendar => self.calendar.delete_event(event).await,
            Side::Document => self.document.delete_event(event).await,
        }
    }

    /// Drop the snapshot (and optionally the sync token) so the next pass
    /// bootstraps.
    pub fn reset(&self, cursor: bool) -> CalNoteResult<()> {
        let guard = self.lock.acquire()?;
        self.cache.clear()?;
        if cursor {
            self.cursor.clear()?;
        }
        guard.release()
    }
}

fn fold_key(event: &Event) -> String {
    if event.id.is_empty() {
        format!("page:{}", event.page_id)
    } else {
        event.id.clone()
    }
}

/// Next snapshot after a full pass: the unchanged entries plus every write
/// that went through. Any failed write for an event keeps its cached entry.
fn fold_outcomes(unchanged: &[Event], outcomes: &[Outcome]) -> Vec<Event> {
    let failed: HashSet<String> = outcomes
        .iter()
        .filter(|o| !o.is_written())
        .map(|o| fold_key(&o.diff.event))
        .collect();

    let mut seen = HashSet::new();
    let mut events = unchanged.to_vec();

    for outcome in outcomes {
        let key = fold_key(&outcome.diff.event);
        if failed.contains(&key) {
            if seen.insert(key) {
                events.extend(outcome.diff.cached.clone());
            }
        } else if let Some(result) = outcome.committed() {
            if seen.insert(key) {
                events.push(result.clone());
            }
        }
    }

    events.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
    events
}

/// Diffs for a webhook pass, one per changed calendar record.
fn changed_diffs(changed: &[Event], document: &[Event], snapshot: Option<&Snapshot>) -> Vec<EventDiff> {
    let by_id: HashMap<&str, &Event> = document
        .iter()
        .filter(|d| !d.id.is_empty())
        .map(|d| (d.id.as_str(), d))
        .collect();
    let by_page: HashMap<&str, &Event> = document
        .iter()
        .filter(|d| !d.page_id.is_empty())
        .map(|d| (d.page_id.as_str(), d))
        .collect();

    let mut diffs = Vec::new();

    for c in changed.iter().filter(|c| !c.id.is_empty()) {
        let cached = snapshot.and_then(|s| s.find_by_id(&c.id)).cloned();
        // A linked cache entry stands in for a page the document fetch missed
        let d = by_id
            .get(c.id.as_str())
            .or_else(|| by_page.get(c.page_id.as_str()))
            .copied()
            .or_else(|| cached.as_ref().filter(|s| !s.page_id.is_empty()))
            .cloned();

        match (decide_single(Some(c), d.as_ref()), d) {
            (SingleDecision::New, _) => {
                diffs.push(EventDiff::create(Side::Document, c.with_ids(&c.id, ""), cached));
            }
            (SingleDecision::Updated, Some(d)) => diffs.push(EventDiff::update(
                Side::Document,
                c.with_ids(&c.id, &d.page_id),
                d,
                cached,
            )),
            (SingleDecision::Deleted, Some(d)) => diffs.push(EventDiff::delete(
                Side::Document,
                d.with_ids(&c.id, &d.page_id),
                cached,
            )),
            _ => {}
        }
    }

    diffs
}

/// Fold webhook outcomes into the existing snapshot. Failed writes leave
/// their entries untouched.
fn merge_changed(mut events: Vec<Event>, outcomes: &[Outcome]) -> Vec<Event> {
    for outcome in outcomes.iter().filter(|o| o.is_written()) {
        let id = &outcome.diff.event.id;
        events.retain(|e| e.id != *id);
        events.extend(outcome.committed().cloned());
    }

    events.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
    events
}
