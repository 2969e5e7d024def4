//! Three-way diff between the calendar, the document database and the cache.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::date_range::DateRange;
use crate::diff::{Authority, Baseline, DiffKind, EventDiff, Strategy};
use crate::event::{Event, Side};
use crate::snapshot::Snapshot;

/// Everything one pass needs to write, per side.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncPlan {
    pub to_calendar: Vec<EventDiff>,
    pub to_document: Vec<EventDiff>,
    /// Events that go into the next snapshot as they are
    pub unchanged: Vec<Event>,
    /// Cache entries for events both sides no longer have
    pub purged: Vec<Event>,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.to_calendar.is_empty() && self.to_document.is_empty()
    }

    pub fn diffs_for(&self, side: Side) -> &[EventDiff] {
        match side {
            Side::Calendar => &self.to_calendar,
            Side::Document => &self.to_document,
        }
    }

    /// (created, updated, deleted) for one side.
    pub fn counts(&self, side: Side) -> (usize, usize, usize) {
        let diffs = self.diffs_for(side);
        let count = |kind| diffs.iter().filter(|d| d.kind == kind).count();
        (
            count(DiffKind::Create),
            count(DiffKind::Update),
            count(DiffKind::Delete),
        )
    }

    fn push(&mut self, diff: EventDiff) {
        match diff.target {
            Side::Calendar => self.to_calendar.push(diff),
            Side::Document => self.to_document.push(diff),
        }
    }

    fn carry(&mut self, cached: Option<&Event>) {
        if let Some(event) = cached {
            self.unchanged.push(event.clone());
        }
    }
}

/// Join key. Calendar ids are the primary key; document records that never
/// reached the calendar are keyed by their page id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Key {
    Id(String),
    Page(String),
}

#[derive(Default)]
struct Slot<'a> {
    calendar: Option<&'a Event>,
    /// Calendar record carrying the soft-deletion marker
    cancelled: Option<&'a Event>,
    document: Option<&'a Event>,
    cached: Option<&'a Event>,
}

#[derive(Debug, Clone, Default)]
pub struct DiffEngine {
    strategy: Strategy,
    window: Option<DateRange>,
}

impl DiffEngine {
    pub fn new(strategy: Strategy) -> Self {
        DiffEngine {
            strategy,
            window: None,
        }
    }

    /// Only infer deletions for records inside the fetched window; anything
    /// outside it may simply not have been fetched.
    pub fn with_window(mut self, window: DateRange) -> Self {
        self.window = Some(window);
        self
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    pub fn diff(&self, calendar: &[Event], document: &[Event], cache: Option<&Snapshot>) -> SyncPlan {
        let cached: &[Event] = match (self.strategy.baseline, cache) {
            (Baseline::Cache, Some(snapshot)) => &snapshot.events,
            _ => &[],
        };

        let slots = join(calendar, document, cached);
        let mut plan = SyncPlan::default();

        for (key, slot) in &slots {
            tracing::trace!(?key, "Classifying");
            match self.strategy.direction.origin() {
                None => self.classify_two_way(slot, &mut plan),
                Some(origin) => self.classify_one_way(origin, slot, &mut plan),
            }
        }

        // Sort by start (ascending); the join order keeps ties deterministic
        let by_start = |a: &EventDiff, b: &EventDiff| a.event.start.cmp(&b.event.start);
        plan.to_calendar.sort_by(by_start);
        plan.to_document.sort_by(by_start);

        plan
    }

    fn classify_two_way(&self, slot: &Slot<'_>, plan: &mut SyncPlan) {
        let cached = slot.cached;

        match (slot.calendar, slot.document) {
            (Some(c), Some(d)) => self.reconcile_pair(c, d, cached, plan),
            (Some(c), None) => {
                if !self.in_window(c) {
                    plan.carry(cached);
                } else if self.witnessed(cached, Side::Document) {
                    // Removed from the document database since the last sync
                    plan.push(EventDiff::delete(Side::Calendar, c.clone(), cached.cloned()));
                } else {
                    plan.push(EventDiff::create(
                        Side::Document,
                        c.with_ids(&c.id, ""),
                        cached.cloned(),
                    ));
                }
            }
            (None, Some(d)) => {
                if slot.cancelled.is_some() {
                    plan.push(EventDiff::delete(Side::Document, d.clone(), cached.cloned()));
                } else if !self.in_window(d) {
                    plan.carry(cached);
                } else if self.witnessed(cached, Side::Calendar) {
                    // Removed from the calendar since the last sync
                    plan.push(EventDiff::delete(Side::Document, d.clone(), cached.cloned()));
                } else if self.strategy.baseline == Baseline::Pairwise && !d.id.is_empty() {
                    // Linked, but the calendar copy wasn't fetched: nothing to go on
                    plan.carry(cached);
                } else {
                    plan.push(EventDiff::create(
                        Side::Calendar,
                        d.with_ids("", &d.page_id),
                        cached.cloned(),
                    ));
                }
            }
            (None, None) => {
                if let Some(stale) = cached {
                    plan.purged.push(stale.clone());
                }
            }
        }
    }

    fn classify_one_way(&self, origin: Side, slot: &Slot<'_>, plan: &mut SyncPlan) {
        let cached = slot.cached;

        match (slot.calendar, slot.document) {
            (Some(c), Some(d)) => self.reconcile_pair(c, d, cached, plan),
            (None, None) => {
                if let Some(stale) = cached {
                    plan.purged.push(stale.clone());
                }
            }
            (Some(c), None) => match origin {
                Side::Calendar if self.in_window(c) => {
                    plan.push(EventDiff::create(
                        Side::Document,
                        c.with_ids(&c.id, ""),
                        cached.cloned(),
                    ));
                }
                Side::Document
                    if self.in_window(c)
                        && (!c.page_id.is_empty() || self.witnessed(cached, Side::Document)) =>
                {
                    plan.push(EventDiff::delete(Side::Calendar, c.clone(), cached.cloned()));
                }
                // Outside the window, or a calendar-only event the mirror doesn't own
                _ => plan.carry(cached),
            },
            (None, Some(d)) => match origin {
                Side::Calendar
                    if slot.cancelled.is_some()
                        || (self.in_window(d)
                            && (!d.id.is_empty() || self.witnessed(cached, Side::Calendar))) =>
                {
                    plan.push(EventDiff::delete(Side::Document, d.clone(), cached.cloned()));
                }
                Side::Document if self.in_window(d) => {
                    plan.push(EventDiff::create(
                        Side::Calendar,
                        d.with_ids("", &d.page_id),
                        cached.cloned(),
                    ));
                }
                _ => plan.carry(cached),
            },
        }
    }

    /// Both sides hold the event: push content to the stale side and repair
    /// missing cross-references.
    fn reconcile_pair(&self, c: &Event, d: &Event, cached: Option<&Event>, plan: &mut SyncPlan) {
        let winner = if c == d {
            None
        } else {
            Some(self.winner(c, d, cached))
        };

        let content = match winner {
            Some(Side::Document) => d,
            _ => c,
        };
        let mut merged = content.with_ids(&c.id, &d.page_id);
        merged.deleted = false;
        merged.updated = c.updated.max(d.updated);

        let mut written = false;
        for (side, current) in [(Side::Calendar, c), (Side::Document, d)] {
            if !self.strategy.direction.writes(side) {
                continue;
            }

            let stale = winner == Some(side.other());
            let unlinked = current.id != merged.id || current.page_id != merged.page_id;

            if stale || unlinked {
                tracing::debug!(event = %merged.key(), %side, stale, unlinked, "Update needed");
                plan.push(EventDiff::update(
                    side,
                    merged.clone(),
                    current.clone(),
                    cached.cloned(),
                ));
                written = true;
            }
        }

        if !written {
            plan.unchanged.push(merged);
        }
    }

    /// The side whose content is kept when both differ.
    fn winner(&self, c: &Event, d: &Event, cached: Option<&Event>) -> Side {
        if let Some(origin) = self.strategy.direction.origin() {
            return origin;
        }

        // Only one side moved away from the converged copy
        if let Some(snapshot) = cached {
            match (c != snapshot, d != snapshot) {
                (true, false) => return Side::Calendar,
                (false, true) => return Side::Document,
                _ => {}
            }
        }

        match self.strategy.authority {
            Authority::Calendar => Side::Calendar,
            Authority::Document => Side::Document,
            Authority::LastEdited => match (c.updated, d.updated) {
                (Some(calendar_edit), Some(document_edit)) if calendar_edit > document_edit => {
                    Side::Calendar
                }
                _ => Side::Document,
            },
        }
    }

    /// Whether the cache saw this event on `side` at the last sync.
    fn witnessed(&self, cached: Option<&Event>, side: Side) -> bool {
        self.strategy.baseline == Baseline::Cache
            && cached.is_some_and(|s| !s.id_on(side).is_empty())
    }

    fn in_window(&self, event: &Event) -> bool {
        self.window
            .as_ref()
            .is_none_or(|window| window.contains(&event.start))
    }
}

/// Line up calendar, document and cache records by key.
fn join<'a>(
    calendar: &'a [Event],
    document: &'a [Event],
    cached: &'a [Event],
) -> BTreeMap<Key, Slot<'a>> {
    let mut slots: BTreeMap<Key, Slot<'a>> = BTreeMap::new();
    // page id -> calendar id, from calendar cross-references first, then cache
    let mut id_by_page: HashMap<&'a str, &'a str> = HashMap::new();

    for event in calendar {
        if event.id.is_empty() {
            tracing::warn!(title = %event.title, "Skipping calendar record without an id");
            continue;
        }

        let slot = slots.entry(Key::Id(event.id.clone())).or_default();
        if slot.calendar.is_some() || slot.cancelled.is_some() {
            tracing::warn!(id = %event.id, "Duplicate calendar record, keeping the first");
            continue;
        }

        if event.deleted {
            slot.cancelled = Some(event);
        } else {
            slot.calendar = Some(event);
        }
        if !event.page_id.is_empty() {
            id_by_page
                .entry(event.page_id.as_str())
                .or_insert(event.id.as_str());
        }
    }

    for event in cached {
        let key = if !event.id.is_empty() {
            Key::Id(event.id.clone())
        } else if !event.page_id.is_empty() {
            Key::Page(event.page_id.clone())
        } else {
            continue;
        };

        let slot = slots.entry(key).or_default();
        if slot.cached.is_some() {
            continue;
        }
        slot.cached = Some(event);

        if event.is_linked() {
            id_by_page
                .entry(event.page_id.as_str())
                .or_insert(event.id.as_str());
        }
    }

    for event in document {
        let key = if !event.id.is_empty() {
            // A stored id naming no live calendar record is stale; the
            // calendar's own cross-reference to this page wins
            let live = slots
                .get(&Key::Id(event.id.clone()))
                .is_some_and(|s| s.calendar.is_some() || s.cancelled.is_some());
            match id_by_page.get(event.page_id.as_str()) {
                Some(id) if !live => Key::Id(id.to_string()),
                _ => Key::Id(event.id.clone()),
            }
        } else if let Some(id) = id_by_page.get(event.page_id.as_str()) {
            Key::Id(id.to_string())
        } else if !event.page_id.is_empty() {
            Key::Page(event.page_id.clone())
        } else {
            tracing::warn!(title = %event.title, "Skipping document record without identifiers");
            continue;
        };

        let slot = slots.entry(key).or_default();
        if slot.document.is_some() {
            tracing::warn!(event = %event.key(), "Duplicate document record, keeping the first");
            continue;
        }
        slot.document = Some(event);
    }

    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::Direction;
    use chrono::{TimeZone, Utc};

    fn cal(id: &str, title: &str) -> Event {
        Event {
            id: id.to_string(),
            title: title.to_string(),
            start: "2024-01-01T10:00:00Z".to_string(),
            end: "2024-01-01T10:30:00Z".to_string(),
            ..Default::default()
        }
    }

    fn linked(id: &str, page_id: &str, title: &str) -> Event {
        cal(id, title).with_ids(id, page_id)
    }

    fn snapshot(events: Vec<Event>) -> Snapshot {
        Snapshot::new(events)
    }

    fn engine() -> DiffEngine {
        DiffEngine::new(Strategy::default())
    }

    #[test]
    fn test_new_calendar_event_is_created_in_document() {
        let calendar = vec![cal("g1", "Standup")];

        let plan = engine().diff(&calendar, &[], None);

        assert_eq!(plan.to_document.len(), 1);
        assert_eq!(plan.to_document[0].kind, DiffKind::Create);
        assert_eq!(plan.to_document[0].event.id, "g1");
        assert!(plan.to_calendar.is_empty());
    }

    #[test]
    fn test_removed_from_document_is_deleted_from_calendar() {
        let calendar = vec![linked("g1", "p1", "Standup")];
        let cache = snapshot(vec![linked("g1", "p1", "Standup")]);

        let plan = engine().diff(&calendar, &[], Some(&cache));

        assert_eq!(plan.to_calendar.len(), 1);
        assert_eq!(plan.to_calendar[0].kind, DiffKind::Delete);
        assert_eq!(plan.to_calendar[0].event.id, "g1");
        assert!(plan.to_document.is_empty());
    }

    #[test]
    fn test_calendar_edit_updates_document() {
        let calendar = vec![linked("g1", "p1", "Standup (moved)")];
        let document = vec![linked("g1", "p1", "Standup")];
        let cache = snapshot(vec![linked("g1", "p1", "Standup")]);

        let plan = engine().diff(&calendar, &document, Some(&cache));

        assert!(plan.to_calendar.is_empty());
        assert_eq!(plan.to_document.len(), 1);
        let diff = &plan.to_document[0];
        assert_eq!(diff.kind, DiffKind::Update);
        assert_eq!(diff.event.title, "Standup (moved)");
        assert_eq!(diff.event.page_id, "p1");
        assert_eq!(diff.previous.as_ref().map(|e| e.title.as_str()), Some("Standup"));
    }

    #[test]
    fn test_document_edit_updates_calendar() {
        let calendar = vec![linked("g1", "p1", "Standup")];
        let document = vec![linked("g1", "p1", "Daily sync")];
        let cache = snapshot(vec![linked("g1", "p1", "Standup")]);

        let plan = engine().diff(&calendar, &document, Some(&cache));

        assert!(plan.to_document.is_empty());
        assert_eq!(plan.to_calendar.len(), 1);
        assert_eq!(plan.to_calendar[0].event.title, "Daily sync");
    }

    #[test]
    fn test_new_document_event_is_created_in_calendar() {
        let document = vec![Event {
            page_id: "p7".to_string(),
            ..cal("", "Dentist")
        }];

        let plan = engine().diff(&[], &document, Some(&snapshot(vec![])));

        assert_eq!(plan.to_calendar.len(), 1);
        assert_eq!(plan.to_calendar[0].kind, DiffKind::Create);
        assert_eq!(plan.to_calendar[0].event.page_id, "p7");
        assert_eq!(plan.to_calendar[0].event.id, "");
    }

    #[test]
    fn test_removed_from_calendar_is_deleted_from_document() {
        let document = vec![linked("g1", "p1", "Standup")];
        let cache = snapshot(vec![linked("g1", "p1", "Standup")]);

        let plan = engine().diff(&[], &document, Some(&cache));

        assert_eq!(plan.to_document.len(), 1);
        assert_eq!(plan.to_document[0].kind, DiffKind::Delete);
        assert_eq!(plan.to_document[0].event.page_id, "p1");
    }

    #[test]
    fn test_gone_from_both_sides_is_purged() {
        let cache = snapshot(vec![linked("g1", "p1", "Standup")]);

        let plan = engine().diff(&[], &[], Some(&cache));

        assert!(plan.is_empty());
        assert_eq!(plan.purged.len(), 1);
        assert!(plan.unchanged.is_empty());
    }

    #[test]
    fn test_converged_state_is_a_no_op() {
        let events = vec![linked("g1", "p1", "Standup"), linked("g2", "p2", "Retro")];
        let cache = snapshot(events.clone());

        let plan = engine().diff(&events, &events, Some(&cache));

        assert!(plan.is_empty());
        assert!(plan.purged.is_empty());
        assert_eq!(plan.unchanged.len(), 2);
    }

    #[test]
    fn test_diff_is_idempotent() {
        let calendar = vec![linked("g1", "p1", "A"), cal("g2", "B"), linked("g3", "p3", "C2")];
        let document = vec![linked("g1", "p1", "A1"), linked("g3", "p3", "C"), linked("g4", "p4", "D")];
        let cache = snapshot(vec![linked("g1", "p1", "A"), linked("g3", "p3", "C"), linked("g4", "p4", "D")]);

        let first = engine().diff(&calendar, &document, Some(&cache));
        let second = engine().diff(&calendar, &document, Some(&cache));

        let summary = |plan: &SyncPlan| {
            plan.to_calendar
                .iter()
                .chain(&plan.to_document)
                .map(|d| (d.target, d.kind, d.event.key(), d.event.title.clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(summary(&first), summary(&second));
        assert_eq!(first.unchanged.len(), second.unchanged.len());
    }

    #[test]
    fn test_pair_missing_from_cache_is_folded_not_recreated() {
        let events = vec![linked("g1", "p1", "Standup")];

        let plan = engine().diff(&events, &events, Some(&snapshot(vec![])));

        assert!(plan.is_empty());
        assert_eq!(plan.unchanged.len(), 1);
        assert!(plan.unchanged[0].is_linked());
    }

    #[test]
    fn test_created_then_linked_event_is_unchanged_next_run() {
        // Run 1: calendar-only event is created in the document database
        let calendar = vec![cal("g1", "Standup")];
        let plan = engine().diff(&calendar, &[], Some(&snapshot(vec![])));
        assert_eq!(plan.to_document[0].kind, DiffKind::Create);

        // Apply: document assigns p1, back-propagation links the calendar copy
        let created = plan.to_document[0].event.with_ids("g1", "p1");
        let calendar = vec![created.clone()];
        let document = vec![created.clone()];
        let cache = snapshot(vec![created]);

        // Run 2: nothing to do
        let plan = engine().diff(&calendar, &document, Some(&cache));
        assert!(plan.is_empty());
        assert_eq!(plan.unchanged.len(), 1);
    }

    #[test]
    fn test_missing_back_reference_is_repaired_not_recreated() {
        // Calendar create succeeded, writing the id back to the page did not
        let calendar = vec![linked("g9", "p9", "Dentist")];
        let document = vec![Event {
            page_id: "p9".to_string(),
            ..cal("", "Dentist")
        }];

        let plan = engine().diff(&calendar, &document, Some(&snapshot(vec![])));

        assert!(plan.to_calendar.is_empty());
        assert_eq!(plan.to_document.len(), 1);
        let diff = &plan.to_document[0];
        assert_eq!(diff.kind, DiffKind::Update);
        assert!(diff.is_link_only());
        assert_eq!(diff.event.id, "g9");
    }

    #[test]
    fn test_document_joined_through_cache_page_id() {
        let document = vec![Event {
            page_id: "p1".to_string(),
            ..cal("", "Standup")
        }];
        let cache = snapshot(vec![linked("g1", "p1", "Standup")]);

        // Calendar copy is gone: the page must be archived, not re-created
        let plan = engine().diff(&[], &document, Some(&cache));

        assert!(plan.to_calendar.is_empty());
        assert_eq!(plan.to_document.len(), 1);
        assert_eq!(plan.to_document[0].kind, DiffKind::Delete);
    }

    #[test]
    fn test_partial_cache_entry_does_not_witness_missing_side() {
        // Seeded from the calendar list: the cache never saw a page for g1
        let calendar = vec![cal("g1", "Standup")];
        let cache = snapshot(vec![cal("g1", "Standup")]);

        let plan = engine().diff(&calendar, &[], Some(&cache));

        assert!(plan.to_calendar.is_empty());
        assert_eq!(plan.to_document[0].kind, DiffKind::Create);
    }

    #[test]
    fn test_conflict_without_cache_uses_last_edit() {
        let mut c = linked("g1", "p1", "Calendar title");
        let mut d = linked("g1", "p1", "Document title");
        c.updated = Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());
        d.updated = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());

        let plan = engine().diff(&[c.clone()], &[d.clone()], None);
        assert_eq!(plan.to_document.len(), 1);
        assert_eq!(plan.to_document[0].event.title, "Calendar title");

        d.updated = Some(Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap());
        let plan = engine().diff(&[c], &[d], None);
        assert_eq!(plan.to_calendar.len(), 1);
        assert_eq!(plan.to_calendar[0].event.title, "Document title");
    }

    #[test]
    fn test_conflict_without_timestamps_document_wins() {
        let c = linked("g1", "p1", "Calendar title");
        let d = linked("g1", "p1", "Document title");
        let cache = snapshot(vec![linked("g1", "p1", "Original")]);

        let plan = engine().diff(&[c], &[d], Some(&cache));

        assert!(plan.to_document.is_empty());
        assert_eq!(plan.to_calendar.len(), 1);
        assert_eq!(plan.to_calendar[0].event.title, "Document title");
    }

    #[test]
    fn test_fixed_calendar_authority() {
        let strategy = Strategy {
            authority: Authority::Calendar,
            ..Default::default()
        };
        let c = linked("g1", "p1", "Calendar title");
        let d = linked("g1", "p1", "Document title");

        let plan = DiffEngine::new(strategy).diff(&[c], &[d], None);

        assert!(plan.to_calendar.is_empty());
        assert_eq!(plan.to_document[0].event.title, "Calendar title");
    }

    #[test]
    fn test_cancelled_calendar_event_archives_page() {
        let mut cancelled = linked("g1", "p1", "Standup");
        cancelled.deleted = true;
        let document = vec![linked("g1", "p1", "Standup")];

        // No cache witness needed: the calendar says it's gone
        let plan = engine().diff(&[cancelled], &document, Some(&snapshot(vec![])));

        assert!(plan.to_calendar.is_empty());
        assert_eq!(plan.to_document[0].kind, DiffKind::Delete);
    }

    #[test]
    fn test_one_way_calendar_mirror() {
        let strategy = Strategy {
            direction: Direction::CalendarToDocument,
            ..Default::default()
        };
        let calendar = vec![cal("g1", "New"), linked("g2", "p2", "Changed")];
        let document = vec![
            linked("g2", "p2", "Original"),
            linked("g3", "p3", "Gone from calendar"),
            Event {
                page_id: "p4".to_string(),
                ..cal("", "Handwritten note")
            },
        ];

        let plan = DiffEngine::new(strategy).diff(&calendar, &document, None);

        assert!(plan.to_calendar.is_empty());
        let (created, updated, deleted) = plan.counts(Side::Document);
        assert_eq!((created, updated, deleted), (1, 1, 1));
        let deleted = plan
            .to_document
            .iter()
            .find(|d| d.kind == DiffKind::Delete)
            .unwrap();
        assert_eq!(deleted.event.page_id, "p3");
    }

    #[test]
    fn test_one_way_document_mirror_never_writes_document() {
        let strategy = Strategy {
            direction: Direction::DocumentToCalendar,
            ..Default::default()
        };
        let calendar = vec![cal("g1", "Calendar only"), linked("g2", "p2", "Stale")];
        let document = vec![linked("g2", "p2", "Fresh"), Event {
            page_id: "p5".to_string(),
            ..cal("", "From notes")
        }];

        let plan = DiffEngine::new(strategy).diff(&calendar, &document, None);

        assert!(plan.to_document.is_empty());
        assert_eq!(plan.counts(Side::Calendar), (1, 1, 0));
    }

    #[test]
    fn test_pairwise_ignores_cache_and_leaves_linked_pages() {
        let strategy = Strategy {
            baseline: Baseline::Pairwise,
            ..Default::default()
        };
        let document = vec![linked("g1", "p1", "Outside the fetch")];
        let cache = snapshot(vec![linked("g1", "p1", "Outside the fetch")]);

        let plan = DiffEngine::new(strategy).diff(&[], &document, Some(&cache));

        assert!(plan.is_empty());
        assert!(plan.purged.is_empty());
    }

    #[test]
    fn test_deletion_outside_window_is_not_inferred() {
        let window = DateRange {
            from: Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).single(),
            to: Utc.with_ymd_and_hms(2024, 2, 8, 0, 0, 0).single(),
        };
        let document = vec![linked("g1", "p1", "Old")];
        let cache = snapshot(vec![linked("g1", "p1", "Old")]);

        let plan = DiffEngine::new(Strategy::default())
            .with_window(window)
            .diff(&[], &document, Some(&cache));

        assert!(plan.is_empty());
        assert_eq!(plan.unchanged.len(), 1);
    }

    #[test]
    fn test_malformed_records_do_not_block_batch() {
        let calendar = vec![
            Event::default(),
            Event {
                start: String::new(),
                ..cal("g2", "")
            },
            cal("g3", "Fine"),
        ];
        let document = vec![Event::default()];

        let plan = engine().diff(&calendar, &document, None);

        let ids: Vec<_> = plan.to_document.iter().map(|d| d.event.id.as_str()).collect();
        assert_eq!(ids, ["g2", "g3"]);
    }

    #[test]
    fn test_cancelled_calendar_record_claims_unlinked_page() {
        let strategy = Strategy {
            baseline: Baseline::Pairwise,
            ..Default::default()
        };
        let calendar = vec![Event {
            deleted: true,
            ..linked("g9", "p9", "Called off")
        }];
        let document = vec![Event {
            page_id: "p9".to_string(),
            ..cal("", "Called off")
        }];

        let plan = DiffEngine::new(strategy).diff(&calendar, &document, None);

        assert!(plan.to_calendar.is_empty());
        assert_eq!(plan.to_document.len(), 1);
        assert_eq!(plan.to_document[0].kind, DiffKind::Delete);
        assert_eq!(plan.to_document[0].event.page_id, "p9");
    }

    #[test]
    fn test_stale_document_id_follows_calendar_reference() {
        let strategy = Strategy {
            direction: Direction::DocumentToCalendar,
            ..Default::default()
        };
        let calendar = vec![linked("g100", "p1", "Standup")];
        let document = vec![linked("g1", "p1", "Standup")];
        let cache = snapshot(vec![linked("g100", "p1", "Standup")]);

        let plan = DiffEngine::new(strategy).diff(&calendar, &document, Some(&cache));

        assert!(plan.is_empty());
        assert_eq!(plan.unchanged.len(), 1);
        assert_eq!(plan.unchanged[0].id, "g100");
    }

    #[test]
    fn test_live_document_id_keeps_its_own_record() {
        let calendar = vec![linked("g1", "p1", "Kept"), linked("g2", "p1", "Other")];
        let document = vec![linked("g1", "p1", "Kept")];
        let cache = snapshot(vec![linked("g1", "p1", "Kept")]);

        let plan = engine().diff(&calendar, &document, Some(&cache));

        assert!(plan.to_calendar.is_empty());
        assert!(plan.to_document.iter().all(|d| d.event.id != "g1"));
    }
}
