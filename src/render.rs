//! Colored terminal rendering for plans and sync reports.

use calnote_core::diff::{DiffKind, EventDiff, SyncPlan};
use calnote_core::event::{Event, Side};
use calnote_core::sync::{SideCounts, SyncReport};
use owo_colors::OwoColorize;

pub trait Render {
    fn render(&self) -> String;
}

impl Render for DiffKind {
    fn render(&self) -> String {
        let symbol = self.symbol();
        match self {
            DiffKind::Create => symbol.green().to_string(),
            DiffKind::Update => symbol.yellow().to_string(),
            DiffKind::Delete => symbol.red().to_string(),
        }
    }
}

fn colorize_diff(kind: DiffKind, text: &str) -> String {
    match kind {
        DiffKind::Create => text.green().to_string(),
        DiffKind::Update => text.yellow().to_string(),
        DiffKind::Delete => text.red().to_string(),
    }
}

fn render_event_time(event: &Event) -> String {
    if event.start.is_empty() {
        return "(no date)".to_string();
    }
    if event.end.is_empty() || event.end == event.start {
        return event.start.clone();
    }
    format!("{} → {}", event.start, event.end)
}

impl Render for EventDiff {
    fn render(&self) -> String {
        let summary = colorize_diff(self.kind, &self.event.to_string());
        let time = render_event_time(&self.event);
        let suffix = if self.is_link_only() { " (link)" } else { "" };

        format!(
            "{} {} {}{}",
            self.kind.render(),
            summary,
            time.dimmed(),
            suffix.dimmed()
        )
    }
}

impl Render for Side {
    fn render(&self) -> String {
        match self {
            Side::Calendar => "📅 Calendar".to_string(),
            Side::Document => "📄 Document".to_string(),
        }
    }
}

/// Lists longer than this show counts unless verbose
const COMPACT_THRESHOLD: usize = 5;

fn pluralize(count: usize) -> &'static str {
    if count == 1 { "event" } else { "events" }
}

fn render_counts(counts: SideCounts, lines: &mut Vec<String>) {
    if counts.created > 0 {
        let label = format!("({} new {})", counts.created, pluralize(counts.created));
        lines.push(format!("   {} {}", "+".green(), label.green()));
    }
    if counts.updated > 0 {
        let label = format!("({} changed {})", counts.updated, pluralize(counts.updated));
        lines.push(format!("   {} {}", "~".yellow(), label.yellow()));
    }
    if counts.deleted > 0 {
        let label = format!("({} deleted {})", counts.deleted, pluralize(counts.deleted));
        lines.push(format!("   {} {}", "-".red(), label.red()));
    }
}

fn render_diff_list(diffs: &[&EventDiff], verbose: bool, lines: &mut Vec<String>) {
    if verbose || diffs.len() <= COMPACT_THRESHOLD {
        for diff in diffs {
            lines.push(format!("   {}", diff.render()));
        }
        return;
    }

    let count = |kind| diffs.iter().filter(|d| d.kind == kind).count();
    render_counts(
        SideCounts {
            created: count(DiffKind::Create),
            updated: count(DiffKind::Update),
            deleted: count(DiffKind::Delete),
        },
        lines,
    );
}

fn render_sides(diffs: &[EventDiff], verbose: bool, lines: &mut Vec<String>) {
    for side in [Side::Calendar, Side::Document] {
        let for_side: Vec<&EventDiff> = diffs.iter().filter(|d| d.target == side).collect();
        if for_side.is_empty() {
            continue;
        }
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push(side.render());
        render_diff_list(&for_side, verbose, lines);
    }
}

pub trait PlanRender {
    fn render(&self, verbose: bool) -> String;
}

impl PlanRender for SyncPlan {
    fn render(&self, verbose: bool) -> String {
        if self.is_empty() {
            return "   No changes".dimmed().to_string();
        }

        let diffs: Vec<EventDiff> = self
            .to_calendar
            .iter()
            .chain(&self.to_document)
            .cloned()
            .collect();

        let mut lines = Vec::new();
        render_sides(&diffs, verbose, &mut lines);
        lines.join("\n")
    }
}

impl PlanRender for SyncReport {
    fn render(&self, verbose: bool) -> String {
        if self.bootstrapped {
            let seeded = self.committed.unwrap_or_default();
            return format!(
                "   First run: seeded the snapshot with {} {}, nothing written",
                seeded,
                pluralize(seeded)
            )
            .dimmed()
            .to_string();
        }

        let mut lines = vec![self.plan.render(verbose)];

        if !self.failures.is_empty() {
            lines.push(String::new());
            lines.push(format!("Failed ({}):", self.failures.len()).red().to_string());
            for failure in &self.failures {
                lines.push(format!(
                    "   {} {} on {}: {}",
                    failure.kind.render(),
                    failure.event,
                    failure.target,
                    failure.reason.red()
                ));
            }
        }

        for side in [Side::Calendar, Side::Document] {
            let counts = self.counts(side);
            if counts.total() > 0 {
                lines.push(format!(
                    "\n{}: {} created, {} updated, {} deleted",
                    side, counts.created, counts.updated, counts.deleted
                ));
            }
        }

        lines.push(
            format!("   done in {:.1}s", self.duration.as_secs_f64())
                .dimmed()
                .to_string(),
        );
        lines.join("\n")
    }
}
