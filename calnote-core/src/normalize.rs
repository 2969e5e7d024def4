//! Pure normalization of raw provider fields.
//!
//! Providers report titles as `"[tag] rest of title"` and dates in whatever
//! shape their API uses. These helpers turn them into the canonical strings
//! the diff engine compares. None of them fail: bad input becomes an empty
//! string so one malformed record never blocks the rest of a batch.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

/// Canonical format for instants (always UTC).
pub const INSTANT_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Canonical format for date-only values.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Split a raw title into `(tag, title)`.
///
/// The first non-empty `[...]` group becomes the tag. Only that group is
/// removed; any later bracket groups stay inside the title.
pub fn parse_tag(raw: &str) -> (String, String) {
    match find_tag(raw) {
        Some((start, end)) => {
            let tag = raw[start + 1..end - 1].to_string();
            let title = format!("{}{}", &raw[..start], &raw[end..]);
            (tag, normalize_text(&title))
        }
        None => (String::new(), normalize_text(raw)),
    }
}

/// Byte range `[start, end)` of the first bracket group with at least one
/// character inside and no line break.
fn find_tag(raw: &str) -> Option<(usize, usize)> {
    for (open, _) in raw.match_indices('[') {
        let rest = &raw[open + 1..];
        let mut chars = rest.char_indices();

        // The group needs at least one character, which may itself be ']'
        let Some((_, first)) = chars.next() else {
            return None;
        };
        if first == '\n' || first == '\r' {
            continue;
        }

        for (offset, c) in chars {
            match c {
                ']' => return Some((open, open + 1 + offset + 1)),
                '\n' | '\r' => break,
                _ => {}
            }
        }
    }
    None
}

/// Compose a provider-bound title: `"[tag] title"`, or just the title.
pub fn join_tag(title: &str, tag: &str) -> String {
    if tag.is_empty() {
        title.to_string()
    } else if title.is_empty() {
        format!("[{tag}]")
    } else {
        format!("[{tag}] {title}")
    }
}

/// Trim surrounding whitespace.
pub fn normalize_text(raw: &str) -> String {
    raw.trim().to_string()
}

/// Normalize a provider date or date-time to its canonical form.
///
/// Instants become `YYYY-MM-DDTHH:MM:SSZ` in UTC, date-only values stay
/// `YYYY-MM-DD`. Empty or unparseable input yields an empty string.
pub fn normalize_date(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }

    if let Some(instant) = parse_instant(raw) {
        return instant.format(INSTANT_FORMAT).to_string();
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        return date.format(DATE_FORMAT).to_string();
    }

    tracing::warn!(value = raw, "Unparseable date, treating as empty");
    String::new()
}

/// Parse any supported date-time representation into a UTC instant.
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    // Offsets written as `Z` are rewritten so the `%z` family can read them
    let with_offset = match raw.strip_suffix(['Z', 'z']) {
        Some(head) => format!("{head}+00:00"),
        None => raw.to_string(),
    };

    for format in ["%Y-%m-%dT%H:%M%:z", "%Y-%m-%dT%H:%M%z", "%Y-%m-%dT%H:%M:%S%z"] {
        if let Ok(dt) = DateTime::parse_from_str(&with_offset, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    // No offset at all: treat as UTC
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    None
}

/// Date of a canonical or raw start value, ignoring the time of day.
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        return Some(date);
    }
    parse_instant(raw).map(|dt| dt.date_naive())
}

/// End of a milestone: the day after `start`, date-only.
pub fn milestone_end(start: &str) -> String {
    parse_day(start)
        .and_then(|day| day.checked_add_signed(Duration::days(1)))
        .map(|day| day.format(DATE_FORMAT).to_string())
        .unwrap_or_default()
}
