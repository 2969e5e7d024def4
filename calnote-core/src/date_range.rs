//! Time window used to bound provider fetches.

use std::fmt;

use chrono::{DateTime, Duration, Utc};

use crate::normalize::{parse_day, parse_instant};

/// Default look-ahead from now.
pub const DEFAULT_WINDOW_DAYS: i64 = 7;

/// Date range for filtering events.
/// None values mean unbounded in that direction.
#[derive(Debug, Clone, PartialEq)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl Default for DateRange {
    /// Default range: now until DEFAULT_WINDOW_DAYS ahead
    fn default() -> Self {
        DateRange::ahead(Duration::days(DEFAULT_WINDOW_DAYS))
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let day = |d: Option<DateTime<Utc>>| match d {
            Some(d) => d.format("%Y-%m-%d").to_string(),
            None => "..".to_string(),
        };
        write!(f, "{} → {}", day(self.from), day(self.to))
    }
}

impl DateRange {
    /// From now until `span` from now.
    pub fn ahead(span: Duration) -> Self {
        let now = Utc::now();
        DateRange {
            from: Some(now),
            to: Some(now + span),
        }
    }

    pub fn unbounded() -> Self {
        DateRange {
            from: None,
            to: None,
        }
    }

    /// Get `from` as RFC3339 string, using the epoch if unbounded.
    pub fn from_rfc3339(&self) -> String {
        self.from.unwrap_or(DateTime::UNIX_EPOCH).to_rfc3339()
    }

    /// Get `to` as RFC3339 string, using a far future date if unbounded.
    pub fn to_rfc3339(&self) -> String {
        self.to
            .or_else(|| parse_instant("2100-01-01T00:00:00Z"))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
            .to_rfc3339()
    }

    /// Whether a canonical start value falls inside the range.
    /// Events whose start can't be read are always considered inside.
    pub fn contains(&self, start: &str) -> bool {
        let instant = parse_instant(start).or_else(|| {
            parse_day(start).and_then(|d| d.and_hms_opt(0, 0, 0)).map(|d| d.and_utc())
        });

        let Some(instant) = instant else {
            return true;
        };

        // All-day events that began today are still inside a window opening now
        let from_ok = self
            .from
            .is_none_or(|from| instant >= from - Duration::days(1));
        let to_ok = self.to.is_none_or(|to| instant <= to);
        from_ok && to_ok
    }
}
