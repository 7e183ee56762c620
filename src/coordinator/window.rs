//! Active time window of the automation.
//!
//! Each bound is either a literal time of day from the configuration or the state
//! of an entity (an `input_datetime` or a timestamp sensor). An entity value is
//! authoritative when it resolves; the literal is the fallback. A literal end of
//! `00:00:00` means the end of the day.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::config::Config;
use crate::config::validation::parse_time_of_day;
use crate::host::{HostRuntime, safe_state};

/// Resolved bounds for one local day. `None` means unbounded on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeWindow {
    /// Resolve both bounds for the local day containing `now`.
    pub fn resolve(config: &Config, host: &dyn HostRuntime, now: DateTime<Utc>) -> Self {
        let tz = config.timezone();
        let date = now.with_timezone(&tz).date_naive();
        let automation = &config.automation;

        let start = resolve_bound(
            host,
            automation.start_entity.as_deref(),
            automation.start_time.as_deref(),
            date,
            tz,
            false,
        );
        let end = resolve_bound(
            host,
            automation.end_entity.as_deref(),
            automation.end_time.as_deref(),
            date,
            tz,
            true,
        );
        Self { start, end }
    }

    /// A start after the end. This is a configuration mistake that only shows at
    /// runtime, with entity-driven bounds.
    pub fn is_inverted(&self) -> bool {
        matches!((self.start, self.end), (Some(start), Some(end)) if start > end)
    }

    /// Whether `now` lies in `[start, end)`. An inverted window is treated as open.
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        if self.is_inverted() {
            return true;
        }

        let after_start = self.start.is_none_or(|start| now >= start);
        let before_end = self.end.is_none_or(|end| now < end);
        after_start && before_end
    }
}

fn resolve_bound(
    host: &dyn HostRuntime,
    entity: Option<&str>,
    literal: Option<&str>,
    date: NaiveDate,
    tz: Tz,
    is_end: bool,
) -> Option<DateTime<Utc>> {
    if let Some(bound) = entity
        .and_then(|entity| safe_state(host, entity))
        .and_then(|value| parse_entity_datetime(&value, date, tz))
    {
        return Some(bound);
    }

    let time = parse_time_of_day(literal?).ok()?;
    if is_end && time == NaiveTime::MIN {
        return None;
    }
    local_to_utc(tz, date.and_time(time))
}

/// Parse an entity-provided datetime.
///
/// Accepts RFC 3339 timestamps, local `YYYY-MM-DD HH:MM:SS` values, and bare times
/// of day, which are placed on `date`.
pub fn parse_entity_datetime(value: &str, date: NaiveDate, tz: Tz) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return local_to_utc(tz, naive);
    }
    let time = parse_time_of_day(value).ok()?;
    local_to_utc(tz, date.and_time(time))
}

fn local_to_utc(tz: Tz, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}
