use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::debug;

use crate::core::model::{Event, FeedEvents};
use crate::core::timeline::{LineItem, TimeOfDay, TimelinePair};
use crate::shared::utils::date::minutes_from_midnight;

const HALF_DAY_SECS: i64 = 12 * 60 * 60;
const ONE_HOUR_SECS: i64 = 60 * 60;

const DESCRIPTION_INDENT: &str = "\n    - ";
const END_MARKER: &str = "BREAK";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Full-day or half-day entries, listed rather than placed on the timeline.
    Long,
    Timed,
}

/// Spans within an hour of half a day, or longer, count as long. Calendars export
/// all-day and half-day entries with slightly irregular spans, so this is loose.
pub fn classify(start: DateTime<Utc>, end: DateTime<Utc>) -> EventKind {
    let span = (end - start).num_seconds().abs();
    if HALF_DAY_SECS - span <= ONE_HOUR_SECS {
        EventKind::Long
    } else {
        EventKind::Timed
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Normalized {
    /// Timed events in input order; not yet sorted.
    pub timed: Vec<TimelinePair>,
    pub full_day: Vec<String>,
}

/// Drops repeated events (first one wins, across calendars) and renders the rest as
/// timeline pairs or full-day lines.
pub fn normalize(feeds: &[FeedEvents], date: NaiveDate, tz: &Tz) -> Normalized {
    let mut seen = HashSet::new();
    let mut normalized = Normalized::default();

    for feed in feeds {
        for event in &feed.events {
            if !seen.insert(event.identity()) {
                debug!(calendar = %feed.calendar, summary = %event.summary, "skipping duplicate event");
                continue;
            }

            match classify(event.start, event.end) {
                EventKind::Long => normalized
                    .full_day
                    .push(render_long(&feed.calendar, event, tz)),
                EventKind::Timed => normalized
                    .timed
                    .push(render_timed(&feed.calendar, event, date, tz)),
            }
        }
    }

    debug!(
        timed = normalized.timed.len(),
        full_day = normalized.full_day.len(),
        "normalized events"
    );
    normalized
}

fn render_long(calendar: &str, event: &Event, tz: &Tz) -> String {
    let start = event.start.with_timezone(tz);
    let end = event.end.with_timezone(tz);

    let mut line = format!(
        "- **({}) {}** {} - {}",
        calendar,
        event.summary.trim(),
        start.format("%m/%d %H:%M"),
        end.format("%m/%d %H:%M"),
    );
    if let Some(location) = event.location.as_deref().map(str::trim) {
        if !location.is_empty() {
            line.push(' ');
            line.push_str(location);
        }
    }
    line
}

fn render_timed(calendar: &str, event: &Event, date: NaiveDate, tz: &Tz) -> TimelinePair {
    let start = event.start.with_timezone(tz);
    let end = event.end.with_timezone(tz);

    let label = format!(
        "**({}) {}** {}",
        calendar,
        event.summary.trim(),
        event.location.as_deref().unwrap_or_default().trim()
    );
    let start_text = format!(
        "- [ ] {} {}{}",
        start.format("%H:%M"),
        label.trim(),
        render_description(event.description.as_deref())
    );

    TimelinePair {
        start: LineItem {
            time: TimeOfDay::from_minutes(minutes_from_midnight(date, &start)),
            text: start_text.trim().to_string(),
        },
        end: LineItem {
            time: TimeOfDay::from_minutes(minutes_from_midnight(date, &end)),
            text: format!("- [ ] {} {}", end.format("%H:%M"), END_MARKER),
        },
    }
}

fn render_description(description: Option<&str>) -> String {
    description
        .unwrap_or_default()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| format!("{DESCRIPTION_INDENT}{line}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn tokyo() -> Tz {
        "Asia/Tokyo".parse().unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 6).unwrap()
    }

    /// Event on 2025-01-06 JST starting at `hour:minute` and lasting `minutes`.
    fn event(uid: Option<&str>, summary: &str, hour: u32, minute: u32, minutes: i64) -> Event {
        let start = tokyo()
            .with_ymd_and_hms(2025, 1, 6, hour, minute, 0)
            .unwrap()
            .to_utc();
        Event {
            uid: uid.map(str::to_string),
            summary: summary.to_string(),
            location: None,
            description: None,
            start,
            end: start + Duration::minutes(minutes),
        }
    }

    fn feed(calendar: &str, events: Vec<Event>) -> FeedEvents {
        FeedEvents {
            calendar: calendar.to_string(),
            events,
        }
    }

    #[test]
    fn test_classification_boundary() {
        let start = Utc.with_ymd_and_hms(2025, 1, 6, 0, 0, 0).unwrap();
        let threshold = start + Duration::hours(11);

        assert_eq!(classify(start, threshold), EventKind::Long);
        assert_eq!(
            classify(start, threshold - Duration::seconds(1)),
            EventKind::Timed
        );
        assert_eq!(classify(start, start + Duration::hours(24)), EventKind::Long);
        assert_eq!(classify(start, start + Duration::minutes(30)), EventKind::Timed);
        // reversed bounds use the absolute span
        assert_eq!(classify(threshold, start), EventKind::Long);
    }

    #[test]
    fn test_duplicates_are_dropped_regardless_of_order() {
        let a = event(Some("same"), "From work", 9, 0, 30);
        let b = event(Some("same"), "From team", 14, 0, 30);

        let forward = normalize(
            &[feed("Work", vec![a.clone()]), feed("Team", vec![b.clone()])],
            date(),
            &tokyo(),
        );
        let backward = normalize(
            &[feed("Team", vec![b]), feed("Work", vec![a])],
            date(),
            &tokyo(),
        );

        assert_eq!(forward.timed.len(), 1);
        assert_eq!(backward.timed.len(), 1);
        assert!(forward.timed[0].start.text.contains("(Work) From work"));
        assert!(backward.timed[0].start.text.contains("(Team) From team"));
    }

    #[test]
    fn test_events_without_uid_use_composite_identity() {
        let first = event(None, "Focus", 9, 0, 60);
        let repeat = first.clone();
        let other_time = event(None, "Focus", 13, 0, 60);

        let normalized = normalize(
            &[feed("Work", vec![first, repeat, other_time])],
            date(),
            &tokyo(),
        );

        assert_eq!(normalized.timed.len(), 2);
    }

    #[test]
    fn test_timed_event_rendering() {
        let mut meeting = event(Some("m"), "Meeting", 9, 30, 30);
        meeting.location = Some("Room A".to_string());
        meeting.description = Some("  Agenda  \n\n  Notes\n".to_string());

        let normalized = normalize(&[feed("Work", vec![meeting])], date(), &tokyo());
        let pair = &normalized.timed[0];

        assert_eq!(
            pair.start.text,
            "- [ ] 09:30 **(Work) Meeting** Room A\n    - Agenda\n    - Notes"
        );
        assert_eq!(pair.start.time, TimeOfDay::from_minutes(570));
        assert_eq!(pair.end.text, "- [ ] 10:00 BREAK");
        assert_eq!(pair.end.time, TimeOfDay::from_minutes(600));
    }

    #[test]
    fn test_timed_event_without_location_has_no_trailing_space() {
        let normalized = normalize(
            &[feed("Work", vec![event(Some("m"), "Meeting", 9, 30, 30)])],
            date(),
            &tokyo(),
        );
        assert_eq!(normalized.timed[0].start.text, "- [ ] 09:30 **(Work) Meeting**");
    }

    #[test]
    fn test_event_ending_after_midnight_keeps_order() {
        let late = event(Some("late"), "Release", 23, 30, 60);
        let normalized = normalize(&[feed("Ops", vec![late])], date(), &tokyo());
        let pair = &normalized.timed[0];

        assert_eq!(pair.end.text, "- [ ] 00:30 BREAK");
        assert_eq!(pair.end.time, TimeOfDay::from_minutes(24 * 60 + 30));
    }

    #[test]
    fn test_long_event_rendering() {
        let start = tokyo().with_ymd_and_hms(2025, 1, 6, 0, 0, 0).unwrap().to_utc();
        let holiday = Event {
            uid: Some("holiday".to_string()),
            summary: "Company Holiday".to_string(),
            location: Some("Everywhere".to_string()),
            description: Some("ignored".to_string()),
            start,
            end: start + Duration::days(1),
        };

        let normalized = normalize(&[feed("Work", vec![holiday])], date(), &tokyo());

        assert!(normalized.timed.is_empty());
        assert_eq!(
            normalized.full_day,
            vec!["- **(Work) Company Holiday** 01/06 00:00 - 01/07 00:00 Everywhere"]
        );
    }
}
