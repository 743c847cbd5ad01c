//! Feed parsing using the icalendar crate's parser.

use chrono::Duration;
use icalendar::{
    parser::{read_calendar, unfold, Component, Property},
    CalendarDateTime, DatePerhapsTime,
};
use thiserror::Error;
use tracing::debug;

use crate::ics::model::{EventTime, Recurrence, VEvent};

#[derive(Debug, Error)]
pub enum IcsParseError {
    #[error("feed is not a valid iCalendar document: {0}")]
    Malformed(String),
}

/// Parses every VEVENT in a feed. Components without DTSTART and cancelled ones are
/// skipped; a malformed document as a whole is an error.
pub fn parse_feed(content: &str) -> Result<Vec<VEvent>, IcsParseError> {
    let unfolded = unfold(content);
    let calendar = read_calendar(&unfolded).map_err(|e| IcsParseError::Malformed(e.to_string()))?;

    let events: Vec<VEvent> = calendar
        .components
        .iter()
        .filter(|c| c.name == "VEVENT")
        .filter_map(parse_vevent)
        .collect();

    debug!(count = events.len(), "parsed feed");
    Ok(events)
}

fn parse_vevent(vevent: &Component) -> Option<VEvent> {
    let uid = vevent
        .find_prop("UID")
        .map(|p| p.val.to_string())
        .filter(|uid| !uid.trim().is_empty());

    if vevent
        .find_prop("STATUS")
        .is_some_and(|p| p.val.as_ref() == "CANCELLED")
    {
        debug!(?uid, "skipping cancelled event");
        return None;
    }

    let Some(start) = vevent.find_prop("DTSTART").and_then(to_event_time) else {
        debug!(?uid, "skipping event without a usable DTSTART");
        return None;
    };

    let end = vevent
        .find_prop("DTEND")
        .and_then(to_event_time)
        .or_else(|| {
            vevent
                .find_prop("DURATION")
                .and_then(|p| parse_duration(p.val.as_ref()))
                .map(|d| start.shifted(d))
        })
        .unwrap_or_else(|| match start {
            EventTime::Date(_) => start.shifted(Duration::days(1)),
            _ => start.clone(),
        });

    let summary = vevent
        .find_prop("SUMMARY")
        .map(|p| unescape_text(p.val.as_ref()))
        .unwrap_or_else(|| "(no summary)".to_string());
    let description = vevent
        .find_prop("DESCRIPTION")
        .map(|p| unescape_text(p.val.as_ref()));
    let location = vevent
        .find_prop("LOCATION")
        .map(|p| unescape_text(p.val.as_ref()))
        .filter(|l| !l.trim().is_empty());

    let recurrence = vevent.find_prop("RRULE").map(|p| Recurrence {
        rrule: p.val.to_string(),
        exdates: vevent
            .properties
            .iter()
            .filter(|p| p.name == "EXDATE")
            .flat_map(parse_exdate_property)
            .collect(),
    });

    let recurrence_id = vevent.find_prop("RECURRENCE-ID").and_then(to_event_time);

    Some(VEvent {
        uid,
        summary,
        description,
        location,
        start,
        end,
        recurrence,
        recurrence_id,
    })
}

fn to_event_time(prop: &Property) -> Option<EventTime> {
    let value = DatePerhapsTime::try_from(prop).ok()?;

    Some(match value {
        DatePerhapsTime::Date(d) => EventTime::Date(d),
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt)) => EventTime::DateTimeUtc(dt),
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive)) => {
            EventTime::DateTimeFloating(naive)
        }
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => {
            EventTime::DateTimeZoned {
                datetime: date_time,
                tzid,
            }
        }
    })
}

/// EXDATE may carry a TZID or VALUE=DATE parameter and a comma-separated list.
fn parse_exdate_property(prop: &Property) -> Vec<EventTime> {
    let tzid = prop
        .params
        .iter()
        .find(|p| p.key == "TZID")
        .and_then(|p| p.val.as_ref().map(|v| v.to_string()));

    let is_date = prop
        .params
        .iter()
        .any(|p| p.key == "VALUE" && p.val.as_ref().map(|v| v.as_ref()) == Some("DATE"));

    prop.val
        .as_ref()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            if is_date {
                return chrono::NaiveDate::parse_from_str(s, "%Y%m%d")
                    .ok()
                    .map(EventTime::Date);
            }

            let naive =
                chrono::NaiveDateTime::parse_from_str(s.trim_end_matches('Z'), "%Y%m%dT%H%M%S")
                    .ok()?;

            Some(match (&tzid, s.ends_with('Z')) {
                (_, true) => EventTime::DateTimeUtc(naive.and_utc()),
                (Some(tz), false) => EventTime::DateTimeZoned {
                    datetime: naive,
                    tzid: tz.clone(),
                },
                (None, false) => EventTime::DateTimeFloating(naive),
            })
        })
        .collect()
}

/// ISO 8601 durations as used by DURATION, e.g. `PT1H30M` or `P1D`.
fn parse_duration(value: &str) -> Option<Duration> {
    let parsed = iso8601::duration(value.trim_start_matches('+')).ok()?;
    let std_duration: std::time::Duration = parsed.into();
    Duration::from_std(std_duration).ok()
}

/// Reverses RFC 5545 TEXT escaping.
fn unescape_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    const FEED: &str = "BEGIN:VCALENDAR\r
VERSION:2.0\r
PRODID:-//cal2plan//test//EN\r
BEGIN:VEVENT\r
UID:standup@example.com\r
SUMMARY:Team Stand-up\r
LOCATION:Meeting Room A\r
DESCRIPTION:Daily sync.\\nBring blockers\\, if any.\r
DTSTART:20250106T003000Z\r
DTEND:20250106T010000Z\r
END:VEVENT\r
BEGIN:VEVENT\r
UID:holiday@example.com\r
SUMMARY:Company Holiday\r
DTSTART;VALUE=DATE:20250106\r
DTEND;VALUE=DATE:20250107\r
END:VEVENT\r
BEGIN:VEVENT\r
UID:weekly@example.com\r
SUMMARY:Weekly Review\r
DTSTART;TZID=Asia/Tokyo:20250101T170000\r
DURATION:PT1H30M\r
RRULE:FREQ=WEEKLY;COUNT=10\r
EXDATE;TZID=Asia/Tokyo:20250108T170000,20250115T170000\r
END:VEVENT\r
BEGIN:VEVENT\r
UID:cancelled@example.com\r
SUMMARY:Cancelled thing\r
STATUS:CANCELLED\r
DTSTART:20250106T050000Z\r
DTEND:20250106T060000Z\r
END:VEVENT\r
BEGIN:VEVENT\r
SUMMARY:No start\r
END:VEVENT\r
END:VCALENDAR\r
";

    #[test]
    fn test_parse_feed() {
        let events = parse_feed(FEED).unwrap();
        assert_eq!(events.len(), 3);

        let standup = &events[0];
        assert_eq!(standup.uid.as_deref(), Some("standup@example.com"));
        assert_eq!(standup.summary, "Team Stand-up");
        assert_eq!(standup.location.as_deref(), Some("Meeting Room A"));
        assert_eq!(
            standup.description.as_deref(),
            Some("Daily sync.\nBring blockers, if any.")
        );
        assert_eq!(
            standup.start,
            EventTime::DateTimeUtc(Utc.with_ymd_and_hms(2025, 1, 6, 0, 30, 0).unwrap())
        );
        assert!(standup.recurrence.is_none());

        let holiday = &events[1];
        assert_eq!(
            holiday.start,
            EventTime::Date(NaiveDate::from_ymd_opt(2025, 1, 6).unwrap())
        );
        assert_eq!(
            holiday.end,
            EventTime::Date(NaiveDate::from_ymd_opt(2025, 1, 7).unwrap())
        );
    }

    #[test]
    fn test_parse_recurrence_and_duration() {
        let events = parse_feed(FEED).unwrap();
        let weekly = &events[2];

        let start = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(17, 0, 0)
            .unwrap();
        assert_eq!(
            weekly.end,
            EventTime::DateTimeZoned {
                datetime: start + Duration::minutes(90),
                tzid: "Asia/Tokyo".to_string(),
            }
        );

        let recurrence = weekly.recurrence.as_ref().unwrap();
        assert_eq!(recurrence.rrule, "FREQ=WEEKLY;COUNT=10");
        assert_eq!(recurrence.exdates.len(), 2);
        assert_eq!(
            recurrence.exdates[1],
            EventTime::DateTimeZoned {
                datetime: NaiveDate::from_ymd_opt(2025, 1, 15)
                    .unwrap()
                    .and_hms_opt(17, 0, 0)
                    .unwrap(),
                tzid: "Asia/Tokyo".to_string(),
            }
        );
    }

    #[test]
    fn test_unescape_text() {
        assert_eq!(unescape_text(r"a\, b\; c\\d\ne"), "a, b; c\\d\ne");
        assert_eq!(unescape_text(r"trailing\"), "trailing\\");
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("PT45M"), Some(Duration::minutes(45)));
        assert_eq!(parse_duration("P1D"), Some(Duration::days(1)));
        assert_eq!(parse_duration("nonsense"), None);
    }
}
