//! Selects the event occurrences that fall on one local day, expanding RRULEs.

use std::collections::HashSet;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use rrule::RRuleSet;
use tracing::{debug, warn};

use crate::core::model::Event;
use crate::ics::model::{EventTime, Recurrence, VEvent};
use crate::shared::utils::date::{day_bounds, resolve_local};

// Upper bound on occurrences generated per master within the search window.
const MAX_OCCURRENCES: u16 = 366;

/// Returns the occurrences of `events` that overlap the local day `date` in `tz`, in feed
/// order. Occurrences replaced by a RECURRENCE-ID override are left out in favour of the
/// override component.
pub fn filter_matching_events(events: &[VEvent], date: NaiveDate, tz: &Tz) -> Vec<Event> {
    let (day_start, day_end) = day_bounds(date, tz);

    let overridden: HashSet<(String, DateTime<Utc>)> = events
        .iter()
        .filter_map(|e| Some((e.uid.clone()?, e.recurrence_id.as_ref()?.resolve(tz))))
        .collect();

    let mut matching = Vec::new();

    for vevent in events {
        let start = vevent.start.resolve(tz);
        let duration = vevent.end.resolve(tz) - start;

        let starts = match (&vevent.recurrence, &vevent.recurrence_id) {
            (Some(recurrence), None) => {
                let window_start = day_start - duration.max(Duration::zero());
                match expand(&vevent.start, recurrence, tz, window_start, day_end) {
                    Ok(occurrences) => occurrences,
                    Err(e) => {
                        warn!(uid = ?vevent.uid, error = %e, "could not expand RRULE, using first occurrence only");
                        vec![start]
                    }
                }
            }
            _ => vec![start],
        };

        for occurrence in starts {
            if vevent.recurrence_id.is_none() && vevent.recurrence.is_some() {
                if let Some(uid) = &vevent.uid {
                    if overridden.contains(&(uid.clone(), occurrence)) {
                        debug!(%uid, %occurrence, "occurrence replaced by override");
                        continue;
                    }
                }
            }

            let end = occurrence + duration;
            if overlaps_day(occurrence, end, day_start, day_end) {
                matching.push(Event {
                    uid: vevent.uid.clone(),
                    summary: vevent.summary.clone(),
                    location: vevent.location.clone(),
                    description: vevent.description.clone(),
                    start: occurrence,
                    end,
                });
            }
        }
    }

    matching
}

fn overlaps_day(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    day_start: DateTime<Utc>,
    day_end: DateTime<Utc>,
) -> bool {
    if end > start {
        start < day_end && end > day_start
    } else {
        start >= day_start && start < day_end
    }
}

fn expand(
    master_start: &EventTime,
    recurrence: &Recurrence,
    tz: &Tz,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Result<Vec<DateTime<Utc>>, rrule::RRuleError> {
    let rrule_set: RRuleSet = build_rrule_string(master_start, recurrence, tz).parse()?;

    // after/before are exclusive
    let utc: rrule::Tz = Utc.into();
    let after = (window_start - Duration::seconds(1)).with_timezone(&utc);
    let before = (window_end + Duration::seconds(1)).with_timezone(&utc);

    let result = rrule_set.after(after).before(before).all(MAX_OCCURRENCES);

    Ok(result
        .dates
        .iter()
        .map(|dt| dt.with_timezone(&Utc))
        .collect())
}

/// DTSTART/RRULE/EXDATE block for the rrule parser. Dates and floating times are pinned to
/// the configured zone so occurrences keep their wall-clock time across DST changes.
fn build_rrule_string(start: &EventTime, recurrence: &Recurrence, tz: &Tz) -> String {
    let mut lines = vec![format!("DTSTART{}", rrule_time(start, tz))];
    lines.push(format!(
        "RRULE:{}",
        normalize_until(&recurrence.rrule, &rrule_zone(start, tz))
    ));
    lines.extend(
        recurrence
            .exdates
            .iter()
            .map(|exdate| format!("EXDATE{}", rrule_time(exdate, tz))),
    );
    lines.join("\n")
}

fn rrule_time(time: &EventTime, tz: &Tz) -> String {
    match time {
        EventTime::Date(d) => format!(";TZID={}:{}T000000", tz.name(), d.format("%Y%m%d")),
        EventTime::DateTimeUtc(dt) => format!(":{}", dt.format("%Y%m%dT%H%M%SZ")),
        EventTime::DateTimeFloating(naive) => {
            format!(";TZID={}:{}", tz.name(), naive.format("%Y%m%dT%H%M%S"))
        }
        EventTime::DateTimeZoned { datetime, .. } => format!(
            ";TZID={}:{}",
            rrule_zone(time, tz).name(),
            datetime.format("%Y%m%dT%H%M%S")
        ),
    }
}

/// Zone the master's wall-clock times are read in.
fn rrule_zone(start: &EventTime, tz: &Tz) -> Tz {
    match start {
        EventTime::DateTimeZoned { tzid, .. } => tzid.parse().unwrap_or(*tz),
        _ => *tz,
    }
}

/// Rewrites a date-only or local UNTIL as a UTC instant, which rrule requires once DTSTART
/// carries a TZID. A date-only UNTIL keeps its whole day.
fn normalize_until(rrule: &str, zone: &Tz) -> String {
    rrule
        .split(';')
        .map(|part| match part.split_once('=') {
            Some((key, value)) if key.eq_ignore_ascii_case("UNTIL") => {
                match until_utc(value.trim(), zone) {
                    Some(until) => format!("{}={}", key, until.format("%Y%m%dT%H%M%SZ")),
                    None => part.to_string(),
                }
            }
            _ => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join(";")
}

fn until_utc(value: &str, zone: &Tz) -> Option<DateTime<Utc>> {
    if value.ends_with('Z') {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y%m%d") {
        let last_second = NaiveTime::from_hms_opt(23, 59, 59)?;
        return Some(resolve_local(zone, &date.and_time(last_second)));
    }

    NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S")
        .ok()
        .map(|naive| resolve_local(zone, &naive))
}
