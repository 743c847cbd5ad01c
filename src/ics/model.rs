use chrono::{DateTime, Days, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;

use crate::shared::utils::date::resolve_local;

/// A DTSTART/DTEND/EXDATE/RECURRENCE-ID value as it appears in the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventTime {
    Date(NaiveDate),
    DateTimeUtc(DateTime<Utc>),
    DateTimeFloating(NaiveDateTime),
    DateTimeZoned { datetime: NaiveDateTime, tzid: String },
}

impl EventTime {
    /// Pins the value to an instant. Dates and floating times are read in `tz`, and so
    /// are zoned times whose TZID chrono-tz does not know (e.g. Windows zone names).
    pub fn resolve(&self, tz: &Tz) -> DateTime<Utc> {
        match self {
            EventTime::Date(d) => resolve_local(tz, &d.and_time(NaiveTime::MIN)),
            EventTime::DateTimeUtc(dt) => *dt,
            EventTime::DateTimeFloating(naive) => resolve_local(tz, naive),
            EventTime::DateTimeZoned { datetime, tzid } => {
                let zone = tzid.parse::<Tz>().unwrap_or(*tz);
                resolve_local(&zone, datetime)
            }
        }
    }

    pub fn shifted(&self, by: Duration) -> EventTime {
        match self {
            EventTime::Date(d) => {
                let days = by.num_days().max(0) as u64;
                EventTime::Date(d.checked_add_days(Days::new(days)).unwrap_or(*d))
            }
            EventTime::DateTimeUtc(dt) => EventTime::DateTimeUtc(*dt + by),
            EventTime::DateTimeFloating(naive) => EventTime::DateTimeFloating(*naive + by),
            EventTime::DateTimeZoned { datetime, tzid } => EventTime::DateTimeZoned {
                datetime: *datetime + by,
                tzid: tzid.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recurrence {
    pub rrule: String,
    pub exdates: Vec<EventTime>,
}

/// One VEVENT component of a feed, before recurrence expansion and day filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VEvent {
    pub uid: Option<String>,
    pub summary: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    pub recurrence: Option<Recurrence>,
    pub recurrence_id: Option<EventTime>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_uses_configured_zone_for_dates_and_floating() {
        let tz: Tz = "Asia/Tokyo".parse().unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();

        assert_eq!(
            EventTime::Date(date).resolve(&tz).to_rfc3339(),
            "2025-01-05T15:00:00+00:00"
        );
        assert_eq!(
            EventTime::DateTimeFloating(date.and_hms_opt(9, 0, 0).unwrap())
                .resolve(&tz)
                .to_rfc3339(),
            "2025-01-06T00:00:00+00:00"
        );
    }

    #[test]
    fn test_resolve_unknown_tzid_falls_back() {
        let tz: Tz = "Europe/Berlin".parse().unwrap();
        let datetime = NaiveDate::from_ymd_opt(2025, 1, 6)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();

        let known = EventTime::DateTimeZoned {
            datetime,
            tzid: "America/New_York".to_string(),
        };
        let unknown = EventTime::DateTimeZoned {
            datetime,
            tzid: "W. Europe Standard Time".to_string(),
        };

        assert_eq!(known.resolve(&tz).to_rfc3339(), "2025-01-06T14:00:00+00:00");
        assert_eq!(unknown.resolve(&tz).to_rfc3339(), "2025-01-06T08:00:00+00:00");
    }

    #[test]
    fn test_shifted_date_moves_whole_days() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        assert_eq!(
            EventTime::Date(date).shifted(Duration::days(2)),
            EventTime::Date(NaiveDate::from_ymd_opt(2025, 1, 8).unwrap())
        );
    }
}
