use chrono::{DateTime, Days, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

/// Resolves a wall-clock time in `tz` to an instant. Ambiguous times take the earlier
/// mapping, times inside a DST gap are moved forward by the one-hour gap.
pub fn resolve_local(tz: &Tz, naive: &NaiveDateTime) -> DateTime<Utc> {
    tz.from_local_datetime(naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(*naive + Duration::hours(1))).earliest())
        .map(|local| local.to_utc())
        .unwrap_or_else(|| naive.and_utc())
}

/// `[start, end)` of the local day `date` in `tz`, expressed in UTC.
pub fn day_bounds(date: NaiveDate, tz: &Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let next = date.checked_add_days(Days::new(1)).unwrap_or(date);

    (
        resolve_local(tz, &date.and_time(NaiveTime::MIN)),
        resolve_local(tz, &next.and_time(NaiveTime::MIN)),
    )
}

/// Minutes between local midnight of `date` and the wall-clock time of `local`.
/// Negative for the previous day, 1440 or more for the following ones.
pub fn minutes_from_midnight(date: NaiveDate, local: &DateTime<Tz>) -> i32 {
    let days = (local.date_naive() - date).num_days() as i32;
    days * 24 * 60 + (local.hour() * 60 + local.minute()) as i32
}

/// Extracts the note date from a file stem such as `Daily-20250106`.
///
/// The stem is split on `separator` and the segment at `segment` is parsed with the
/// chrono `format` string.
pub fn date_from_note_name(
    stem: &str,
    separator: &str,
    segment: usize,
    format: &str,
) -> Option<NaiveDate> {
    let part = stem.split(separator).nth(segment)?;
    NaiveDate::parse_from_str(part.trim(), format).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_bounds_tokyo() {
        let tz: Tz = "Asia/Tokyo".parse().unwrap();
        let (start, end) = day_bounds(NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(), &tz);

        assert_eq!(start.to_rfc3339(), "2023-01-01T15:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2023-01-02T15:00:00+00:00");
    }

    #[test]
    fn test_day_bounds_los_angeles_dst_start() {
        let tz: Tz = "America/Los_Angeles".parse().unwrap();
        let (start, end) = day_bounds(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(), &tz);

        assert_eq!(start.to_rfc3339(), "2024-03-10T08:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2024-03-11T07:00:00+00:00");
        assert_eq!((end - start).num_hours(), 23);
    }

    #[test]
    fn test_minutes_from_midnight() {
        let tz: Tz = "Asia/Tokyo".parse().unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();

        let same_day = tz.with_ymd_and_hms(2025, 1, 6, 9, 30, 0).unwrap();
        let next_day = tz.with_ymd_and_hms(2025, 1, 7, 0, 30, 0).unwrap();
        let prev_day = tz.with_ymd_and_hms(2025, 1, 5, 23, 0, 0).unwrap();

        assert_eq!(minutes_from_midnight(date, &same_day), 570);
        assert_eq!(minutes_from_midnight(date, &next_day), 1470);
        assert_eq!(minutes_from_midnight(date, &prev_day), -60);
    }

    #[test]
    fn test_date_from_note_name() {
        assert_eq!(
            date_from_note_name("Daily-20250106", "-", 1, "%Y%m%d"),
            NaiveDate::from_ymd_opt(2025, 1, 6)
        );
        assert_eq!(
            date_from_note_name("2025-01-06", "_", 0, "%Y-%m-%d"),
            NaiveDate::from_ymd_opt(2025, 1, 6)
        );
        assert_eq!(date_from_note_name("Inbox", "-", 1, "%Y%m%d"), None);
        assert_eq!(date_from_note_name("Daily-notadate", "-", 1, "%Y%m%d"), None);
    }
}
