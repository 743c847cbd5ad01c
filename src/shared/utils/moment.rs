//! Moment-style date patterns (`YYYY-MM-DD`, `dddd`, `HH:mm`) as used by daily-note
//! templates, rendered with chrono.

use chrono::{DateTime, Datelike, TimeZone, Timelike};
use std::fmt::Display;

// Longest tokens first so `MMMM` wins over `MM`.
const TOKENS: &[&str] = &[
    "YYYY", "YY", "MMMM", "MMM", "MM", "M", "DDDD", "DDD", "Do", "DD", "D", "dddd", "ddd",
    "dd", "d", "HH", "H", "hh", "h", "mm", "m", "ss", "s", "A", "a", "ZZ", "Z", "X", "x",
];

pub fn format_moment<T>(dt: &DateTime<T>, pattern: &str) -> String
where
    T: TimeZone,
    T::Offset: Display,
{
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut rest = pattern;

    while let Some(ch) = rest.chars().next() {
        if ch == '[' {
            if let Some(close) = rest.find(']') {
                out.push_str(&rest[1..close]);
                rest = &rest[close + 1..];
                continue;
            }
        }

        match TOKENS.iter().find(|token| rest.starts_with(**token)) {
            Some(token) => {
                out.push_str(&render_token(dt, token));
                rest = &rest[token.len()..];
            }
            None => {
                out.push(ch);
                rest = &rest[ch.len_utf8()..];
            }
        }
    }

    out
}

fn render_token<T>(dt: &DateTime<T>, token: &str) -> String
where
    T: TimeZone,
    T::Offset: Display,
{
    match token {
        "YYYY" => format!("{:04}", dt.year()),
        "YY" => format!("{:02}", dt.year().rem_euclid(100)),
        "MMMM" => dt.format("%B").to_string(),
        "MMM" => dt.format("%b").to_string(),
        "MM" => format!("{:02}", dt.month()),
        "M" => dt.month().to_string(),
        "DDDD" => format!("{:03}", dt.ordinal()),
        "DDD" => dt.ordinal().to_string(),
        "Do" => ordinal_suffix(dt.day()),
        "DD" => format!("{:02}", dt.day()),
        "D" => dt.day().to_string(),
        "dddd" => dt.format("%A").to_string(),
        "ddd" => dt.format("%a").to_string(),
        "dd" => dt.format("%a").to_string().chars().take(2).collect(),
        "d" => dt.weekday().num_days_from_sunday().to_string(),
        "HH" => format!("{:02}", dt.hour()),
        "H" => dt.hour().to_string(),
        "hh" => format!("{:02}", dt.hour12().1),
        "h" => dt.hour12().1.to_string(),
        "mm" => format!("{:02}", dt.minute()),
        "m" => dt.minute().to_string(),
        "ss" => format!("{:02}", dt.second()),
        "s" => dt.second().to_string(),
        "A" => (if dt.hour12().0 { "PM" } else { "AM" }).to_string(),
        "a" => (if dt.hour12().0 { "pm" } else { "am" }).to_string(),
        "ZZ" => dt.format("%z").to_string(),
        "Z" => dt.format("%:z").to_string(),
        "X" => dt.timestamp().to_string(),
        "x" => dt.timestamp_millis().to_string(),
        _ => token.to_string(),
    }
}

fn ordinal_suffix(day: u32) -> String {
    let suffix = match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{day}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn sample() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(9 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 1, 6, 14, 5, 9)
            .unwrap()
    }

    #[test]
    fn test_common_daily_note_patterns() {
        let dt = sample();
        assert_eq!(format_moment(&dt, "YYYY-MM-DD"), "2025-01-06");
        assert_eq!(format_moment(&dt, "YYYYMMDD"), "20250106");
        assert_eq!(format_moment(&dt, "dddd, MMMM Do"), "Monday, January 6th");
        assert_eq!(format_moment(&dt, "HH:mm:ss"), "14:05:09");
        assert_eq!(format_moment(&dt, "h:mm A"), "2:05 PM");
    }

    #[test]
    fn test_bracketed_text_is_literal() {
        let dt = sample();
        assert_eq!(format_moment(&dt, "[Week of] YYYY"), "Week of 2025");
        assert_eq!(format_moment(&dt, "HH[h]mm"), "14h05");
    }

    #[test]
    fn test_unknown_characters_pass_through() {
        let dt = sample();
        assert_eq!(format_moment(&dt, "YYYY/% é"), "2025/% é");
        assert_eq!(format_moment(&dt, "Z"), "+09:00");
    }

    #[test]
    fn test_ordinal_suffix() {
        assert_eq!(ordinal_suffix(1), "1st");
        assert_eq!(ordinal_suffix(2), "2nd");
        assert_eq!(ordinal_suffix(3), "3rd");
        assert_eq!(ordinal_suffix(11), "11th");
        assert_eq!(ordinal_suffix(12), "12th");
        assert_eq!(ordinal_suffix(22), "22nd");
    }
}
