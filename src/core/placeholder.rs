use std::sync::LazyLock;

use chrono::DateTime;
use chrono_tz::Tz;
use regex::{Captures, Regex};

use crate::shared::utils::moment::format_moment;

static DATE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{date:(.*?)\}\}").expect("date token pattern is valid"));
static FULL_DAY_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{fullDayEvents\}\}").expect("full-day pattern is valid"));

/// Expands `{{date:FORMAT}}` and `{{fullDayEvents}}` in template lines. Other `{{...}}`
/// tokens are left as they are.
#[derive(Debug, Clone)]
pub struct Placeholders {
    now: DateTime<Tz>,
    full_day: String,
}

impl Placeholders {
    pub fn new(now: DateTime<Tz>, full_day_lines: &[String]) -> Self {
        Placeholders {
            now,
            full_day: full_day_lines.join("\n"),
        }
    }

    pub fn substitute(&self, line: &str) -> String {
        let dated = DATE_TOKEN.replace_all(line, |caps: &Captures| {
            format_moment(&self.now, &caps[1])
        });

        FULL_DAY_TOKEN
            .replace_all(&dated, regex::NoExpand(self.full_day.as_str()))
            .into_owned()
    }
}
