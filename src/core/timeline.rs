use std::fmt;

/// Minutes since local midnight of the target date. Values below zero or past
/// `24 * 60` belong to the neighbouring days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(i32);

impl TimeOfDay {
    pub const fn from_minutes(minutes: i32) -> Self {
        TimeOfDay(minutes)
    }

    /// `None` unless `hour` is 0-23 and `minute` 0-59.
    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        (hour < 24 && minute < 60).then(|| TimeOfDay((hour * 60 + minute) as i32))
    }

    pub fn minutes(self) -> i32 {
        self.0
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let wrapped = self.minutes().rem_euclid(24 * 60);
        write!(f, "{:02}:{:02}", wrapped / 60, wrapped % 60)
    }
}

/// A rendered line and the time it is ordered and matched by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub time: TimeOfDay,
    pub text: String,
}

/// Start line and end line of one timed event, kept together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelinePair {
    pub start: LineItem,
    pub end: LineItem,
}

/// Timed events ordered by start time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timeline {
    pairs: Vec<TimelinePair>,
}

impl Timeline {
    /// Stable sort: pairs starting at the same minute keep their input order.
    pub fn build(mut pairs: Vec<TimelinePair>) -> Self {
        pairs.sort_by_key(|pair| pair.start.time);
        Timeline { pairs }
    }

    pub fn pairs(&self) -> &[TimelinePair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }
}
