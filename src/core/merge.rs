//! Interleaves the day's timeline into the planner template.
//!
//! Template lines are walked in order. Before a timestamped line (`- [ ] HH:mm ...`), every
//! pending event that starts strictly earlier is emitted as its start line followed by its
//! end line. A timestamped template line at or before the end of the last emitted event is
//! covered by that event and is replaced with an empty line. Everything else goes through
//! placeholder substitution and is kept.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::core::placeholder::Placeholders;
use crate::core::timeline::{Timeline, TimelinePair, TimeOfDay};

static LINE_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-\s*\[\s*\]\s*(\d+):(\d+)").expect("line time pattern is valid")
});

/// Time of an unchecked checkbox line such as `- [ ] 09:30 Standup`. Anything that is not
/// an `H:mm`/`HH:mm` wall-clock time yields `None`.
pub fn extract_line_time(line: &str) -> Option<TimeOfDay> {
    let caps = LINE_TIME.captures(line)?;
    let (hour, minute) = (&caps[1], &caps[2]);

    if hour.len() > 2 || minute.len() != 2 {
        return None;
    }

    TimeOfDay::from_hm(hour.parse().ok()?, minute.parse().ok()?)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOptions {
    /// Emit events that start after the last timestamped template line at the end of the
    /// document instead of leaving them out.
    pub append_unplaced: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub lines: Vec<String>,
    /// Template lines blanked because an emitted event covers them.
    pub suppressed: usize,
    /// Events that found no template line to precede.
    pub unplaced: usize,
}

impl MergeOutcome {
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

struct MergeCursor<'a> {
    pending: std::iter::Peekable<std::slice::Iter<'a, TimelinePair>>,
    last_end: Option<TimeOfDay>,
    outcome: MergeOutcome,
}

impl<'a> MergeCursor<'a> {
    fn new(timeline: &'a Timeline) -> Self {
        MergeCursor {
            pending: timeline.pairs().iter().peekable(),
            last_end: None,
            outcome: MergeOutcome::default(),
        }
    }

    fn emit_events_before(&mut self, line_time: TimeOfDay) {
        while let Some(pair) = self.pending.next_if(|pair| line_time > pair.start.time) {
            self.emit_pair(pair);
        }
    }

    fn emit_pair(&mut self, pair: &TimelinePair) {
        self.outcome.lines.push(pair.start.text.clone());
        self.outcome.lines.push(pair.end.text.clone());
        self.last_end = Some(pair.end.time);
    }

    fn is_covered(&self, line_time: TimeOfDay) -> bool {
        self.last_end.is_some_and(|end| line_time <= end)
    }
}

pub fn merge<'t, I>(
    template_lines: I,
    timeline: &Timeline,
    placeholders: &Placeholders,
    options: MergeOptions,
) -> MergeOutcome
where
    I: IntoIterator<Item = &'t str>,
{
    let mut cursor = MergeCursor::new(timeline);

    for line in template_lines {
        match extract_line_time(line) {
            Some(line_time) => {
                cursor.emit_events_before(line_time);

                if cursor.is_covered(line_time) {
                    debug!(%line_time, line, "template slot covered by calendar event");
                    cursor.outcome.suppressed += 1;
                    cursor.outcome.lines.push(String::new());
                } else {
                    cursor.outcome.lines.push(placeholders.substitute(line));
                }
            }
            None => cursor.outcome.lines.push(placeholders.substitute(line)),
        }
    }

    let remaining: Vec<&TimelinePair> = cursor.pending.by_ref().collect();
    cursor.outcome.unplaced = remaining.len();

    if !remaining.is_empty() {
        if options.append_unplaced {
            debug!(count = remaining.len(), "appending events after the last template slot");
            for pair in remaining {
                cursor.emit_pair(pair);
            }
        } else {
            warn!(
                count = remaining.len(),
                "events start after the last timestamped template line and were left out"
            );
        }
    }

    cursor.outcome
}
