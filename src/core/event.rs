use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use thiserror::Error;

use crate::shared::utils::date::date_from_note_name;

#[cfg_attr(test, mockall::automock)]
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

pub struct RealClock;

impl Clock for RealClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// How daily note file names carry their date, e.g. `Daily-20250106`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteDateFormat {
    pub separator: String,
    pub segment: usize,
    pub format: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateSelection {
    Explicit(NaiveDate),
    Today,
    /// File stem of the note the plan is inserted into.
    NoteName(String),
}

#[derive(Debug, Error)]
pub enum TargetDateError {
    #[error("Could not read a date from note name '{stem}' (segment {segment} after splitting on '{separator}', format '{format}'); pass --date instead.")]
    NoteDateNotFound {
        stem: String,
        separator: String,
        segment: usize,
        format: String,
    },
}

pub struct TargetDateResolver<C: Clock> {
    clock: C,
}

impl<C: Clock> TargetDateResolver<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    pub fn now<TZ: TimeZone>(&self, tz: &TZ) -> DateTime<TZ> {
        self.clock.now().with_timezone(tz)
    }

    pub fn resolve<TZ: TimeZone>(
        &self,
        tz: &TZ,
        selection: &DateSelection,
        note_format: &NoteDateFormat,
    ) -> Result<NaiveDate, TargetDateError> {
        match selection {
            DateSelection::Explicit(date) => Ok(*date),
            DateSelection::Today => Ok(self.now(tz).date_naive()),
            DateSelection::NoteName(stem) => date_from_note_name(
                stem,
                &note_format.separator,
                note_format.segment,
                &note_format.format,
            )
            .ok_or_else(|| TargetDateError::NoteDateNotFound {
                stem: stem.clone(),
                separator: note_format.separator.clone(),
                segment: note_format.segment,
                format: note_format.format.clone(),
            }),
        }
    }
}
