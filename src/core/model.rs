use chrono::{DateTime, Utc};

/// A single occurrence of a calendar event on the target date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub uid: Option<String>,
    pub summary: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Key used to drop repeated events, across feeds as well as within one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventIdentity {
    Uid(String),
    Composite {
        summary: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl Event {
    pub fn identity(&self) -> EventIdentity {
        match &self.uid {
            Some(uid) => EventIdentity::Uid(uid.clone()),
            None => EventIdentity::Composite {
                summary: self.summary.clone(),
                start: self.start,
                end: self.end,
            },
        }
    }
}

/// The day's events of one configured calendar.
#[derive(Debug, Clone)]
pub struct FeedEvents {
    pub calendar: String,
    pub events: Vec<Event>,
}
