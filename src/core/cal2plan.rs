use crate::calendar::registry::{CalendarConfig, CalendarRegistry, RegistryError};
use crate::config::{self, Config};
use crate::core::event::{Clock, DateSelection, RealClock, TargetDateError, TargetDateResolver};
use crate::core::merge::{merge, MergeOptions, MergeOutcome};
use crate::core::model::FeedEvents;
use crate::core::normalize::normalize;
use crate::core::placeholder::Placeholders;
use crate::core::timeline::Timeline;
use crate::ics::client::{FeedSource, FetchError, IcsClient};
use crate::ics::filter::filter_matching_events;
use crate::ics::parse::{parse_feed, IcsParseError};
use crate::shared::utils::path::contract_tilde;
use chrono::NaiveDate;
use futures::future;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("Template file not found; please check if '{0}' exists.")]
    MissingTemplate(String),

    #[error(transparent)]
    NoteDate(#[from] TargetDateError),

    #[error("Failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to fetch calendar '{calendar}': {source}")]
    Retrieval {
        calendar: String,
        #[source]
        source: FetchError,
    },

    #[error("Failed to parse calendar '{calendar}': {source}")]
    Parse {
        calendar: String,
        #[source]
        source: IcsParseError,
    },
}

/// What to merge: for which day, from which template.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub selection: DateSelection,
    /// Overrides `output.templatePath`.
    pub template_path: Option<PathBuf>,
    /// Overrides `settings.allowPartialResults` when set.
    pub allow_partial: bool,
}

#[derive(Debug)]
pub struct Plan {
    pub date: NaiveDate,
    pub outcome: MergeOutcome,
}

/// Where a registered calendar is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarOrigin {
    ConfigFile,
    Store,
}

pub struct Cal2Plan<S: FeedSource, C: Clock> {
    config: Config,
    source: S,
    dates: TargetDateResolver<C>,
}

impl Cal2Plan<IcsClient, RealClock> {
    pub fn new() -> anyhow::Result<Self> {
        let config = config::init()?;
        Ok(Self::with_parts(config, IcsClient::new(), RealClock))
    }
}

impl<S: FeedSource, C: Clock> Cal2Plan<S, C> {
    pub fn with_parts(config: Config, source: S, clock: C) -> Self {
        Self {
            config,
            source,
            dates: TargetDateResolver::new(clock),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store_path(&self) -> &Path {
        &self.config.settings.calendars_file_path
    }

    /// Calendars from config.lua in declaration order, then the ones added through the CLI
    /// store. A store entry whose name is already declared in config.lua is ignored.
    pub fn calendars(&self) -> Result<Vec<(CalendarOrigin, CalendarConfig)>, RegistryError> {
        // rejects duplicate names and unusable urls in config.lua
        let mut declared = CalendarRegistry::new();
        for calendar in &self.config.source.calendars {
            declared.add(calendar.clone())?;
        }

        let mut from_store = CalendarRegistry::load(self.store_path())?;
        for calendar in &self.config.source.calendars {
            if from_store.remove(&calendar.name).is_ok() {
                warn!(
                    name = %calendar.name,
                    "calendar is declared in both config.lua and the calendar store; using config.lua"
                );
            }
        }

        let from_config = self
            .config
            .source
            .calendars
            .iter()
            .map(|calendar| (CalendarOrigin::ConfigFile, calendar.clone()));
        let stored = from_store
            .iter()
            .map(|calendar| (CalendarOrigin::Store, calendar.clone()));

        Ok(from_config.chain(stored).collect())
    }

    pub async fn plan(&self, request: &PlanRequest) -> anyhow::Result<Plan> {
        let tz = self.config.settings.tz;
        let date = self
            .dates
            .resolve(&tz, &request.selection, &self.config.settings.note_date)
            .map_err(PlanError::from)?;

        let template_path = request
            .template_path
            .as_deref()
            .unwrap_or(&self.config.output.template_path);
        let template_lines = read_template(template_path)?;

        let allow_partial = request.allow_partial || self.config.settings.allow_partial_results;
        let feeds = self.fetch_day(date, allow_partial).await?;

        let normalized = normalize(&feeds, date, &tz);
        let timeline = Timeline::build(normalized.timed);
        let placeholders = Placeholders::new(self.dates.now(&tz), &normalized.full_day);

        let outcome = merge(
            template_lines.iter().map(String::as_str),
            &timeline,
            &placeholders,
            MergeOptions {
                append_unplaced: self.config.output.append_unplaced_events,
            },
        );

        info!(
            %date,
            timed = timeline.len(),
            full_day = normalized.full_day.len(),
            suppressed = outcome.suppressed,
            unplaced = outcome.unplaced,
            "merged calendar events into template"
        );

        Ok(Plan { date, outcome })
    }

    /// Fetches every calendar concurrently and keeps the events on `date`, in calendar order.
    pub async fn fetch_day(
        &self,
        date: NaiveDate,
        allow_partial: bool,
    ) -> anyhow::Result<Vec<FeedEvents>> {
        let tz = self.config.settings.tz;
        let calendars: Vec<CalendarConfig> = self
            .calendars()?
            .into_iter()
            .map(|(_, calendar)| calendar)
            .collect();

        if calendars.is_empty() {
            warn!("no calendars configured; the template is rendered without events");
            return Ok(Vec::new());
        }

        let fetches = calendars
            .iter()
            .map(|calendar| self.source.fetch(&calendar.url));
        let results = future::join_all(fetches).await;

        let mut feeds = Vec::new();
        for (calendar, result) in calendars.into_iter().zip(results) {
            let parsed = result
                .map_err(|source| PlanError::Retrieval {
                    calendar: calendar.name.clone(),
                    source,
                })
                .and_then(|raw| {
                    parse_feed(&raw).map_err(|source| PlanError::Parse {
                        calendar: calendar.name.clone(),
                        source,
                    })
                });

            let events = match parsed {
                Ok(events) => events,
                Err(err) if allow_partial => {
                    warn!(calendar = %calendar.name, error = %err, "skipping calendar");
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            let events = filter_matching_events(&events, date, &tz);
            debug!(calendar = %calendar.name, count = events.len(), %date, "events on target date");
            feeds.push(FeedEvents {
                calendar: calendar.name,
                events,
            });
        }

        Ok(feeds)
    }
}

/// Template lines, split on `\n`. A missing template is an error; nothing is synthesized.
pub fn read_template(path: &Path) -> Result<Vec<String>, PlanError> {
    let content = fs::read_to_string(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => PlanError::MissingTemplate(contract_tilde(path)),
        _ => PlanError::Io {
            path: contract_tilde(path),
            source,
        },
    })?;

    Ok(content
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
        .collect())
}

/// Inserts `text` into the note before 1-based `line`, or at the end when `line` is `None`
/// or past the last line.
pub fn insert_into_note(path: &Path, text: &str, line: Option<usize>) -> Result<(), PlanError> {
    let io_error = |source| PlanError::Io {
        path: contract_tilde(path),
        source,
    };

    let content = fs::read_to_string(path).map_err(io_error)?;
    let trailing_newline = content.ends_with('\n');

    let mut lines: Vec<&str> = if content.is_empty() {
        Vec::new()
    } else {
        content.split('\n').collect()
    };
    if trailing_newline {
        lines.pop();
    }

    let index = line
        .map(|n| n.saturating_sub(1).min(lines.len()))
        .unwrap_or(lines.len());
    lines.insert(index, text);

    let mut merged = lines.join("\n");
    if trailing_newline {
        merged.push('\n');
    }

    fs::write(path, merged).map_err(io_error)?;
    debug!(?path, index, "inserted plan into note");
    Ok(())
}
