use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::ics::client::normalize_feed_url;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarConfig {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("A calendar named '{0}' already exists; use `calendar replace` to change it.")]
    AlreadyExists(String),

    #[error("No calendar named '{0}' is configured.")]
    NotFound(String),

    #[error("Calendar name must not be empty.")]
    EmptyName,

    #[error("Calendar '{name}' has an unsupported feed url '{url}'.")]
    InvalidUrl { name: String, url: String },

    #[error("Failed to access calendar store '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Calendar store '{path}' is not valid JSON: {source}")]
    Serde {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredCalendars {
    calendars: Vec<CalendarConfig>,
}

/// Calendars keyed by name. Every change is explicit: adding an existing name or
/// removing/replacing a missing one fails instead of silently overwriting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarRegistry {
    calendars: BTreeMap<String, CalendarConfig>,
}

impl CalendarRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, calendar: CalendarConfig) -> Result<(), RegistryError> {
        validate(&calendar)?;
        if self.calendars.contains_key(&calendar.name) {
            return Err(RegistryError::AlreadyExists(calendar.name));
        }
        self.calendars.insert(calendar.name.clone(), calendar);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<CalendarConfig, RegistryError> {
        self.calendars
            .remove(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    /// Swaps in a new configuration for an existing name and returns the previous one.
    pub fn replace(&mut self, calendar: CalendarConfig) -> Result<CalendarConfig, RegistryError> {
        validate(&calendar)?;
        match self.calendars.get_mut(&calendar.name) {
            Some(existing) => Ok(std::mem::replace(existing, calendar)),
            None => Err(RegistryError::NotFound(calendar.name)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&CalendarConfig> {
        self.calendars.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CalendarConfig> {
        self.calendars.values()
    }

    pub fn len(&self) -> usize {
        self.calendars.len()
    }

    /// Reads the JSON store. A store that does not exist yet is an empty registry.
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(?path, "calendar store not found, starting empty");
                return Ok(Self::new());
            }
            Err(source) => {
                return Err(RegistryError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let stored: StoredCalendars =
            serde_json::from_str(&content).map_err(|source| RegistryError::Serde {
                path: path.to_path_buf(),
                source,
            })?;

        let mut registry = Self::new();
        for calendar in stored.calendars {
            registry.add(calendar)?;
        }
        Ok(registry)
    }

    pub fn save(&self, path: &Path) -> Result<(), RegistryError> {
        let io_error = |source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        };

        let stored = StoredCalendars {
            calendars: self.calendars.values().cloned().collect(),
        };
        let text = serde_json::to_string_pretty(&stored).map_err(|source| RegistryError::Serde {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(io_error)?;
        }
        fs::write(path, text).map_err(io_error)?;
        debug!(?path, count = self.len(), "saved calendar store");
        Ok(())
    }
}

fn validate(calendar: &CalendarConfig) -> Result<(), RegistryError> {
    if calendar.name.trim().is_empty() {
        return Err(RegistryError::EmptyName);
    }
    normalize_feed_url(&calendar.url).map_err(|_| RegistryError::InvalidUrl {
        name: calendar.name.clone(),
        url: calendar.url.clone(),
    })?;
    Ok(())
}
