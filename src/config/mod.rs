pub mod error;

use crate::calendar::registry::CalendarConfig;
use crate::config::error::ConfigError;
use crate::core::event::NoteDateFormat;
use crate::shared::utils;
use chrono_tz::Tz;
use mlua::{Lua, Table, Value};
use std::{
    env, fs,
    path::{Path, PathBuf},
};

const DEFAULT_TZ: &str = "UTC";
const DEFAULT_NOTE_DATE_SEPARATOR: &str = "-";
const DEFAULT_NOTE_DATE_SEGMENT: usize = 1;
const DEFAULT_NOTE_DATE_FORMAT: &str = "%Y%m%d";

#[derive(Debug, PartialEq, Eq)]
pub struct Config {
    pub source: Source,
    pub output: Output,
    pub settings: Settings,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Source {
    /// Calendars declared in the config file, in file order.
    pub calendars: Vec<CalendarConfig>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Output {
    pub template_path: PathBuf,
    pub append_unplaced_events: bool,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Settings {
    pub tz: Tz,
    pub calendars_file_path: PathBuf,
    pub note_date: NoteDateFormat,
    pub allow_partial_results: bool,
}

pub fn init() -> anyhow::Result<Config> {
    let path_buf = get_config_file_path()?;
    load_config(&path_buf)
}

fn get_config_file_path() -> anyhow::Result<PathBuf> {
    let config_file_path = match std::env::var("CAL2PLAN_CONFIG_FILE_PATH") {
        Ok(path) => path.trim().to_string(),
        Err(_) => {
            let home_dir =
                env::var("HOME").map_err(|_e| ConfigError::HomeEnvironmentNotFoundError)?;
            format!("{}/.config/cal2plan/config.lua", home_dir)
        }
    };

    let config_file_path_buf = utils::path::expand_tilde(&config_file_path);

    if config_file_path_buf.is_file() {
        Ok(config_file_path_buf)
    } else {
        Err(
            ConfigError::ConfigFileNotFoundError(utils::path::contract_tilde(
                &config_file_path_buf,
            ))
            .into(),
        )
    }
}

fn get_calendars_file_path() -> anyhow::Result<PathBuf> {
    let home_dir = env::var("HOME").map_err(|_e| ConfigError::HomeEnvironmentNotFoundError)?;
    Ok(PathBuf::from(format!(
        "{}/.local/share/cal2plan/calendars.json",
        home_dir
    )))
}

fn load_config(config_file_path: &Path) -> anyhow::Result<Config> {
    let lua = Lua::new();
    let shown_path = utils::path::contract_tilde(config_file_path);

    // lets config.lua `require` sibling files such as secrets.lua
    let config_dir = config_file_path
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .to_string_lossy();
    lua.load(format!(
        r#"package.path = package.path .. ";{}/?.lua""#,
        config_dir
    ))
    .exec()
    .map_err(|e| ConfigError::LuaRuntimeError(e.to_string()))?;

    let config_code = fs::read_to_string(config_file_path)?;
    let config_eval = lua
        .load(&config_code)
        .eval()
        .map_err(|e| ConfigError::LuaRuntimeError(e.to_string()))?;

    let Value::Table(config_tbl) = config_eval else {
        return Err(ConfigError::RequiredFieldNotFound(
            "config.lua did not return a table!".to_owned(),
            shown_path,
        )
        .into());
    };

    let calendars = match config_tbl.get::<_, Option<Table>>("source")? {
        Some(source_tbl) => match source_tbl.get::<_, Option<Table>>("ics")? {
            Some(ics_tbl) => load_calendars(&ics_tbl, &shown_path)?,
            None => Vec::new(),
        },
        None => Vec::new(),
    };

    let output_tbl: Table = config_tbl
        .get::<_, Option<Table>>("output")?
        .ok_or_else(|| {
            ConfigError::RequiredFieldNotFound("output".to_owned(), shown_path.clone())
        })?;
    let template_path: String = output_tbl
        .get::<_, Option<String>>("templatePath")?
        .ok_or_else(|| {
            ConfigError::RequiredFieldNotFound(
                "output.templatePath".to_owned(),
                shown_path.clone(),
            )
        })?;
    let append_unplaced_events = output_tbl
        .get::<_, Option<bool>>("appendUnplacedEvents")?
        .unwrap_or(false);

    let settings_tbl = config_tbl.get::<_, Option<Table>>("settings")?;
    let setting_string = |key: &str| -> anyhow::Result<Option<String>> {
        Ok(match &settings_tbl {
            Some(table) => table.get::<_, Option<String>>(key)?,
            None => None,
        })
    };

    let tz_name = setting_string("TZ")?.unwrap_or_else(|| DEFAULT_TZ.to_string());
    let tz: Tz = tz_name
        .parse()
        .map_err(|_| ConfigError::InvalidTimeZone(tz_name.clone(), shown_path.clone()))?;

    let calendars_file_path = match setting_string("calendarsFilePath")? {
        Some(path) => utils::path::expand_tilde(&path),
        None => get_calendars_file_path()?,
    };

    let note_date = NoteDateFormat {
        separator: setting_string("noteDateSeparator")?
            .unwrap_or_else(|| DEFAULT_NOTE_DATE_SEPARATOR.to_string()),
        segment: match &settings_tbl {
            Some(table) => table.get::<_, Option<usize>>("noteDateSegment")?,
            None => None,
        }
        .unwrap_or(DEFAULT_NOTE_DATE_SEGMENT),
        format: setting_string("noteDateFormat")?
            .unwrap_or_else(|| DEFAULT_NOTE_DATE_FORMAT.to_string()),
    };
    if note_date.separator.is_empty() {
        return Err(ConfigError::InvalidField(
            "settings.noteDateSeparator".to_owned(),
            shown_path,
            "must not be empty".to_owned(),
        )
        .into());
    }

    let allow_partial_results = match &settings_tbl {
        Some(table) => table.get::<_, Option<bool>>("allowPartialResults")?,
        None => None,
    }
    .unwrap_or(false);

    Ok(Config {
        source: Source { calendars },
        output: Output {
            template_path: utils::path::expand_tilde(&template_path),
            append_unplaced_events,
        },
        settings: Settings {
            tz,
            calendars_file_path,
            note_date,
            allow_partial_results,
        },
    })
}

fn load_calendars(ics_tbl: &Table, shown_path: &str) -> anyhow::Result<Vec<CalendarConfig>> {
    let Some(calendars_tbl) = ics_tbl.get::<_, Option<Table>>("calendars")? else {
        return Ok(Vec::new());
    };

    let mut calendars = Vec::new();
    for (i, entry) in calendars_tbl.sequence_values::<Table>().enumerate() {
        let entry = entry?;
        let field = |key: &str| -> anyhow::Result<String> {
            entry.get::<_, Option<String>>(key)?.ok_or_else(|| {
                ConfigError::RequiredFieldNotFound(
                    format!("source.ics.calendars[{}].{}", i + 1, key),
                    shown_path.to_owned(),
                )
                .into()
            })
        };

        calendars.push(CalendarConfig {
            name: field("name")?,
            url: field("url")?,
        });
    }

    Ok(calendars)
}
