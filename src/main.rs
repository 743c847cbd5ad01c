mod calendar;
mod config;
mod core;
mod ics;
mod shared;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{ArgAction, Parser, Subcommand};
use tracing::{info, warn};

use crate::calendar::registry::{CalendarConfig, CalendarRegistry, RegistryError};
use crate::core::cal2plan::{insert_into_note, Cal2Plan, CalendarOrigin, PlanRequest};
use crate::core::event::{Clock, DateSelection};
use crate::ics::client::FeedSource;
use crate::shared::utils::path::{contract_tilde, note_stem};

#[derive(Debug, Parser)]
#[command(
    name = "cal2plan",
    version,
    about = "Merges the day's calendar events into a day planner template."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
    #[arg(
        long,
        value_name = "DATE",
        conflicts_with = "today",
        value_parser = parse_date,
        help = "Target date (YYYY-MM-DD)."
    )]
    pub date: Option<NaiveDate>,
    #[arg(long, help = "Plan for today, ignoring the note's file name.")]
    pub today: bool,
    #[arg(
        long,
        value_name = "PATH",
        help = "Insert the plan into this note instead of printing it. Its file name supplies the date unless --date or --today is given."
    )]
    pub note: Option<PathBuf>,
    #[arg(
        long,
        value_name = "N",
        requires = "note",
        help = "Insert before this 1-based line of the note (default: append)."
    )]
    pub line: Option<usize>,
    #[arg(long, value_name = "PATH", help = "Use this template instead of output.templatePath.")]
    pub template: Option<PathBuf>,
    #[arg(long, help = "Skip calendars that cannot be fetched or parsed.")]
    pub allow_partial: bool,
    #[arg(short, long, action = ArgAction::Count, help = "Increase log verbosity (-v, -vv, -vvv).")]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Manage the calendars stored outside config.lua")]
    Calendar {
        #[command(subcommand)]
        command: CalendarCommands,
    },
}

#[derive(Debug, Subcommand)]
enum CalendarCommands {
    #[command(about = "List every configured calendar")]
    List,
    #[command(about = "Add a calendar feed")]
    Add { name: String, url: String },
    #[command(about = "Point an existing calendar at a new feed")]
    Replace { name: String, url: String },
    #[command(about = "Remove a calendar")]
    Remove { name: String },
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD ({})", e))
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = match verbose {
        0 => "cal2plan=warn",
        1 => "cal2plan=info",
        2 => "cal2plan=debug",
        _ => "cal2plan=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cal2plan = match Cal2Plan::new() {
        Ok(cal2plan) => cal2plan,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let result = match &cli.command {
        Some(Commands::Calendar { command }) => run_calendar_command(&cal2plan, command),
        None => run_plan(&cal2plan, &cli).await,
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

async fn run_plan<S: FeedSource, C: Clock>(
    cal2plan: &Cal2Plan<S, C>,
    cli: &Cli,
) -> anyhow::Result<()> {
    let request = PlanRequest {
        selection: determine_date_selection(cli),
        template_path: cli.template.clone(),
        allow_partial: cli.allow_partial,
    };

    let plan = cal2plan.plan(&request).await?;
    let text = plan.outcome.text();

    match &cli.note {
        Some(note) => {
            insert_into_note(note, &text, cli.line)?;
            info!(date = %plan.date, note = %contract_tilde(note), "plan inserted into note");
        }
        None => println!("{}", text),
    }

    Ok(())
}

fn determine_date_selection(cli: &Cli) -> DateSelection {
    if let Some(date) = cli.date {
        DateSelection::Explicit(date)
    } else if cli.today {
        DateSelection::Today
    } else if let Some(note) = &cli.note {
        match note_stem(note) {
            Some(stem) => DateSelection::NoteName(stem),
            None => {
                warn!(note = %contract_tilde(note), "note has no file name; planning for today");
                DateSelection::Today
            }
        }
    } else {
        DateSelection::Today
    }
}

fn run_calendar_command<S: FeedSource, C: Clock>(
    cal2plan: &Cal2Plan<S, C>,
    command: &CalendarCommands,
) -> anyhow::Result<()> {
    match command {
        CalendarCommands::List => list_calendars(cal2plan),
        CalendarCommands::Add { name, url } => edit_store(cal2plan, |registry| {
            registry.add(calendar(name, url))?;
            Ok(format!("Added calendar '{}'.", name))
        }),
        CalendarCommands::Replace { name, url } => edit_store(cal2plan, |registry| {
            let previous = registry.replace(calendar(name, url))?;
            Ok(format!("Replaced calendar '{}' (was {}).", name, previous.url))
        }),
        CalendarCommands::Remove { name } => edit_store(cal2plan, |registry| {
            registry.remove(name)?;
            Ok(format!("Removed calendar '{}'.", name))
        }),
    }
}

fn calendar(name: &str, url: &str) -> CalendarConfig {
    CalendarConfig {
        name: name.to_string(),
        url: url.to_string(),
    }
}

fn list_calendars<S: FeedSource, C: Clock>(cal2plan: &Cal2Plan<S, C>) -> anyhow::Result<()> {
    for (origin, calendar) in cal2plan.calendars()? {
        let origin = match origin {
            CalendarOrigin::ConfigFile => "config",
            CalendarOrigin::Store => "store",
        };
        println!("{}\t{}\t{}", calendar.name, calendar.url, origin);
    }
    Ok(())
}

fn edit_store<S, C, F>(cal2plan: &Cal2Plan<S, C>, edit: F) -> anyhow::Result<()>
where
    S: FeedSource,
    C: Clock,
    F: FnOnce(&mut CalendarRegistry) -> Result<String, RegistryError>,
{
    let store_path = cal2plan.store_path();
    let mut registry = CalendarRegistry::load(store_path)?;
    let message = edit(&mut registry)?;
    registry.save(store_path)?;
    println!("{}", message);

    if cal2plan
        .config()
        .source
        .calendars
        .iter()
        .any(|c| registry.get(&c.name).is_some())
    {
        warn!("calendars declared in config.lua take precedence over stored ones with the same name");
    }

    Ok(())
}
