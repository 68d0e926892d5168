use std::{fs, path::Path};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Args;
use praxis_calendar_core::{import, prelude::*};
use serde::Deserialize;

use crate::cache::FileCache;

const APP_NAME: &str = "praxis-calendar";

/// Where the events come from
#[derive(Args, Debug, Clone)]
pub struct Source {
    /// JSON file with events (bare array or `{"events": [...]}`)
    #[arg(short, long, conflicts_with = "practice_id")]
    pub input: Option<String>,

    /// Practice whose events are fetched from the event store
    #[arg(short, long, required_unless_present = "input")]
    pub practice_id: Option<String>,

    #[command(flatten)]
    pub store: StoreArgs,
}

#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Event store base URL
    #[arg(long, env = "EVENT_STORE_URL")]
    pub store_url: Option<String>,

    /// Event store API key
    #[arg(long, env = "EVENT_STORE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

impl StoreArgs {
    fn service(&self) -> Result<CalendarService<HttpEventStore, FileCache>> {
        let base_url = self
            .store_url
            .clone()
            .context("--store-url or EVENT_STORE_URL is required to reach the event store")?;

        let mut config = StoreConfig::new(base_url);
        config.api_key = self.api_key.clone();

        let store = HttpEventStore::new(&config)?;
        let cache = FileCache::with_default_dir(APP_NAME)?;
        Ok(CalendarService::new(
            store,
            CacheManager::new(cache, config.cache_ttl),
        ))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EventFile {
    Bare(Vec<CalendarEvent>),
    Wrapped { events: Vec<CalendarEvent> },
}

/// Read canonical events from a JSON file
pub fn load_events_file<P: AsRef<Path>>(path: P) -> Result<Vec<CalendarEvent>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file: EventFile = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a valid event list", path.display()))?;

    Ok(match file {
        EventFile::Bare(events) | EventFile::Wrapped { events } => events,
    })
}

async fn load_events(source: &Source) -> Result<Vec<CalendarEvent>> {
    if let Some(ref input) = source.input {
        let events = load_events_file(input)?;
        tracing::info!(count = events.len(), input = %input, "Loaded events from file");
        return Ok(events);
    }

    let practice_id = source
        .practice_id
        .as_deref()
        .context("either --input or --practice-id is required")?;
    let service = source.store.service()?;
    // Unlike the server, the CLI reports an unreachable store
    Ok(service.try_events(practice_id).await?)
}

/// How listed events are printed
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn print_events(events: &[CalendarEvent], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(events)?),
        OutputFormat::Text => {
            if events.is_empty() {
                println!("No events");
            }
            for event in events {
                println!("{}", describe(event));
            }
        }
    }
    Ok(())
}

/// One-line summary of an event
pub fn describe(event: &CalendarEvent) -> String {
    let when = if event.is_all_day || event.start_time.is_empty() {
        "all day".to_string()
    } else if event.end_time.is_empty() {
        event.start_time.clone()
    } else {
        format!("{}-{}", event.start_time, event.end_time)
    };
    let days = if event.start_date == event.end_date {
        event.start_date.to_string()
    } else {
        format!("{} .. {}", event.start_date, event.end_date)
    };
    let marker = if event.is_recurring_instance { " ↻" } else { "" };

    format!(
        "{days} {when:<11} [{}/{}] {}{marker}",
        event.event_type.as_str(),
        event.priority.as_str(),
        event.title
    )
}

pub async fn expand_command(
    source: Source,
    from: NaiveDate,
    to: NaiveDate,
    format: OutputFormat,
) -> Result<()> {
    let window = DateWindow::new(from, to)?;
    let events = load_events(&source).await?;

    let expanded = expand(&events, &window);
    tracing::info!(
        canonical = events.len(),
        expanded = expanded.len(),
        "Expanded recurring events"
    );
    print_events(&expanded, format)
}

pub async fn on_date_command(source: Source, date: NaiveDate, format: OutputFormat) -> Result<()> {
    let events = load_events(&source).await?;
    print_events(&instances_on_date(&events, date), format)
}

pub async fn upcoming_command(
    source: Source,
    days: u32,
    today: Option<NaiveDate>,
    format: OutputFormat,
) -> Result<()> {
    let events = load_events(&source).await?;
    let today = today.unwrap_or_else(|| Local::now().date_naive());
    print_events(&upcoming_from(&events, today, days), format)
}

/// Export parameters
pub struct ExportParams {
    pub source: Source,
    pub output: Option<String>,
    pub calendar_name: Option<String>,
    pub timezone: Option<String>,
    pub include_description: bool,
    pub reminder_minutes: Option<u32>,
}

pub async fn export_command(params: ExportParams) -> Result<()> {
    let events = load_events(&params.source).await?;

    let defaults = IcsOptions::default();
    let options = IcsOptions {
        calendar_name: params.calendar_name.or(defaults.calendar_name),
        timezone: params.timezone.unwrap_or(defaults.timezone),
        include_description: params.include_description,
        reminder_minutes: params.reminder_minutes,
    };

    let output = params.output.unwrap_or_else(|| {
        format!(
            "{}.ics",
            params.source.practice_id.as_deref().unwrap_or("praxiskalender")
        )
    });
    write_ics(&events, options, &output)?;
    println!("✓ {} events exported to {}", events.len(), output);

    Ok(())
}

/// Render events as iCalendar and write them to `output`
pub fn write_ics<P: AsRef<Path>>(
    events: &[CalendarEvent],
    options: IcsOptions,
    output: P,
) -> Result<()> {
    let ics_content = IcsGenerator::new(options).generate(events)?;
    fs::write(output.as_ref(), ics_content)
        .with_context(|| format!("failed to write {}", output.as_ref().display()))?;
    Ok(())
}

/// Import parameters
pub struct ImportParams {
    pub file: String,
    pub practice_id: String,
    pub created_by: String,
    pub output: Option<String>,
    pub push: bool,
    pub store: StoreArgs,
}

pub async fn import_command(params: ImportParams) -> Result<()> {
    let drafts = import::from_path(&params.file, &params.practice_id, &params.created_by)?;
    println!("✓ Parsed {} events from {}", drafts.len(), params.file);

    if let Some(ref output) = params.output {
        fs::write(output, serde_json::to_string_pretty(&drafts)?)
            .with_context(|| format!("failed to write {output}"))?;
        println!("✓ Drafts written to {output}");
    }

    if params.push {
        let service = params.store.service()?;
        let mut created = 0;
        for draft in drafts {
            let title = draft.title.clone();
            match service.create(&params.practice_id, draft).await {
                Ok(event) => {
                    created += 1;
                    tracing::debug!(event_id = %event.id, "Imported event");
                }
                Err(e) => eprintln!("✗ {title}: {e}"),
            }
        }
        println!("✓ {created} events created in practice {}", params.practice_id);
    } else if params.output.is_none() {
        println!("{}", serde_json::to_string_pretty(&drafts)?);
    }

    Ok(())
}

/// Dump the canonical events of a practice as JSON
pub async fn fetch_command(
    practice_id: String,
    store: StoreArgs,
    output: Option<String>,
) -> Result<()> {
    let service = store.service()?;
    let events = service.try_events(&practice_id).await?;
    let json = serde_json::to_string_pretty(&serde_json::json!({ "events": events }))?;

    match output {
        Some(output) => {
            fs::write(&output, json).with_context(|| format!("failed to write {output}"))?;
            println!("✓ {} events saved to {}", events.len(), output);
        }
        None => println!("{json}"),
    }

    Ok(())
}

pub async fn cache_clear_command() -> Result<()> {
    let cache = FileCache::with_default_dir(APP_NAME)?;
    CacheManager::new(cache, std::time::Duration::ZERO)
        .clear()
        .await?;
    println!("✓ Event cache cleared");
    Ok(())
}
