mod cache;
mod commands;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use praxis_calendar_core::query::DEFAULT_UPCOMING_DAYS;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{OutputFormat, Source, StoreArgs};

#[derive(Parser)]
#[command(name = "praxis-calendar")]
#[command(about = "Effizienz Praxis calendar tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand recurring events within a date range
    Expand {
        #[command(flatten)]
        source: Source,

        /// First day of the range (YYYY-MM-DD)
        #[arg(long)]
        from: NaiveDate,

        /// Last day of the range (YYYY-MM-DD)
        #[arg(long)]
        to: NaiveDate,

        #[arg(short, long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Events, including recurring instances, that cover a date
    OnDate {
        #[command(flatten)]
        source: Source,

        /// Date to look at (YYYY-MM-DD)
        date: NaiveDate,

        #[arg(short, long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Events starting within the next days
    Upcoming {
        #[command(flatten)]
        source: Source,

        /// Number of days to look ahead
        #[arg(short, long, default_value_t = DEFAULT_UPCOMING_DAYS)]
        days: u32,

        /// Count from this day instead of today (YYYY-MM-DD)
        #[arg(long)]
        today: Option<NaiveDate>,

        #[arg(short, long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Write events as an ICS file
    Export {
        #[command(flatten)]
        source: Source,

        /// Output file path
        #[arg(short, long)]
        output: Option<String>,

        /// Calendar name
        #[arg(long)]
        calendar_name: Option<String>,

        /// Timezone of event times
        #[arg(long)]
        timezone: Option<String>,

        /// Leave descriptions out of the feed
        #[arg(long)]
        no_description: bool,

        /// Reminder before each event (minutes)
        #[arg(long)]
        reminder_minutes: Option<u32>,
    },

    /// Read an ICS file as event drafts
    Import {
        /// ICS file to read
        file: String,

        /// Practice the imported events belong to
        #[arg(short, long)]
        practice_id: String,

        /// User recorded as creator
        #[arg(short, long, default_value = "import")]
        created_by: String,

        /// Write the drafts as JSON to this file
        #[arg(short, long)]
        output: Option<String>,

        /// Create the events in the event store
        #[arg(long)]
        push: bool,

        #[command(flatten)]
        store: StoreArgs,
    },

    /// Download the canonical events of a practice as JSON
    Fetch {
        /// Practice to fetch
        #[arg(short, long)]
        practice_id: String,

        /// Output file path
        #[arg(short, long)]
        output: Option<String>,

        #[command(flatten)]
        store: StoreArgs,
    },

    /// Remove cached event lists
    ClearCache,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("praxis_calendar_cli={log_level},praxis_calendar_core={log_level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Expand {
            source,
            from,
            to,
            format,
        } => commands::expand_command(source, from, to, format).await,

        Commands::OnDate {
            source,
            date,
            format,
        } => commands::on_date_command(source, date, format).await,

        Commands::Upcoming {
            source,
            days,
            today,
            format,
        } => commands::upcoming_command(source, days, today, format).await,

        Commands::Export {
            source,
            output,
            calendar_name,
            timezone,
            no_description,
            reminder_minutes,
        } => {
            commands::export_command(commands::ExportParams {
                source,
                output,
                calendar_name,
                timezone,
                include_description: !no_description,
                reminder_minutes,
            })
            .await
        }

        Commands::Import {
            file,
            practice_id,
            created_by,
            output,
            push,
            store,
        } => {
            commands::import_command(commands::ImportParams {
                file,
                practice_id,
                created_by,
                output,
                push,
                store,
            })
            .await
        }

        Commands::Fetch {
            practice_id,
            output,
            store,
        } => commands::fetch_command(practice_id, store, output).await,

        Commands::ClearCache => commands::cache_clear_command().await,
    }
}
