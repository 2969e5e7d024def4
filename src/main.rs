mod commands;
mod render;
mod utils;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use calnote_core::config::CalNoteConfig;
use calnote_core::diff::Direction;
use clap::{Parser, Subcommand, ValueEnum};
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "calnote=info,calnote_core=info";
const VERBOSE_LOG_FILTER: &str = "calnote=debug,calnote_core=debug";

#[derive(Parser)]
#[command(name = "calnote")]
#[command(about = "Keep a calendar and a document database in sync")]
struct Cli {
    /// Config file (default: ~/.config/calnote/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show debug logs and every event in plans
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile both services against the last snapshot
    Sync {
        /// Override the configured sync direction
        #[arg(long, value_enum)]
        direction: Option<DirectionArg>,
    },
    /// Apply calendar changes since the stored sync token
    Webhook,
    /// Show what the next sync would do, without writing anything
    Status {
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
    /// Release a run lock left behind by a crashed pass
    Unlock,
    /// Drop the snapshot so the next sync starts over
    Reset {
        /// Also drop the webhook sync token
        #[arg(long)]
        cursor: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DirectionArg {
    TwoWay,
    CalendarToDocument,
    DocumentToCalendar,
}

impl From<DirectionArg> for Direction {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::TwoWay => Direction::TwoWay,
            DirectionArg::CalendarToDocument => Direction::CalendarToDocument,
            DirectionArg::DocumentToCalendar => Direction::DocumentToCalendar,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", format!("{e:#}").red());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = CalNoteConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Sync { direction } => {
            commands::sync::run(&config, direction.map(Direction::from), cli.verbose).await
        }
        Commands::Webhook => commands::webhook::run(&config, cli.verbose).await,
        Commands::Status { json } => commands::status::run(&config, json, cli.verbose).await,
        Commands::Unlock => commands::unlock::run(&config),
        Commands::Reset { cursor } => commands::reset::run(&config, cursor),
    }
}

/// Logs go to stderr so rendered plans on stdout stay clean.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new(VERBOSE_LOG_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
