use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use um_cli::commands::{log, monitoring, report, sessions, status, util, watch};
use um_cli::{Cli, Commands, Config};

/// Load config, ensuring the database's parent directory exists.
fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    Ok(config)
}

fn open_database(config_path: Option<&Path>) -> Result<(um_db::Database, Config)> {
    let config = load_config(config_path)?;
    let db = um_db::Database::open(&config.database_path).context("failed to open database")?;
    Ok((db, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    match &cli.command {
        Some(Commands::Log { event }) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            log::run(&mut db, event)?;
        }
        Some(Commands::Report {
            date,
            last_day,
            days,
            json,
        }) => {
            let config = load_config(cli.config.as_deref())?;
            let today = util::local_today(config.tz()?, Utc::now());
            let end_date = if *last_day {
                today - chrono::Duration::days(1)
            } else {
                date.unwrap_or(today)
            };
            report::run(&config, end_date, *days, *json)?;
        }
        Some(Commands::Sessions { date, json }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            let tz = config.tz()?;
            let now = Utc::now();
            let date = date.unwrap_or_else(|| util::local_today(tz, now));
            let view = util::compute_day_view(&db, &config, date, now)?;
            sessions::run(&mut std::io::stdout(), &view, tz, *json)?;
        }
        Some(Commands::Monitoring { date, json }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            let tz = config.tz()?;
            let now = Utc::now();
            let date = date.unwrap_or_else(|| util::local_today(tz, now));
            let view = util::compute_day_view(&db, &config, date, now)?;
            monitoring::run(&mut std::io::stdout(), &view, tz, *json)?;
        }
        Some(Commands::Status) => {
            let config = load_config(cli.config.as_deref())?;
            status::run(&mut std::io::stdout(), &config)?;
        }
        Some(Commands::Watch { interval_secs }) => {
            let (_db, config) = open_database(cli.config.as_deref())?;
            watch::run(&config, Duration::from_secs(*interval_secs))?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
