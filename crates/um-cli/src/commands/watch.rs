//! Watch command: poll the log and reprint today's summary on change.
//!
//! The poll loop never blocks on a recomputation. Each detected change
//! claims a generation from a [`LatestSlot`] and recomputes on a background
//! thread; the loop prints whatever the newest finished recomputation
//! published. A slow recomputation overtaken by a newer one is discarded.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use um_db::Database;

use crate::commands::report::{DayReport, format_report_day};
use crate::commands::util::{compute_day_view, local_today};
use crate::{Config, LatestSlot};

/// The change signal: event count plus newest timestamp.
type LogSignal = (u64, Option<DateTime<Utc>>);

fn read_signal(config: &Config) -> Result<LogSignal> {
    let db = Database::open(&config.database_path).context("failed to open database")?;
    Ok((db.event_count()?, db.last_event_at()?))
}

/// Renders today's report from the current log contents.
pub fn recompute(config: &Config, now: DateTime<Utc>) -> Result<String> {
    let db = Database::open(&config.database_path).context("failed to open database")?;
    let date = local_today(config.tz()?, now);
    let view = compute_day_view(&db, config, date, now)?;
    let report = DayReport {
        date,
        monitored_ms: view.monitoring.iter().map(|p| p.duration_ms()).sum(),
        stats: view.stats,
    };
    Ok(format_report_day(&report))
}

/// Runs the watch loop. Does not return except on error.
pub fn run(config: &Config, interval: Duration) -> Result<()> {
    let slot: Arc<LatestSlot<String>> = Arc::new(LatestSlot::new());
    let mut last_signal: Option<LogSignal> = None;

    tracing::info!(interval_secs = interval.as_secs(), "watching event log");

    loop {
        match read_signal(config) {
            Ok(signal) => {
                if last_signal.as_ref() != Some(&signal) {
                    last_signal = Some(signal);
                    let generation = slot.begin();
                    let slot = Arc::clone(&slot);
                    let config = config.clone();
                    std::thread::spawn(move || match recompute(&config, Utc::now()) {
                        Ok(rendered) => {
                            slot.publish(generation, rendered);
                        }
                        Err(error) => {
                            tracing::warn!(%error, "recompute failed");
                        }
                    });
                }
            }
            Err(error) => tracing::warn!(%error, "could not read log signal"),
        }

        if let Some(rendered) = slot.take() {
            print!("{rendered}");
        }

        std::thread::sleep(interval);
    }
}
