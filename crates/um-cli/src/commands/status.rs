//! Status command: event log health.

use std::io::Write;

use anyhow::{Context, Result};

use um_db::Database;

use crate::Config;

pub fn run<W: Write>(writer: &mut W, config: &Config) -> Result<()> {
    let db = Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?;

    let count = db.event_count()?;
    let last_event_at = db.last_event_at()?;

    writeln!(writer, "Usage monitor status")?;
    writeln!(writer, "Database: {}", config.database_path.display())?;
    writeln!(writer, "Timezone: {}", config.timezone)?;

    if count == 0 {
        writeln!(writer, "No events recorded.")?;
        return Ok(());
    }

    writeln!(writer, "Events: {count}")?;
    if let Some(last) = last_event_at {
        writeln!(writer, "Last event: {}", last.to_rfc3339())?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{TimeZone, Utc};
    use um_core::{EventKind, ServiceState, TimelineEvent};
    use um_db::EventRecord;

    #[test]
    fn status_reports_count_and_last_event() {
        let temp = tempfile::tempdir().unwrap();
        let db_path = temp.path().join("um.db");
        let mut db = Database::open(&db_path).unwrap();

        let event = TimelineEvent::new(
            Utc.with_ymd_and_hms(2025, 2, 10, 9, 0, 0).unwrap(),
            EventKind::ServiceLifecycle {
                state: ServiceState::Started,
            },
        );
        db.insert_events(&[EventRecord::from_event("event-a", &event).unwrap()])
            .unwrap();
        drop(db);

        let config = Config {
            database_path: db_path,
            timezone: "UTC".to_string(),
            ..Config::default()
        };
        let mut output = Vec::new();
        run(&mut output, &config).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("Events: 1"));
        assert!(output.contains("Last event: 2025-02-10T09:00:00"));
        assert!(output.contains("Timezone: UTC"));
    }

    #[test]
    fn status_reports_empty_log() {
        let temp = tempfile::tempdir().unwrap();
        let config = Config {
            database_path: temp.path().join("um.db"),
            ..Config::default()
        };

        let mut output = Vec::new();
        run(&mut output, &config).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("No events recorded."));
    }
}
