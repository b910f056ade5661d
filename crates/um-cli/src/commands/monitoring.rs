//! Monitoring command: list availability periods for a date.

use std::io::Write;

use anyhow::Result;
use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Serialize;

use um_core::MonitoringPeriod;

use crate::commands::report::format_duration;
use crate::commands::util::{DayView, format_local_time};

#[derive(Debug, Serialize)]
struct JsonMonitoring<'a> {
    date: NaiveDate,
    timezone: &'a str,
    total_ms: i64,
    periods: &'a [MonitoringPeriod],
}

pub fn run<W: Write>(writer: &mut W, view: &DayView, tz: Tz, json: bool) -> Result<()> {
    let total_ms: i64 = view.monitoring.iter().map(MonitoringPeriod::duration_ms).sum();

    if json {
        let output = serde_json::to_string_pretty(&JsonMonitoring {
            date: view.date,
            timezone: &view.timezone,
            total_ms,
            periods: &view.monitoring,
        })?;
        writeln!(writer, "{output}")?;
        return Ok(());
    }

    writeln!(writer, "Monitoring for {} ({})", view.date, view.timezone)?;

    if view.monitoring.is_empty() {
        writeln!(writer, "No monitoring recorded.")?;
        return Ok(());
    }

    writeln!(writer)?;
    for period in &view.monitoring {
        writeln!(
            writer,
            "{} - {}   {}",
            format_local_time(period.start, tz),
            format_local_time(period.end, tz),
            format_duration(period.duration_ms())
        )?;
    }
    writeln!(writer)?;
    writeln!(writer, "Total: {}", format_duration(total_ms))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn ts(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 10, 9, 0, 0).unwrap() + chrono::Duration::minutes(minutes)
    }

    fn view_with(monitoring: Vec<MonitoringPeriod>) -> DayView {
        DayView {
            date: NaiveDate::from_ymd_opt(2025, 2, 10).unwrap(),
            timezone: "UTC".to_string(),
            sessions: Vec::new(),
            parts: Vec::new(),
            monitoring,
            stats: None,
        }
    }

    #[test]
    fn lists_periods_and_total() {
        let view = view_with(vec![
            MonitoringPeriod {
                start: ts(0),
                end: ts(90),
            },
            MonitoringPeriod {
                start: ts(120),
                end: ts(150),
            },
        ]);

        let mut output = Vec::new();
        run(&mut output, &view, Tz::UTC, false).unwrap();
        let output = String::from_utf8(output).unwrap();

        assert!(output.contains("09:00:00 - 10:30:00   1h 30m"));
        assert!(output.contains("11:00:00 - 11:30:00   30m"));
        assert!(output.contains("Total: 2h 0m"));
    }

    #[test]
    fn empty_date_prints_placeholder() {
        let view = view_with(Vec::new());

        let mut output = Vec::new();
        run(&mut output, &view, Tz::UTC, false).unwrap();
        let output = String::from_utf8(output).unwrap();

        assert!(output.contains("No monitoring recorded."));
    }

    #[test]
    fn json_output_includes_total() {
        let view = view_with(vec![MonitoringPeriod {
            start: ts(0),
            end: ts(60),
        }]);

        let mut output = Vec::new();
        run(&mut output, &view, Tz::UTC, true).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();

        assert_eq!(value["total_ms"], 3_600_000);
        assert_eq!(value["periods"].as_array().unwrap().len(), 1);
    }
}
