//! Report command: render daily usage rollups.
//!
//! This module implements `um report` with date selection (--date,
//! --last-day, --days) and output formats (human-readable, JSON).

use std::fmt::Write;

use anyhow::{Context, Result, ensure};
use chrono::{DateTime, NaiveDate, Utc};
use rayon::prelude::*;
use serde::Serialize;

use um_core::DailyStats;
use um_db::Database;

use crate::Config;
use crate::commands::util::compute_day_view;

/// Rollup for one date, ready to render.
#[derive(Debug, Serialize)]
pub struct DayReport {
    pub date: NaiveDate,
    /// Total monitoring availability on the date.
    pub monitored_ms: i64,
    /// `None` when nothing at all happened on the date.
    pub stats: Option<DailyStats>,
}

/// Top-level JSON output.
#[derive(Debug, Serialize)]
pub struct JsonReport {
    pub generated_at: String,
    pub timezone: String,
    pub days: Vec<DayReport>,
}

// ========== Duration Formatting ==========

/// Formats milliseconds as a duration string.
/// Returns "Xh Ym" if >= 1 hour, "Xm" if < 1 hour.
/// Negative durations render as "0m".
pub fn format_duration(ms: i64) -> String {
    if ms < 0 {
        return "0m".to_string();
    }
    let total_minutes = ms / 60_000;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours >= 1 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Formats a minute-of-day as wall-clock `HH:MM`. Minute 1440 reads "24:00".
pub fn minute_label(minute: u32) -> String {
    format!("{:02}:{:02}", minute / 60, minute % 60)
}

// ========== Progress Bar ==========

/// Generates a 10-character progress bar.
/// Non-zero values below 5% of max still get a single block.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn progress_bar(value: i64, max: i64) -> String {
    if max == 0 {
        return "░░░░░░░░░░".to_string();
    }

    let ratio = value as f64 / max as f64;
    let filled = if ratio < 0.05 && value > 0 {
        1
    } else {
        (ratio * 10.0).round().min(10.0) as usize
    };

    let empty = 10 - filled;
    format!("{}{}", "█".repeat(filled), "░".repeat(empty))
}

// ========== Report Generation ==========

/// Computes rollups for `days` consecutive dates ending at `end_date`.
///
/// Each date is a full independent replay of the log, so the dates are
/// computed in parallel with one database handle per worker.
pub fn generate_reports(
    config: &Config,
    end_date: NaiveDate,
    days: u32,
    now: DateTime<Utc>,
) -> Result<Vec<DayReport>> {
    ensure!(days >= 1, "--days must be at least 1");

    let dates: Vec<NaiveDate> = (0..days)
        .rev()
        .map(|i| end_date - chrono::Duration::days(i64::from(i)))
        .collect();

    dates
        .par_iter()
        .map(|date| {
            let db = Database::open(&config.database_path)
                .context("failed to open database")?;
            let view = compute_day_view(&db, config, *date, now)?;
            Ok(DayReport {
                date: *date,
                monitored_ms: view.monitoring.iter().map(|p| p.duration_ms()).sum(),
                stats: view.stats,
            })
        })
        .collect()
}

// ========== Human-Readable Output ==========

/// Formats one day's rollup.
pub fn format_report_day(report: &DayReport) -> String {
    let mut output = String::new();

    writeln!(
        output,
        "USAGE REPORT: {}",
        report.date.format("%A, %b %-d, %Y")
    )
    .unwrap();

    let Some(stats) = &report.stats else {
        writeln!(output).unwrap();
        writeln!(output, "No usage recorded for this day.").unwrap();
        writeln!(output).unwrap();
        writeln!(output, "Hint: run 'um status' to check log health.").unwrap();
        return output;
    };

    // SUMMARY section
    writeln!(output).unwrap();
    writeln!(output, "SUMMARY").unwrap();
    writeln!(output, "───────").unwrap();
    writeln!(
        output,
        "Total usage:   {}",
        format_duration(stats.total_usage_ms)
    )
    .unwrap();
    writeln!(
        output,
        "Sessions:      {} (avg {}, longest {})",
        stats.session_count,
        format_duration(stats.average_session_ms),
        format_duration(stats.longest_session_ms)
    )
    .unwrap();
    writeln!(
        output,
        "Monitored:     {}",
        format_duration(report.monitored_ms)
    )
    .unwrap();

    // BY APP section
    if !stats.apps.is_empty() {
        let max_usage = stats.apps.iter().map(|a| a.total_usage_ms).max().unwrap_or(0);
        writeln!(output).unwrap();
        writeln!(output, "BY APP").unwrap();
        writeln!(output, "──────").unwrap();
        for app in &stats.apps {
            writeln!(
                output,
                "{:<28}{:>7}  {}",
                app.package,
                format_duration(app.total_usage_ms),
                progress_bar(app.total_usage_ms, max_usage)
            )
            .unwrap();
        }
    }

    // BY TIME OF DAY section: only buckets that accumulated a whole minute
    let active_buckets: Vec<_> = stats
        .buckets
        .iter()
        .filter(|b| b.usage_minutes > 0)
        .collect();
    if !active_buckets.is_empty() {
        writeln!(output).unwrap();
        writeln!(output, "BY TIME OF DAY").unwrap();
        writeln!(output, "──────────────").unwrap();
        for bucket in active_buckets {
            let top = bucket
                .top_package
                .as_ref()
                .map_or("", um_core::PackageId::as_str);
            writeln!(
                output,
                "{}-{}  {:>4}m  {top}",
                minute_label(bucket.start_minute),
                minute_label(bucket.end_minute),
                bucket.usage_minutes
            )
            .unwrap();
        }
    }

    // SUGGESTIONS section
    if let Some(suggestions) = &stats.suggestions {
        writeln!(output).unwrap();
        writeln!(output, "SUGGESTIONS").unwrap();
        writeln!(output, "───────────").unwrap();
        writeln!(
            output,
            "Shown: {}  Ended soon: {}  Continued: {}  Unknown: {}",
            suggestions.shown_count,
            suggestions.ended_soon_count,
            suggestions.continued_count,
            suggestions.unknown_outcome_count
        )
        .unwrap();
        for (decision, count) in &suggestions.decision_counts {
            let ended_soon = suggestions
                .ended_soon_by_decision
                .get(decision)
                .copied()
                .unwrap_or(0);
            writeln!(output, "  {decision}: {count} ({ended_soon} ended soon)").unwrap();
        }
    }

    output
}

/// Formats the full multi-day report.
pub fn format_report(reports: &[DayReport]) -> String {
    let mut output = String::new();
    for (i, report) in reports.iter().enumerate() {
        if i > 0 {
            output.push('\n');
        }
        output.push_str(&format_report_day(report));
    }
    output
}

/// Formats the rollups as JSON.
pub fn format_report_json(
    reports: Vec<DayReport>,
    timezone: &str,
    generated_at: DateTime<Utc>,
) -> Result<String> {
    let report = JsonReport {
        generated_at: generated_at.to_rfc3339(),
        timezone: timezone.to_string(),
        days: reports,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

// ========== Public Interface ==========

/// Runs the report command.
pub fn run(config: &Config, end_date: NaiveDate, days: u32, json: bool) -> Result<()> {
    let now = Utc::now();
    let reports = generate_reports(config, end_date, days, now)?;

    if json {
        let output = format_report_json(reports, &config.timezone, now)?;
        println!("{output}");
    } else {
        let output = format_report(&reports);
        print!("{output}");
    }

    Ok(())
}
