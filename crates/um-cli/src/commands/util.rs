//! Shared projection plumbing for commands.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use um_core::{
    DailyStats, MonitoringPeriod, ProjectedSession, SessionPart, build_monitoring_periods,
    calculate_daily_stats, generate_session_parts, local_date, project_sessions,
};
use um_db::Database;

use crate::Config;

/// Everything the engine derives for one local date.
pub struct DayView {
    pub date: NaiveDate,
    pub timezone: String,
    pub sessions: Vec<ProjectedSession>,
    pub parts: Vec<SessionPart>,
    pub monitoring: Vec<MonitoringPeriod>,
    pub stats: Option<DailyStats>,
}

/// Replays the full event log and derives the views for `date`.
///
/// Projection is a pure replay, so the result depends only on the log
/// contents, the config, and `now`.
pub fn compute_day_view(
    db: &Database,
    config: &Config,
    date: NaiveDate,
    now: DateTime<Utc>,
) -> Result<DayView> {
    let tz = config.tz()?;
    let targets = config.target_set()?;

    let events = db.events_before(now)?;
    tracing::debug!(count = events.len(), %date, "replaying event log");

    let sessions = project_sessions(&events, &targets, config.grace_period_ms, now);
    let parts = generate_session_parts(&sessions, tz, now);
    let monitoring = build_monitoring_periods(date, tz, &events, now);
    let stats = calculate_daily_stats(
        &sessions,
        &parts,
        &monitoring,
        date,
        tz,
        config.bucket_minutes,
        config.ended_soon_threshold_ms,
        now,
    );

    Ok(DayView {
        date,
        timezone: config.timezone.clone(),
        sessions,
        parts,
        monitoring,
        stats,
    })
}

/// The current local date in the configured zone.
pub fn local_today(tz: Tz, now: DateTime<Utc>) -> NaiveDate {
    local_date(now, tz)
}

/// Formats an instant as a local wall-clock time, `HH:MM:SS`.
pub fn format_local_time(instant: DateTime<Utc>, tz: Tz) -> String {
    instant.with_timezone(&tz).format("%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn local_today_respects_the_zone() {
        // 23:30Z on Feb 10 is already Feb 11 in Tokyo.
        let now = Utc.with_ymd_and_hms(2025, 2, 10, 23, 30, 0).unwrap();
        assert_eq!(
            local_today(Tz::UTC, now),
            NaiveDate::from_ymd_opt(2025, 2, 10).unwrap()
        );
        assert_eq!(
            local_today(Tz::Asia__Tokyo, now),
            NaiveDate::from_ymd_opt(2025, 2, 11).unwrap()
        );
    }

    #[test]
    fn local_time_formats_in_the_zone() {
        let instant = Utc.with_ymd_and_hms(2025, 2, 10, 0, 5, 30).unwrap();
        assert_eq!(format_local_time(instant, Tz::UTC), "00:05:30");
        assert_eq!(format_local_time(instant, Tz::Asia__Tokyo), "09:05:30");
    }
}
