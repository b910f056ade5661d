//! Daily usage rollups.
//!
//! Combines projected sessions, their day slices, and monitoring periods for
//! one local date into a single statistics value object: totals, per-app
//! breakdown, fixed-width time buckets, and the suggestion funnel.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::localtime::{MINUTES_PER_DAY, day_bounds};
use crate::monitoring::MonitoringPeriod;
use crate::parts::{SessionPart, active_segments};
use crate::session::ProjectedSession;
use crate::suggestion::{SuggestionDailyStats, build_suggestion_daily_stats};
use crate::types::PackageId;

/// Default width of a time-of-day bucket.
pub const DEFAULT_BUCKET_MINUTES: u32 = 30;

/// Usage rollup for one application on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppUsageStats {
    pub package: PackageId,
    pub total_usage_ms: i64,
    pub session_count: usize,
    pub average_session_ms: i64,
}

/// Usage and monitoring minutes inside one fixed-width slice of the day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeBucketStats {
    /// Minute-of-day the bucket starts at.
    pub start_minute: u32,
    /// Minute-of-day the bucket ends at (exclusive).
    pub end_minute: u32,
    /// Whole minutes of target-app usage inside the bucket.
    pub usage_minutes: i64,
    /// Whole minutes of monitoring availability inside the bucket.
    pub monitored_minutes: i64,
    /// Package with the most accumulated usage, ties broken by first
    /// encountered. `None` if no whole minute accumulated.
    pub top_package: Option<PackageId>,
}

/// Complete rollup for one local date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    /// Total active usage on the date, summed over session parts.
    pub total_usage_ms: i64,
    /// Sessions whose lifetime overlaps the date, active or paused.
    pub session_count: usize,
    /// Mean active duration of those sessions (0 for an empty set).
    pub average_session_ms: i64,
    /// Longest active duration among those sessions.
    pub longest_session_ms: i64,
    /// Per-app rollups, largest usage first.
    pub apps: Vec<AppUsageStats>,
    /// Fixed-width time-of-day buckets covering the 24h day.
    pub buckets: Vec<TimeBucketStats>,
    /// Suggestion funnel, absent when no prompt was shown on the date.
    pub suggestions: Option<SuggestionDailyStats>,
}

/// Whole minutes of overlap between two millisecond ranges.
///
/// Truncates, never rounds, so bucket sums stay below the underlying
/// segment durations.
fn intersection_minutes(a_start: i64, a_end: i64, b_start: i64, b_end: i64) -> i64 {
    let overlap = a_end.min(b_end) - a_start.max(b_start);
    if overlap <= 0 { 0 } else { overlap / 60_000 }
}

/// Calculates the daily rollup for one local date.
///
/// Pure over its arguments and rebuilt from scratch on every call. Returns
/// `None` when the date saw no usage, no overlapping session, and no
/// monitoring at all: "nothing happened" as opposed to "measured zero".
#[allow(clippy::too_many_arguments)]
pub fn calculate_daily_stats(
    sessions: &[ProjectedSession],
    parts: &[SessionPart],
    monitoring_periods: &[MonitoringPeriod],
    date: NaiveDate,
    tz: Tz,
    bucket_minutes: u32,
    ended_soon_threshold_ms: i64,
    now: DateTime<Utc>,
) -> Option<DailyStats> {
    let (day_start, day_end) = day_bounds(date, tz);

    let date_parts: Vec<&SessionPart> = parts.iter().filter(|p| p.date == date).collect();
    let monitoring_on_date: Vec<&MonitoringPeriod> = monitoring_periods
        .iter()
        .filter(|p| p.start < day_end && p.end > day_start)
        .collect();

    // (1)-(2) Sessions whose lifetime overlaps the date, measured over
    // their whole active duration (which may extend beyond the date). A
    // session paused across the entire date still counts; an open session
    // runs until the evaluation instant.
    let overlapping: Vec<&ProjectedSession> = sessions
        .iter()
        .filter(|projected| {
            projected.start_time().is_some_and(|start| {
                let end = projected.end_time().unwrap_or(now);
                start < day_end && end > day_start
            })
        })
        .collect();

    if date_parts.is_empty() && monitoring_on_date.is_empty() && overlapping.is_empty() {
        return None;
    }

    let session_durations: Vec<i64> = overlapping
        .iter()
        .map(|projected| {
            active_segments(projected, now)
                .iter()
                .map(|(s, e)| (*e - *s).num_milliseconds())
                .sum()
        })
        .collect();
    let session_count = session_durations.len();
    let longest_session_ms = session_durations.iter().copied().max().unwrap_or(0);
    let average_session_ms = if session_count == 0 {
        0
    } else {
        session_durations.iter().sum::<i64>() / session_count as i64
    };

    // (3) Total usage on the date.
    let total_usage_ms: i64 = date_parts.iter().map(|p| p.duration_ms()).sum();

    // (4) Per-app rollups, in first-encountered order then sorted by usage.
    let mut apps: Vec<AppUsageStats> = Vec::new();
    for part in &date_parts {
        if let Some(app) = apps.iter_mut().find(|a| a.package == part.package) {
            app.total_usage_ms += part.duration_ms();
        } else {
            apps.push(AppUsageStats {
                package: part.package.clone(),
                total_usage_ms: part.duration_ms(),
                session_count: 0,
                average_session_ms: 0,
            });
        }
    }
    for app in &mut apps {
        let mut seen = Vec::new();
        for part in &date_parts {
            if part.package == app.package && !seen.contains(&part.session) {
                seen.push(part.session);
            }
        }
        app.session_count = seen.len();
        app.average_session_ms = if seen.is_empty() {
            0
        } else {
            app.total_usage_ms / app.session_count as i64
        };
    }
    apps.sort_by(|a, b| {
        b.total_usage_ms
            .cmp(&a.total_usage_ms)
            .then_with(|| a.package.cmp(&b.package))
    });

    // (5) Fixed-width buckets over the 24h day, accumulating truncated
    // interval-intersection minutes for usage and monitoring.
    let bucket_minutes = bucket_minutes.max(1);
    let bucket_ms = i64::from(bucket_minutes) * 60_000;

    let mut buckets: Vec<TimeBucketStats> = (0..MINUTES_PER_DAY)
        .step_by(bucket_minutes as usize)
        .map(|start_minute| TimeBucketStats {
            start_minute,
            end_minute: (start_minute + bucket_minutes).min(MINUTES_PER_DAY),
            usage_minutes: 0,
            monitored_minutes: 0,
            top_package: None,
        })
        .collect();
    // Per-bucket per-package minutes, insertion-ordered for the tie-break.
    let mut by_package: Vec<Vec<(PackageId, i64)>> = vec![Vec::new(); buckets.len()];

    for part in &date_parts {
        let p_start = (part.start - day_start).num_milliseconds();
        let p_end = (part.end - day_start).num_milliseconds();
        for (i, bucket) in buckets.iter_mut().enumerate() {
            let b_start = i as i64 * bucket_ms;
            let minutes = intersection_minutes(p_start, p_end, b_start, b_start + bucket_ms);
            if minutes > 0 {
                bucket.usage_minutes += minutes;
                let entries = &mut by_package[i];
                if let Some(entry) = entries.iter_mut().find(|(p, _)| *p == part.package) {
                    entry.1 += minutes;
                } else {
                    entries.push((part.package.clone(), minutes));
                }
            }
        }
    }

    for period in &monitoring_on_date {
        let m_start = (period.start.max(day_start) - day_start).num_milliseconds();
        let m_end = (period.end.min(day_end) - day_start).num_milliseconds();
        for (i, bucket) in buckets.iter_mut().enumerate() {
            let b_start = i as i64 * bucket_ms;
            bucket.monitored_minutes +=
                intersection_minutes(m_start, m_end, b_start, b_start + bucket_ms);
        }
    }

    for (bucket, entries) in buckets.iter_mut().zip(&by_package) {
        let mut top: Option<&(PackageId, i64)> = None;
        for entry in entries {
            // Strictly greater keeps the first-encountered package on ties.
            if top.is_none_or(|t| entry.1 > t.1) {
                top = Some(entry);
            }
        }
        bucket.top_package = top.map(|(p, _)| p.clone());
    }

    // (6) Suggestion funnel.
    let suggestions = build_suggestion_daily_stats(sessions, date, tz, ended_soon_threshold_ms);

    tracing::debug!(
        %date,
        total_usage_ms,
        session_count,
        "calculated daily stats"
    );

    Some(DailyStats {
        date,
        total_usage_ms,
        session_count,
        average_session_ms,
        longest_session_ms,
        apps,
        buckets,
        suggestions,
    })
}
