//! Monitoring availability projection.
//!
//! Derives the intervals during which the system could actually observe
//! foreground activity on a given local date, from three independent
//! signals: the service running, the screen on, and no required permission
//! revoked.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::event::{EventKind, TimelineEvent};
use crate::localtime::day_bounds;
use crate::types::{PermissionKind, PermissionState, ServiceState};

/// A half-open interval `[start, end)` of monitoring availability.
///
/// Always finalized: an interval still open at evaluation time is clamped to
/// `min(now, day_end)` before being emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonitoringPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl MonitoringPeriod {
    /// Length of the period in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        (self.end - self.start).num_milliseconds()
    }
}

/// Whether monitoring could run at all: service up and no required
/// permission known to be revoked.
///
/// A permission never yet reported counts as granted, so missing
/// instrumentation does not under-count availability.
#[must_use]
pub fn is_monitoring_enabled(
    service_running: bool,
    permissions: &HashMap<PermissionKind, PermissionState>,
) -> bool {
    service_running && permissions.values().all(|s| *s != PermissionState::Revoked)
}

/// Whether monitoring was actually observing: enabled and the screen on.
#[must_use]
pub fn is_monitoring_active(
    service_running: bool,
    screen_on: bool,
    permissions: &HashMap<PermissionKind, PermissionState>,
) -> bool {
    is_monitoring_enabled(service_running, permissions) && screen_on
}

/// Tracked signal state during the replay.
#[derive(Debug)]
struct SignalState {
    service_running: bool,
    screen_on: bool,
    permissions: HashMap<PermissionKind, PermissionState>,
}

impl SignalState {
    fn new() -> Self {
        Self {
            service_running: false,
            // Like an unreported permission, an unreported screen counts as
            // on; only an explicit off signal suspends monitoring.
            screen_on: true,
            permissions: HashMap::new(),
        }
    }

    fn apply(&mut self, kind: &EventKind) {
        match kind {
            EventKind::ServiceLifecycle { state } => {
                self.service_running = *state == ServiceState::Started;
            }
            EventKind::ScreenState { on } => {
                self.screen_on = *on;
            }
            EventKind::PermissionChange { kind, state } => {
                self.permissions.insert(*kind, *state);
            }
            _ => {}
        }
    }

    fn active(&self) -> bool {
        is_monitoring_active(self.service_running, self.screen_on, &self.permissions)
    }
}

/// Builds the monitoring periods for one local date.
///
/// Events strictly before the day's start seed the signal state without
/// emitting intervals; the day's events then open an interval on each
/// false-to-true transition and close it on true-to-false. All intervals are
/// clipped to `[day_start, day_end)` and zero-length intervals are dropped.
///
/// Returned periods never overlap and are sorted by start time.
pub fn build_monitoring_periods(
    date: NaiveDate,
    tz: Tz,
    events: &[TimelineEvent],
    now: DateTime<Utc>,
) -> Vec<MonitoringPeriod> {
    let (day_start, day_end) = day_bounds(date, tz);

    let mut ordered: Vec<&TimelineEvent> = events.iter().collect();
    ordered.sort_by_key(|e| e.timestamp);

    let mut state = SignalState::new();
    let mut periods: Vec<MonitoringPeriod> = Vec::new();
    let mut open_since: Option<DateTime<Utc>> = None;

    for event in ordered {
        if event.timestamp >= day_end {
            break;
        }
        if event.timestamp < day_start {
            // Seed pass: state only, no intervals.
            state.apply(&event.kind);
            continue;
        }

        if open_since.is_none() && state.active() {
            // Carried over from the seed: active since the day began.
            open_since = Some(day_start);
        }

        let was_active = state.active();
        state.apply(&event.kind);
        let is_active = state.active();

        if !was_active && is_active {
            open_since = Some(event.timestamp.max(day_start));
        } else if was_active && !is_active {
            if let Some(start) = open_since.take() {
                if event.timestamp > start {
                    periods.push(MonitoringPeriod {
                        start,
                        end: event.timestamp,
                    });
                }
            }
        }
    }

    // Still active at the end of the replay: close at the evaluation
    // instant, clipped to the day.
    let close_at = now.min(day_end);
    let start = open_since.or_else(|| state.active().then_some(day_start));
    if let Some(start) = start {
        if close_at > start {
            periods.push(MonitoringPeriod {
                start,
                end: close_at,
            });
        }
    }

    tracing::debug!(%date, periods = periods.len(), "built monitoring periods");
    periods
}
