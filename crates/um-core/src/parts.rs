//! Calendar-day slicing of session active time.
//!
//! A session's active (non-paused) time is a list of absolute segments; each
//! segment is cut at every local midnight so that no emitted part crosses a
//! day boundary. Part durations conserve the segment exactly at millisecond
//! precision.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::localtime::{local_date, local_midnight_to_utc, minute_of_day};
use crate::session::{ProjectedSession, SubEventKind};
use crate::types::{PackageId, SessionId};

/// One calendar-day slice of a session's active time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionPart {
    /// The session this slice belongs to.
    pub session: SessionId,
    /// The application the session tracks.
    pub package: PackageId,
    /// The local date the slice falls on.
    pub date: NaiveDate,
    /// Absolute slice start.
    pub start: DateTime<Utc>,
    /// Absolute slice end.
    pub end: DateTime<Utc>,
    /// Minute-of-day of the start, `0..1440`.
    pub start_minute_of_day: u32,
    /// Minute-of-day of the end, `0..=1440` (1440 = slice ends at midnight).
    pub end_minute_of_day: u32,
}

impl SessionPart {
    /// Length of the slice in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        (self.end - self.start).num_milliseconds()
    }
}

/// Computes a session's active segments from its sub-events.
///
/// Each `Start` or `Resume` opens a segment; the next `Pause` or `End`
/// closes it. A segment still open at the evaluation instant is closed at
/// `now`, so output segments are never open-ended.
#[must_use]
pub fn active_segments(
    session: &ProjectedSession,
    now: DateTime<Utc>,
) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    let mut segments = Vec::new();
    let mut open: Option<DateTime<Utc>> = None;

    for sub in &session.sub_events {
        match sub.kind {
            SubEventKind::Start | SubEventKind::Resume => {
                if open.is_none() {
                    open = Some(sub.timestamp);
                }
            }
            SubEventKind::Pause | SubEventKind::End => {
                if let Some(start) = open.take() {
                    if sub.timestamp > start {
                        segments.push((start, sub.timestamp));
                    }
                }
            }
            _ => {}
        }
    }

    if let Some(start) = open {
        if now > start {
            segments.push((start, now));
        }
    }

    segments
}

/// Slices every session's active segments at local day boundaries.
///
/// For each emitted part the minute-of-day offsets lie in `[0, 1440]` and
/// the sum of part durations per segment equals the segment duration
/// exactly.
pub fn generate_session_parts(
    sessions: &[ProjectedSession],
    tz: Tz,
    now: DateTime<Utc>,
) -> Vec<SessionPart> {
    let mut parts = Vec::new();

    for projected in sessions {
        for (seg_start, seg_end) in active_segments(projected, now) {
            let mut cursor = seg_start;
            loop {
                let date = local_date(cursor, tz);
                let next_midnight =
                    local_midnight_to_utc(date + chrono::Duration::days(1), tz);
                let slice_end = seg_end.min(next_midnight);

                if slice_end > cursor {
                    parts.push(SessionPart {
                        session: projected.session.id,
                        package: projected.session.package.clone(),
                        date,
                        start: cursor,
                        end: slice_end,
                        start_minute_of_day: minute_of_day(cursor, date, tz),
                        end_minute_of_day: minute_of_day(slice_end, date, tz),
                    });
                }

                if seg_end <= next_midnight {
                    break;
                }
                cursor = next_midnight;
            }
        }
    }

    parts
}
