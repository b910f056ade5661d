//! Core projection and aggregation engine for the usage monitor.
//!
//! This crate contains the deterministic, replayable pipeline that turns a
//! flat log of lifecycle events into derived views:
//! - Session projection: coalescing foreground activity into logical
//!   sessions under a configurable grace period
//! - Monitoring availability: intervals during which observation was possible
//! - Day slicing: per-calendar-day parts of a session's active time
//! - Daily statistics: totals, per-app breakdown, time-of-day buckets, and
//!   the suggestion funnel
//!
//! Everything here is a pure function over explicit arguments; the event log
//! itself lives in `um-db`.

pub mod event;
pub mod localtime;
pub mod monitoring;
pub mod parts;
pub mod session;
pub mod stats;
pub mod suggestion;
pub mod types;

pub use event::{EventKind, TimelineEvent};
pub use localtime::{MINUTES_PER_DAY, day_bounds, local_date, local_midnight_to_utc, minute_of_day};
pub use monitoring::{
    MonitoringPeriod, build_monitoring_periods, is_monitoring_active, is_monitoring_enabled,
};
pub use parts::{SessionPart, active_segments, generate_session_parts};
pub use session::{
    DEFAULT_GRACE_MS, ProjectedSession, Session, SessionSubEvent, SubEventKind, project_sessions,
};
pub use stats::{
    AppUsageStats, DEFAULT_BUCKET_MINUTES, DailyStats, TimeBucketStats, calculate_daily_stats,
};
pub use suggestion::{
    DEFAULT_ENDED_SOON_THRESHOLD_MS, SuggestionDailyStats, SuggestionInstance,
    build_suggestion_daily_stats,
};
pub use types::{
    Decision, PackageId, PermissionKind, PermissionState, ServiceState, SessionId, SuggestionId,
    ValidationError,
};
