//! Raw lifecycle events from the device.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Decision, PackageId, PermissionKind, PermissionState, ServiceState, SuggestionId};

/// A single entry in the append-only timeline log.
///
/// Events are immutable once recorded. The projection engine never writes
/// them back; every derived view (sessions, parts, periods, stats) is
/// recomputed from scratch from a window of these.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimelineEvent {
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    pub kind: EventKind,
}

impl TimelineEvent {
    /// Creates an event at the given instant.
    #[must_use]
    pub const fn new(timestamp: DateTime<Utc>, kind: EventKind) -> Self {
        Self { timestamp, kind }
    }
}

/// The kind of lifecycle event.
///
/// Projectors match on this exhaustively but always carry a wildcard arm, so
/// variants added later are no-ops rather than errors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// The monitoring service started or stopped.
    ServiceLifecycle { state: ServiceState },
    /// A required permission was granted or revoked.
    PermissionChange {
        kind: PermissionKind,
        state: PermissionState,
    },
    /// The device screen turned on or off.
    ScreenState { on: bool },
    /// The foreground application changed.
    ///
    /// `None` means the user returned to the home screen or launcher.
    ForegroundAppChanged { package: Option<PackageId> },
    /// The set of tracked applications changed.
    TargetAppSetChanged { packages: BTreeSet<PackageId> },
    /// A suggestion prompt was shown inside a tracked app.
    SuggestionShown { suggestion: SuggestionId },
    /// The user responded to a suggestion prompt.
    SuggestionDecision {
        suggestion: SuggestionId,
        decision: Decision,
    },
    /// A user-visible setting changed.
    SettingsChanged { key: String, description: String },
}

impl EventKind {
    /// Canonical type string, matching the serde tag.
    ///
    /// Used as the indexed `type` column in storage.
    #[must_use]
    pub const fn type_str(&self) -> &'static str {
        match self {
            Self::ServiceLifecycle { .. } => "service_lifecycle",
            Self::PermissionChange { .. } => "permission_change",
            Self::ScreenState { .. } => "screen_state",
            Self::ForegroundAppChanged { .. } => "foreground_app_changed",
            Self::TargetAppSetChanged { .. } => "target_app_set_changed",
            Self::SuggestionShown { .. } => "suggestion_shown",
            Self::SuggestionDecision { .. } => "suggestion_decision",
            Self::SettingsChanged { .. } => "settings_changed",
        }
    }
}
