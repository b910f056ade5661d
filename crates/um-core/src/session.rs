//! Session projection.
//!
//! Folds an ordered window of timeline events into logical usage sessions,
//! one per continuous (possibly paused) period of foreground use of a target
//! application.
//!
//! # Algorithm Summary
//!
//! 1. Re-sort events by timestamp (defensive, stable)
//! 2. Single forward pass keeping an `ActiveState` per target package
//! 3. Before each event (and once more at `now`), sweep paused sessions
//!    whose grace period has elapsed and close them at the moment activity
//!    actually stopped
//!
//! The grace period is a reinterpretation window, never extra duration: a
//! grace-closed session ends at its last inactivity timestamp, not at the
//! grace expiry.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::event::{EventKind, TimelineEvent};
use crate::types::{Decision, PackageId, ServiceState, SessionId, SuggestionId};

/// Default grace period before a paused session is considered over.
pub const DEFAULT_GRACE_MS: i64 = 120_000;

/// One logical period of foreground use of a target application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    /// Synthetic ID, assigned in projection order.
    pub id: SessionId,
    /// The application this session tracks.
    pub package: PackageId,
}

/// What happened at one point inside a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubEventKind {
    /// The session opened.
    Start,
    /// Activity stopped (app left foreground, screen off).
    Pause,
    /// Activity came back within the grace period.
    Resume,
    /// The session closed.
    End,
    /// A suggestion prompt was shown during the session.
    SuggestionShown { suggestion: SuggestionId },
    /// The user responded to a suggestion prompt.
    SuggestionDecision {
        suggestion: SuggestionId,
        decision: Decision,
    },
    /// A setting changed while the session was open.
    SettingsChanged { key: String },
}

/// A timestamped sub-event belonging to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSubEvent {
    /// The owning session.
    pub session: SessionId,
    /// When it happened.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    pub kind: SubEventKind,
}

/// A session together with its ordered sub-events.
///
/// For a finished session the sub-events open with exactly one `Start`,
/// close with exactly one `End`, and hold well-formed `Pause`/`Resume`
/// pairs in between (a trailing unmatched `Pause` is allowed). A session
/// still open at the evaluation instant has no `End`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectedSession {
    pub session: Session,
    pub sub_events: Vec<SessionSubEvent>,
}

impl ProjectedSession {
    /// Timestamp of the `Start` sub-event.
    #[must_use]
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.sub_events
            .iter()
            .find(|e| e.kind == SubEventKind::Start)
            .map(|e| e.timestamp)
    }

    /// Timestamp of the `End` sub-event, if the session has closed.
    #[must_use]
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.sub_events
            .iter()
            .find(|e| e.kind == SubEventKind::End)
            .map(|e| e.timestamp)
    }
}

/// Per-package scan state, confined to one projection pass.
#[derive(Debug)]
struct ActiveState {
    id: SessionId,
    sub_events: Vec<SessionSubEvent>,
    /// Set while the session is paused; cleared on resume.
    last_inactive_at: Option<DateTime<Utc>>,
}

impl ActiveState {
    fn push(&mut self, timestamp: DateTime<Utc>, kind: SubEventKind) {
        self.sub_events.push(SessionSubEvent {
            session: self.id,
            timestamp,
            kind,
        });
    }

    fn mark_inactive(&mut self, at: DateTime<Utc>) {
        if self.last_inactive_at.is_none() {
            self.push(at, SubEventKind::Pause);
            self.last_inactive_at = Some(at);
        }
    }
}

/// Closes a session at `end_at`, producing its final shape.
///
/// A trailing `Pause` at the same instant as the `End` collapses into it,
/// so a grace-closed session reads `... End@T` rather than `... Pause@T End@T`.
fn close(package: &PackageId, mut state: ActiveState, end_at: DateTime<Utc>) -> ProjectedSession {
    if let Some(last) = state.sub_events.last() {
        if last.kind == SubEventKind::Pause && last.timestamp == end_at {
            state.sub_events.pop();
        }
    }
    state.push(end_at, SubEventKind::End);
    ProjectedSession {
        session: Session {
            id: state.id,
            package: package.clone(),
        },
        sub_events: state.sub_events,
    }
}

/// Projects sessions from a window of timeline events.
///
/// Pure over its arguments: the same events, targets, grace period, and
/// evaluation instant always produce the same sessions. Events referencing
/// packages with no open state and no start condition are silent no-ops.
///
/// # Arguments
///
/// * `events` - The event window (re-sorted by timestamp defensively)
/// * `target_packages` - Tracked applications as of the window start; updated
///   in-pass by `TargetAppSetChanged` events
/// * `grace_ms` - Inactivity tolerance before a paused session closes
///   (default [`DEFAULT_GRACE_MS`])
/// * `now` - Evaluation instant, used for the final grace sweep
///
/// # Returns
///
/// Sessions ordered by ID, each with sub-events ordered by timestamp.
pub fn project_sessions(
    events: &[TimelineEvent],
    target_packages: &BTreeSet<PackageId>,
    grace_ms: i64,
    now: DateTime<Utc>,
) -> Vec<ProjectedSession> {
    let mut ordered: Vec<&TimelineEvent> = events.iter().collect();
    ordered.sort_by_key(|e| e.timestamp);

    let mut targets = target_packages.clone();
    let mut states: HashMap<PackageId, ActiveState> = HashMap::new();
    let mut finished: Vec<ProjectedSession> = Vec::new();
    let mut foreground: Option<PackageId> = None;
    let mut next_id: i64 = 1;

    // Closes every paused session whose grace period elapsed before `cutoff`,
    // backdating the end to the moment activity stopped.
    let sweep = |cutoff: DateTime<Utc>,
                 states: &mut HashMap<PackageId, ActiveState>,
                 finished: &mut Vec<ProjectedSession>| {
        let expired: Vec<PackageId> = states
            .iter()
            .filter(|(_, s)| {
                s.last_inactive_at
                    .is_some_and(|t| (cutoff - t).num_milliseconds() >= grace_ms)
            })
            .map(|(p, _)| p.clone())
            .collect();
        for package in expired {
            if let Some(state) = states.remove(&package) {
                let end_at = state.last_inactive_at.unwrap_or(cutoff);
                finished.push(close(&package, state, end_at));
            }
        }
    };

    for event in ordered {
        let at = event.timestamp;
        sweep(at, &mut states, &mut finished);

        match &event.kind {
            EventKind::ForegroundAppChanged { package } => {
                if let Some(prev) = &foreground {
                    if Some(prev) != package.as_ref() {
                        if let Some(state) = states.get_mut(prev) {
                            state.mark_inactive(at);
                        }
                    }
                }
                if let Some(pkg) = package {
                    if targets.contains(pkg) {
                        if let Some(state) = states.get_mut(pkg) {
                            if state.last_inactive_at.take().is_some() {
                                state.push(at, SubEventKind::Resume);
                            }
                        } else {
                            let id = SessionId(next_id);
                            next_id += 1;
                            let mut state = ActiveState {
                                id,
                                sub_events: Vec::new(),
                                last_inactive_at: None,
                            };
                            state.push(at, SubEventKind::Start);
                            states.insert(pkg.clone(), state);
                        }
                    }
                }
                foreground = package.clone();
            }

            EventKind::ScreenState { on: false } => {
                for state in states.values_mut() {
                    state.mark_inactive(at);
                }
            }

            EventKind::ScreenState { on: true } => {
                // Only the current foreground target comes back; anything
                // else stays paused until its own foreground event.
                if let Some(pkg) = &foreground {
                    if let Some(state) = states.get_mut(pkg) {
                        if state.last_inactive_at.take().is_some() {
                            state.push(at, SubEventKind::Resume);
                        }
                    }
                }
            }

            EventKind::ServiceLifecycle {
                state: ServiceState::Stopped,
            } => {
                // Hard stop: every open session ends here, grace ignored.
                let open: Vec<PackageId> = states.keys().cloned().collect();
                for package in open {
                    if let Some(state) = states.remove(&package) {
                        finished.push(close(&package, state, at));
                    }
                }
            }

            EventKind::TargetAppSetChanged { packages } => {
                let dropped: Vec<PackageId> = states
                    .keys()
                    .filter(|p| !packages.contains(*p))
                    .cloned()
                    .collect();
                for package in dropped {
                    if let Some(state) = states.remove(&package) {
                        finished.push(close(&package, state, at));
                    }
                }
                targets = packages.clone();
            }

            EventKind::SuggestionShown { suggestion } => {
                if let Some(state) = foreground.as_ref().and_then(|p| states.get_mut(p)) {
                    state.push(
                        at,
                        SubEventKind::SuggestionShown {
                            suggestion: suggestion.clone(),
                        },
                    );
                }
            }

            EventKind::SuggestionDecision {
                suggestion,
                decision,
            } => {
                if let Some(state) = foreground.as_ref().and_then(|p| states.get_mut(p)) {
                    state.push(
                        at,
                        SubEventKind::SuggestionDecision {
                            suggestion: suggestion.clone(),
                            decision: *decision,
                        },
                    );
                }
            }

            EventKind::SettingsChanged { key, .. } => {
                if let Some(state) = foreground.as_ref().and_then(|p| states.get_mut(p)) {
                    state.push(at, SubEventKind::SettingsChanged { key: key.clone() });
                }
            }

            // Service start and permission changes shape monitoring
            // availability, not sessions. Unknown variants are no-ops.
            _ => {}
        }
    }

    sweep(now, &mut states, &mut finished);

    // Sessions still open (active, or paused within grace) stay open: no End.
    for (package, state) in states {
        finished.push(ProjectedSession {
            session: Session {
                id: state.id,
                package,
            },
            sub_events: state.sub_events,
        });
    }

    for projected in &mut finished {
        projected.sub_events.sort_by_key(|e| e.timestamp);
    }
    finished.sort_by_key(|p| p.session.id);

    tracing::debug!(
        sessions = finished.len(),
        grace_ms,
        "projected sessions from event window"
    );
    finished
}
