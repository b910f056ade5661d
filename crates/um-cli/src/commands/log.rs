//! Log command: append lifecycle events to the event log.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use chrono::Utc;
use uuid::Uuid;

use um_core::{EventKind, PackageId, ServiceState, SuggestionId, TimelineEvent};
use um_db::{Database, EventRecord};

use crate::LogEvent;

/// Appends one event described by the CLI arguments.
pub fn run(db: &mut Database, event: &LogEvent) -> Result<()> {
    let timeline_event = build_event(event)?;
    let record = EventRecord::from_event(Uuid::new_v4().to_string(), &timeline_event)?;

    let written = db.insert_events(std::slice::from_ref(&record))?;
    if written == 1 {
        tracing::info!(kind = %record.kind, timestamp = %record.timestamp, "event logged");
    } else {
        tracing::warn!(id = %record.id, "event already present, nothing written");
    }
    Ok(())
}

/// Translates CLI arguments into a timeline event.
///
/// Missing `--at` means "now".
fn build_event(event: &LogEvent) -> Result<TimelineEvent> {
    let (at, kind) = match event {
        LogEvent::ServiceStarted { at } => (
            at,
            EventKind::ServiceLifecycle {
                state: ServiceState::Started,
            },
        ),
        LogEvent::ServiceStopped { at } => (
            at,
            EventKind::ServiceLifecycle {
                state: ServiceState::Stopped,
            },
        ),
        LogEvent::Screen { state, at } => (at, EventKind::ScreenState { on: state.is_on() }),
        LogEvent::Foreground { package, at } => {
            let package = package
                .as_deref()
                .map(|p| PackageId::new(p).with_context(|| format!("invalid package {p:?}")))
                .transpose()?;
            (at, EventKind::ForegroundAppChanged { package })
        }
        LogEvent::Targets { packages, at } => {
            let packages: BTreeSet<PackageId> = packages
                .iter()
                .map(|p| PackageId::new(p.clone()).with_context(|| format!("invalid package {p:?}")))
                .collect::<Result<_>>()?;
            (at, EventKind::TargetAppSetChanged { packages })
        }
        LogEvent::Permission { kind, state, at } => (
            at,
            EventKind::PermissionChange {
                kind: (*kind).into(),
                state: (*state).into(),
            },
        ),
        LogEvent::SuggestionShown { id, at } => {
            let suggestion =
                SuggestionId::new(id.clone()).with_context(|| format!("invalid suggestion id {id:?}"))?;
            (at, EventKind::SuggestionShown { suggestion })
        }
        LogEvent::SuggestionDecision { id, decision, at } => {
            let suggestion =
                SuggestionId::new(id.clone()).with_context(|| format!("invalid suggestion id {id:?}"))?;
            (
                at,
                EventKind::SuggestionDecision {
                    suggestion,
                    decision: (*decision).into(),
                },
            )
        }
        LogEvent::Settings {
            key,
            description,
            at,
        } => (
            at,
            EventKind::SettingsChanged {
                key: key.clone(),
                description: description.clone(),
            },
        ),
    };

    let timestamp = at.unwrap_or_else(Utc::now);
    Ok(TimelineEvent::new(timestamp, kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{DecisionArg, ScreenArg};
    use chrono::{DateTime, TimeZone};
    use um_core::Decision;

    fn at() -> Option<DateTime<Utc>> {
        Some(Utc.with_ymd_and_hms(2025, 2, 10, 9, 0, 0).unwrap())
    }

    #[test]
    fn builds_foreground_event() {
        let event = build_event(&LogEvent::Foreground {
            package: Some("com.example.reader".to_string()),
            at: at(),
        })
        .unwrap();

        assert_eq!(event.timestamp, at().unwrap());
        assert_eq!(
            event.kind,
            EventKind::ForegroundAppChanged {
                package: Some(PackageId::new("com.example.reader").unwrap()),
            }
        );
    }

    #[test]
    fn builds_cleared_foreground_event() {
        let event = build_event(&LogEvent::Foreground {
            package: None,
            at: at(),
        })
        .unwrap();
        assert_eq!(event.kind, EventKind::ForegroundAppChanged { package: None });
    }

    #[test]
    fn rejects_empty_package() {
        let result = build_event(&LogEvent::Foreground {
            package: Some(String::new()),
            at: at(),
        });
        assert!(result.is_err());
    }

    #[test]
    fn builds_screen_event() {
        let event = build_event(&LogEvent::Screen {
            state: ScreenArg::Off,
            at: at(),
        })
        .unwrap();
        assert_eq!(event.kind, EventKind::ScreenState { on: false });
    }

    #[test]
    fn builds_target_set_event() {
        let event = build_event(&LogEvent::Targets {
            packages: vec!["b".to_string(), "a".to_string(), "b".to_string()],
            at: at(),
        })
        .unwrap();

        let EventKind::TargetAppSetChanged { packages } = event.kind else {
            panic!("expected target set change");
        };
        assert_eq!(packages.len(), 2);
    }

    #[test]
    fn builds_decision_event() {
        let event = build_event(&LogEvent::SuggestionDecision {
            id: "sug-1".to_string(),
            decision: DecisionArg::Snoozed,
            at: at(),
        })
        .unwrap();

        assert_eq!(
            event.kind,
            EventKind::SuggestionDecision {
                suggestion: SuggestionId::new("sug-1").unwrap(),
                decision: Decision::Snoozed,
            }
        );
    }

    #[test]
    fn missing_at_defaults_to_now() {
        let before = Utc::now();
        let event = build_event(&LogEvent::ServiceStarted { at: None }).unwrap();
        let after = Utc::now();
        assert!(event.timestamp >= before && event.timestamp <= after);
    }

    #[test]
    fn run_appends_to_the_log() {
        let mut db = Database::open_in_memory().unwrap();
        run(
            &mut db,
            &LogEvent::ServiceStarted { at: at() },
        )
        .unwrap();
        assert_eq!(db.event_count().unwrap(), 1);
    }
}
