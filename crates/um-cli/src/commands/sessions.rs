//! Sessions command: list projected sessions touching a date.

use std::io::Write;

use anyhow::Result;
use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Serialize;

use um_core::{ProjectedSession, SessionId};

use crate::commands::report::format_duration;
use crate::commands::util::{DayView, format_local_time};

/// One session's share of the requested date.
#[derive(Debug, Serialize)]
struct SessionLine {
    session: SessionId,
    package: String,
    /// Local wall-clock start of the session.
    start: String,
    /// Local wall-clock end, or `None` while the session is still open.
    end: Option<String>,
    /// Active time attributed to the requested date.
    active_ms_on_date: i64,
}

fn session_lines(view: &DayView, tz: Tz) -> Vec<SessionLine> {
    let mut lines = Vec::new();
    for projected in &view.sessions {
        let active_ms_on_date: i64 = view
            .parts
            .iter()
            .filter(|p| p.session == projected.session.id && p.date == view.date)
            .map(um_core::SessionPart::duration_ms)
            .sum();
        if active_ms_on_date == 0 {
            continue;
        }
        lines.push(SessionLine {
            session: projected.session.id,
            package: projected.session.package.to_string(),
            start: projected
                .start_time()
                .map(|t| format_local_time(t, tz))
                .unwrap_or_default(),
            end: projected.end_time().map(|t| format_local_time(t, tz)),
            active_ms_on_date,
        });
    }
    lines
}

/// Sessions with sub-events, for JSON output.
#[derive(Debug, Serialize)]
struct JsonSessions<'a> {
    date: NaiveDate,
    timezone: &'a str,
    sessions: Vec<&'a ProjectedSession>,
}

pub fn run<W: Write>(writer: &mut W, view: &DayView, tz: Tz, json: bool) -> Result<()> {
    let lines = session_lines(view, tz);

    if json {
        let on_date: Vec<&ProjectedSession> = view
            .sessions
            .iter()
            .filter(|s| lines.iter().any(|l| l.session == s.session.id))
            .collect();
        let output = serde_json::to_string_pretty(&JsonSessions {
            date: view.date,
            timezone: &view.timezone,
            sessions: on_date,
        })?;
        writeln!(writer, "{output}")?;
        return Ok(());
    }

    writeln!(writer, "Sessions for {} ({})", view.date, view.timezone)?;

    if lines.is_empty() {
        writeln!(writer, "No sessions recorded.")?;
        return Ok(());
    }

    writeln!(writer)?;
    for line in &lines {
        let end = line.end.as_deref().unwrap_or("(open)");
        writeln!(
            writer,
            "#{:<4} {:<28} {} - {:<9} active {}",
            line.session,
            line.package,
            line.start,
            end,
            format_duration(line.active_ms_on_date)
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use um_core::{PackageId, Session, SessionSubEvent, SubEventKind, generate_session_parts};

    fn ts(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 10, 9, 0, 0).unwrap() + chrono::Duration::minutes(minutes)
    }

    fn projected(id: i64, package: &str, subs: Vec<(DateTime<Utc>, SubEventKind)>) -> ProjectedSession {
        let sid = SessionId(id);
        ProjectedSession {
            session: Session {
                id: sid,
                package: PackageId::new(package).unwrap(),
            },
            sub_events: subs
                .into_iter()
                .map(|(timestamp, kind)| SessionSubEvent {
                    session: sid,
                    timestamp,
                    kind,
                })
                .collect(),
        }
    }

    fn view_for(sessions: Vec<ProjectedSession>) -> DayView {
        let now = ts(600);
        let parts = generate_session_parts(&sessions, Tz::UTC, now);
        DayView {
            date: NaiveDate::from_ymd_opt(2025, 2, 10).unwrap(),
            timezone: "UTC".to_string(),
            sessions,
            parts,
            monitoring: Vec::new(),
            stats: None,
        }
    }

    #[test]
    fn lists_sessions_with_active_time_on_the_date() {
        let view = view_for(vec![projected(
            1,
            "com.example.reader",
            vec![(ts(0), SubEventKind::Start), (ts(45), SubEventKind::End)],
        )]);

        let mut output = Vec::new();
        run(&mut output, &view, Tz::UTC, false).unwrap();
        let output = String::from_utf8(output).unwrap();

        assert!(output.contains("Sessions for 2025-02-10 (UTC)"));
        assert!(output.contains("#1"));
        assert!(output.contains("com.example.reader"));
        assert!(output.contains("09:00:00 - 09:45:00"));
        assert!(output.contains("active 45m"));
    }

    #[test]
    fn open_sessions_are_marked() {
        let view = view_for(vec![projected(
            1,
            "com.example.reader",
            vec![(ts(0), SubEventKind::Start)],
        )]);

        let mut output = Vec::new();
        run(&mut output, &view, Tz::UTC, false).unwrap();
        let output = String::from_utf8(output).unwrap();

        assert!(output.contains("(open)"));
    }

    #[test]
    fn empty_date_prints_placeholder() {
        let view = view_for(Vec::new());

        let mut output = Vec::new();
        run(&mut output, &view, Tz::UTC, false).unwrap();
        let output = String::from_utf8(output).unwrap();

        assert!(output.contains("No sessions recorded."));
    }

    #[test]
    fn json_output_carries_sub_events() {
        let view = view_for(vec![projected(
            1,
            "com.example.reader",
            vec![(ts(0), SubEventKind::Start), (ts(45), SubEventKind::End)],
        )]);

        let mut output = Vec::new();
        run(&mut output, &view, Tz::UTC, true).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();

        assert_eq!(value["date"], "2025-02-10");
        assert_eq!(value["sessions"][0]["session"]["id"], 1);
        assert_eq!(value["sessions"][0]["sub_events"][0]["kind"]["kind"], "start");
    }
}
