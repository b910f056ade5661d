//! Suggestion funnel statistics.
//!
//! Classifies how the user responded to each suggestion prompt shown inside
//! a session, and how soon after the prompt the session ended.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::localtime::local_date;
use crate::session::{ProjectedSession, SubEventKind};
use crate::types::{Decision, SessionId, SuggestionId};

/// Default window after a prompt within which a session end counts as
/// "ended soon".
pub const DEFAULT_ENDED_SOON_THRESHOLD_MS: i64 = 120_000;

/// One shown prompt and its classified outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuggestionInstance {
    pub session: SessionId,
    pub suggestion: SuggestionId,
    pub shown_at: DateTime<Utc>,
    /// The first decision recorded before the next prompt, if any.
    pub decision: Option<Decision>,
    /// `Some(true)` if the session ended within the threshold,
    /// `Some(false)` if it ended later, `None` if no end is known yet.
    pub ended_soon: Option<bool>,
}

/// Funnel rollup over all prompts shown on one local date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuggestionDailyStats {
    pub date: NaiveDate,
    pub shown_count: usize,
    /// Responses per decision kind.
    pub decision_counts: BTreeMap<Decision, usize>,
    /// Prompts whose session ended within the threshold.
    pub ended_soon_count: usize,
    /// Prompts whose session demonstrably continued past the threshold.
    pub continued_count: usize,
    /// Prompts whose session has no known end.
    pub unknown_outcome_count: usize,
    /// Ended-soon counts broken down by decision kind.
    pub ended_soon_by_decision: BTreeMap<Decision, usize>,
    pub instances: Vec<SuggestionInstance>,
}

/// Builds the suggestion funnel for one local date.
///
/// Returns `None` when no prompt was shown on that date, so callers can
/// distinguish "no prompts" from "prompts with empty outcomes".
///
/// Lookahead for each prompt is bounded by the next `SuggestionShown` in the
/// same session; prompts sharing a timestamp are processed in sub-event list
/// order.
pub fn build_suggestion_daily_stats(
    sessions: &[ProjectedSession],
    date: NaiveDate,
    tz: Tz,
    ended_soon_threshold_ms: i64,
) -> Option<SuggestionDailyStats> {
    let mut instances = Vec::new();

    for projected in sessions {
        let subs = &projected.sub_events;
        for (i, sub) in subs.iter().enumerate() {
            let SubEventKind::SuggestionShown { suggestion } = &sub.kind else {
                continue;
            };
            if local_date(sub.timestamp, tz) != date {
                continue;
            }

            let mut decision = None;
            let mut ended_at = None;
            for later in &subs[i + 1..] {
                match &later.kind {
                    SubEventKind::SuggestionShown { .. } => break,
                    SubEventKind::SuggestionDecision { decision: d, .. } => {
                        if decision.is_none() {
                            decision = Some(*d);
                        }
                    }
                    SubEventKind::End => {
                        ended_at = Some(later.timestamp);
                    }
                    _ => {}
                }
            }

            let ended_soon = ended_at
                .map(|end| (end - sub.timestamp).num_milliseconds() <= ended_soon_threshold_ms);

            instances.push(SuggestionInstance {
                session: projected.session.id,
                suggestion: suggestion.clone(),
                shown_at: sub.timestamp,
                decision,
                ended_soon,
            });
        }
    }

    if instances.is_empty() {
        return None;
    }

    let mut decision_counts: BTreeMap<Decision, usize> = BTreeMap::new();
    let mut ended_soon_by_decision: BTreeMap<Decision, usize> = BTreeMap::new();
    let mut ended_soon_count = 0;
    let mut continued_count = 0;
    let mut unknown_outcome_count = 0;

    for instance in &instances {
        if let Some(decision) = instance.decision {
            *decision_counts.entry(decision).or_insert(0) += 1;
        }
        match instance.ended_soon {
            Some(true) => {
                ended_soon_count += 1;
                if let Some(decision) = instance.decision {
                    *ended_soon_by_decision.entry(decision).or_insert(0) += 1;
                }
            }
            Some(false) => continued_count += 1,
            None => unknown_outcome_count += 1,
        }
    }

    Some(SuggestionDailyStats {
        date,
        shown_count: instances.len(),
        decision_counts,
        ended_soon_count,
        continued_count,
        unknown_outcome_count,
        ended_soon_by_decision,
        instances,
    })
}
