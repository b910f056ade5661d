//! Append-only event log for the usage monitor.
//!
//! Stores [`um_core::TimelineEvent`]s in SQLite and serves them back by
//! half-open time range. The engine in `um-core` never writes here; this
//! crate is the single source of truth the projections replay from.
//!
//! # Thread Safety
//!
//! [`Database`] wraps a `rusqlite::Connection`, which is `Send` but not
//! `Sync`: an instance can move between threads but needs external
//! synchronization (`Mutex`, pool, or per-thread instances) to be shared.
//!
//! # Schema
//!
//! Timestamps are stored as TEXT in ISO 8601 with millisecond precision
//! (e.g., `2025-02-10T09:00:00.000Z`), so lexicographic ordering matches
//! chronological ordering and range scans can use the timestamp index
//! directly. The `data` column holds the serde-tagged JSON payload of the
//! event kind; the `type` column duplicates the tag for indexed filtering.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, params};
use thiserror::Error;

use um_core::{EventKind, TimelineEvent};

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse an event timestamp.
    #[error("invalid timestamp for event {event_id}: {timestamp}")]
    TimestampParse {
        event_id: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// Failed to parse or produce event payload JSON.
    #[error("invalid event data for {event_id}: {message}")]
    InvalidEventData { event_id: String, message: String },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// A raw event row, ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub id: String,
    pub timestamp: String,
    pub kind: String,
    pub data: String,
}

impl EventRecord {
    /// Builds a storable row from a timeline event.
    pub fn from_event(id: impl Into<String>, event: &TimelineEvent) -> Result<Self, DbError> {
        let id = id.into();
        let data = serde_json::to_string(&event.kind).map_err(|e| DbError::InvalidEventData {
            event_id: id.clone(),
            message: e.to_string(),
        })?;
        Ok(Self {
            id,
            timestamp: format_timestamp(event.timestamp),
            kind: event.kind.type_str().to_string(),
            data,
        })
    }

    /// Reconstructs the timeline event from the stored row.
    pub fn to_event(&self) -> Result<TimelineEvent, DbError> {
        let timestamp = DateTime::parse_from_rfc3339(&self.timestamp)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|source| DbError::TimestampParse {
                event_id: self.id.clone(),
                timestamp: self.timestamp.clone(),
                source,
            })?;
        let kind: EventKind =
            serde_json::from_str(&self.data).map_err(|e| DbError::InvalidEventData {
                event_id: self.id.clone(),
                message: e.to_string(),
            })?;
        Ok(TimelineEvent::new(timestamp, kind))
    }
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the schema.
    ///
    /// Idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- Events table: the append-only lifecycle log
            -- timestamp: ISO 8601 with milliseconds (e.g., '2025-02-10T09:00:00.000Z')
            -- type: serde tag of the event kind
            -- data: JSON payload of the event kind
            CREATE TABLE IF NOT EXISTS events (
                id TEXT PRIMARY KEY,
                timestamp TEXT NOT NULL,
                type TEXT NOT NULL,
                data TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events(timestamp);
            CREATE INDEX IF NOT EXISTS idx_events_type ON events(type);
            ",
        )?;
        Ok(())
    }

    /// Inserts a batch of events, ignoring duplicates by ID.
    ///
    /// Returns the number of rows actually written.
    pub fn insert_events(&mut self, events: &[EventRecord]) -> Result<usize, DbError> {
        if events.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO events (id, timestamp, type, data) VALUES (?, ?, ?, ?)",
            )?;
            for event in events {
                inserted += stmt.execute(params![
                    event.id,
                    event.timestamp,
                    event.kind,
                    event.data,
                ])?;
            }
        }
        tx.commit()?;
        tracing::debug!(inserted, "inserted events");
        Ok(inserted)
    }

    /// Reads events within `[start, end)`, ordered by timestamp then ID.
    pub fn events_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TimelineEvent>, DbError> {
        if end <= start {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(
            "
            SELECT id, timestamp, type, data
            FROM events
            WHERE timestamp >= ? AND timestamp < ?
            ORDER BY timestamp ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map([format_timestamp(start), format_timestamp(end)], row_record)?;
        collect_events(rows)
    }

    /// Reads all events strictly before `t`, ordered by timestamp then ID.
    ///
    /// Used to seed projector state ahead of a day window.
    pub fn events_before(&self, t: DateTime<Utc>) -> Result<Vec<TimelineEvent>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, timestamp, type, data
            FROM events
            WHERE timestamp < ?
            ORDER BY timestamp ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map([format_timestamp(t)], row_record)?;
        collect_events(rows)
    }

    /// Total number of stored events.
    pub fn event_count(&self) -> Result<u64, DbError> {
        let count: u64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Timestamp of the most recent event, if any.
    ///
    /// Together with [`Self::event_count`] this is the change signal watchers
    /// poll to decide when to recompute.
    pub fn last_event_at(&self) -> Result<Option<DateTime<Utc>>, DbError> {
        let latest: Option<String> =
            self.conn
                .query_row("SELECT MAX(timestamp) FROM events", [], |row| row.get(0))?;
        match latest {
            None => Ok(None),
            Some(timestamp) => {
                let parsed = DateTime::parse_from_rfc3339(&timestamp)
                    .map(|t| t.with_timezone(&Utc))
                    .map_err(|source| DbError::TimestampParse {
                        event_id: "(max)".to_string(),
                        timestamp,
                        source,
                    })?;
                Ok(Some(parsed))
            }
        }
    }
}

fn row_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<EventRecord> {
    Ok(EventRecord {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        kind: row.get(2)?,
        data: row.get(3)?,
    })
}

fn collect_events(
    rows: impl Iterator<Item = rusqlite::Result<EventRecord>>,
) -> Result<Vec<TimelineEvent>, DbError> {
    let mut events = Vec::new();
    for row in rows {
        events.push(row?.to_event()?);
    }
    Ok(events)
}

/// Formats a timestamp for storage (ISO 8601, millisecond precision, UTC).
fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use um_core::{
        Decision, PackageId, PermissionKind, PermissionState, ServiceState, SuggestionId,
    };

    fn ts(ms: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 10, 9, 0, 0).unwrap() + chrono::Duration::milliseconds(ms)
    }

    fn fg(ms: i64, package: Option<&str>) -> TimelineEvent {
        TimelineEvent::new(
            ts(ms),
            EventKind::ForegroundAppChanged {
                package: package.map(|p| PackageId::new(p).unwrap()),
            },
        )
    }

    fn record(id: &str, event: &TimelineEvent) -> EventRecord {
        EventRecord::from_event(id, event).unwrap()
    }

    #[test]
    fn open_in_memory_database() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn open_creates_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("um.db");
        let db = Database::open(&path);
        assert!(db.is_ok());
        assert!(path.exists());
    }

    #[test]
    fn record_roundtrips_every_kind() {
        let kinds = vec![
            EventKind::ServiceLifecycle {
                state: ServiceState::Started,
            },
            EventKind::PermissionChange {
                kind: PermissionKind::UsageAccess,
                state: PermissionState::Revoked,
            },
            EventKind::ScreenState { on: false },
            EventKind::ForegroundAppChanged {
                package: Some(PackageId::new("com.example.reader").unwrap()),
            },
            EventKind::ForegroundAppChanged { package: None },
            EventKind::TargetAppSetChanged {
                packages: [PackageId::new("com.example.reader").unwrap()]
                    .into_iter()
                    .collect(),
            },
            EventKind::SuggestionShown {
                suggestion: SuggestionId::new("sug-1").unwrap(),
            },
            EventKind::SuggestionDecision {
                suggestion: SuggestionId::new("sug-1").unwrap(),
                decision: Decision::Snoozed,
            },
            EventKind::SettingsChanged {
                key: "grace_period_ms".into(),
                description: "set to 2m".into(),
            },
        ];

        for (i, kind) in kinds.into_iter().enumerate() {
            let event = TimelineEvent::new(ts(i64::try_from(i).unwrap()), kind);
            let rec = record(&format!("e{i}"), &event);
            assert_eq!(rec.to_event().unwrap(), event);
        }
    }

    #[test]
    fn insert_ignores_duplicate_ids() {
        let mut db = Database::open_in_memory().unwrap();
        let event = fg(0, Some("P"));
        let records = vec![record("e1", &event), record("e1", &event)];

        let inserted = db.insert_events(&records).unwrap();
        assert_eq!(inserted, 1);
        assert_eq!(db.event_count().unwrap(), 1);
    }

    #[test]
    fn events_between_is_half_open() {
        let mut db = Database::open_in_memory().unwrap();
        db.insert_events(&[
            record("e1", &fg(0, Some("P"))),
            record("e2", &fg(1_000, None)),
            record("e3", &fg(2_000, Some("P"))),
        ])
        .unwrap();

        let events = db.events_between(ts(0), ts(2_000)).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].timestamp, ts(0));
        assert_eq!(events[1].timestamp, ts(1_000));
    }

    #[test]
    fn events_between_empty_range_is_empty() {
        let mut db = Database::open_in_memory().unwrap();
        db.insert_events(&[record("e1", &fg(0, Some("P")))]).unwrap();
        assert!(db.events_between(ts(10), ts(10)).unwrap().is_empty());
        assert!(db.events_between(ts(10), ts(0)).unwrap().is_empty());
    }

    #[test]
    fn events_before_excludes_the_boundary() {
        let mut db = Database::open_in_memory().unwrap();
        db.insert_events(&[
            record("e1", &fg(0, Some("P"))),
            record("e2", &fg(1_000, None)),
        ])
        .unwrap();

        let events = db.events_before(ts(1_000)).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].timestamp, ts(0));
    }

    #[test]
    fn events_come_back_in_timestamp_order() {
        let mut db = Database::open_in_memory().unwrap();
        // Inserted out of order.
        db.insert_events(&[
            record("e2", &fg(2_000, None)),
            record("e1", &fg(0, Some("P"))),
        ])
        .unwrap();

        let events = db.events_between(ts(0), ts(10_000)).unwrap();
        assert_eq!(events[0].timestamp, ts(0));
        assert_eq!(events[1].timestamp, ts(2_000));
    }

    #[test]
    fn last_event_at_tracks_the_max_timestamp() {
        let mut db = Database::open_in_memory().unwrap();
        assert_eq!(db.last_event_at().unwrap(), None);

        db.insert_events(&[
            record("e1", &fg(5_000, Some("P"))),
            record("e2", &fg(1_000, None)),
        ])
        .unwrap();

        assert_eq!(db.last_event_at().unwrap(), Some(ts(5_000)));
        assert_eq!(db.event_count().unwrap(), 2);
    }
}
