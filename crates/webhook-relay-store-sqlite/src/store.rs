// crates/webhook-relay-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Enrollment Store
// Description: Durable EnrollmentStore with in-memory table and disk snapshots.
// Purpose: Persist enrollments across restarts without blocking mutations.
// Dependencies: webhook-relay-core, rusqlite, serde_json, time, tracing
// ============================================================================

//! ## Overview
//! This module implements [`EnrollmentStore`] over an in-memory `SQLite`
//! table guarded by one mutex. Every mutation schedules a whole-store
//! snapshot to a disk file on a detached thread using the `SQLite` online
//! backup API; boot restores the latest snapshot with the same API. The
//! disk image is a full replaceable copy, never an incremental log.
//!
//! # Invariants
//! - Restore failure of any kind (missing, empty, corrupt, unreadable
//!   snapshot) degrades to an empty registry and is never fatal.
//! - Snapshots run under the table mutex, so a snapshot can never observe
//!   a half-applied mutation.
//! - Snapshot failure is logged and never rolls back in-memory state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::backup::Backup;
use rusqlite::backup::StepResult;
use rusqlite::params;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::debug;
use tracing::info;
use tracing::warn;
use webhook_relay_core::Enrollment;
use webhook_relay_core::EnrollmentId;
use webhook_relay_core::EnrollmentStore;
use webhook_relay_core::NewEnrollment;
use webhook_relay_core::StoreError;
use webhook_relay_core::SubscriptionArgs;

// ============================================================================
// SECTION: Schema
// ============================================================================

/// Table definition for the enrollment registry.
const SCHEMA_SQL: &str = "CREATE TABLE IF NOT EXISTS enrollments (
    id TEXT PRIMARY KEY,
    queue TEXT NOT NULL,
    target_url TEXT NOT NULL,
    subscription_args TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

/// Column list shared by the read paths.
const SELECT_COLUMNS: &str =
    "id, queue, target_url, subscription_args, created_at, updated_at";

/// Busy timeout for disk connections, which may briefly contend when a
/// restore overlaps a still-running background snapshot.
const SNAPSHOT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// SECTION: Store
// ============================================================================

/// Durable enrollment store with an in-memory working copy.
pub struct SqliteEnrollmentStore {
    /// Authoritative in-memory database behind the table mutex.
    conn: Arc<Mutex<Connection>>,
    /// Disk path snapshots are written to and restored from.
    snapshot_path: PathBuf,
}

impl SqliteEnrollmentStore {
    /// Opens the store, restoring the disk snapshot when one exists.
    ///
    /// A missing, empty, or unreadable snapshot file starts the registry
    /// empty; only failures to create the in-memory table itself are
    /// returned as errors.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the in-memory database cannot be
    /// created or the schema cannot be applied.
    pub fn open(snapshot_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let snapshot_path = snapshot_path.into();
        let restored = match try_restore(&snapshot_path) {
            Ok(conn) => conn,
            Err(err) => {
                warn!(
                    error = %err,
                    path = %snapshot_path.display(),
                    "snapshot restore failed; starting with empty registry"
                );
                None
            }
        };
        let restored_from_disk = restored.is_some();
        let conn = match restored {
            Some(conn) => conn,
            None => Connection::open_in_memory()
                .map_err(|err| StoreError::Io(err.to_string()))?,
        };
        // Applies the table to fresh databases and to snapshots written by
        // older builds that may predate it.
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|err| StoreError::Query(err.to_string()))?;
        if restored_from_disk {
            let rows = count_rows(&conn)?;
            info!(
                rows,
                path = %snapshot_path.display(),
                "restored enrollment registry from snapshot"
            );
        } else {
            debug!(
                path = %snapshot_path.display(),
                "no usable snapshot on disk; registry starts empty"
            );
        }
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            snapshot_path,
        })
    }

    /// Writes a synchronous snapshot; used once at graceful shutdown.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the disk image cannot be written.
    pub fn snapshot_now(&self) -> Result<(), StoreError> {
        write_snapshot(&self.conn, &self.snapshot_path)
    }

    /// Schedules a fire-and-forget snapshot on a detached thread.
    fn schedule_snapshot(&self) {
        let conn = Arc::clone(&self.conn);
        let path = self.snapshot_path.clone();
        let spawned = thread::Builder::new()
            .name("registry-snapshot".to_string())
            .spawn(move || {
                if let Err(err) = write_snapshot(&conn, &path) {
                    warn!(
                        error = %err,
                        path = %path.display(),
                        "background registry snapshot failed"
                    );
                }
            });
        if let Err(err) = spawned {
            warn!(error = %err, "could not spawn registry snapshot thread");
        }
    }
}

impl EnrollmentStore for SqliteEnrollmentStore {
    fn insert_or_replace(&self, enrollment: &NewEnrollment) -> Result<Enrollment, StoreError> {
        let row = {
            let guard = self
                .conn
                .lock()
                .map_err(|_| StoreError::Query("enrollment table mutex poisoned".to_string()))?;
            let now = format_timestamp(OffsetDateTime::now_utc())?;
            let args_json = serde_json::to_string(&enrollment.subscription_args)
                .map_err(|err| StoreError::Query(err.to_string()))?;
            guard
                .execute(
                    "INSERT INTO enrollments
                         (id, queue, target_url, subscription_args, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                     ON CONFLICT(id) DO UPDATE SET
                         queue = excluded.queue,
                         target_url = excluded.target_url,
                         subscription_args = excluded.subscription_args,
                         updated_at = excluded.updated_at",
                    params![
                        enrollment.id.as_str(),
                        enrollment.queue,
                        enrollment.target_url,
                        args_json,
                        now
                    ],
                )
                .map_err(|err| StoreError::Query(err.to_string()))?;
            let select = format!("SELECT {SELECT_COLUMNS} FROM enrollments WHERE id = ?1");
            let raw = guard
                .query_row(&select, params![enrollment.id.as_str()], read_raw_row)
                .map_err(|err| StoreError::Query(err.to_string()))?;
            decode_row(raw)?
        };
        self.schedule_snapshot();
        Ok(row)
    }

    fn delete(&self, id: &EnrollmentId) -> Result<(), StoreError> {
        {
            let guard = self
                .conn
                .lock()
                .map_err(|_| StoreError::Query("enrollment table mutex poisoned".to_string()))?;
            guard
                .execute("DELETE FROM enrollments WHERE id = ?1", params![id.as_str()])
                .map_err(|err| StoreError::Query(err.to_string()))?;
        }
        self.schedule_snapshot();
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<Enrollment>, StoreError> {
        let guard = self
            .conn
            .lock()
            .map_err(|_| StoreError::Query("enrollment table mutex poisoned".to_string()))?;
        let select = format!("SELECT {SELECT_COLUMNS} FROM enrollments ORDER BY id");
        let mut stmt = guard
            .prepare(&select)
            .map_err(|err| StoreError::Query(err.to_string()))?;
        let raw_rows = stmt
            .query_map([], read_raw_row)
            .map_err(|err| StoreError::Query(err.to_string()))?;
        let mut rows = Vec::new();
        for raw in raw_rows {
            let raw = raw.map_err(|err| StoreError::Query(err.to_string()))?;
            rows.push(decode_row(raw)?);
        }
        Ok(rows)
    }
}

// ============================================================================
// SECTION: Snapshot Plumbing
// ============================================================================

/// Restores the disk snapshot into a fresh in-memory database.
///
/// Returns `Ok(None)` when no snapshot exists yet (missing or empty file);
/// that is the normal first-boot case, not an error.
fn try_restore(path: &Path) -> Result<Option<Connection>, StoreError> {
    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(StoreError::Io(err.to_string())),
    };
    if metadata.len() == 0 {
        return Ok(None);
    }
    let disk = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|err| StoreError::Io(err.to_string()))?;
    disk.busy_timeout(SNAPSHOT_BUSY_TIMEOUT)
        .map_err(|err| StoreError::Io(err.to_string()))?;
    let mut mem =
        Connection::open_in_memory().map_err(|err| StoreError::Io(err.to_string()))?;
    let backup = Backup::new(&disk, &mut mem).map_err(|err| StoreError::Io(err.to_string()))?;
    let outcome = backup.step(-1).map_err(|err| StoreError::Io(err.to_string()))?;
    if !matches!(outcome, StepResult::Done) {
        return Err(StoreError::Io("snapshot restore did not complete".to_string()));
    }
    drop(backup);
    Ok(Some(mem))
}

/// Copies the in-memory table to the disk snapshot under the table mutex.
fn write_snapshot(conn: &Mutex<Connection>, path: &Path) -> Result<(), StoreError> {
    let guard = conn
        .lock()
        .map_err(|_| StoreError::Query("enrollment table mutex poisoned".to_string()))?;
    let mut disk = Connection::open(path).map_err(|err| StoreError::Io(err.to_string()))?;
    disk.busy_timeout(SNAPSHOT_BUSY_TIMEOUT)
        .map_err(|err| StoreError::Io(err.to_string()))?;
    let backup = Backup::new(&guard, &mut disk).map_err(|err| StoreError::Io(err.to_string()))?;
    let outcome = backup.step(-1).map_err(|err| StoreError::Io(err.to_string()))?;
    if !matches!(outcome, StepResult::Done) {
        return Err(StoreError::Io("snapshot write did not complete".to_string()));
    }
    Ok(())
}

/// Counts rows in the enrollment table.
fn count_rows(conn: &Connection) -> Result<i64, StoreError> {
    conn.query_row("SELECT COUNT(*) FROM enrollments", [], |row| row.get(0))
        .map_err(|err| StoreError::Query(err.to_string()))
}

// ============================================================================
// SECTION: Row Codec
// ============================================================================

/// Raw column values read from one enrollment row.
struct RawRow {
    /// Enrollment id column.
    id: String,
    /// Source queue column.
    queue: String,
    /// Webhook target URL column.
    target_url: String,
    /// Serialized subscription arguments column, nullable.
    subscription_args: Option<String>,
    /// Creation timestamp column, RFC 3339 text.
    created_at: String,
    /// Last-update timestamp column, RFC 3339 text.
    updated_at: String,
}

/// Reads one row into its raw column values.
fn read_raw_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        id: row.get(0)?,
        queue: row.get(1)?,
        target_url: row.get(2)?,
        subscription_args: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

/// Converts raw column values into an [`Enrollment`].
///
/// A `subscription_args` cell that fails to parse degrades to an empty
/// map; a timestamp that fails to parse is a corrupt row.
fn decode_row(raw: RawRow) -> Result<Enrollment, StoreError> {
    let subscription_args = raw
        .subscription_args
        .as_deref()
        .and_then(|text| serde_json::from_str::<SubscriptionArgs>(text).ok())
        .unwrap_or_default();
    Ok(Enrollment {
        id: EnrollmentId::new(raw.id),
        queue: raw.queue,
        target_url: raw.target_url,
        subscription_args,
        created_at: parse_timestamp(&raw.created_at)?,
        updated_at: parse_timestamp(&raw.updated_at)?,
    })
}

/// Formats a timestamp as RFC 3339 text for storage.
fn format_timestamp(value: OffsetDateTime) -> Result<String, StoreError> {
    value
        .format(&Rfc3339)
        .map_err(|err| StoreError::Query(err.to_string()))
}

/// Parses an RFC 3339 timestamp read back from storage.
fn parse_timestamp(raw: &str) -> Result<OffsetDateTime, StoreError> {
    OffsetDateTime::parse(raw, &Rfc3339)
        .map_err(|err| StoreError::Corrupt(format!("invalid stored timestamp: {err}")))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
