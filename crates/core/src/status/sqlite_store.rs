//! SQLite-backed status store.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::{
    JobState, JobStatus, StatusCounts, StatusError, StatusStore, StatusUpdate, WriteOutcome,
};

/// SQLite-backed status store.
///
/// The non-regression rule is enforced inside the UPSERT itself, so several
/// processes sharing one database file still cannot regress a terminal record.
pub struct SqliteStatusStore {
    conn: Mutex<Connection>,
}

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

impl SqliteStatusStore {
    /// Open (or create) the database file and its tables.
    pub fn new(path: &Path) -> Result<Self, StatusError> {
        let conn = Connection::open(path).map_err(|e| StatusError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, StatusError> {
        let conn =
            Connection::open_in_memory().map_err(|e| StatusError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StatusError> {
        // Other processes may hold the write lock on a shared file
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| StatusError::Database(e.to_string()))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS job_status (
                id TEXT PRIMARY KEY,
                state TEXT NOT NULL,
                output_url TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_job_status_state ON job_status(state);
            CREATE INDEX IF NOT EXISTS idx_job_status_updated_at ON job_status(updated_at);
            "#,
        )
        .map_err(|e| StatusError::Database(e.to_string()))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StatusError> {
        self.conn
            .lock()
            .map_err(|e| StatusError::Database(format!("lock poisoned: {e}")))
    }
}

impl StatusStore for SqliteStatusStore {
    fn put(&self, job_id: &str, update: StatusUpdate) -> Result<WriteOutcome, StatusError> {
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();

        // A terminal row is only overwritten by another terminal write.
        let changed = conn
            .execute(
                r#"
                INSERT INTO job_status (id, state, output_url, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?4)
                ON CONFLICT(id) DO UPDATE SET
                    state = excluded.state,
                    output_url = excluded.output_url,
                    updated_at = excluded.updated_at
                WHERE job_status.state NOT IN ('DONE', 'FAILED')
                   OR excluded.state IN ('DONE', 'FAILED')
                "#,
                params![job_id, update.state().as_str(), update.output_url(), now],
            )
            .map_err(|e| StatusError::Database(e.to_string()))?;

        if changed == 0 {
            Ok(WriteOutcome::Absorbed)
        } else {
            Ok(WriteOutcome::Applied)
        }
    }

    fn get(&self, job_id: &str) -> Result<JobStatus, StatusError> {
        let conn = self.lock()?;

        let row: Option<(String, Option<String>)> = conn
            .query_row(
                "SELECT state, output_url FROM job_status WHERE id = ?1",
                params![job_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|e| StatusError::Database(e.to_string()))?;

        match row {
            Some((state, output_url)) => Ok(JobStatus {
                state: state
                    .parse()
                    .map_err(|_| StatusError::Database(format!("corrupt state '{state}'")))?,
                output_url,
            }),
            None => Ok(JobStatus::unknown()),
        }
    }

    fn counts(&self) -> Result<StatusCounts, StatusError> {
        let conn = self.lock()?;

        let mut stmt = conn
            .prepare("SELECT state, COUNT(*) FROM job_status GROUP BY state")
            .map_err(|e| StatusError::Database(e.to_string()))?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
            .map_err(|e| StatusError::Database(e.to_string()))?;

        let mut counts = StatusCounts::default();
        for row in rows {
            let (state, n) = row.map_err(|e| StatusError::Database(e.to_string()))?;
            if let Ok(state) = state.parse::<JobState>() {
                counts.add(state, n.max(0) as u64);
            }
        }
        Ok(counts)
    }
}
