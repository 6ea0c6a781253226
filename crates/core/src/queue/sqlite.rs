//! SQLite-backed job queue.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use super::{Delivery, JobQueue, QueueError};

fn db_err(e: rusqlite::Error) -> QueueError {
    QueueError::Unavailable(e.to_string())
}

/// Durable queue stored in a SQLite table.
///
/// A receive leases the oldest visible row by pushing its `visible_at` into
/// the future. Acking deletes the row; an expired lease makes it visible again.
/// Several processes may share one database file.
pub struct SqliteQueue {
    conn: Mutex<Connection>,
    visibility_timeout: Duration,
}

impl SqliteQueue {
    pub fn new(path: &Path, visibility_timeout: Duration) -> Result<Self, QueueError> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            visibility_timeout,
        })
    }

    pub fn in_memory(visibility_timeout: Duration) -> Result<Self, QueueError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            visibility_timeout,
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), QueueError> {
        conn.busy_timeout(Duration::from_secs(5)).map_err(db_err)?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS queue_messages (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                payload BLOB NOT NULL,
                attempts INTEGER NOT NULL DEFAULT 0,
                visible_at INTEGER NOT NULL,
                published_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_queue_messages_visible_at
                ON queue_messages(visible_at);
            "#,
        )
        .map_err(db_err)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, QueueError> {
        self.conn
            .lock()
            .map_err(|e| QueueError::Unavailable(format!("lock poisoned: {e}")))
    }
}

#[async_trait]
impl JobQueue for SqliteQueue {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn publish(&self, payload: Vec<u8>) -> Result<String, QueueError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        self.lock()?
            .execute(
                "INSERT INTO queue_messages (id, payload, visible_at, published_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id, payload, now.timestamp_millis(), now.to_rfc3339()],
            )
            .map_err(db_err)?;

        Ok(id)
    }

    async fn receive(&self) -> Result<Option<Delivery>, QueueError> {
        let mut conn = self.lock()?;
        let now = Utc::now().timestamp_millis();
        let lease_until = now + self.visibility_timeout.as_millis() as i64;

        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_err)?;

        let row: Option<(i64, String, Vec<u8>, u32)> = tx
            .query_row(
                "SELECT seq, id, payload, attempts FROM queue_messages
                 WHERE visible_at <= ?1
                 ORDER BY seq
                 LIMIT 1",
                params![now],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()
            .map_err(db_err)?;

        let Some((seq, message_id, payload, attempts)) = row else {
            return Ok(None);
        };

        tx.execute(
            "UPDATE queue_messages SET attempts = attempts + 1, visible_at = ?1 WHERE seq = ?2",
            params![lease_until, seq],
        )
        .map_err(db_err)?;
        tx.commit().map_err(db_err)?;

        Ok(Some(Delivery {
            message_id,
            payload,
            attempt: attempts + 1,
        }))
    }

    async fn ack(&self, message_id: &str) -> Result<(), QueueError> {
        let deleted = self
            .lock()?
            .execute(
                "DELETE FROM queue_messages WHERE id = ?1",
                params![message_id],
            )
            .map_err(db_err)?;

        if deleted == 0 {
            return Err(QueueError::UnknownMessage(message_id.to_string()));
        }
        Ok(())
    }

    async fn nack(&self, message_id: &str) -> Result<(), QueueError> {
        let updated = self
            .lock()?
            .execute(
                "UPDATE queue_messages SET visible_at = ?1 WHERE id = ?2",
                params![Utc::now().timestamp_millis(), message_id],
            )
            .map_err(db_err)?;

        if updated == 0 {
            return Err(QueueError::UnknownMessage(message_id.to_string()));
        }
        Ok(())
    }

    async fn extend(&self, message_id: &str) -> Result<(), QueueError> {
        let now = Utc::now().timestamp_millis();
        let updated = self
            .lock()?
            .execute(
                "UPDATE queue_messages SET visible_at = ?1 WHERE id = ?2 AND visible_at > ?3",
                params![
                    now + self.visibility_timeout.as_millis() as i64,
                    message_id,
                    now
                ],
            )
            .map_err(db_err)?;

        if updated == 0 {
            return Err(QueueError::UnknownMessage(message_id.to_string()));
        }
        Ok(())
    }

    fn visibility_timeout(&self) -> Duration {
        self.visibility_timeout
    }

    async fn depth(&self) -> Result<usize, QueueError> {
        let count: i64 = self
            .lock()?
            .query_row("SELECT COUNT(*) FROM queue_messages", [], |row| row.get(0))
            .map_err(db_err)?;
        Ok(count.max(0) as usize)
    }
}
