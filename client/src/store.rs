//! Local store backed by SQLite.
//!
//! Holds the user's tasks and the outbox. The pool keeps exactly one
//! connection, so every statement runs on a single serialized context and
//! an in-memory database survives for the lifetime of the store.

use crate::error::Result;
use crate::outbox::{PendingKind, PendingWrite};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;
use tasklist_engine::{Changeset, Error as EngineError, Task, Timestamp};

/// SQLite integers are signed; timestamps past `i64::MAX` are clamped so
/// ordering by them stays correct.
fn to_sql_millis(millis: Timestamp) -> i64 {
    i64::try_from(millis).unwrap_or(i64::MAX)
}

fn from_sql_millis(millis: i64) -> Timestamp {
    Timestamp::try_from(millis).unwrap_or(0)
}

/// A stored task row.
#[derive(Debug)]
struct StoredTask {
    id: String,
    owner_id: String,
    title: String,
    created_at: i64,
    is_done: bool,
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for StoredTask {
    fn from_row(row: &'r SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(StoredTask {
            id: row.try_get("id")?,
            owner_id: row.try_get("owner_id")?,
            title: row.try_get("title")?,
            created_at: row.try_get("created_at")?,
            is_done: row.try_get("is_done")?,
        })
    }
}

impl StoredTask {
    fn into_task(self) -> Task {
        Task {
            id: self.id,
            owner_id: self.owner_id,
            title: self.title,
            created_at: from_sql_millis(self.created_at),
            is_done: self.is_done,
        }
    }
}

/// A stored outbox row.
#[derive(Debug)]
struct StoredPending {
    seq: i64,
    owner_id: String,
    task_id: String,
    kind: String,
    queued_at: i64,
    last_error: Option<String>,
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for StoredPending {
    fn from_row(row: &'r SqliteRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(StoredPending {
            seq: row.try_get("seq")?,
            owner_id: row.try_get("owner_id")?,
            task_id: row.try_get("task_id")?,
            kind: row.try_get("kind")?,
            queued_at: row.try_get("queued_at")?,
            last_error: row.try_get("last_error")?,
        })
    }
}

impl StoredPending {
    fn into_pending(self) -> Result<PendingWrite> {
        Ok(PendingWrite {
            seq: self.seq,
            owner_id: self.owner_id,
            task_id: self.task_id,
            kind: serde_json::from_str(&self.kind)?,
            queued_at: from_sql_millis(self.queued_at),
            last_error: self.last_error,
        })
    }
}

/// SQLite local store.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) a database file and run migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        tracing::debug!(path = %path.display(), "Opening local store");
        Self::connect(options).await
    }

    /// Open a private in-memory database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        Self::connect(options).await
    }

    async fn connect(options: SqliteConnectOptions) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Close the underlying pool. Later calls fail with a store error.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// All tasks of `owner`, oldest first.
    pub async fn tasks_for(&self, owner: &str) -> Result<Vec<Task>> {
        let rows = sqlx::query_as::<_, StoredTask>(
            r#"
            SELECT id, owner_id, title, created_at, is_done
            FROM tasks
            WHERE owner_id = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(StoredTask::into_task).collect())
    }

    /// A single task of `owner`.
    pub async fn get(&self, owner: &str, id: &str) -> Result<Option<Task>> {
        let row = sqlx::query_as::<_, StoredTask>(
            r#"
            SELECT id, owner_id, title, created_at, is_done
            FROM tasks
            WHERE owner_id = ? AND id = ?
            "#,
        )
        .bind(owner)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(StoredTask::into_task))
    }

    /// Number of tasks of `owner` with `id` (0 or 1).
    pub async fn count(&self, owner: &str, id: &str) -> Result<i64> {
        let result: (i64,) =
            sqlx::query_as(r#"SELECT COUNT(*) FROM tasks WHERE owner_id = ? AND id = ?"#)
                .bind(owner)
                .bind(id)
                .fetch_one(&self.pool)
                .await?;

        Ok(result.0)
    }

    /// Commit a changeset in one transaction.
    ///
    /// An insert colliding with an existing task, or an update/delete of a
    /// missing task, fails the whole commit and nothing is written.
    pub async fn commit(&self, changeset: &Changeset) -> Result<()> {
        if changeset.is_empty() {
            return Ok(());
        }
        changeset.validate_owner()?;

        let owner = changeset.owner_id.as_str();
        let mut tx = self.pool.begin().await?;

        for task in &changeset.inserts {
            sqlx::query(
                r#"
                INSERT INTO tasks (id, owner_id, title, created_at, is_done)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(&task.id)
            .bind(&task.owner_id)
            .bind(&task.title)
            .bind(to_sql_millis(task.created_at))
            .bind(task.is_done)
            .execute(&mut *tx)
            .await?;
        }

        for patch in &changeset.updates {
            let result = sqlx::query(
                r#"UPDATE tasks SET title = ?, is_done = ? WHERE owner_id = ? AND id = ?"#,
            )
            .bind(&patch.title)
            .bind(patch.is_done)
            .bind(owner)
            .bind(&patch.id)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(EngineError::TaskNotFound(patch.id.clone()).into());
            }
        }

        for id in &changeset.deletes {
            let result = sqlx::query(r#"DELETE FROM tasks WHERE owner_id = ? AND id = ?"#)
                .bind(owner)
                .bind(id)
                .execute(&mut *tx)
                .await?;

            if result.rows_affected() == 0 {
                return Err(EngineError::TaskNotFound(id.clone()).into());
            }
        }

        tx.commit().await?;

        tracing::debug!(
            owner = %owner,
            inserts = changeset.inserts.len(),
            updates = changeset.updates.len(),
            deletes = changeset.deletes.len(),
            "Local commit"
        );

        Ok(())
    }

    /// Queue a remote write. Returns its sequence number.
    pub async fn enqueue(
        &self,
        owner: &str,
        task_id: &str,
        kind: &PendingKind,
        queued_at: Timestamp,
        last_error: Option<&str>,
    ) -> Result<i64> {
        let kind = serde_json::to_string(kind)?;
        let result = sqlx::query(
            r#"
            INSERT INTO outbox (owner_id, task_id, kind, queued_at, last_error)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(owner)
        .bind(task_id)
        .bind(kind)
        .bind(to_sql_millis(queued_at))
        .bind(last_error)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Queued writes of `owner` in enqueue order.
    pub async fn pending(&self, owner: &str) -> Result<Vec<PendingWrite>> {
        let rows = sqlx::query_as::<_, StoredPending>(
            r#"
            SELECT seq, owner_id, task_id, kind, queued_at, last_error
            FROM outbox
            WHERE owner_id = ?
            ORDER BY seq ASC
            "#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(StoredPending::into_pending).collect()
    }

    /// Queued writes targeting one task, in enqueue order.
    pub async fn pending_for_task(&self, owner: &str, task_id: &str) -> Result<Vec<PendingWrite>> {
        let rows = sqlx::query_as::<_, StoredPending>(
            r#"
            SELECT seq, owner_id, task_id, kind, queued_at, last_error
            FROM outbox
            WHERE owner_id = ? AND task_id = ?
            ORDER BY seq ASC
            "#,
        )
        .bind(owner)
        .bind(task_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(StoredPending::into_pending).collect()
    }

    /// Drop every queued write targeting one task. Returns how many went.
    pub async fn discard_pending(&self, owner: &str, task_id: &str) -> Result<u64> {
        let result = sqlx::query(r#"DELETE FROM outbox WHERE owner_id = ? AND task_id = ?"#)
            .bind(owner)
            .bind(task_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Number of queued writes of `owner`.
    pub async fn pending_count(&self, owner: &str) -> Result<usize> {
        let result: (i64,) = sqlx::query_as(r#"SELECT COUNT(*) FROM outbox WHERE owner_id = ?"#)
            .bind(owner)
            .fetch_one(&self.pool)
            .await?;

        Ok(result.0 as usize)
    }

    /// Remove a queued write once it went through.
    pub async fn remove_pending(&self, seq: i64) -> Result<()> {
        sqlx::query(r#"DELETE FROM outbox WHERE seq = ?"#)
            .bind(seq)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Record the error of a failed replay.
    pub async fn mark_failed(&self, seq: i64, error: &str) -> Result<()> {
        sqlx::query(r#"UPDATE outbox SET last_error = ? WHERE seq = ?"#)
            .bind(error)
            .bind(seq)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
