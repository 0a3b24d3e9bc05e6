//! Database operations for the documents table.

use serde_json::Value;
use sqlx::{PgPool, Row};
use tasklist_engine::RawDocument;

/// A stored document row from the database.
#[derive(Debug)]
pub struct StoredDocument {
    pub task_id: String,
    pub data: Value,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredDocument {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredDocument {
            task_id: row.try_get("task_id")?,
            data: row.try_get("data")?,
        })
    }
}

impl StoredDocument {
    /// Wire form keyed by the document's storage key.
    pub fn into_raw(self) -> RawDocument {
        RawDocument::new(self.task_id, self.data)
    }
}

/// All documents in the owner's collection.
pub async fn list_documents(
    pool: &PgPool,
    owner_id: &str,
) -> Result<Vec<StoredDocument>, sqlx::Error> {
    sqlx::query_as::<_, StoredDocument>(
        r#"
        SELECT task_id, data
        FROM documents
        WHERE owner_id = $1
        ORDER BY task_id ASC
        "#,
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await
}

/// Write a whole document, replacing any existing one.
pub async fn upsert_document(
    pool: &PgPool,
    owner_id: &str,
    task_id: &str,
    data: &Value,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO documents (owner_id, task_id, data)
        VALUES ($1, $2, $3)
        ON CONFLICT (owner_id, task_id) DO UPDATE SET
            data = EXCLUDED.data,
            updated_at = now()
        "#,
    )
    .bind(owner_id)
    .bind(task_id)
    .bind(data)
    .execute(pool)
    .await?;

    Ok(())
}

/// Set one top-level field of an existing document.
///
/// Returns `false` when the document does not exist.
pub async fn update_document_field(
    pool: &PgPool,
    owner_id: &str,
    task_id: &str,
    field: &str,
    value: &Value,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE documents
        SET data = jsonb_set(data, ARRAY[$3::text], $4, true),
            updated_at = now()
        WHERE owner_id = $1 AND task_id = $2
        "#,
    )
    .bind(owner_id)
    .bind(task_id)
    .bind(field)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Remove a document. Returns whether one existed.
pub async fn delete_document(
    pool: &PgPool,
    owner_id: &str,
    task_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(r#"DELETE FROM documents WHERE owner_id = $1 AND task_id = $2"#)
        .bind(owner_id)
        .bind(task_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
