//! Document handlers - the per-user task collection.

use crate::db;
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;
use tasklist_engine::{FieldUpdate, RawDocument, TaskDocument};

/// Response for listing a collection.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse {
    pub documents: Vec<RawDocument>,
}

/// Every document in the user's collection.
pub async fn handle_list(pool: &PgPool, user_id: &str) -> Result<ListResponse> {
    let documents = db::list_documents(pool, user_id)
        .await?
        .into_iter()
        .map(db::StoredDocument::into_raw)
        .collect::<Vec<_>>();

    tracing::debug!(user_id = %user_id, count = documents.len(), "Listed documents");
    Ok(ListResponse { documents })
}

/// Write a whole document under `task_id`.
pub async fn handle_put(
    pool: &PgPool,
    user_id: &str,
    task_id: &str,
    document: TaskDocument,
) -> Result<()> {
    check_document(task_id, &document)?;

    let data = serde_json::to_value(&document).map_err(|e| AppError::Internal(e.to_string()))?;
    db::upsert_document(pool, user_id, task_id, &data).await?;

    tracing::info!(user_id = %user_id, task_id = %task_id, "Document written");
    Ok(())
}

/// Update one field of an existing document.
pub async fn handle_patch(
    pool: &PgPool,
    user_id: &str,
    task_id: &str,
    update: FieldUpdate,
) -> Result<()> {
    let found =
        db::update_document_field(pool, user_id, task_id, update.field(), &field_value(&update))
            .await?;
    if !found {
        return Err(AppError::NotFound(format!("document {task_id}")));
    }

    tracing::info!(user_id = %user_id, task_id = %task_id, field = update.field(), "Document updated");
    Ok(())
}

/// Remove a document. Removing a missing document succeeds.
pub async fn handle_delete(pool: &PgPool, user_id: &str, task_id: &str) -> Result<()> {
    let existed = db::delete_document(pool, user_id, task_id).await?;
    tracing::info!(user_id = %user_id, task_id = %task_id, existed, "Document deleted");
    Ok(())
}

/// The body's id must name the document it is written to.
pub fn check_document(task_id: &str, document: &TaskDocument) -> Result<()> {
    if document.id != task_id {
        return Err(AppError::BadRequest(format!(
            "document id '{}' does not match path '{}'",
            document.id, task_id
        )));
    }
    Ok(())
}

/// JSON value stored for a field update.
pub fn field_value(update: &FieldUpdate) -> Value {
    match update {
        FieldUpdate::Title(title) => Value::from(title.as_str()),
        FieldUpdate::IsDone(is_done) => Value::from(*is_done),
    }
}
