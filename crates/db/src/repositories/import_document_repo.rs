//! Repository for the `import_documents` table.

use sqlx::PgPool;
use savings_core::types::DbId;

use crate::models::import_document::{ImportDocument, ImportOutcome};

const COLUMNS: &str = "id, entity_type, file_name, total_records, success_count, failure_count, \
                       errors, completed, created_by, completed_at, created_at, updated_at";

pub struct ImportDocumentRepo;

impl ImportDocumentRepo {
    /// Register a new, not yet completed import run.
    pub async fn create(
        pool: &PgPool,
        entity_type: &str,
        file_name: &str,
        created_by: Option<DbId>,
    ) -> Result<ImportDocument, sqlx::Error> {
        let query = format!(
            "INSERT INTO import_documents (entity_type, file_name, created_by)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportDocument>(&query)
            .bind(entity_type)
            .bind(file_name)
            .bind(created_by)
            .fetch_one(pool)
            .await
    }

    /// Record the outcome and mark the run completed.
    pub async fn complete(
        pool: &PgPool,
        id: DbId,
        outcome: &ImportOutcome,
    ) -> Result<Option<ImportDocument>, sqlx::Error> {
        let query = format!(
            "UPDATE import_documents SET
                total_records = $2, success_count = $3, failure_count = $4, errors = $5,
                completed = TRUE, completed_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportDocument>(&query)
            .bind(id)
            .bind(outcome.total_records)
            .bind(outcome.success_count)
            .bind(outcome.failure_count)
            .bind(&outcome.errors)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ImportDocument>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM import_documents WHERE id = $1");
        sqlx::query_as::<_, ImportDocument>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
