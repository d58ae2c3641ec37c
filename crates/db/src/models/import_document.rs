//! Bulk import runs (`import_documents` table).

use serde::Serialize;
use sqlx::FromRow;
use savings_core::types::{DbId, Timestamp};

/// A row from the `import_documents` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportDocument {
    pub id: DbId,
    pub entity_type: String,
    pub file_name: String,
    pub total_records: i32,
    pub success_count: i32,
    pub failure_count: i32,
    /// `[{"row": n, "error": "..."}]` for every rejected row.
    pub errors: serde_json::Value,
    pub completed: bool,
    pub created_by: Option<DbId>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Final tallies of an import run.
#[derive(Debug, Clone, Default)]
pub struct ImportOutcome {
    pub total_records: i32,
    pub success_count: i32,
    pub failure_count: i32,
    pub errors: serde_json::Value,
}
