//! Audit trail of processed write commands (`command_sources` table).

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use savings_core::types::{DbId, Timestamp};

/// A row from the `command_sources` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandSource {
    pub id: DbId,
    pub action_name: String,
    pub entity_name: String,
    pub resource_id: Option<DbId>,
    pub sub_resource_id: Option<DbId>,
    pub href: String,
    pub command_json: serde_json::Value,
    pub maker_id: Option<DbId>,
    pub made_on: Timestamp,
    pub integrity_hash: String,
    #[serde(skip)]
    pub created_at: Timestamp,
    #[serde(skip)]
    pub updated_at: Timestamp,
}

/// DTO for recording a processed command. `integrity_hash` chains this
/// entry to the previous one.
#[derive(Debug, Clone)]
pub struct CreateCommandSource {
    pub action_name: String,
    pub entity_name: String,
    pub resource_id: Option<DbId>,
    pub sub_resource_id: Option<DbId>,
    pub href: String,
    pub command_json: serde_json::Value,
    pub maker_id: Option<DbId>,
    pub integrity_hash: String,
}

/// Query parameters for `GET /audits`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandSourceQuery {
    pub action_name: Option<String>,
    pub entity_name: Option<String>,
    pub resource_id: Option<DbId>,
    pub maker_id: Option<DbId>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
