//! Command envelopes and the audit trail of processed writes.
//!
//! Every write endpoint describes its request as a [`CommandWrapper`],
//! checks the caller's permission for it, applies it inside one database
//! transaction and records it in `command_sources` in that same transaction.
//! Audit entries are hash-chained: each stores
//! `sha256(previous_hash | action | entity | resource | sub-resource | json)`.

use savings_core::account::SavingsAccount;
use savings_core::types::DbId;
use savings_db::models::command_source::CreateCommandSource;
use savings_db::repositories::CommandSourceRepo;
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use sqlx::PgConnection;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequirePermission;

/// A write request: the action, its target and its JSON payload.
#[derive(Debug, Clone)]
pub struct CommandWrapper {
    pub action: String,
    pub entity: String,
    pub entity_id: Option<DbId>,
    pub sub_entity_id: Option<DbId>,
    pub href: String,
    pub json: Value,
}

impl CommandWrapper {
    pub fn new(action: &str, entity: &str) -> Self {
        Self {
            action: action.to_ascii_uppercase(),
            entity: entity.to_ascii_uppercase(),
            entity_id: None,
            sub_entity_id: None,
            href: String::new(),
            json: Value::Object(Map::new()),
        }
    }

    pub fn with_entity_id(mut self, id: DbId) -> Self {
        self.entity_id = Some(id);
        self
    }

    pub fn with_sub_entity_id(mut self, id: DbId) -> Self {
        self.sub_entity_id = Some(id);
        self
    }

    pub fn with_href(mut self, href: impl Into<String>) -> Self {
        self.href = href.into();
        self
    }

    pub fn with_json(mut self, json: Value) -> Self {
        self.json = json;
        self
    }

    /// Reject unless `user` may perform this command.
    pub fn authorize(&self, user: &AuthUser) -> AppResult<()> {
        user.require_permission(&self.action, &self.entity)
    }
}

/// Outcome of a processed command, returned as the response body.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandProcessingResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<DbId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub savings_id: Option<DbId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<DbId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<DbId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_resource_id: Option<DbId>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub changes: Map<String, Value>,
}

impl CommandProcessingResult {
    pub fn resource(id: DbId) -> Self {
        Self {
            resource_id: Some(id),
            ..Self::default()
        }
    }

    /// Result naming `account` as the resource.
    pub fn for_account(account: &SavingsAccount) -> Self {
        Self {
            resource_id: account.id,
            savings_id: account.id,
            client_id: account.client_id,
            group_id: account.group_id,
            ..Self::default()
        }
    }

    pub fn with_sub_resource(mut self, id: Option<DbId>) -> Self {
        self.sub_resource_id = id;
        self
    }

    pub fn with_change(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.changes.insert(key.to_string(), value.into());
        self
    }
}

/// Chain hash of an audit entry.
pub fn integrity_hash(
    previous: Option<&str>,
    command: &CommandWrapper,
    resource_id: Option<DbId>,
    sub_resource_id: Option<DbId>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(previous.unwrap_or_default().as_bytes());
    let parts: [String; 5] = [
        command.action.clone(),
        command.entity.clone(),
        resource_id.map(|id| id.to_string()).unwrap_or_default(),
        sub_resource_id.map(|id| id.to_string()).unwrap_or_default(),
        command.json.to_string(),
    ];
    for part in &parts {
        hasher.update(b"|");
        hasher.update(part.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Record a processed command on the connection that applied it.
pub async fn record(
    conn: &mut PgConnection,
    command: &CommandWrapper,
    result: &CommandProcessingResult,
    maker_id: DbId,
) -> AppResult<()> {
    let resource_id = result.resource_id.or(command.entity_id);
    let sub_resource_id = result.sub_resource_id.or(command.sub_entity_id);
    let previous = CommandSourceRepo::find_last_hash(conn).await?;
    let hash = integrity_hash(previous.as_deref(), command, resource_id, sub_resource_id);

    CommandSourceRepo::create(
        conn,
        &CreateCommandSource {
            action_name: command.action.clone(),
            entity_name: command.entity.clone(),
            resource_id,
            sub_resource_id,
            href: command.href.clone(),
            command_json: command.json.clone(),
            maker_id: Some(maker_id),
            integrity_hash: hash,
        },
    )
    .await?;

    tracing::info!(
        action = %command.action,
        entity = %command.entity,
        resource_id = ?resource_id,
        maker_id,
        "Command processed"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn approve() -> CommandWrapper {
        CommandWrapper::new("approve", "savingsaccount")
            .with_entity_id(7)
            .with_href("/savingsaccounts/7?command=approve")
            .with_json(json!({"approvedOnDate": "2024-01-02"}))
    }

    #[test]
    fn wrapper_uppercases_action_and_entity() {
        let cmd = approve();
        assert_eq!(cmd.action, "APPROVE");
        assert_eq!(cmd.entity, "SAVINGSACCOUNT");
        assert_eq!(cmd.entity_id, Some(7));
    }

    #[test]
    fn hash_is_stable_and_chained() {
        let cmd = approve();
        let first = integrity_hash(None, &cmd, Some(7), None);
        assert_eq!(first, integrity_hash(None, &cmd, Some(7), None));
        assert_eq!(first.len(), 64);

        let chained = integrity_hash(Some(&first), &cmd, Some(7), None);
        assert_ne!(first, chained);
    }

    #[test]
    fn hash_covers_the_payload() {
        let cmd = approve();
        let mut altered = cmd.clone();
        altered.json = json!({"approvedOnDate": "2024-01-03"});
        assert_ne!(
            integrity_hash(None, &cmd, Some(7), None),
            integrity_hash(None, &altered, Some(7), None)
        );
    }

    #[test]
    fn result_omits_empty_fields() {
        let result = CommandProcessingResult::resource(3).with_change("status", "Approved");
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"resourceId": 3, "changes": {"status": "Approved"}})
        );
    }
}
