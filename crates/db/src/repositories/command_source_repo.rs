//! Repository for the `command_sources` audit table.

use sqlx::{PgConnection, PgPool};
use savings_core::listing::{clamp_limit, clamp_offset, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};

use crate::models::command_source::{CommandSource, CommandSourceQuery, CreateCommandSource};

const COLUMNS: &str = "\
    id, action_name, entity_name, resource_id, sub_resource_id, href, command_json, \
    maker_id, made_on, integrity_hash, created_at, updated_at";

pub struct CommandSourceRepo;

impl CommandSourceRepo {
    /// Record a command inside the transaction that applied it.
    pub async fn create(
        conn: &mut PgConnection,
        input: &CreateCommandSource,
    ) -> Result<CommandSource, sqlx::Error> {
        let query = format!(
            "INSERT INTO command_sources
                (action_name, entity_name, resource_id, sub_resource_id, href, command_json,
                 maker_id, integrity_hash)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CommandSource>(&query)
            .bind(&input.action_name)
            .bind(&input.entity_name)
            .bind(input.resource_id)
            .bind(input.sub_resource_id)
            .bind(&input.href)
            .bind(&input.command_json)
            .bind(input.maker_id)
            .bind(&input.integrity_hash)
            .fetch_one(&mut *conn)
            .await
    }

    /// Integrity hash of the most recent entry, locking the table against
    /// concurrent appends so the chain stays linear.
    pub async fn find_last_hash(conn: &mut PgConnection) -> Result<Option<String>, sqlx::Error> {
        sqlx::query("LOCK TABLE command_sources IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *conn)
            .await?;
        sqlx::query_scalar::<_, String>(
            "SELECT integrity_hash FROM command_sources ORDER BY id DESC LIMIT 1",
        )
        .fetch_optional(&mut *conn)
        .await
    }

    /// Entries matching `params`, newest first.
    pub async fn query(
        pool: &PgPool,
        params: &CommandSourceQuery,
    ) -> Result<Vec<CommandSource>, sqlx::Error> {
        let limit = clamp_limit(params.limit, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT);
        let offset = clamp_offset(params.offset);
        let query = format!(
            "SELECT {COLUMNS} FROM command_sources
             WHERE ($1::TEXT IS NULL OR action_name = $1)
               AND ($2::TEXT IS NULL OR entity_name = $2)
               AND ($3::BIGINT IS NULL OR resource_id = $3)
               AND ($4::BIGINT IS NULL OR maker_id = $4)
             ORDER BY id DESC
             LIMIT $5 OFFSET $6"
        );
        sqlx::query_as::<_, CommandSource>(&query)
            .bind(params.action_name.as_deref().map(str::to_uppercase))
            .bind(params.entity_name.as_deref().map(str::to_uppercase))
            .bind(params.resource_id)
            .bind(params.maker_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Count entries matching `params` (ignores paging).
    pub async fn count(pool: &PgPool, params: &CommandSourceQuery) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*)::BIGINT FROM command_sources
             WHERE ($1::TEXT IS NULL OR action_name = $1)
               AND ($2::TEXT IS NULL OR entity_name = $2)
               AND ($3::BIGINT IS NULL OR resource_id = $3)
               AND ($4::BIGINT IS NULL OR maker_id = $4)",
        )
        .bind(params.action_name.as_deref().map(str::to_uppercase))
        .bind(params.entity_name.as_deref().map(str::to_uppercase))
        .bind(params.resource_id)
        .bind(params.maker_id)
        .fetch_one(pool)
        .await
    }
}
