//! Charge definitions (`/charges`).

use savings_core::charges::ChargeDefinition;
use savings_core::error::CoreError;
use savings_core::types::DbId;
use savings_db::models::charge::{Charge, UpdateCharge};
use savings_db::repositories::ChargeRepo;
use sqlx::PgPool;

use crate::commands::{self, CommandProcessingResult, CommandWrapper};
use crate::error::AppResult;

pub async fn find_charge(pool: &PgPool, id: DbId) -> AppResult<Charge> {
    Ok(ChargeRepo::find_by_id(pool, id)
        .await?
        .ok_or(CoreError::NotFound { entity: "Charge", id })?)
}

pub async fn create_charge(
    pool: &PgPool,
    command: &CommandWrapper,
    mut def: ChargeDefinition,
    user_id: DbId,
) -> AppResult<CommandProcessingResult> {
    def.id = None;
    def.currency_code = def.currency_code.trim().to_ascii_uppercase();
    def.validate()?;

    let mut tx = pool.begin().await?;
    let charge = ChargeRepo::create(&mut tx, &def).await?;
    let result = CommandProcessingResult::resource(charge.id);
    commands::record(&mut tx, command, &result, user_id).await?;
    tx.commit().await?;

    tracing::info!(charge_id = charge.id, name = %charge.name, "Charge created");
    Ok(result)
}

pub async fn update_charge(
    pool: &PgPool,
    id: DbId,
    command: &CommandWrapper,
    input: &UpdateCharge,
    user_id: DbId,
) -> AppResult<CommandProcessingResult> {
    let mut def = find_charge(pool, id).await?.to_definition()?;
    input.apply_to(&mut def);
    def.validate()?;

    let mut tx = pool.begin().await?;
    ChargeRepo::update(&mut tx, id, &def)
        .await?
        .ok_or(CoreError::NotFound { entity: "Charge", id })?;
    let mut result = CommandProcessingResult::resource(id);
    if let Some(changes) = command.json.as_object() {
        result.changes = changes.clone();
    }
    commands::record(&mut tx, command, &result, user_id).await?;
    tx.commit().await?;

    tracing::info!(charge_id = id, "Charge updated");
    Ok(result)
}

/// Delete a definition. Charges still attached to products or accounts
/// fail with a foreign-key conflict.
pub async fn delete_charge(
    pool: &PgPool,
    id: DbId,
    command: &CommandWrapper,
    user_id: DbId,
) -> AppResult<CommandProcessingResult> {
    let mut tx = pool.begin().await?;
    if !ChargeRepo::delete(&mut tx, id).await? {
        return Err(CoreError::NotFound { entity: "Charge", id }.into());
    }
    let result = CommandProcessingResult::resource(id);
    commands::record(&mut tx, command, &result, user_id).await?;
    tx.commit().await?;

    tracing::info!(charge_id = id, "Charge deleted");
    Ok(result)
}
