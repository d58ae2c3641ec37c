//! Handlers for charge definitions (`/charges`).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use savings_core::charges::ChargeDefinition;
use savings_core::permissions::ENTITY_CHARGE;
use savings_core::types::DbId;
use savings_db::models::charge::UpdateCharge;
use savings_db::repositories::ChargeRepo;
use serde_json::{json, Value};

use crate::commands::CommandWrapper;
use crate::error::AppResult;
use crate::extract::JsonBody;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequirePermission;
use crate::services::charges;
use crate::state::AppState;
use crate::views::charge_options;

fn charge_command(action: &str, id: Option<DbId>, json: Value) -> CommandWrapper {
    match id {
        Some(id) => CommandWrapper::new(action, ENTITY_CHARGE)
            .with_entity_id(id)
            .with_href(format!("/charges/{id}")),
        None => CommandWrapper::new(action, ENTITY_CHARGE).with_href("/charges"),
    }
    .with_json(json)
}

/// GET /api/v1/charges
pub async fn list(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<ChargeDefinition>>> {
    auth.require_read(ENTITY_CHARGE)?;
    let items = ChargeRepo::list(&state.pool)
        .await?
        .iter()
        .map(|c| c.to_definition())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(items))
}

/// GET /api/v1/charges/template
pub async fn template(auth: AuthUser) -> AppResult<Json<Value>> {
    auth.require_read(ENTITY_CHARGE)?;
    Ok(Json(Value::Object(charge_options())))
}

/// GET /api/v1/charges/{id}
pub async fn get(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<ChargeDefinition>> {
    auth.require_read(ENTITY_CHARGE)?;
    let charge = charges::find_charge(&state.pool, id).await?;
    Ok(Json(charge.to_definition()?))
}

/// POST /api/v1/charges
pub async fn create(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(def, json): JsonBody<ChargeDefinition>,
) -> AppResult<impl IntoResponse> {
    let command = charge_command("CREATE", None, json);
    command.authorize(&auth)?;
    let result = charges::create_charge(&state.pool, &command, def, auth.user_id).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// PUT /api/v1/charges/{id}
pub async fn update(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    JsonBody(input, json): JsonBody<UpdateCharge>,
) -> AppResult<impl IntoResponse> {
    let command = charge_command("UPDATE", Some(id), json);
    command.authorize(&auth)?;
    let result = charges::update_charge(&state.pool, id, &command, &input, auth.user_id).await?;
    Ok(Json(result))
}

/// DELETE /api/v1/charges/{id}
pub async fn delete(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let command = charge_command("DELETE", Some(id), json!({}));
    command.authorize(&auth)?;
    let result = charges::delete_charge(&state.pool, id, &command, auth.user_id).await?;
    Ok(Json(result))
}
