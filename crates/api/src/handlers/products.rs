//! Handlers for savings, fixed deposit and recurring deposit products.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use savings_core::types::DbId;
use savings_db::models::product::{CreateProduct, UpdateProduct};
use savings_db::repositories::{ChargeRepo, ProductRepo};
use serde_json::{json, Value};

use crate::commands::CommandWrapper;
use crate::error::AppResult;
use crate::extract::JsonBody;
use crate::kinds::AccountKind;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequirePermission;
use crate::services::products;
use crate::state::AppState;
use crate::views::{self, term_options, ProductData};

fn product_command<K: AccountKind>(action: &str, id: Option<DbId>, json: Value) -> CommandWrapper {
    let href = match id {
        Some(id) => format!("/{}/{id}", K::PRODUCTS_PATH),
        None => format!("/{}", K::PRODUCTS_PATH),
    };
    let command = CommandWrapper::new(action, K::PRODUCT_ENTITY)
        .with_href(href)
        .with_json(json);
    match id {
        Some(id) => command.with_entity_id(id),
        None => command,
    }
}

/// GET /api/v1/{products}
pub async fn list<K: AccountKind>(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<ProductData>>> {
    auth.require_read(K::PRODUCT_ENTITY)?;
    let rows = ProductRepo::list(&state.pool, K::TYPE).await?;
    let mut items = Vec::with_capacity(rows.len());
    for product in &rows {
        items.push(products::product_view(&state.pool, product).await?);
    }
    Ok(Json(items))
}

/// GET /api/v1/{products}/template
///
/// Option lists for the product form plus the active charges in any currency.
pub async fn template<K: AccountKind>(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Value>> {
    auth.require_read(K::PRODUCT_ENTITY)?;
    let charges = ChargeRepo::list(&state.pool)
        .await?
        .iter()
        .filter(|c| c.active)
        .map(|c| c.to_definition())
        .collect::<Result<Vec<_>, _>>()?;

    let mut body = Value::Object(term_options(K::TYPE));
    views::insert(&mut body, "chargeOptions", json!(charges));
    Ok(Json(body))
}

/// GET /api/v1/{products}/{id}
pub async fn get<K: AccountKind>(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<ProductData>> {
    auth.require_read(K::PRODUCT_ENTITY)?;
    let product = products::find_product(&state.pool, K::TYPE, id).await?;
    Ok(Json(products::product_view(&state.pool, &product).await?))
}

/// POST /api/v1/{products}
pub async fn create<K: AccountKind>(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(input, json): JsonBody<CreateProduct>,
) -> AppResult<impl IntoResponse> {
    let command = product_command::<K>("CREATE", None, json);
    command.authorize(&auth)?;
    let result = products::create_product(&state.pool, K::TYPE, &command, &input, auth.user_id).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// PUT /api/v1/{products}/{id}
pub async fn update<K: AccountKind>(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    JsonBody(input, json): JsonBody<UpdateProduct>,
) -> AppResult<impl IntoResponse> {
    let command = product_command::<K>("UPDATE", Some(id), json);
    command.authorize(&auth)?;
    let result =
        products::update_product(&state.pool, K::TYPE, id, &command, &input, auth.user_id).await?;
    Ok(Json(result))
}

/// DELETE /api/v1/{products}/{id}
pub async fn delete<K: AccountKind>(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let command = product_command::<K>("DELETE", Some(id), json!({}));
    command.authorize(&auth)?;
    let result = products::delete_product(&state.pool, K::TYPE, id, &command, auth.user_id).await?;
    Ok(Json(result))
}
