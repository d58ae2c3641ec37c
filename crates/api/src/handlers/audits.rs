//! Handler for the command audit trail (`/audits`).

use axum::extract::{Query, State};
use axum::Json;
use savings_core::permissions::ENTITY_AUDIT;
use savings_db::models::command_source::{CommandSource, CommandSourceQuery};
use savings_db::repositories::CommandSourceRepo;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequirePermission;
use crate::response::Page;
use crate::state::AppState;

/// GET /api/v1/audits
///
/// Processed commands, newest first. Filters: `actionName`, `entityName`,
/// `resourceId`, `makerId`; paging: `offset`, `limit`.
pub async fn list(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(mut params): Query<CommandSourceQuery>,
) -> AppResult<Json<Page<CommandSource>>> {
    auth.require_read(ENTITY_AUDIT)?;
    params.action_name = params.action_name.map(|a| a.trim().to_ascii_uppercase());
    params.entity_name = params.entity_name.map(|e| e.trim().to_ascii_uppercase());

    let total = CommandSourceRepo::count(&state.pool, &params).await?;
    let items = CommandSourceRepo::query(&state.pool, &params).await?;
    Ok(Json(Page {
        total_filtered_records: total,
        page_items: items,
    }))
}
