//! Route definitions for `/audits` and `/imports`.

use axum::routing::get;
use axum::Router;

use crate::handlers::{audits, imports};
use crate::state::AppState;

/// Routes mounted at `/audits`.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(audits::list))
}

/// Routes mounted at `/imports`.
///
/// ```text
/// GET /{id}    -> import document status
/// ```
pub fn imports_router() -> Router<AppState> {
    Router::new().route("/{id}", get(imports::get_import))
}
