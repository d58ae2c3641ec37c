//! Route definitions for the `/charges` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::charges;
use crate::state::AppState;

/// Routes mounted at `/charges`.
///
/// ```text
/// GET    /            -> list
/// POST   /            -> create
/// GET    /template    -> template
/// GET    /{id}        -> get
/// PUT    /{id}        -> update
/// DELETE /{id}        -> delete
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(charges::list).post(charges::create))
        .route("/template", get(charges::template))
        .route(
            "/{id}",
            get(charges::get).put(charges::update).delete(charges::delete),
        )
}
