//! Route definitions for `/authentication`.

use axum::routing::post;
use axum::Router;

use crate::handlers::auth;
use crate::state::AppState;

/// Routes mounted at `/authentication`.
///
/// ```text
/// POST /    -> login (public)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(auth::login))
}
