//! Route definitions for the product resources.

use axum::routing::get;
use axum::Router;

use crate::handlers::products;
use crate::kinds::AccountKind;
use crate::state::AppState;

/// Routes mounted at `/savingsproducts`, `/fixeddepositproducts` and
/// `/recurringdepositproducts`.
///
/// ```text
/// GET    /            -> list
/// POST   /            -> create
/// GET    /template    -> template
/// GET    /{id}        -> get
/// PUT    /{id}        -> update
/// DELETE /{id}        -> delete
/// ```
pub fn router<K: AccountKind>() -> Router<AppState> {
    Router::new()
        .route("/", get(products::list::<K>).post(products::create::<K>))
        .route("/template", get(products::template::<K>))
        .route(
            "/{id}",
            get(products::get::<K>)
                .put(products::update::<K>)
                .delete(products::delete::<K>),
        )
}
