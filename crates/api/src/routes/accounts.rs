//! Route definitions for the account resources.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{account_charges, accounts, imports, transactions};
use crate::kinds::AccountKind;
use crate::state::AppState;

/// Routes mounted at `/savingsaccounts`, `/fixeddepositaccounts` and
/// `/recurringdepositaccounts`.
///
/// ```text
/// GET    /                                        -> list
/// POST   /                                        -> submit
/// GET    /template                                -> new application template
/// GET    /downloadtemplate                        -> account import CSV header
/// POST   /uploadtemplate                          -> account import (multipart)
/// GET    /transactions/downloadtemplate           -> transaction import CSV header
/// POST   /transactions/uploadtemplate             -> transaction import (multipart)
/// GET    /{id}                                    -> get
/// PUT    /{id}                                    -> modify | ?command=updateWithHoldTax
/// POST   /{id}?command=                           -> lifecycle command
/// DELETE /{id}                                    -> delete application
/// GET    /{id}/transactions                       -> list transactions
/// POST   /{id}/transactions?command=              -> new transaction
/// GET    /{id}/transactions/template              -> transaction template
/// GET    /{id}/transactions/{tx_id}               -> get transaction
/// POST   /{id}/transactions/{tx_id}?command=      -> undo | modify | releaseAmount
/// GET    /{id}/charges                            -> list account charges
/// POST   /{id}/charges                            -> add charge
/// GET    /{id}/charges/template                   -> charge template
/// GET    /{id}/charges/{charge_id}                -> get charge
/// PUT    /{id}/charges/{charge_id}                -> update charge
/// DELETE /{id}/charges/{charge_id}                -> remove charge
/// POST   /{id}/charges/{charge_id}?command=       -> paycharge | waive | inactivate
/// ```
pub fn router<K: AccountKind>() -> Router<AppState> {
    Router::new()
        .route("/", get(accounts::list::<K>).post(accounts::submit::<K>))
        .route("/template", get(accounts::template::<K>))
        .route("/downloadtemplate", get(imports::download_accounts::<K>))
        .route("/uploadtemplate", post(imports::upload_accounts::<K>))
        .route(
            "/transactions/downloadtemplate",
            get(imports::download_transactions::<K>),
        )
        .route(
            "/transactions/uploadtemplate",
            post(imports::upload_transactions::<K>),
        )
        .route(
            "/{id}",
            get(accounts::get::<K>)
                .put(accounts::update::<K>)
                .post(accounts::command::<K>)
                .delete(accounts::delete::<K>),
        )
        .route(
            "/{id}/transactions",
            get(transactions::list::<K>).post(transactions::create::<K>),
        )
        .route(
            "/{id}/transactions/template",
            get(transactions::template::<K>),
        )
        .route(
            "/{id}/transactions/{transaction_id}",
            get(transactions::get::<K>).post(transactions::adjust::<K>),
        )
        .route(
            "/{id}/charges",
            get(account_charges::list::<K>).post(account_charges::add::<K>),
        )
        .route("/{id}/charges/template", get(account_charges::template::<K>))
        .route(
            "/{id}/charges/{charge_id}",
            get(account_charges::get::<K>)
                .put(account_charges::update::<K>)
                .post(account_charges::command::<K>)
                .delete(account_charges::delete::<K>),
        )
}

/// [`router`] plus the closure template served by fixed and recurring
/// deposit accounts.
///
/// ```text
/// GET    /{id}/template?command=close             -> closure template
/// ```
pub fn deposit_router<K: AccountKind>() -> Router<AppState> {
    router::<K>().route("/{id}/template", get(accounts::close_template::<K>))
}
