pub mod accounts;
pub mod audits;
pub mod auth;
pub mod charges;
pub mod health;
pub mod products;

use axum::Router;

use crate::kinds::{FixedDeposit, RecurringDeposit, Savings};
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /authentication                                  login (public)
///
/// /savingsproducts                                 list, create
/// /savingsproducts/template                        option lists
/// /savingsproducts/{id}                            get, update, delete
/// /fixeddepositproducts[...]                       same shape, plus charts
/// /recurringdepositproducts[...]                   same shape, plus charts
///
/// /charges                                         list, create
/// /charges/template                                option lists
/// /charges/{id}                                    get, update, delete
///
/// /savingsaccounts                                 list, submit
/// /savingsaccounts/template                        new application template
/// /savingsaccounts/downloadtemplate                account import header (CSV)
/// /savingsaccounts/uploadtemplate                  account import (multipart)
/// /savingsaccounts/transactions/downloadtemplate   transaction import header (CSV)
/// /savingsaccounts/transactions/uploadtemplate     transaction import (multipart)
/// /savingsaccounts/{id}                            get, modify, ?command=, delete
/// /savingsaccounts/{id}/transactions               list, ?command=deposit|withdrawal|...
/// /savingsaccounts/{id}/transactions/template      transaction template
/// /savingsaccounts/{id}/transactions/{tx_id}       get, ?command=undo|modify|releaseAmount
/// /savingsaccounts/{id}/charges                    list, add
/// /savingsaccounts/{id}/charges/template           charge template
/// /savingsaccounts/{id}/charges/{charge_id}        get, update, remove, ?command=
///
/// /fixeddepositaccounts[...]                       same shape as savings accounts
/// /fixeddepositaccounts/{id}/template?command=close
/// /recurringdepositaccounts[...]                   same shape as savings accounts
/// /recurringdepositaccounts/{id}/template?command=close
///
/// /imports/{id}                                    import document status
/// /audits                                          command audit trail
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/authentication", auth::router())
        // Product definitions.
        .nest("/savingsproducts", products::router::<Savings>())
        .nest("/fixeddepositproducts", products::router::<FixedDeposit>())
        .nest(
            "/recurringdepositproducts",
            products::router::<RecurringDeposit>(),
        )
        .nest("/charges", charges::router())
        // Accounts with their transactions, charges and bulk import.
        .nest("/savingsaccounts", accounts::router::<Savings>())
        .nest(
            "/fixeddepositaccounts",
            accounts::deposit_router::<FixedDeposit>(),
        )
        .nest(
            "/recurringdepositaccounts",
            accounts::deposit_router::<RecurringDeposit>(),
        )
        .nest("/imports", audits::imports_router())
        .nest("/audits", audits::router())
}
