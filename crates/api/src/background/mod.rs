//! Long-running background tasks spawned at startup.
//!
//! Each task runs on a fixed interval until its `CancellationToken` is
//! triggered during graceful shutdown.

pub mod deposit_maturity;
pub mod interest_posting;

use savings_core::account::SavingsAccount;
use savings_core::enums::DepositAccountType;
use savings_core::error::CoreError;
use savings_core::types::DbId;
use savings_db::repositories::SavingsAccountRepo;

use crate::error::{AppResult, CONCURRENT_MODIFICATION};
use crate::services::account_tx::lock_account;
use crate::state::AppState;

/// Lock one account, apply `step` and save it when `step` reports a change.
///
/// Returns whether the account was saved. Jobs write with no maker id.
pub(crate) async fn process_account<F>(
    state: &AppState,
    deposit_type: DepositAccountType,
    id: DbId,
    step: F,
) -> AppResult<bool>
where
    F: FnOnce(&mut SavingsAccount) -> AppResult<bool>,
{
    let mut tx = state.pool.begin().await?;
    let mut account = lock_account(&mut *tx, deposit_type, id, state.config.posting).await?;
    if !step(&mut account)? {
        return Ok(false);
    }
    if !SavingsAccountRepo::save(&mut *tx, &mut account, None).await? {
        return Err(CoreError::DataIntegrity(CONCURRENT_MODIFICATION.into()).into());
    }
    tx.commit().await?;
    Ok(true)
}
