//! Unit of work around one locked account aggregate.

use savings_core::account::{PostingConfig, SavingsAccount};
use savings_core::enums::DepositAccountType;
use savings_core::error::CoreError;
use savings_core::types::DbId;
use savings_db::repositories::SavingsAccountRepo;
use sqlx::{PgConnection, Postgres, Transaction};

use crate::commands::{self, CommandProcessingResult, CommandWrapper};
use crate::error::{AppResult, CONCURRENT_MODIFICATION};
use crate::kinds::account_noun;
use crate::state::AppState;

/// An account loaded `FOR UPDATE` inside an open transaction.
///
/// Dropping it without [`AccountTx::commit`] rolls everything back.
pub struct AccountTx {
    tx: Transaction<'static, Postgres>,
    pub account: SavingsAccount,
}

impl AccountTx {
    pub async fn begin(
        state: &AppState,
        deposit_type: DepositAccountType,
        id: DbId,
    ) -> AppResult<Self> {
        let mut tx = state.pool.begin().await?;
        let account = lock_account(&mut *tx, deposit_type, id, state.config.posting).await?;
        Ok(Self { tx, account })
    }

    pub fn conn(&mut self) -> &mut PgConnection {
        &mut *self.tx
    }

    /// Save the account, record `command` and commit.
    ///
    /// `result` is built after the save so it sees transaction and charge ids.
    pub async fn commit<F>(
        mut self,
        command: &CommandWrapper,
        user_id: DbId,
        result: F,
    ) -> AppResult<(SavingsAccount, CommandProcessingResult)>
    where
        F: FnOnce(&SavingsAccount) -> CommandProcessingResult,
    {
        save_account(&mut *self.tx, &mut self.account, user_id).await?;
        let result = result(&self.account);
        commands::record(&mut *self.tx, command, &result, user_id).await?;
        self.tx.commit().await?;
        Ok((self.account, result))
    }
}

/// Load and row-lock an account on `conn`.
pub async fn lock_account(
    conn: &mut PgConnection,
    deposit_type: DepositAccountType,
    id: DbId,
    posting: PostingConfig,
) -> AppResult<SavingsAccount> {
    let parts = SavingsAccountRepo::find_for_update(conn, deposit_type, id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: account_noun(deposit_type),
            id,
        })?;
    let mut account = parts.into_account()?;
    account.posting_config = posting;
    Ok(account)
}

/// Persist `account`, failing with a data-integrity conflict when another
/// command saved it first.
pub async fn save_account(
    conn: &mut PgConnection,
    account: &mut SavingsAccount,
    user_id: DbId,
) -> AppResult<()> {
    if !SavingsAccountRepo::save(conn, account, Some(user_id)).await? {
        tracing::warn!(account_id = ?account.id, version = account.version, "Stale account version");
        return Err(CoreError::DataIntegrity(CONCURRENT_MODIFICATION.into()).into());
    }
    Ok(())
}
