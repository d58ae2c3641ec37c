//! Moves fixed and recurring deposits to Matured once their maturity date
//! is reached.

use std::time::Duration;

use savings_core::enums::{AccountStatus, DepositAccountType};
use savings_db::repositories::SavingsAccountRepo;
use tokio_util::sync::CancellationToken;

use super::process_account;
use crate::services::business_date;
use crate::state::AppState;

const ACCOUNT_TYPES: [DepositAccountType; 2] = [
    DepositAccountType::FixedDeposit,
    DepositAccountType::RecurringDeposit,
];

/// Run the maturity loop until `cancel` is triggered.
pub async fn run(state: AppState, cancel: CancellationToken) {
    let period = Duration::from_secs(state.config.job_interval_secs);
    tracing::info!(interval_secs = period.as_secs(), "Deposit maturity job started");

    let mut interval = tokio::time::interval(period);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Deposit maturity job stopping");
                break;
            }
            _ = interval.tick() => {
                run_once(&state).await;
            }
        }
    }
}

/// One pass over every active deposit. Returns how many matured.
pub async fn run_once(state: &AppState) -> usize {
    let ids = match SavingsAccountRepo::list_ids_by_status(
        &state.pool,
        &ACCOUNT_TYPES,
        AccountStatus::Active,
    )
    .await
    {
        Ok(ids) => ids,
        Err(e) => {
            tracing::error!(error = %e, "Deposit maturity: failed to list accounts");
            return 0;
        }
    };

    let today = business_date();
    let mut matured = 0;
    for (id, type_id) in ids {
        let Some(deposit_type) = DepositAccountType::from_id(type_id) else {
            continue;
        };
        match process_account(state, deposit_type, id, |account| Ok(account.mature(today)?)).await {
            Ok(true) => {
                tracing::info!(account_id = id, "Deposit matured");
                matured += 1;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(account_id = id, error = %e, "Deposit maturity: account skipped");
            }
        }
    }
    matured
}
