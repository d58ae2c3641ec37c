//! Periodic interest posting for active savings and recurring deposit
//! accounts.

use std::time::Duration;

use savings_core::enums::{AccountStatus, DepositAccountType};
use savings_db::repositories::SavingsAccountRepo;
use tokio_util::sync::CancellationToken;

use super::process_account;
use crate::services::business_date;
use crate::state::AppState;

const ACCOUNT_TYPES: [DepositAccountType; 2] = [
    DepositAccountType::Savings,
    DepositAccountType::RecurringDeposit,
];

/// Run the interest posting loop until `cancel` is triggered.
///
/// Posts every completed posting period up to today. Accounts whose
/// postings are already current are left untouched.
pub async fn run(state: AppState, cancel: CancellationToken) {
    let period = Duration::from_secs(state.config.job_interval_secs);
    tracing::info!(interval_secs = period.as_secs(), "Interest posting job started");

    let mut interval = tokio::time::interval(period);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Interest posting job stopping");
                break;
            }
            _ = interval.tick() => {
                run_once(&state).await;
            }
        }
    }
}

/// One pass over every active account. Failures are logged per account.
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
            tracing::error!(error = %e, "Interest posting: failed to list accounts");
            return 0;
        }
    };

    let today = business_date();
    let mut posted = 0;
    for (id, type_id) in ids {
        let Some(deposit_type) = DepositAccountType::from_id(type_id) else {
            continue;
        };
        let outcome = process_account(state, deposit_type, id, |account| {
            let before = account.transactions.len();
            account.post_interest(today, false)?;
            Ok(account.transactions.len() != before)
        })
        .await;
        match outcome {
            Ok(true) => posted += 1,
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(account_id = id, error = %e, "Interest posting: account skipped");
            }
        }
    }

    if posted > 0 {
        tracing::info!(posted, "Interest posting: accounts updated");
    } else {
        tracing::debug!("Interest posting: nothing to post");
    }
    posted
}
