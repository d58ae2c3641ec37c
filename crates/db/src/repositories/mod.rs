//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods. Plain
//! lookups accept `&PgPool`; anything that takes part in a command's
//! transaction accepts `&mut PgConnection` (pass `&mut *tx`).

pub mod account_charge_repo;
pub mod charge_repo;
pub mod command_source_repo;
pub mod deposit_amount_change_repo;
pub mod import_document_repo;
pub mod interest_rate_chart_repo;
pub mod product_repo;
pub mod savings_account_repo;
pub mod transaction_repo;
pub mod user_repo;

pub use account_charge_repo::AccountChargeRepo;
pub use charge_repo::ChargeRepo;
pub use command_source_repo::CommandSourceRepo;
pub use deposit_amount_change_repo::DepositAmountChangeRepo;
pub use import_document_repo::ImportDocumentRepo;
pub use interest_rate_chart_repo::InterestRateChartRepo;
pub use product_repo::ProductRepo;
pub use savings_account_repo::{AccountListFilter, SavingsAccountRepo};
pub use transaction_repo::TransactionRepo;
pub use user_repo::UserRepo;
