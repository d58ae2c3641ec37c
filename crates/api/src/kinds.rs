//! The three account families served by the same handlers.
//!
//! Savings accounts, fixed deposits and recurring deposits share storage,
//! routes and most rules. Handlers are generic over [`AccountKind`] and
//! instantiated once per family in `routes`.

use savings_core::commands::{
    AccountCommand, TransactionCommand, DEPOSIT_TRANSACTION_ADJUST_COMMANDS,
    DEPOSIT_TRANSACTION_COMMANDS, FIXED_DEPOSIT_ACCOUNT_COMMANDS,
    RECURRING_DEPOSIT_ACCOUNT_COMMANDS, SAVINGS_ACCOUNT_COMMANDS,
    SAVINGS_TRANSACTION_ADJUST_COMMANDS, SAVINGS_TRANSACTION_COMMANDS,
};
use savings_core::enums::DepositAccountType;
use savings_core::permissions::{
    ENTITY_FIXED_DEPOSIT_ACCOUNT, ENTITY_FIXED_DEPOSIT_PRODUCT, ENTITY_RECURRING_DEPOSIT_ACCOUNT,
    ENTITY_RECURRING_DEPOSIT_PRODUCT, ENTITY_SAVINGS_ACCOUNT, ENTITY_SAVINGS_PRODUCT,
};

pub trait AccountKind: Send + Sync + 'static {
    const TYPE: DepositAccountType;
    /// Permission entity for accounts (`SAVINGSACCOUNT`, ...).
    const ACCOUNT_ENTITY: &'static str;
    /// Permission entity for products (`SAVINGSPRODUCT`, ...).
    const PRODUCT_ENTITY: &'static str;
    /// URL segment of the account resource.
    const ACCOUNTS_PATH: &'static str;
    /// URL segment of the product resource.
    const PRODUCTS_PATH: &'static str;
    /// Label used in not-found errors.
    const NOUN: &'static str;
    const COMMANDS: &'static [AccountCommand];
    const TRANSACTION_COMMANDS: &'static [TransactionCommand];
    const TRANSACTION_ADJUST_COMMANDS: &'static [TransactionCommand];
}

pub struct Savings;
pub struct FixedDeposit;
pub struct RecurringDeposit;

impl AccountKind for Savings {
    const TYPE: DepositAccountType = DepositAccountType::Savings;
    const ACCOUNT_ENTITY: &'static str = ENTITY_SAVINGS_ACCOUNT;
    const PRODUCT_ENTITY: &'static str = ENTITY_SAVINGS_PRODUCT;
    const ACCOUNTS_PATH: &'static str = "savingsaccounts";
    const PRODUCTS_PATH: &'static str = "savingsproducts";
    const NOUN: &'static str = "SavingsAccount";
    const COMMANDS: &'static [AccountCommand] = SAVINGS_ACCOUNT_COMMANDS;
    const TRANSACTION_COMMANDS: &'static [TransactionCommand] = SAVINGS_TRANSACTION_COMMANDS;
    const TRANSACTION_ADJUST_COMMANDS: &'static [TransactionCommand] =
        SAVINGS_TRANSACTION_ADJUST_COMMANDS;
}

/// Fixed deposits move money only on activation and closure, so they accept
/// no transaction commands.
impl AccountKind for FixedDeposit {
    const TYPE: DepositAccountType = DepositAccountType::FixedDeposit;
    const ACCOUNT_ENTITY: &'static str = ENTITY_FIXED_DEPOSIT_ACCOUNT;
    const PRODUCT_ENTITY: &'static str = ENTITY_FIXED_DEPOSIT_PRODUCT;
    const ACCOUNTS_PATH: &'static str = "fixeddepositaccounts";
    const PRODUCTS_PATH: &'static str = "fixeddepositproducts";
    const NOUN: &'static str = "FixedDepositAccount";
    const COMMANDS: &'static [AccountCommand] = FIXED_DEPOSIT_ACCOUNT_COMMANDS;
    const TRANSACTION_COMMANDS: &'static [TransactionCommand] = &[];
    const TRANSACTION_ADJUST_COMMANDS: &'static [TransactionCommand] = &[];
}

impl AccountKind for RecurringDeposit {
    const TYPE: DepositAccountType = DepositAccountType::RecurringDeposit;
    const ACCOUNT_ENTITY: &'static str = ENTITY_RECURRING_DEPOSIT_ACCOUNT;
    const PRODUCT_ENTITY: &'static str = ENTITY_RECURRING_DEPOSIT_PRODUCT;
    const ACCOUNTS_PATH: &'static str = "recurringdepositaccounts";
    const PRODUCTS_PATH: &'static str = "recurringdepositproducts";
    const NOUN: &'static str = "RecurringDepositAccount";
    const COMMANDS: &'static [AccountCommand] = RECURRING_DEPOSIT_ACCOUNT_COMMANDS;
    const TRANSACTION_COMMANDS: &'static [TransactionCommand] = DEPOSIT_TRANSACTION_COMMANDS;
    const TRANSACTION_ADJUST_COMMANDS: &'static [TransactionCommand] =
        DEPOSIT_TRANSACTION_ADJUST_COMMANDS;
}

/// Permission entity for accounts of `deposit_type`.
pub fn account_entity(deposit_type: DepositAccountType) -> &'static str {
    match deposit_type {
        DepositAccountType::Savings => Savings::ACCOUNT_ENTITY,
        DepositAccountType::FixedDeposit => FixedDeposit::ACCOUNT_ENTITY,
        DepositAccountType::RecurringDeposit => RecurringDeposit::ACCOUNT_ENTITY,
    }
}

/// Not-found label for accounts of `deposit_type`.
pub fn account_noun(deposit_type: DepositAccountType) -> &'static str {
    match deposit_type {
        DepositAccountType::Savings => Savings::NOUN,
        DepositAccountType::FixedDeposit => FixedDeposit::NOUN,
        DepositAccountType::RecurringDeposit => RecurringDeposit::NOUN,
    }
}
