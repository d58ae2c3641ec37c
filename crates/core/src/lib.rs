//! Savings and deposit domain logic.
//!
//! Pure types and rules with no I/O: enumerations, money, the interest
//! engine, the savings account aggregate and its state machine, charges,
//! fixed/recurring deposit terms, command parsing and permissions.
//! Every date-sensitive operation takes `today` explicitly.

pub mod account;
pub mod charges;
pub mod commands;
pub mod enums;
pub mod error;
pub mod fixed_deposit;
pub mod interest;
pub mod listing;
pub mod permissions;
pub mod recurring_deposit;
pub mod types;
