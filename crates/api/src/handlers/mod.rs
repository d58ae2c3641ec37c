//! Request handlers.
//!
//! Account, product, transaction and account-charge handlers are generic
//! over [`crate::kinds::AccountKind`] and instantiated once per account
//! family by the routers. Reads check `READ_<ENTITY>`; writes build a
//! [`crate::commands::CommandWrapper`], authorize it and hand it to the
//! matching service in [`crate::services`].

pub mod account_charges;
pub mod accounts;
pub mod audits;
pub mod auth;
pub mod charges;
pub mod imports;
pub mod products;
pub mod transactions;
