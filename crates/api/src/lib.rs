//! Savings and deposits API server library.
//!
//! Exposes the building blocks (config, state, error handling, routes,
//! write services, background jobs) so integration tests and the binary
//! entrypoint can both access them.

pub mod auth;
pub mod background;
pub mod commands;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod kinds;
pub mod middleware;
pub mod query;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
pub mod views;
