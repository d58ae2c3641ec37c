//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated user from a JWT Bearer token.
//! - [`rbac::RequirePermission`] -- Checks an `ACTION_ENTITY` permission for that user.

pub mod auth;
pub mod rbac;
