//! Request authentication.
//!
//! - [`session::require_session`] -- layer on protected routes; validates
//!   the session token and refreshes it when close to expiry.
//! - [`auth::AuthUser`] -- extractor for the identity the layer attached.

pub mod auth;
pub mod session;
