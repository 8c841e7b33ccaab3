//! HTTP handlers, one module per resource.

pub mod auth;
pub mod chapter;
pub mod generation;
pub mod note;
pub mod notebook;
pub mod question;
pub mod question_bank;
pub mod user;
pub mod webhook;
