//! Domain logic shared by the database, notification and API crates.
//!
//! Nothing in this crate performs I/O: it holds identifier aliases, the
//! domain error type, and the pure rules (entitlement transitions,
//! notebook capabilities, answer grading) the handlers apply.

pub mod error;
pub mod generation;
pub mod grading;
pub mod pagination;
pub mod permissions;
pub mod plan;
pub mod types;
