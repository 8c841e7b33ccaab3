//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - `Deserialize` DTOs for the writes the API performs
//!
//! API-facing JSON uses camelCase field names.

pub mod chapter;
pub mod generation_job;
pub mod incorrect_answer;
pub mod note;
pub mod notebook;
pub mod question;
pub mod question_bank;
pub mod share_link;
pub mod user;
pub mod user_response;
