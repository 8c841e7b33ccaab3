//! Shared response envelope types for API handlers.
//!
//! Most responses use a `{ "data": ... }` envelope. The auth, webhook and
//! question-bank read endpoints keep the shapes their clients already
//! consume and build their bodies directly.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
///
/// ```ignore
/// Ok(Json(DataResponse { data: notebook }))
/// ```
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
