use std::sync::Arc;

use quizdeck_generation::GenerationGateway;
use quizdeck_notify::Mailer;

use crate::auth::identity::IdentityProvider;
use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone: everything but the pool sits behind an `Arc`, and the
/// pool is itself reference-counted.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: quizdeck_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Outbound email.
    pub mailer: Arc<dyn Mailer>,
    /// Remote question-generation service.
    pub generation: Arc<dyn GenerationGateway>,
    /// External identity provider; `None` when OAuth is not configured.
    pub identity: Option<Arc<dyn IdentityProvider>>,
}
