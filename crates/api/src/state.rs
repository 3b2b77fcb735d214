use std::sync::Arc;

use memcard_catalog::GameCatalog;
use memcard_db::DataBackend;

use crate::auth::session::SessionResolver;
use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable. Holds process-wide collaborators only; the
/// per-request [`ScopedClient`](memcard_db::ScopedClient) is built by the
/// request-context extractors and never stored here.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Data service used to build scoped clients.
    pub backend: Arc<dyn DataBackend>,
    /// Bearer credential resolver.
    pub sessions: Arc<dyn SessionResolver>,
    /// Game-metadata catalog. `None` when no catalog credentials are configured.
    pub catalog: Option<Arc<dyn GameCatalog>>,
}
