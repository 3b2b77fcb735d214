//! Game-metadata catalog client (IGDB).
//!
//! Provides the [`GameCatalog`] seam used by the API, the IGDB
//! implementation, and the lazily refreshed Twitch access-token cache the
//! IGDB API requires.

pub mod config;
pub mod error;
pub mod igdb;
pub mod token;

use async_trait::async_trait;

pub use config::CatalogConfig;
pub use error::CatalogError;
pub use igdb::{Game, IgdbClient};
pub use token::{FetchedToken, TokenCache, TokenRefresher, TwitchRefresher};

/// Read-only access to game metadata.
#[async_trait]
pub trait GameCatalog: Send + Sync {
    /// Full-text search, in the catalog's own relevance order.
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<Game>, CatalogError>;

    /// Look up a single game by catalog id.
    async fn game(&self, id: i64) -> Result<Option<Game>, CatalogError>;
}
