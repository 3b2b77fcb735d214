//! Client SDK for the MemCard API.
//!
//! - [`api`] -- typed HTTP client; reads go through the [`QueryCache`],
//!   mutations invalidate the keys they affect.
//! - [`cache`] -- per-user, TTL, single-flight query cache.
//! - [`store`] -- global state slices and their persistence adapters.
//! - [`sync`] -- keeps the cache and slices consistent with the current
//!   session identity.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod store;
pub mod sync;

pub use api::{ApiClient, QuizResult};
pub use cache::{QueryCache, QueryKey, QueryOptions};
pub use config::ClientConfig;
pub use error::ClientError;
pub use store::{FileStorage, MemoryStorage, StorageAdapter, Stores};
pub use sync::{SeedSource, SessionSynchronizer};
