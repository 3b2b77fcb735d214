//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept a [`ScopedClient`](crate::ScopedClient) as the first argument.
//! Mutations with cross-entity effects call exactly one stored procedure;
//! inputs are validated before any remote call is made.

pub mod account_repo;
pub mod collection_repo;
pub mod friend_repo;
pub mod notification_repo;
pub mod profile_repo;

pub use account_repo::AccountRepo;
pub use collection_repo::CollectionRepo;
pub use friend_repo::FriendRepo;
pub use notification_repo::NotificationRepo;
pub use profile_repo::ProfileRepo;
