//! Domain types shared by the MemCard server, data layer and client SDK.
//!
//! Nothing in here performs I/O: errors, identifiers, the session
//! identity, money arithmetic, validated request DTOs and player-rank
//! scoring.

pub mod dto;
pub mod error;
pub mod money;
pub mod rank;
pub mod session;
pub mod types;
