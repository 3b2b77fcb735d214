//! Session resolution.
//!
//! - [`session`] -- the [`SessionResolver`](session::SessionResolver) seam
//!   to the identity provider.
//! - [`jwt`] -- HS256 access-token validation (and minting, for local
//!   development and tests).

pub mod jwt;
pub mod session;
