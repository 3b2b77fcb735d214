//! Row and procedure-result payloads.
//!
//! Everything the data service returns is JSON; these types are the
//! schemas it is validated against before reaching handlers.

pub mod collection;
pub mod friendship;
pub mod notification;
pub mod profile;
