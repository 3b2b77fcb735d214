pub mod account;
pub mod collection;
pub mod friends;
pub mod games;
pub mod notification;
pub mod profile;
pub mod quiz;
