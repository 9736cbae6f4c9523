//! Identity provider administration library crate.
//!
//! Provides OAuth2 client credential lifecycle and user account administration
//! over pluggable storage, exposed through an anti-forgery protected HTTP API.

pub mod admin;
pub mod config;
pub mod errors;
pub mod http;
pub mod storage;
