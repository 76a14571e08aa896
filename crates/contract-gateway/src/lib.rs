//! Contract gateway - validating relay for generated Terms of Service
//!
//! This crate exposes a single streaming endpoint that checks a free-text
//! business description, forwards it to a text-generation API and relays
//! the upstream output back to the caller as server-sent events.

pub mod config;
pub mod error;
pub mod relay;
pub mod validator;

pub use error::GatewayError;
