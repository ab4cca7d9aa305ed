//! Core components for signing cloud API requests and sharing pooled connections.
//!
//! This crate provides the foundational types and traits for the cloudsign ecosystem.
//!
//! ## Overview
//!
//! - **Capabilities**: [`SigningService`] computes an authorization value for a request
//!   description, [`PoolProvider`] hands out shared connection managers by key, and
//!   [`HttpSend`] dispatches a signed request.
//! - **Errors**: a single [`Error`] type whose [`ErrorKind`] separates signature
//!   failures from configuration failures.
//! - **Env**: [`Env`] abstracts environment access so configuration can be tested
//!   with [`StaticEnv`].
//!
//! ## Utilities
//!
//! - [`hash`]: Cryptographic hashing utilities
//! - [`time`]: Time formatting used by signers
//! - [`utils`]: General utilities including data redaction

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod hash;
pub mod time;
pub mod utils;

mod error;
pub use error::{Error, ErrorKind, Result};
mod env;
pub use env::{Env, OsEnv, StaticEnv};
mod http;
pub use http::HttpSend;
mod api;
pub use api::{PoolProvider, SigningService};
