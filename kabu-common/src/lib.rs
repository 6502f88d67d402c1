//! Kabu Common - shared utilities for the kabu watchlist tools.
//!
//! This crate provides:
//! - Error types and context helpers
//! - Logging setup
//! - Defensive text and number coercion for scraped data and config files

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod error;
pub mod logging;
pub mod util;

pub use error::{Error, Result, ResultExt};
pub use logging::{init_logging, LogFormat};
