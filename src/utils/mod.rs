//! The `utils` module provides the shared error types and logging setup used
//! across the `ttweet` server.

pub mod error;
pub mod logging;
