//! # ttweet
//!
//! `ttweet` is a small multi-client message broker built with Rust. Clients
//! connect over WebSockets, register a unique username, post short tagged
//! messages ("tweets"), subscribe to hashtags and read back a personal
//! timeline of the tweets matching their subscriptions.
//!
//! ## Core Modules
//!
//! - `broker`: the registry of live sessions, their state, and tweet fan-out.
//! - `config`: loads server configuration from files and the environment.
//! - `dispatch`: validates requests into commands and executes them.
//! - `transport`: the WebSocket server and the wire format.
//! - `utils`: error types and logging setup.

pub mod broker;
pub mod config;
pub mod dispatch;
pub mod transport;
pub mod utils;
