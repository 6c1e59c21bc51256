//! The `transport` module handles network communication with clients over
//! WebSockets.
//!
//! It defines the wire format of requests and the plain-text responses, and
//! implements the server that supervises each connection and forwards its
//! requests to the dispatcher.

pub mod message;
pub mod websocket;
