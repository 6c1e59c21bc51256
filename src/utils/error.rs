//! The `error` module defines the error types used within the `ttweet` server.
//!
//! Request and registry errors double as the user-facing response text: their
//! `Display` output is exactly what gets written back to the client.

use std::io;

use thiserror::Error;

use crate::broker::session::SessionId;

/// A request that failed decoding or field validation.
///
/// Nothing is mutated when one of these is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("message format illegal.")]
    Format,

    #[error("username has wrong format.")]
    InvalidUsername,

    #[error("message length illegal.")]
    MessageLength,

    #[error("hashtag illegal format.")]
    InvalidHashtag,

    #[error("operation failed: already registered")]
    AlreadyRegistered,
}

/// Failures of the identity registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("username illegal, connection refused.")]
    DuplicateName(String),

    #[error("error: max users logged in, connection refused.")]
    CapacityExceeded(usize),

    #[error("operation failed: {0} is not registered")]
    UnknownSession(SessionId),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscriptionError {
    #[error("already subscribed to #{0}")]
    AlreadySubscribed(String),

    #[error("subscription limit of {0} reached")]
    LimitReached(usize),

    #[error("Hashtag not found")]
    NotFound(String),
}

/// Why a connection was refused during the registration handshake.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandshakeError {
    #[error("username illegal, connection refused.")]
    Rejected(#[source] RequestError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}
