//! The `dispatch` module turns decoded requests into broker operations.
//!
//! A request is first validated into a [`Command`]; only then is the broker
//! locked and mutated, so a rejected request never leaves partial state
//! behind. Every command produces a [`Reply`] telling the connection what to
//! write back and whether to keep going.

pub mod command;

use std::sync::Arc;

use tracing::debug;

use crate::broker::post::Post;
use crate::broker::session::SessionId;
use crate::broker::{Broker, SharedBroker, lock_broker};
use crate::transport::message::{ClientMessage, EMPTY_TIMELINE, EXITING, OPERATION_SUCCESS};
use crate::utils::error::{HandshakeError, RegistryError, RequestError};

pub use command::Command;

/// What the connection does after a command has run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Write this text and keep reading.
    Text(String),
    /// Write nothing and keep reading.
    Silent,
    /// Write this final text and tear the session down.
    Exit(String),
}

/// Runs the registration handshake for a fresh connection.
///
/// The first request must be a valid `create`; anything else is rejected
/// without touching the broker.
pub fn register(broker: &SharedBroker, msg: ClientMessage) -> Result<SessionId, HandshakeError> {
    let username = match Command::try_from(msg) {
        Ok(Command::Register(username)) => username,
        Ok(_) => return Err(HandshakeError::Rejected(RequestError::Format)),
        Err(e) => return Err(HandshakeError::Rejected(e)),
    };

    let id = lock_broker(broker).register(username)?;
    Ok(id)
}

/// Validates and executes one request from the registered `session`.
pub fn dispatch(broker: &SharedBroker, session: SessionId, msg: ClientMessage) -> Reply {
    // A second `create` is refused whatever name it carries.
    if matches!(msg, ClientMessage::Create { .. }) {
        return Reply::Text(RequestError::AlreadyRegistered.to_string());
    }

    match Command::try_from(msg) {
        Ok(command) => execute(&mut lock_broker(broker), session, command),
        Err(e) => {
            debug!(%session, "rejected request: {e}");
            Reply::Text(e.to_string())
        }
    }
}

/// Executes a validated command against an already locked broker.
pub fn execute(broker: &mut Broker, session: SessionId, command: Command) -> Reply {
    match command {
        Command::Register(_) => Reply::Text(RequestError::AlreadyRegistered.to_string()),

        Command::Post { text, tags } => match broker.publish(session, text, tags) {
            Ok(_) => Reply::Silent,
            Err(e) => Reply::Exit(e.to_string()),
        },

        Command::ListUsers => Reply::Text(broker.usernames().join("\n")),

        Command::Subscribe(tag) => {
            let limit = broker.max_subscriptions();
            let Some(own) = broker.session_mut(session) else {
                return gone(session);
            };
            match own.subscribe(&tag, limit) {
                Ok(()) => Reply::Text(OPERATION_SUCCESS.to_string()),
                Err(e) => {
                    debug!(%session, "subscribe failed: {e}");
                    Reply::Text(format!(
                        "operation failed: sub #{tag} failed, already exists or exceeds {limit} limitation"
                    ))
                }
            }
        }

        Command::Unsubscribe(tag) => {
            let Some(own) = broker.session_mut(session) else {
                return gone(session);
            };
            match own.unsubscribe(&tag) {
                Ok(()) => Reply::Text(OPERATION_SUCCESS.to_string()),
                Err(e) => Reply::Text(e.to_string()),
            }
        }

        Command::GetPosts { username } => match broker.find(&username) {
            None => Reply::Text(format!("no user {username} in the system")),
            Some(user) if user.posts().is_empty() => {
                Reply::Text(format!("{username} has no tweets in the system"))
            }
            Some(user) => Reply::Text(render(user.posts())),
        },

        Command::GetFeed => match broker.session(session) {
            None => gone(session),
            Some(own) if own.feed().is_empty() => Reply::Text(EMPTY_TIMELINE.to_string()),
            Some(own) => Reply::Text(render(own.feed())),
        },

        Command::Exit => Reply::Exit(EXITING.to_string()),
    }
}

fn render(posts: &[Arc<Post>]) -> String {
    posts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

fn gone(session: SessionId) -> Reply {
    Reply::Exit(RegistryError::UnknownSession(session).to_string())
}

#[cfg(test)]
mod tests;
