//! Broker engine
//!
//! The in-memory registry of live sessions and the fan-out of accepted posts.
//!
//! Concurrency and usage notes:
//! - The API is synchronous and meant to be held behind a single lock
//!   ([`SharedBroker`]). That lock guards registry membership together with
//!   every session's subscriptions and feed, so a fan-out traversal always
//!   sees a consistent set of sessions and tags.
//! - Callers must not hold the lock across network I/O.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::broker::post::{Post, TagSpec};
use crate::broker::session::{Session, SessionId, Username};
use crate::config::BrokerSettings;
use crate::utils::error::RegistryError;

pub type SharedBroker = Arc<Mutex<Broker>>;

/// Locks the broker. A panic in another handler never leaves the registry
/// half-updated, so a poisoned lock is recovered rather than propagated.
pub fn lock_broker(broker: &SharedBroker) -> MutexGuard<'_, Broker> {
    broker.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
pub struct Broker {
    sessions: BTreeMap<SessionId, Session>,
    next_id: u64,
    capacity: usize,
    max_subscriptions: usize,
}

impl Broker {
    /// Maximum number of concurrently registered sessions.
    pub const DEFAULT_CAPACITY: usize = 5;

    /// Maximum number of tags a single session may subscribe to.
    pub const DEFAULT_MAX_SUBSCRIPTIONS: usize = 3;
}

impl Default for Broker {
    fn default() -> Self {
        Self::new()
    }
}

impl Broker {
    pub fn new() -> Self {
        Self::with_limits(Self::DEFAULT_CAPACITY, Self::DEFAULT_MAX_SUBSCRIPTIONS)
    }

    pub fn with_limits(capacity: usize, max_subscriptions: usize) -> Self {
        Self {
            sessions: BTreeMap::new(),
            next_id: 0,
            capacity,
            max_subscriptions,
        }
    }

    pub fn from_settings(settings: &BrokerSettings) -> Self {
        Self::with_limits(settings.max_sessions, settings.max_subscriptions)
    }

    /// Wraps the broker in the lock shared by every connection task.
    pub fn into_shared(self) -> SharedBroker {
        Arc::new(Mutex::new(self))
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn max_subscriptions(&self) -> usize {
        self.max_subscriptions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.sessions.len() >= self.capacity
    }

    /// Registers a new identity.
    ///
    /// The capacity check and the insertion happen under the same `&mut`
    /// borrow, so concurrent registrations serialized by the broker lock
    /// can never exceed the capacity or admit a duplicate name.
    pub fn register(&mut self, username: Username) -> Result<SessionId, RegistryError> {
        if self.is_full() {
            return Err(RegistryError::CapacityExceeded(self.capacity));
        }
        if self.find(username.as_str()).is_some() {
            return Err(RegistryError::DuplicateName(username.to_string()));
        }

        let id = SessionId(self.next_id);
        self.next_id += 1;

        info!(%id, %username, "registered");
        self.sessions.insert(id, Session::new(id, username));
        Ok(id)
    }

    /// Removes a session and frees its slot. Its posts and feed go with it.
    pub fn unregister(&mut self, id: SessionId) -> Option<Session> {
        let session = self.sessions.remove(&id)?;
        info!(%id, username = %session.username, "unregistered");
        Some(session)
    }

    /// Every live name, in registration order.
    pub fn usernames(&self) -> Vec<&str> {
        self.sessions
            .values()
            .map(|session| session.username.as_str())
            .collect()
    }

    /// Applies `f` to every live session, in registration order.
    pub fn for_each_session<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut Session),
    {
        for session in self.sessions.values_mut() {
            f(session);
        }
    }

    pub fn session(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub fn session_mut(&mut self, id: SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(&id)
    }

    pub fn find(&self, username: &str) -> Option<&Session> {
        self.sessions
            .values()
            .find(|session| session.username.as_str() == username)
    }

    /// Accepts a validated post from `author` and fans it out.
    ///
    /// The post is appended to the author's history, then delivered once to
    /// every session (the author included) holding `ALL` or one of its tags.
    /// Returns the number of feeds it was delivered to.
    pub fn publish(
        &mut self,
        author: SessionId,
        text: String,
        tags: TagSpec,
    ) -> Result<usize, RegistryError> {
        let session = self
            .sessions
            .get_mut(&author)
            .ok_or(RegistryError::UnknownSession(author))?;

        let post = Arc::new(Post {
            author: session.username.clone(),
            text,
            tags,
        });
        session.record(Arc::clone(&post));

        let mut delivered = 0;
        self.for_each_session(|session| {
            if session.deliver(&post) {
                delivered += 1;
            }
        });

        debug!(%author, tags = post.tags.raw(), delivered, "published");
        Ok(delivered)
    }
}
