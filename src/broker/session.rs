use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::broker::post::{ALL_TAG, Post, Tag, TagSpec};
use crate::utils::error::{RequestError, SubscriptionError};

/// Registry key of a live session. Issued in increasing order, so sorting by
/// id is registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub(crate) u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// A registered identity: 1 to 15 ASCII alphanumeric characters,
/// case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Username(String);

impl Username {
    pub const MAX_LEN: usize = 15;

    pub fn parse(raw: &str) -> Result<Self, RequestError> {
        if raw.is_empty()
            || raw.len() > Self::MAX_LEN
            || !raw.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(RequestError::InvalidUsername);
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-identity state: post history, subscriptions and the delivered feed.
///
/// Sessions only live inside the [`Broker`](crate::broker::Broker), so every
/// mutation happens under the broker lock.
#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    pub username: Username,
    posts: Vec<Arc<Post>>,
    tags: HashSet<String>,
    feed: Vec<Arc<Post>>,
}

impl Session {
    pub fn new(id: SessionId, username: Username) -> Self {
        Self {
            id,
            username,
            posts: Vec::new(),
            tags: HashSet::new(),
            feed: Vec::new(),
        }
    }

    pub fn posts(&self) -> &[Arc<Post>] {
        &self.posts
    }

    pub fn feed(&self) -> &[Arc<Post>] {
        &self.feed
    }

    pub fn tags(&self) -> &HashSet<String> {
        &self.tags
    }

    /// Adds a subscription unless it is already held or `limit` tags are held.
    pub fn subscribe(&mut self, tag: &Tag, limit: usize) -> Result<(), SubscriptionError> {
        if self.tags.contains(tag.as_str()) {
            return Err(SubscriptionError::AlreadySubscribed(tag.to_string()));
        }
        if self.tags.len() >= limit {
            return Err(SubscriptionError::LimitReached(limit));
        }
        self.tags.insert(tag.to_string());
        Ok(())
    }

    /// Removes a subscription. `#ALL` clears every subscription and always
    /// succeeds.
    pub fn unsubscribe(&mut self, tag: &Tag) -> Result<(), SubscriptionError> {
        if tag.is_all() {
            self.tags.clear();
            return Ok(());
        }
        if self.tags.remove(tag.as_str()) {
            Ok(())
        } else {
            Err(SubscriptionError::NotFound(tag.to_string()))
        }
    }

    /// True when any held tag is `ALL` or one of the post's tags.
    pub fn wants(&self, spec: &TagSpec) -> bool {
        self.tags
            .iter()
            .any(|tag| tag == ALL_TAG || spec.contains(tag))
    }

    pub(crate) fn record(&mut self, post: Arc<Post>) {
        self.posts.push(post);
    }

    /// Appends `post` to the feed if it matches; at most one copy per call.
    pub(crate) fn deliver(&mut self, post: &Arc<Post>) -> bool {
        if self.wants(&post.tags) {
            self.feed.push(Arc::clone(post));
            true
        } else {
            false
        }
    }
}
