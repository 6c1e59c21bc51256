use std::fmt;

use crate::broker::session::Username;
use crate::utils::error::RequestError;

/// Reserved tag meaning "every post". Valid as a subscription, never as a
/// tag on a post.
pub const ALL_TAG: &str = "ALL";

/// A subscription target, stored without its leading `#`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag(String);

impl Tag {
    /// Parses a `#name` hashtag as sent by a client.
    pub fn parse(hashtag: &str) -> Result<Self, RequestError> {
        let bare = hashtag
            .strip_prefix('#')
            .ok_or(RequestError::InvalidHashtag)?;

        if bare.is_empty() || bare.contains('#') || bare.contains(char::is_whitespace) {
            return Err(RequestError::InvalidHashtag);
        }

        Ok(Self(bare.to_string()))
    }

    /// Parses a hashtag naming a subscription to drop. Only the leading `#`
    /// and a non-empty name are required; a name no subscription could hold
    /// is simply not found later.
    pub fn parse_held(hashtag: &str) -> Result<Self, RequestError> {
        match hashtag.strip_prefix('#') {
            Some(bare) if !bare.is_empty() => Ok(Self(bare.to_string())),
            _ => Err(RequestError::InvalidHashtag),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_all(&self) -> bool {
        self.0 == ALL_TAG
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The tag annotation attached to a post.
///
/// Keeps the raw string for rendering and the parsed tokens for matching.
/// Tokens are split on `#`; whitespace around a token is ignored, whitespace
/// inside one is not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSpec {
    raw: String,
    tags: Vec<String>,
}

impl TagSpec {
    pub const MAX_TAGS: usize = 4;

    pub fn parse(raw: &str) -> Result<Self, RequestError> {
        let mut parts = raw.split('#');

        // Anything before the first `#` is not a tag.
        if parts.next().is_some_and(|head| !head.trim().is_empty()) {
            return Err(RequestError::InvalidHashtag);
        }

        let mut tags: Vec<String> = Vec::new();
        for part in parts {
            let tag = part.trim();
            if tag.is_empty()
                || tag.contains(char::is_whitespace)
                || tag == ALL_TAG
                || tags.iter().any(|t| t == tag)
            {
                return Err(RequestError::InvalidHashtag);
            }
            tags.push(tag.to_string());
        }

        if tags.is_empty() || tags.len() > Self::MAX_TAGS {
            return Err(RequestError::InvalidHashtag);
        }

        Ok(Self {
            raw: raw.to_string(),
            tags,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Validates the body of a tweet: 1 to [`Post::MAX_TEXT_LEN`] characters.
pub fn validate_text(text: &str) -> Result<(), RequestError> {
    match text.chars().count() {
        0 => Err(RequestError::Format),
        n if n > Post::MAX_TEXT_LEN => Err(RequestError::MessageLength),
        _ => Ok(()),
    }
}

/// An accepted post. Shared between the author's history and every feed it
/// was delivered to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub author: Username,
    pub text: String,
    pub tags: TagSpec,
}

impl Post {
    pub const MAX_TEXT_LEN: usize = 150;
}

/// Renders as `<author>: "<text>" <tagSpec>`.
impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: \"{}\" {}", self.author, self.text, self.tags.raw())
    }
}
