use crate::broker::post::{Tag, TagSpec, validate_text};
use crate::broker::session::Username;
use crate::transport::message::ClientMessage;
use crate::utils::error::RequestError;

/// A fully validated request. Building one never touches the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Register(Username),
    Post { text: String, tags: TagSpec },
    ListUsers,
    Subscribe(Tag),
    Unsubscribe(Tag),
    GetPosts { username: String },
    GetFeed,
    Exit,
}

impl TryFrom<ClientMessage> for Command {
    type Error = RequestError;

    fn try_from(msg: ClientMessage) -> Result<Self, Self::Error> {
        let command = match msg {
            ClientMessage::Create { username } => Command::Register(Username::parse(&username)?),

            // The author is the session's identity; the username field is
            // not trusted.
            ClientMessage::Tweet {
                message, hashtags, ..
            } => {
                validate_text(&message)?;
                let tags = TagSpec::parse(&hashtags)?;
                Command::Post {
                    text: message,
                    tags,
                }
            }

            ClientMessage::GetUsers => Command::ListUsers,
            ClientMessage::Subscribe { hashtag } => Command::Subscribe(Tag::parse(&hashtag)?),
            ClientMessage::Unsubscribe { hashtag } => {
                Command::Unsubscribe(Tag::parse_held(&hashtag)?)
            }

            ClientMessage::GetTweets { username } if username.is_empty() => {
                return Err(RequestError::Format);
            }
            ClientMessage::GetTweets { username } => Command::GetPosts { username },

            ClientMessage::Timeline => Command::GetFeed,
            ClientMessage::Exit => Command::Exit,
        };
        Ok(command)
    }
}
