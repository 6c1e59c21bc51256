use serde::{Deserialize, Serialize};
use tungstenite::protocol::Message as WsMessage;

/// A request as it appears on the wire: one JSON object per frame,
/// discriminated by its `command` field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "command")]
pub enum ClientMessage {
    #[serde(rename = "create")]
    Create { username: String },

    #[serde(rename = "tweet")]
    Tweet {
        username: String,
        message: String,
        hashtags: String,
    },

    #[serde(rename = "getusers")]
    GetUsers,

    #[serde(rename = "subscribe")]
    Subscribe { hashtag: String },

    #[serde(rename = "unsubscribe")]
    Unsubscribe { hashtag: String },

    #[serde(rename = "gettweets")]
    GetTweets { username: String },

    #[serde(rename = "timeline")]
    Timeline,

    #[serde(rename = "exit")]
    Exit,
}

// Plain-text responses.
pub const REGISTERED: &str = "username legal, connection established.";
pub const OPERATION_SUCCESS: &str = "operation success";
pub const EMPTY_TIMELINE: &str = "no tweets in timeline";
pub const EXITING: &str = "exiting";

/// One inbound frame, classified.
#[derive(Debug)]
pub enum Inbound {
    Request(Result<ClientMessage, serde_json::Error>),
    /// Empty payloads and control frames. Not a command.
    Empty,
    /// A binary payload that is not UTF-8. Ends the session like a broken read.
    Malformed,
    Closed,
}

pub fn decode_frame(msg: WsMessage) -> Inbound {
    match msg {
        WsMessage::Text(text) if text.trim().is_empty() => Inbound::Empty,
        WsMessage::Text(text) => Inbound::Request(serde_json::from_str(text.as_str())),
        WsMessage::Binary(data) if data.is_empty() => Inbound::Empty,
        WsMessage::Binary(data) => match std::str::from_utf8(&data) {
            Ok(text) => Inbound::Request(serde_json::from_str(text)),
            Err(_) => Inbound::Malformed,
        },
        WsMessage::Close(_) => Inbound::Closed,
        WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => Inbound::Empty,
    }
}
