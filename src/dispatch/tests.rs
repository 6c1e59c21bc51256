use serde_json::json;

use super::{Command, Reply, dispatch, execute, register};
use crate::broker::post::Tag;
use crate::broker::session::{SessionId, Username};
use crate::broker::{Broker, SharedBroker, lock_broker};
use crate::transport::message::ClientMessage;
use crate::utils::error::{HandshakeError, RegistryError, RequestError};

fn request(value: serde_json::Value) -> ClientMessage {
    serde_json::from_value(value).unwrap()
}

fn create(broker: &SharedBroker, username: &str) -> SessionId {
    register(broker, request(json!({"command": "create", "username": username}))).unwrap()
}

fn send(broker: &SharedBroker, session: SessionId, value: serde_json::Value) -> Reply {
    dispatch(broker, session, request(value))
}

fn text(reply: Reply) -> String {
    match reply {
        Reply::Text(text) => text,
        other => panic!("expected a text reply, got {other:?}"),
    }
}

fn tweet(broker: &SharedBroker, session: SessionId, message: &str, hashtags: &str) -> Reply {
    send(
        broker,
        session,
        json!({"command": "tweet", "username": "ignored", "message": message, "hashtags": hashtags}),
    )
}

fn subscribe(broker: &SharedBroker, session: SessionId, hashtag: &str) -> String {
    text(send(
        broker,
        session,
        json!({"command": "subscribe", "hashtag": hashtag}),
    ))
}

fn unsubscribe(broker: &SharedBroker, session: SessionId, hashtag: &str) -> String {
    text(send(
        broker,
        session,
        json!({"command": "unsubscribe", "hashtag": hashtag}),
    ))
}

fn timeline(broker: &SharedBroker, session: SessionId) -> String {
    text(send(broker, session, json!({"command": "timeline"})))
}

#[test]
fn test_request_round_trip() {
    let original = ClientMessage::Tweet {
        username: "alice".to_string(),
        message: "quote \" and unicode é".to_string(),
        hashtags: "#music #sports".to_string(),
    };
    let encoded = serde_json::to_string(&original).unwrap();
    let decoded: ClientMessage = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded, original);
}

#[test]
fn test_wire_field_names() {
    assert_eq!(
        request(json!({"command": "gettweets", "username": "bob"})),
        ClientMessage::GetTweets {
            username: "bob".to_string()
        }
    );
    assert_eq!(request(json!({"command": "getusers"})), ClientMessage::GetUsers);
    assert_eq!(request(json!({"command": "exit"})), ClientMessage::Exit);
    assert!(serde_json::from_value::<ClientMessage>(json!({"command": "dance"})).is_err());
    assert!(serde_json::from_value::<ClientMessage>(json!({"command": "subscribe"})).is_err());
}

#[test]
fn test_command_validation() {
    let long = "a".repeat(151);
    let cases = [
        (json!({"command": "create", "username": "bad name"}), RequestError::InvalidUsername),
        (
            json!({"command": "tweet", "username": "a", "message": "", "hashtags": "#x"}),
            RequestError::Format,
        ),
        (
            json!({"command": "tweet", "username": "a", "message": long, "hashtags": "#x"}),
            RequestError::MessageLength,
        ),
        (
            json!({"command": "tweet", "username": "a", "message": "hi", "hashtags": "#ALL"}),
            RequestError::InvalidHashtag,
        ),
        (json!({"command": "subscribe", "hashtag": "music"}), RequestError::InvalidHashtag),
        (json!({"command": "unsubscribe", "hashtag": "#"}), RequestError::InvalidHashtag),
        (json!({"command": "gettweets", "username": ""}), RequestError::Format),
    ];

    for (value, expected) in cases {
        assert_eq!(Command::try_from(request(value.clone())), Err(expected), "{value}");
    }
}

#[test]
fn test_handshake() {
    let broker = Broker::new().into_shared();
    create(&broker, "alice");

    assert_eq!(
        register(&broker, request(json!({"command": "create", "username": "alice"}))),
        Err(HandshakeError::Registry(RegistryError::DuplicateName(
            "alice".to_string()
        )))
    );
    assert_eq!(
        register(&broker, request(json!({"command": "getusers"}))),
        Err(HandshakeError::Rejected(RequestError::Format))
    );
    assert_eq!(
        register(&broker, request(json!({"command": "create", "username": "way_too_long_name"}))),
        Err(HandshakeError::Rejected(RequestError::InvalidUsername))
    );
    assert_eq!(lock_broker(&broker).len(), 1);
}

#[test]
fn test_handshake_error_text() {
    assert_eq!(
        HandshakeError::Rejected(RequestError::InvalidUsername).to_string(),
        "username illegal, connection refused."
    );
    assert_eq!(
        HandshakeError::from(RegistryError::DuplicateName("a".to_string())).to_string(),
        "username illegal, connection refused."
    );
    assert_eq!(
        HandshakeError::from(RegistryError::CapacityExceeded(5)).to_string(),
        "error: max users logged in, connection refused."
    );
}

#[test]
fn test_sixth_registration_is_refused() {
    let broker = Broker::new().into_shared();
    for name in ["a", "b", "c", "d", "e"] {
        create(&broker, name);
    }
    let refused = register(&broker, request(json!({"command": "create", "username": "f"})));
    assert_eq!(
        refused,
        Err(HandshakeError::Registry(RegistryError::CapacityExceeded(5)))
    );
}

#[test]
fn test_getusers() {
    let broker = Broker::new().into_shared();
    let alice = create(&broker, "alice");
    create(&broker, "bob");

    assert_eq!(
        text(send(&broker, alice, json!({"command": "getusers"}))),
        "alice\nbob"
    );
}

#[test]
fn test_subscribe_responses() {
    let broker = Broker::new().into_shared();
    let alice = create(&broker, "alice");

    assert_eq!(subscribe(&broker, alice, "#a"), "operation success");
    assert_eq!(
        subscribe(&broker, alice, "#a"),
        "operation failed: sub #a failed, already exists or exceeds 3 limitation"
    );
    assert_eq!(subscribe(&broker, alice, "#b"), "operation success");
    assert_eq!(subscribe(&broker, alice, "#c"), "operation success");
    assert_eq!(
        subscribe(&broker, alice, "#d"),
        "operation failed: sub #d failed, already exists or exceeds 3 limitation"
    );

    let guard = lock_broker(&broker);
    let tags = guard.session(alice).unwrap().tags();
    assert_eq!(tags.len(), 3);
    assert!(!tags.contains("d"));
}

#[test]
fn test_unsubscribe_responses() {
    let broker = Broker::new().into_shared();
    let alice = create(&broker, "alice");

    assert_eq!(unsubscribe(&broker, alice, "#a"), "Hashtag not found");
    subscribe(&broker, alice, "#a");
    subscribe(&broker, alice, "#b");
    assert_eq!(unsubscribe(&broker, alice, "#c"), "Hashtag not found");
    assert_eq!(unsubscribe(&broker, alice, "#a"), "operation success");
    assert_eq!(unsubscribe(&broker, alice, "#ALL"), "operation success");
    assert_eq!(unsubscribe(&broker, alice, "#ALL"), "operation success");
    assert!(lock_broker(&broker).session(alice).unwrap().tags().is_empty());
}

#[test]
fn test_unsubscribe_unholdable_tag_is_not_found() {
    let broker = Broker::new().into_shared();
    let alice = create(&broker, "alice");
    subscribe(&broker, alice, "#a");

    assert_eq!(unsubscribe(&broker, alice, "#a b"), "Hashtag not found");
    assert_eq!(unsubscribe(&broker, alice, "#a#b"), "Hashtag not found");
    assert_eq!(unsubscribe(&broker, alice, "a"), "hashtag illegal format.");
    assert_eq!(lock_broker(&broker).session(alice).unwrap().tags().len(), 1);
}

#[test]
fn test_tweet_is_silent_and_fans_out() {
    let broker = Broker::new().into_shared();
    let alice = create(&broker, "alice");
    let bob = create(&broker, "bob");
    let carol = create(&broker, "carol");
    let dave = create(&broker, "dave");
    subscribe(&broker, bob, "#music");
    subscribe(&broker, carol, "#ALL");
    subscribe(&broker, dave, "#news");

    assert_eq!(tweet(&broker, alice, "hello", "#music #sports"), Reply::Silent);

    let line = "alice: \"hello\" #music #sports";
    assert_eq!(timeline(&broker, bob), line);
    assert_eq!(timeline(&broker, carol), line);
    assert_eq!(timeline(&broker, dave), "no tweets in timeline");
    assert_eq!(timeline(&broker, alice), "no tweets in timeline");
}

#[test]
fn test_timeline_lists_each_post_once() {
    let broker = Broker::new().into_shared();
    let alice = create(&broker, "alice");
    let bob = create(&broker, "bob");
    subscribe(&broker, bob, "#music");
    subscribe(&broker, bob, "#sports");

    tweet(&broker, alice, "first", "#music#sports");
    tweet(&broker, alice, "second", "#sports");

    assert_eq!(
        timeline(&broker, bob),
        "alice: \"first\" #music#sports\nalice: \"second\" #sports"
    );
}

#[test]
fn test_rejected_tweet_leaves_no_trace() {
    let broker = Broker::new().into_shared();
    let alice = create(&broker, "alice");
    let bob = create(&broker, "bob");
    subscribe(&broker, alice, "#ALL");
    subscribe(&broker, bob, "#ALL");

    let reply = tweet(&broker, alice, &"x".repeat(151), "#music");
    assert_eq!(reply, Reply::Text("message length illegal.".to_string()));

    let reply = tweet(&broker, alice, "hi", "#music##sports");
    assert_eq!(reply, Reply::Text("hashtag illegal format.".to_string()));

    assert_eq!(timeline(&broker, alice), "no tweets in timeline");
    assert_eq!(timeline(&broker, bob), "no tweets in timeline");
    assert_eq!(
        text(send(&broker, bob, json!({"command": "gettweets", "username": "alice"}))),
        "alice has no tweets in the system"
    );
}

#[test]
fn test_gettweets() {
    let broker = Broker::new().into_shared();
    let alice = create(&broker, "alice");
    let bob = create(&broker, "bob");

    assert_eq!(
        text(send(&broker, bob, json!({"command": "gettweets", "username": "alice"}))),
        "alice has no tweets in the system"
    );
    assert_eq!(
        text(send(&broker, bob, json!({"command": "gettweets", "username": "zoe"}))),
        "no user zoe in the system"
    );

    tweet(&broker, alice, "one", "#a");
    tweet(&broker, alice, "two", "#b#c");

    assert_eq!(
        text(send(&broker, bob, json!({"command": "gettweets", "username": "alice"}))),
        "alice: \"one\" #a\nalice: \"two\" #b#c"
    );
}

#[test]
fn test_author_sees_own_post_when_subscribed() {
    let broker = Broker::new().into_shared();
    let alice = create(&broker, "alice");
    subscribe(&broker, alice, "#me");

    tweet(&broker, alice, "note to self", "#me");
    assert_eq!(timeline(&broker, alice), "alice: \"note to self\" #me");
}

#[test]
fn test_format_errors_do_not_close() {
    let broker = Broker::new().into_shared();
    let alice = create(&broker, "alice");

    assert_eq!(
        send(&broker, alice, json!({"command": "create", "username": "other"})),
        Reply::Text("operation failed: already registered".to_string())
    );
    assert_eq!(
        send(&broker, alice, json!({"command": "create", "username": "bad name"})),
        Reply::Text("operation failed: already registered".to_string())
    );
    assert_eq!(
        send(&broker, alice, json!({"command": "subscribe", "hashtag": "nohash"})),
        Reply::Text("hashtag illegal format.".to_string())
    );
    assert_eq!(lock_broker(&broker).usernames(), ["alice"]);
}

#[test]
fn test_exit_reply() {
    let broker = Broker::new().into_shared();
    let alice = create(&broker, "alice");
    assert_eq!(
        send(&broker, alice, json!({"command": "exit"})),
        Reply::Exit("exiting".to_string())
    );
}

#[test]
fn test_execute_for_unknown_session_exits() {
    let mut broker = Broker::new();
    let id = broker.register(Username::parse("alice").unwrap()).unwrap();
    broker.unregister(id);

    assert!(matches!(execute(&mut broker, id, Command::GetFeed), Reply::Exit(_)));
    assert!(matches!(
        execute(&mut broker, id, Command::Subscribe(Tag::parse("#a").unwrap())),
        Reply::Exit(_)
    ));
}
