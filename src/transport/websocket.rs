//! WebSocket transport
//!
//! Accepts connections and supervises each one through its lifecycle:
//!
//! ```text
//! Connecting -> Registering -> Active -> Closing -> Closed
//! ```
//!
//! - Connecting: refuse straight away when the broker is full.
//! - Registering: the first request must be a valid `create`.
//! - Active: read one request, dispatch it, write at most one response.
//! - Closing: unregister the session and release its slot.
//!
//! Every connection gets its own reader task and a writer task fed through an
//! unbounded channel. Teardown drops the channel, gives the writer a short
//! grace period to flush and close, then aborts it so a stalled peer cannot
//! pin a task.

use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{WebSocketStream, accept_async};
use tracing::{Instrument, debug, info, info_span, warn};
use tungstenite::protocol::Message as WsMessage;
use uuid::Uuid;

use crate::broker::session::SessionId;
use crate::broker::{SharedBroker, lock_broker};
use crate::dispatch::{self, Reply};
use crate::transport::message::{Inbound, REGISTERED, decode_frame};
use crate::utils::error::{HandshakeError, RegistryError, RequestError, ServerError};

type WsWriter = SplitSink<WebSocketStream<TcpStream>, WsMessage>;
type WsReader = SplitStream<WebSocketStream<TcpStream>>;

const WRITER_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Registering,
    Active(SessionId),
    Closing(SessionId),
    Closed,
}

pub async fn bind(addr: &str) -> Result<TcpListener, ServerError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        })
}

/// Accepts connections forever, one task per connection.
pub async fn start_websocket_server(listener: TcpListener, broker: SharedBroker) {
    if let Ok(addr) = listener.local_addr() {
        info!("ttweet server listening on ws://{addr}");
    }

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("accept failed: {e}");
                continue;
            }
        };

        let broker = broker.clone();
        let client_id = format!("client-{}", Uuid::new_v4());
        let span = info_span!("conn", id = %client_id, %peer);

        tokio::spawn(handle_connection(stream, broker).instrument(span));
    }
}

async fn handle_connection(stream: TcpStream, broker: SharedBroker) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake error: {e}");
            return;
        }
    };

    let (ws_sender, ws_receiver) = ws_stream.split();
    let (tx, rx) = mpsc::unbounded_channel::<WsMessage>();
    let mut writer = spawn_writer(ws_sender, rx);

    let mut connection = Connection {
        broker,
        receiver: ws_receiver,
        outbound: tx,
    };

    let mut state = ConnectionState::Connecting;
    while state != ConnectionState::Closed {
        state = connection.step(state).await;
        debug!(?state, "connection state");
    }

    // Dropping the sender lets the writer drain and close the socket.
    drop(connection);
    if tokio::time::timeout(WRITER_GRACE, &mut writer).await.is_err() {
        debug!("writer stalled, aborting");
        writer.abort();
    }
}

fn spawn_writer(
    mut ws_sender: WsWriter,
    mut rx: mpsc::UnboundedReceiver<WsMessage>,
) -> JoinHandle<()> {
    tokio::spawn(
        async move {
            while let Some(msg) = rx.recv().await {
                if let Err(e) = ws_sender.send(msg).await {
                    debug!("failed to send: {e}");
                    return;
                }
            }
            let _ = ws_sender.close().await;
        }
        .in_current_span(),
    )
}

struct Connection {
    broker: SharedBroker,
    receiver: WsReader,
    outbound: mpsc::UnboundedSender<WsMessage>,
}

impl Connection {
    async fn step(&mut self, state: ConnectionState) -> ConnectionState {
        match state {
            ConnectionState::Connecting => self.admit(),
            ConnectionState::Registering => self.register().await,
            ConnectionState::Active(id) => self.serve(id).await,
            ConnectionState::Closing(id) => {
                lock_broker(&self.broker).unregister(id);
                ConnectionState::Closed
            }
            ConnectionState::Closed => ConnectionState::Closed,
        }
    }

    fn admit(&self) -> ConnectionState {
        let full = {
            let broker = lock_broker(&self.broker);
            broker
                .is_full()
                .then(|| RegistryError::CapacityExceeded(broker.capacity()))
        };

        match full {
            Some(refusal) => {
                info!("refused: {refusal}");
                self.send(refusal.to_string());
                ConnectionState::Closed
            }
            None => ConnectionState::Registering,
        }
    }

    async fn register(&mut self) -> ConnectionState {
        loop {
            let frame = tokio::select! {
                frame = self.receiver.next() => frame,
                _ = self.outbound.closed() => return ConnectionState::Closed,
            };

            let msg = match frame {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => {
                    debug!("read failed before registration: {e}");
                    return ConnectionState::Closed;
                }
                None => return ConnectionState::Closed,
            };

            let request = match decode_frame(msg) {
                Inbound::Empty => continue,
                Inbound::Closed | Inbound::Malformed => return ConnectionState::Closed,
                Inbound::Request(request) => request,
            };

            let outcome = request
                .map_err(|_| HandshakeError::Rejected(RequestError::Format))
                .and_then(|msg| dispatch::register(&self.broker, msg));

            return match outcome {
                Ok(id) => {
                    self.send(REGISTERED);
                    ConnectionState::Active(id)
                }
                Err(e) => {
                    info!("registration refused: {e:?}");
                    self.send(e.to_string());
                    ConnectionState::Closed
                }
            };
        }
    }

    async fn serve(&mut self, id: SessionId) -> ConnectionState {
        loop {
            let frame = tokio::select! {
                frame = self.receiver.next() => frame,
                _ = self.outbound.closed() => {
                    debug!(%id, "writer gone");
                    return ConnectionState::Closing(id);
                }
            };

            let msg = match frame {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => {
                    debug!(%id, "read failed: {e}");
                    return ConnectionState::Closing(id);
                }
                None => return ConnectionState::Closing(id),
            };

            let request = match decode_frame(msg) {
                Inbound::Empty => continue,
                Inbound::Closed => return ConnectionState::Closing(id),
                Inbound::Malformed => {
                    debug!(%id, "binary frame is not UTF-8");
                    return ConnectionState::Closing(id);
                }
                Inbound::Request(Ok(request)) => request,
                Inbound::Request(Err(e)) => {
                    debug!(%id, "undecodable request: {e}");
                    self.send(RequestError::Format.to_string());
                    continue;
                }
            };

            match dispatch::dispatch(&self.broker, id, request) {
                Reply::Text(text) => self.send(text),
                Reply::Silent => {}
                Reply::Exit(text) => {
                    self.send(text);
                    return ConnectionState::Closing(id);
                }
            }
        }
    }

    /// Queues a text frame for the writer task.
    fn send(&self, text: impl Into<String>) {
        if self.outbound.send(WsMessage::text(text.into())).is_err() {
            debug!("writer closed, response dropped");
        }
    }
}
