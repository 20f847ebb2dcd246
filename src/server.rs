//! WebSocket transport.
//!
//! Binds connections to identities through the `link-user` handshake and
//! forwards every other text frame to the [`SessionRouter`]. Envelopes are
//! delivered while the router lock is held, router first and hub second.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::body::Body;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::Request;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use rand::Rng;
use tokio::sync::mpsc;
use tower::ServiceBuilder;
use tracing::{debug, error, info, instrument, warn};

use crate::config::ServerConfig;
use crate::protocol::{
    ErrorReply, IS_READY, LINK_USER, NOT_REGISTERED, Outgoing, PING, PONG, RawMessage,
    ServerEvent, UserInfo,
};
use crate::router::{Channel, Envelope, SessionRouter};
use crate::session::UserId;

/// Handle for one open socket.
pub type ConnectionId = u64;

#[derive(Debug)]
struct Connection {
    channel: Channel,
    identity: Option<UserId>,
    tx: mpsc::UnboundedSender<String>,
}

/// Open connections and their outbound queues.
#[derive(Debug, Default)]
pub struct ConnectionHub {
    next_id: ConnectionId,
    connections: HashMap<ConnectionId, Connection>,
}

impl ConnectionHub {
    /// Creates an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an unbound connection.
    pub fn register(
        &mut self,
        channel: Channel,
        tx: mpsc::UnboundedSender<String>,
    ) -> ConnectionId {
        let id = self.next_id;
        self.next_id += 1;
        self.connections.insert(
            id,
            Connection {
                channel,
                identity: None,
                tx,
            },
        );
        debug!(connection = id, %channel, "Connection opened");
        id
    }

    /// Binds a connection to an identity, returning the previous one.
    pub fn bind(&mut self, connection: ConnectionId, identity: UserId) -> Option<UserId> {
        self.connections
            .get_mut(&connection)
            .and_then(|c| c.identity.replace(identity))
    }

    /// Identity bound to the connection.
    pub fn identity(&self, connection: ConnectionId) -> Option<&UserId> {
        self.connections
            .get(&connection)
            .and_then(|c| c.identity.as_ref())
    }

    /// Removes a connection, returning its identity if it was bound.
    pub fn unregister(&mut self, connection: ConnectionId) -> Option<UserId> {
        debug!(connection, "Connection closed");
        self.connections
            .remove(&connection)
            .and_then(|c| c.identity)
    }

    /// Number of open connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Returns true when nothing is connected.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Queues a frame on one connection.
    pub fn send_to(&self, connection: ConnectionId, message: &Outgoing) {
        let Some(conn) = self.connections.get(&connection) else {
            return;
        };
        if let Some(text) = render(message) {
            // A closed receiver means the socket is going away.
            let _ = conn.tx.send(text);
        }
    }

    /// Queues each envelope on every connection of its recipient and channel.
    #[instrument(skip_all, fields(count = envelopes.len()))]
    pub fn deliver(&self, envelopes: Vec<Envelope>) {
        for envelope in envelopes {
            let Some(text) = render(&envelope.message) else {
                continue;
            };
            let mut delivered = 0;
            for conn in self.connections.values().filter(|c| {
                c.channel == envelope.channel && c.identity.as_deref() == Some(envelope.to.as_str())
            }) {
                if conn.tx.send(text.clone()).is_ok() {
                    delivered += 1;
                }
            }
            if delivered == 0 {
                debug!(to = %envelope.to, channel = %envelope.channel, "Recipient not connected");
            }
        }
    }
}

fn render(message: &Outgoing) -> Option<String> {
    match message.to_text() {
        Ok(text) => Some(text),
        Err(e) => {
            error!(error = %e, "Failed to serialize outgoing frame");
            None
        }
    }
}

/// What a text frame means to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Keep-alive.
    Ping,
    /// Handshake, with the identity the client already holds.
    LinkUser(Option<UserId>),
    /// Anything else, for the router.
    Event,
}

impl Frame {
    /// Classifies a text frame.
    pub fn classify(text: &str) -> Self {
        if text == PING {
            return Self::Ping;
        }
        match RawMessage::parse(text) {
            Ok(raw) if raw.event == LINK_USER => Self::LinkUser(
                raw.info
                    .as_str()
                    .filter(|id| !id.is_empty())
                    .map(str::to_owned),
            ),
            _ => Self::Event,
        }
    }
}

fn mint_user_id() -> UserId {
    format!("{:016x}", rand::rng().random::<u64>())
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        warn!("Recovering poisoned lock");
        poisoned.into_inner()
    })
}

/// Shared server state.
#[derive(Debug, Clone)]
pub struct AppState {
    router: Arc<Mutex<SessionRouter>>,
    hub: Arc<Mutex<ConnectionHub>>,
}

impl AppState {
    /// Wraps a router.
    pub fn new(router: SessionRouter) -> Self {
        Self {
            router: Arc::new(Mutex::new(router)),
            hub: Arc::new(Mutex::new(ConnectionHub::new())),
        }
    }

    /// Registers a connection on `channel`.
    pub fn open(&self, channel: Channel, tx: mpsc::UnboundedSender<String>) -> ConnectionId {
        lock(&self.hub).register(channel, tx)
    }

    /// Handles one text frame from a connection.
    #[instrument(skip(self, text))]
    pub fn on_text(&self, connection: ConnectionId, channel: Channel, text: &str) {
        let mut router = lock(&self.router);
        let mut hub = lock(&self.hub);

        match Frame::classify(text) {
            Frame::Ping => hub.send_to(connection, &Outgoing::Text(PONG)),
            Frame::LinkUser(existing) => {
                let (identity, reply) = match existing {
                    Some(id) => (id, Outgoing::Text(IS_READY)),
                    None => {
                        let id = mint_user_id();
                        let reply = Outgoing::from(ServerEvent::SaveUser(UserInfo {
                            user_id: id.clone(),
                        }));
                        (id, reply)
                    }
                };
                info!(user_id = %identity, "Connection linked");
                let previous = hub.bind(connection, identity.clone());
                if previous.as_ref() != Some(&identity) {
                    if let Some(previous) = previous {
                        hub.deliver(router.disconnect(&previous, channel));
                    }
                    router.connect(&identity, channel);
                }
                hub.send_to(connection, &reply);
            }
            Frame::Event => match hub.identity(connection).cloned() {
                Some(identity) => hub.deliver(router.handle(&identity, channel, text)),
                None => {
                    warn!("Event before link-user");
                    hub.send_to(connection, &Outgoing::from(ErrorReply::new(NOT_REGISTERED)));
                }
            },
        }
    }

    /// Drops a connection and runs the router's disconnect path.
    #[instrument(skip(self))]
    pub fn on_close(&self, connection: ConnectionId, channel: Channel) {
        let mut router = lock(&self.router);
        let mut hub = lock(&self.hub);
        if let Some(identity) = hub.unregister(connection) {
            hub.deliver(router.disconnect(&identity, channel));
        }
    }
}

async fn handle_socket(socket: WebSocket, state: AppState, channel: Channel) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let connection = state.open(channel, tx);

    let writer = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => state.on_text(connection, channel, text.as_str()),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(connection, error = %e, "Socket error");
                break;
            }
        }
    }

    state.on_close(connection, channel);
    writer.abort();
}

async fn lobby_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, Channel::Lobby))
}

async fn game_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, Channel::Game))
}

/// Builds the HTTP application with the lobby and game endpoints.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/lobby", get(lobby_socket))
        .route("/reversi", get(game_socket))
        .layer(ServiceBuilder::new().map_request(|req: Request<Body>| {
            info!(method = %req.method(), uri = %req.uri(), "Incoming HTTP request");
            req
        }))
        .with_state(state)
}

/// Serves until ctrl-c.
#[instrument(skip(config), fields(addr = %config.bind_addr()))]
pub async fn serve(config: &ServerConfig) -> std::io::Result<()> {
    let state = AppState::new(SessionRouter::from_config(config));
    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    info!(addr = %listener.local_addr()?, "Server ready");

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for ctrl-c");
        return;
    }
    info!("Shutting down");
}
