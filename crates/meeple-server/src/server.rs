//! WebSocket server and connection handling.

use crate::protocol::{ClientMessage, ServerMessage};
use crate::room::{MatchRoom, RoomError};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{error, info, warn};
use uuid::Uuid;

/// How often the liveness sweep runs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Server state shared across all connections.
pub struct ServerState {
    /// The whole consistency domain: sessions, invites, and the match all
    /// mutate under this one lock.
    pub room: Mutex<MatchRoom>,
    /// Mapping from connection ID to its outbound message sender. Advisory
    /// plumbing only; deliberately outside the room lock.
    pub senders: DashMap<Uuid, mpsc::UnboundedSender<ServerMessage>>,
}

impl ServerState {
    pub fn new(room: MatchRoom) -> Self {
        Self {
            room: Mutex::new(room),
            senders: DashMap::new(),
        }
    }

    /// Send a message to a specific connection.
    pub fn send_to(&self, connection: Uuid, msg: ServerMessage) {
        if let Some(sender) = self.senders.get(&connection) {
            let _ = sender.send(msg);
        }
    }
}

/// Run the WebSocket server.
pub async fn run_server(addr: SocketAddr, state: Arc<ServerState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Meeple host listening on {}", addr);

    // Liveness sweep: expired sessions flip to disconnected, stale invites
    // expire. Disconnection never forfeits the match.
    let sweeper = Arc::clone(&state);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            if let Ok(mut room) = sweeper.room.lock() {
                room.sweep(Instant::now());
            }
        }
    });

    while let Ok((stream, peer_addr)) = listener.accept().await {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }

    Ok(())
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<ServerState>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New WebSocket connection from {}", addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let connection = Uuid::new_v4();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    state.senders.insert(connection, tx);

    // Forward queued replies to the socket.
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(text) = serde_json::to_string(&msg) {
                if ws_sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        }
    });

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if let Ok(client_msg) = serde_json::from_str::<ClientMessage>(&text) {
                    handle_message(connection, client_msg, &state);
                } else {
                    warn!("Invalid message from {}: {}", addr, text);
                }
            }
            Ok(Message::Close(_)) => {
                info!("Client {} closing connection", addr);
                break;
            }
            Ok(Message::Ping(data)) => {
                state.send_to(connection, ServerMessage::Pong);
                let _ = data;
            }
            Err(e) => {
                error!("WebSocket error from {}: {}", addr, e);
                break;
            }
            _ => {}
        }
    }

    // A dropped socket is not a departure: the session stays until it
    // times out or the player reconnects by name.
    state.senders.remove(&connection);
    send_task.abort();

    info!("Connection closed for {}", addr);
    Ok(())
}

fn reply_err(state: &Arc<ServerState>, connection: Uuid, err: RoomError) {
    state.send_to(
        connection,
        ServerMessage::Error {
            message: err.to_string(),
        },
    );
}

/// Handle a client message. Every arm takes the room lock, performs one
/// short synchronous operation, and replies on the requesting connection.
fn handle_message(connection: Uuid, msg: ClientMessage, state: &Arc<ServerState>) {
    let mut room = match state.room.lock() {
        Ok(room) => room,
        Err(poisoned) => poisoned.into_inner(),
    };

    match msg {
        ClientMessage::Join { name } => match room.join(&name) {
            Ok((token, slot, view)) => {
                info!("{} joined as slot {}", name, slot);
                state.send_to(connection, ServerMessage::Joined { token, slot, view });
            }
            Err(e) => reply_err(state, connection, e),
        },

        ClientMessage::Heartbeat { token } => match room.heartbeat(token) {
            Ok(()) => state.send_to(connection, ServerMessage::HeartbeatAck),
            Err(e) => reply_err(state, connection, e),
        },

        ClientMessage::Leave { token } => match room.leave(token) {
            Ok(()) => state.send_to(connection, ServerMessage::Left),
            Err(e) => reply_err(state, connection, e),
        },

        ClientMessage::Invite { token, to, rules } => match room.invite(token, &to, rules) {
            Ok(invite) => {
                info!("Invite {} -> {}", invite.from, invite.to);
                state.send_to(connection, ServerMessage::InviteSent { invite });
            }
            Err(e) => reply_err(state, connection, e),
        },

        ClientMessage::RespondInvite { invite_id, accept } => {
            match room.respond_invite(invite_id, accept) {
                Ok(invite) => {
                    info!("Invite {} resolved: {:?}", invite.id, invite.status);
                    state.send_to(connection, ServerMessage::InviteResolved { invite });
                }
                Err(e) => reply_err(state, connection, e),
            }
        }

        ClientMessage::Poll { token } => match room.poll(token) {
            Ok(view) => state.send_to(connection, ServerMessage::View { view }),
            Err(e) => reply_err(state, connection, e),
        },

        ClientMessage::SubmitTurn {
            token,
            x,
            y,
            rot_deg,
            meeple,
        } => match room.submit_turn(token, x, y, rot_deg, meeple) {
            Ok(view) => state.send_to(connection, ServerMessage::View { view }),
            Err(e) => reply_err(state, connection, e),
        },

        ClientMessage::PublishIntent {
            token,
            x,
            y,
            rot_deg,
            meeple,
            locked,
        } => match room.publish_intent(token, x, y, rot_deg, meeple, locked) {
            Ok(view) => state.send_to(connection, ServerMessage::View { view }),
            Err(e) => reply_err(state, connection, e),
        },

        ClientMessage::ClearIntent { token } => match room.clear_intent(token) {
            Ok(view) => state.send_to(connection, ServerMessage::View { view }),
            Err(e) => reply_err(state, connection, e),
        },

        ClientMessage::Resign { token } => match room.resign(token) {
            Ok(view) => state.send_to(connection, ServerMessage::View { view }),
            Err(e) => reply_err(state, connection, e),
        },

        ClientMessage::Ping => {
            state.send_to(connection, ServerMessage::Pong);
        }
    }
}
