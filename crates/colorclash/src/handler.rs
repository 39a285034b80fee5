//! Per-connection handler: command decoding and event fan-out.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The connection is split in two:
//!   1. a writer task drains the player's event channel into the socket,
//!   2. the handler loop decodes commands and routes them to the registry.
//!
//! Validation failures become a `rejected` event for this connection only.

use std::sync::Arc;

use colorclash_protocol::{ClientCommand, Codec, PlayerId, ServerEvent};
use colorclash_room::{EventSender, RoomAction, RoomError};
use colorclash_transport::{WebSocketConnection, WebSocketSender};
use tokio::sync::mpsc;

use crate::ColorclashError;
use crate::server::ServerState;

/// Drop guard that takes the player out of their room when the handler
/// exits, however it exits.
///
/// `Drop` is synchronous, so the async leave runs in a spawned task.
struct DisconnectGuard<C: Codec> {
    player_id: PlayerId,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for DisconnectGuard<C> {
    fn drop(&mut self) {
        let player_id = self.player_id;
        let registry = Arc::clone(&self.state.registry);
        tokio::spawn(async move {
            match registry.leave_room(player_id).await {
                Ok(()) => tracing::debug!(%player_id, "left room on disconnect"),
                Err(RoomError::NotInRoom(_)) => {}
                Err(e) => tracing::debug!(%player_id, error = %e, "leave on disconnect failed"),
            }
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), ColorclashError> {
    let conn_id = conn.id();
    let player_id = PlayerId(conn_id.into_inner());
    tracing::info!(%conn_id, %player_id, peer = %conn.peer_addr(), "player connected");

    let (sink, mut stream) = conn.split();
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_events(sink, events_rx, Arc::clone(&state)));

    let _guard = DisconnectGuard {
        player_id,
        state: Arc::clone(&state),
    };

    let result = loop {
        let data = match stream.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(%player_id, "connection closed cleanly");
                break Ok(());
            }
            Err(e) => break Err(ColorclashError::from(e)),
        };

        let cmd: ClientCommand = match state.codec.decode(&data) {
            Ok(cmd) => cmd,
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "failed to decode command");
                reject(&events_tx, format!("invalid command: {e}"));
                continue;
            }
        };

        if let Err(e) = handle_command(&state, player_id, cmd, &events_tx).await {
            tracing::debug!(%player_id, error = %e, "command rejected");
            reject(&events_tx, e.to_string());
        }
    };

    // The room may still hold a clone of the event sender until the guard's
    // leave runs; stop writing to a socket nobody reads.
    writer.abort();
    result
}

/// Routes one decoded command. Lobby commands go to the registry, the rest
/// to the player's room.
async fn handle_command<C: Codec>(
    state: &ServerState<C>,
    player_id: PlayerId,
    cmd: ClientCommand,
    events_tx: &EventSender,
) -> Result<(), RoomError> {
    let registry = &state.registry;
    match cmd {
        ClientCommand::ListRooms => {
            let rooms = registry.list().await;
            let _ = events_tx.send(ServerEvent::RoomList { rooms });
        }
        ClientCommand::CreateRoom {
            username,
            room_name,
        } => {
            let room_id = registry
                .create_room(player_id, &username, room_name, events_tx.clone())
                .await?;
            tracing::info!(%player_id, %room_id, "room created by player");
        }
        ClientCommand::JoinRoom { username, room_id } => {
            registry
                .join_room(player_id, &username, room_id, events_tx.clone())
                .await?;
        }
        other => match RoomAction::try_from(other) {
            Ok(action) => registry.dispatch(player_id, action).await?,
            Err(cmd) => tracing::warn!(%player_id, ?cmd, "unroutable command"),
        },
    }
    Ok(())
}

fn reject(events_tx: &EventSender, reason: String) {
    let _ = events_tx.send(ServerEvent::Rejected { reason });
}

/// Drains a player's event channel into their socket.
async fn write_events<C: Codec>(
    mut sink: WebSocketSender,
    mut events_rx: mpsc::UnboundedReceiver<ServerEvent>,
    state: Arc<ServerState<C>>,
) {
    let conn_id = sink.id();
    while let Some(event) = events_rx.recv().await {
        let bytes = match state.codec.encode(&event) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(%conn_id, error = %e, "failed to encode event");
                continue;
            }
        };
        if let Err(e) = sink.send(bytes).await {
            tracing::debug!(%conn_id, error = %e, "send failed, stopping writer");
            break;
        }
    }
    let _ = sink.close().await;
}
