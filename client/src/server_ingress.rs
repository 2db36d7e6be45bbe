//! Consumes the TCP event stream from the game server, drives the
//! client-side world model and the shared arbiter, and forwards
//! outbound client messages the other direction.
//!
//! Grounded on `examples/original_source/bomb-it-client.cpp`'s
//! `LobbyHandler`/`GameHandler`/`handle_hello`, and on
//! `relay-server/src/message_relay.rs`'s split-sink/stream task pair for
//! the task shape.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, Mutex};
use tokio_util::codec::Framed;

use protocol::{ClientMessage, ClientSideCodec, ClientToGui, ProtocolError, ServerMessage};

use crate::arbiter::{Arbiter, Phase};
use crate::gui::send_snapshot;
use crate::world::{HelloInfo, World};

/// Applies one server message to the world model, returning the phase
/// the arbiter should move to (if any) and the snapshot that should be
/// sent to the GUI (if any). Kept pure and separate from I/O so it can
/// be exercised without a real socket.
pub fn apply(
    world: &mut World,
    msg: ServerMessage,
) -> Result<(Option<Phase>, Option<ClientToGui>), ProtocolError> {
    match msg {
        ServerMessage::Hello {
            server_name,
            players_count,
            size_x,
            size_y,
            game_length,
            explosion_radius,
            bomb_timer,
        } => {
            world.set_hello(HelloInfo {
                server_name,
                players_count,
                size_x,
                size_y,
                game_length,
                explosion_radius,
                bomb_timer,
            });
            Ok((Some(Phase::Lobby), world.lobby_snapshot()))
        }
        ServerMessage::AcceptedPlayer { id, player } => {
            world.accept_player(id, player);
            Ok((None, world.lobby_snapshot()))
        }
        ServerMessage::GameStarted { players } => {
            world.start_game(players);
            Ok((Some(Phase::InGame), world.game_snapshot()))
        }
        ServerMessage::Turn(turn) => {
            world.apply_turn(&turn)?;
            Ok((None, world.game_snapshot()))
        }
        ServerMessage::GameEnded { .. } => {
            world.end_game();
            Ok((Some(Phase::Lobby), world.lobby_snapshot()))
        }
    }
}

/// Forwards everything the GUI-ingress task stages onto the TCP sink,
/// until the channel closes or the write fails.
pub async fn run_outbound(
    mut sink: impl futures::Sink<ClientMessage, Error = protocol::EncodeError> + Unpin,
    mut from_gui: mpsc::UnboundedReceiver<ClientMessage>,
) {
    while let Some(msg) = from_gui.recv().await {
        if sink.send(msg).await.is_err() {
            break;
        }
    }
}

/// Reads the server's message stream forever, maintaining the world
/// model and arbiter and pushing a snapshot to the GUI after each
/// message. Returns on stream end or a fatal protocol error — per
/// a protocol violation on this link aborts the
/// client process; the caller is expected to treat a returned `Err` that
/// way.
pub async fn run_inbound(
    mut stream: impl futures::Stream<Item = Result<ServerMessage, ProtocolError>> + Unpin,
    arbiter: Arc<Arbiter>,
    world: Arc<Mutex<World>>,
    gui_socket: Arc<UdpSocket>,
) -> Result<(), ProtocolError> {
    while let Some(msg) = stream.next().await {
        let msg = msg?;
        let mut guard = world.lock().await;
        let (phase, snapshot) = apply(&mut guard, msg)?;
        drop(guard);
        if let Some(phase) = phase {
            arbiter.set(phase).await;
        }
        if let Some(snapshot) = snapshot {
            if let Err(error) = send_snapshot(&gui_socket, &snapshot).await {
                tracing::warn!(%error, "failed to send gui snapshot");
            }
        }
    }
    Ok(())
}

/// Splits a framed TCP connection into its sink/stream halves, the way
/// `relay-server/src/message_relay.rs` splits its websocket.
pub fn split_connection(
    framed: Framed<tokio::net::TcpStream, ClientSideCodec>,
) -> (
    impl futures::Sink<ClientMessage, Error = protocol::EncodeError>,
    impl futures::Stream<Item = Result<ServerMessage, ProtocolError>>,
) {
    framed.split()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn hello_msg() -> ServerMessage {
        ServerMessage::Hello {
            server_name: "arena".into(),
            players_count: 1,
            size_x: 3,
            size_y: 3,
            game_length: 5,
            explosion_radius: 1,
            bomb_timer: 2,
        }
    }

    #[test]
    fn hello_moves_to_lobby_and_emits_lobby_snapshot() {
        let mut world = World::new();
        let (phase, snapshot) = apply(&mut world, hello_msg()).unwrap();
        assert_eq!(phase, Some(Phase::Lobby));
        assert!(matches!(snapshot, Some(ClientToGui::Lobby { .. })));
    }

    #[test]
    fn game_started_moves_to_ingame_and_emits_game_snapshot() {
        let mut world = World::new();
        apply(&mut world, hello_msg()).unwrap();
        let mut players = BTreeMap::new();
        players.insert(
            0,
            protocol::Player {
                name: "a".into(),
                address: "1.1.1.1:1".into(),
            },
        );
        let (phase, snapshot) = apply(&mut world, ServerMessage::GameStarted { players }).unwrap();
        assert_eq!(phase, Some(Phase::InGame));
        assert!(matches!(snapshot, Some(ClientToGui::Game { .. })));
    }

    #[test]
    fn game_ended_returns_to_lobby() {
        let mut world = World::new();
        apply(&mut world, hello_msg()).unwrap();
        let (phase, _) = apply(
            &mut world,
            ServerMessage::GameEnded {
                scores: BTreeMap::new(),
            },
        )
        .unwrap();
        assert_eq!(phase, Some(Phase::Lobby));
    }
}
