//! Wire protocol and shared domain types for the bomb-placing-robots
//! game: the big-endian, length-prefixed binary framing used on the
//! server<->client TCP link and the client<->GUI UDP link.
//!
//! This crate does no I/O of its own. `server` and `client` drive
//! [`codec::ServerSideCodec`]/[`codec::ClientSideCodec`] through
//! `tokio_util::codec::Framed` for the streaming TCP halves, and call
//! [`codec::encode_gui_message`]/[`types::GuiToClient::decode`] directly
//! against a `UdpSocket` for the one-shot UDP half.

pub mod blast;
pub mod codec;
pub mod error;
pub mod types;
pub mod wire;

pub use blast::affected_cells;
pub use codec::{encode_gui_message, ClientSideCodec, ServerSideCodec, DATAGRAM_SIZE};
pub use error::{EncodeError, ProtocolError};
pub use types::{
    Bomb, BombId, ClientMessage, ClientToGui, Direction, Event, GuiToClient, Player, PlayerId,
    Position, Score, ServerMessage, Turn,
};

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    use std::collections::BTreeMap;
    use tokio_util::codec::{Decoder, Encoder};

    #[test]
    fn position_round_trips() {
        let p = Position::new(7, 900);
        let mut buf = BytesMut::new();
        p.encode(&mut buf);
        let mut cur = wire::Cursor::new(&buf);
        assert_eq!(Position::try_decode(&mut cur), Some(p));
    }

    #[test]
    fn hello_round_trips_through_client_codec() {
        let msg = ServerMessage::Hello {
            server_name: "arena".into(),
            players_count: 4,
            size_x: 20,
            size_y: 15,
            game_length: 300,
            explosion_radius: 3,
            bomb_timer: 5,
        };
        let mut buf = BytesMut::new();
        let mut codec = ClientSideCodec;
        codec.encode(msg.clone(), &mut buf).unwrap();
        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, msg);
        assert!(buf.is_empty());
    }

    #[test]
    fn turn_with_events_round_trips() {
        let turn = Turn {
            turn: 12,
            events: vec![
                Event::BombPlaced {
                    bomb_id: 3,
                    position: Position::new(1, 1),
                },
                Event::BombExploded {
                    bomb_id: 3,
                    robots_destroyed: vec![0, 2],
                    blocks_destroyed: vec![Position::new(2, 1)],
                },
                Event::PlayerMoved {
                    player_id: 1,
                    position: Position::new(5, 5),
                },
                Event::BlockPlaced {
                    position: Position::new(9, 9),
                },
            ],
        };
        let msg = ServerMessage::Turn(turn.clone());
        let mut buf = BytesMut::new();
        let mut codec = ClientSideCodec;
        codec.encode(msg.clone(), &mut buf).unwrap();
        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn streaming_decode_survives_arbitrary_chunking() {
        let mut codec = ClientSideCodec;
        let mut whole = BytesMut::new();
        let messages = vec![
            ServerMessage::Hello {
                server_name: "a".into(),
                players_count: 2,
                size_x: 5,
                size_y: 5,
                game_length: 10,
                explosion_radius: 1,
                bomb_timer: 2,
            },
            ServerMessage::GameStarted {
                players: {
                    let mut m = BTreeMap::new();
                    m.insert(
                        0,
                        Player {
                            name: "bob".into(),
                            address: "127.0.0.1:1".into(),
                        },
                    );
                    m
                },
            },
            ServerMessage::GameEnded {
                scores: {
                    let mut m = BTreeMap::new();
                    m.insert(0, 3);
                    m
                },
            },
        ];
        for m in &messages {
            codec.encode(m.clone(), &mut whole).unwrap();
        }

        // Feed the concatenated bytes back one byte at a time and confirm
        // every message is recovered in order, none ever handed back
        // partially.
        let mut rx = BytesMut::new();
        let mut decoded = Vec::new();
        for byte in whole.iter().copied() {
            rx.extend_from_slice(&[byte]);
            while let Some(m) = codec.decode(&mut rx).unwrap() {
                decoded.push(m);
            }
        }
        assert_eq!(decoded, messages);
    }

    #[test]
    fn unknown_tag_is_a_hard_error() {
        let mut codec = ClientSideCodec;
        let mut buf = BytesMut::from(&[200u8][..]);
        assert!(codec.decode(&mut buf).is_err());
    }

    #[test]
    fn invalid_direction_is_a_hard_error() {
        let mut codec = ServerSideCodec;
        let mut buf = BytesMut::from(&[3u8, 9u8][..]); // CS_MOVE, direction=9
        assert!(codec.decode(&mut buf).is_err());
    }

    #[test]
    fn gui_move_with_invalid_direction_is_dropped_not_errored() {
        assert_eq!(GuiToClient::decode(&[2, 4]), None);
        assert_eq!(
            GuiToClient::decode(&[2, 0]),
            Some(GuiToClient::Move {
                direction: Direction::Up
            })
        );
    }

    #[test]
    fn gui_place_bomb_requires_exactly_one_byte() {
        assert_eq!(GuiToClient::decode(&[0]), Some(GuiToClient::PlaceBomb));
        assert_eq!(GuiToClient::decode(&[0, 0]), None);
    }

    #[test]
    fn client_to_gui_lobby_round_trips() {
        let mut players = BTreeMap::new();
        players.insert(
            0,
            Player {
                name: "robo".into(),
                address: "10.0.0.1:9".into(),
            },
        );
        let msg = ClientToGui::Lobby {
            server_name: "arena".into(),
            players_count: 2,
            size_x: 8,
            size_y: 8,
            game_length: 50,
            explosion_radius: 2,
            bomb_timer: 4,
            players,
        };
        let buf = encode_gui_message(&msg).unwrap();
        let decoded = ClientToGui::decode(&buf).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn string_over_255_bytes_fails_to_encode() {
        let long = "x".repeat(300);
        let msg = ClientMessage::Join { name: long };
        let mut buf = BytesMut::new();
        let mut codec = ServerSideCodec;
        assert!(Encoder::<ClientMessage>::encode(&mut codec, msg, &mut buf).is_err());
    }
}
