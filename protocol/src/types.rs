//! Domain types and message shapes shared by the server and client.
//!
//! Field layout and tag values are taken from the original
//! implementation's `message_types.h` so that every message on this wire
//! remains byte-compatible with what it specifies, even though nothing
//! here shares its code.

use std::collections::BTreeMap;

use bytes::BytesMut;

use crate::error::{EncodeError, ProtocolError};
use crate::wire::{put_count, put_string, Cursor};

pub type PlayerId = u8;
pub type BombId = u32;
pub type Score = u32;

/// A single grid cell. Always satisfies `0 <= x < size_x`, `0 <= y < size_y`
/// for whatever grid it was produced against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub x: u16,
    pub y: u16,
}

impl Position {
    pub fn new(x: u16, y: u16) -> Self {
        Position { x, y }
    }

    pub fn encode(&self, out: &mut BytesMut) {
        use bytes::BufMut;
        out.put_u16(self.x);
        out.put_u16(self.y);
    }

    pub fn try_decode(cur: &mut Cursor) -> Option<Position> {
        let x = cur.try_u16()?;
        let y = cur.try_u16()?;
        Some(Position { x, y })
    }

    /// The cell one step from `self` in `dir`, if that step stays within
    /// a `size_x` x `size_y` grid.
    pub fn stepped(&self, dir: Direction, size_x: u16, size_y: u16) -> Option<Position> {
        match dir {
            Direction::Up => (self.y + 1 < size_y).then(|| Position::new(self.x, self.y + 1)),
            Direction::Down => self
                .y
                .checked_sub(1)
                .map(|y| Position::new(self.x, y)),
            Direction::Right => (self.x + 1 < size_x).then(|| Position::new(self.x + 1, self.y)),
            Direction::Left => self
                .x
                .checked_sub(1)
                .map(|x| Position::new(x, self.y)),
        }
    }
}

/// Movement direction, matching `message_types.h`'s `Direction` enum values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up = 0,
    Right = 1,
    Down = 2,
    Left = 3,
}

impl Direction {
    pub fn from_u8(b: u8) -> Result<Direction, ProtocolError> {
        match b {
            0 => Ok(Direction::Up),
            1 => Ok(Direction::Right),
            2 => Ok(Direction::Down),
            3 => Ok(Direction::Left),
            other => Err(ProtocolError::InvalidDirection(other)),
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub name: String,
    pub address: String,
}

impl Player {
    pub fn encode(&self, out: &mut BytesMut) -> Result<(), EncodeError> {
        put_string(out, &self.name)?;
        put_string(out, &self.address)?;
        Ok(())
    }

    pub fn try_decode(cur: &mut Cursor) -> Option<Player> {
        let name = cur.try_string()?;
        let address = cur.try_string()?;
        Some(Player { name, address })
    }
}

/// A live bomb as rendered to the GUI: where it sits and how many turns
/// remain before it goes off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bomb {
    pub position: Position,
    pub timer: u16,
}

impl Bomb {
    pub fn encode(&self, out: &mut BytesMut) {
        use bytes::BufMut;
        self.position.encode(out);
        out.put_u16(self.timer);
    }

    pub fn try_decode(cur: &mut Cursor) -> Option<Bomb> {
        let position = Position::try_decode(cur)?;
        let timer = cur.try_u16()?;
        Some(Bomb { position, timer })
    }
}

/// One event nested inside a `Turn`, tagged 0..3 on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    BombPlaced {
        bomb_id: BombId,
        position: Position,
    },
    BombExploded {
        bomb_id: BombId,
        robots_destroyed: Vec<PlayerId>,
        blocks_destroyed: Vec<Position>,
    },
    PlayerMoved {
        player_id: PlayerId,
        position: Position,
    },
    BlockPlaced {
        position: Position,
    },
}

const EVENT_BOMB_PLACED: u8 = 0;
const EVENT_BOMB_EXPLODED: u8 = 1;
const EVENT_PLAYER_MOVED: u8 = 2;
const EVENT_BLOCK_PLACED: u8 = 3;

impl Event {
    pub fn encode(&self, out: &mut BytesMut) -> Result<(), EncodeError> {
        use bytes::BufMut;
        match self {
            Event::BombPlaced { bomb_id, position } => {
                out.put_u8(EVENT_BOMB_PLACED);
                out.put_u32(*bomb_id);
                position.encode(out);
            }
            Event::BombExploded {
                bomb_id,
                robots_destroyed,
                blocks_destroyed,
            } => {
                out.put_u8(EVENT_BOMB_EXPLODED);
                out.put_u32(*bomb_id);
                put_count(out, robots_destroyed.len());
                for p in robots_destroyed {
                    out.put_u8(*p);
                }
                put_count(out, blocks_destroyed.len());
                for pos in blocks_destroyed {
                    pos.encode(out);
                }
            }
            Event::PlayerMoved { player_id, position } => {
                out.put_u8(EVENT_PLAYER_MOVED);
                out.put_u8(*player_id);
                position.encode(out);
            }
            Event::BlockPlaced { position } => {
                out.put_u8(EVENT_BLOCK_PLACED);
                position.encode(out);
            }
        }
        Ok(())
    }

    pub fn try_decode(cur: &mut Cursor) -> Result<Option<Event>, ProtocolError> {
        let Some(tag) = cur.try_u8() else {
            return Ok(None);
        };
        let event = match tag {
            EVENT_BOMB_PLACED => {
                let Some(bomb_id) = cur.try_u32() else {
                    return Ok(None);
                };
                let Some(position) = Position::try_decode(cur) else {
                    return Ok(None);
                };
                Event::BombPlaced { bomb_id, position }
            }
            EVENT_BOMB_EXPLODED => {
                let Some(bomb_id) = cur.try_u32() else {
                    return Ok(None);
                };
                let Some(robots_destroyed) = try_decode_u8_seq(cur)? else {
                    return Ok(None);
                };
                let Some(blocks_destroyed) = try_decode_position_seq(cur)? else {
                    return Ok(None);
                };
                Event::BombExploded {
                    bomb_id,
                    robots_destroyed,
                    blocks_destroyed,
                }
            }
            EVENT_PLAYER_MOVED => {
                let Some(player_id) = cur.try_u8() else {
                    return Ok(None);
                };
                let Some(position) = Position::try_decode(cur) else {
                    return Ok(None);
                };
                Event::PlayerMoved { player_id, position }
            }
            EVENT_BLOCK_PLACED => {
                let Some(position) = Position::try_decode(cur) else {
                    return Ok(None);
                };
                Event::BlockPlaced { position }
            }
            other => {
                return Err(ProtocolError::UnknownTag {
                    context: "event",
                    tag: other,
                })
            }
        };
        Ok(Some(event))
    }
}

fn try_decode_u8_seq(cur: &mut Cursor) -> Result<Option<Vec<u8>>, ProtocolError> {
    let Some(count) = cur.try_count()? else {
        return Ok(None);
    };
    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let Some(v) = cur.try_u8() else {
            return Ok(None);
        };
        out.push(v);
    }
    Ok(Some(out))
}

fn try_decode_position_seq(cur: &mut Cursor) -> Result<Option<Vec<Position>>, ProtocolError> {
    let Some(count) = cur.try_count()? else {
        return Ok(None);
    };
    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let Some(p) = Position::try_decode(cur) else {
            return Ok(None);
        };
        out.push(p);
    }
    Ok(Some(out))
}

/// One simulation step, as broadcast by `SC_TURN`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub turn: u16,
    pub events: Vec<Event>,
}

impl Turn {
    pub fn encode(&self, out: &mut BytesMut) -> Result<(), EncodeError> {
        use bytes::BufMut;
        out.put_u16(self.turn);
        put_count(out, self.events.len());
        for e in &self.events {
            e.encode(out)?;
        }
        Ok(())
    }

    pub fn try_decode(cur: &mut Cursor) -> Result<Option<Turn>, ProtocolError> {
        let Some(turn) = cur.try_u16() else {
            return Ok(None);
        };
        let Some(count) = cur.try_count()? else {
            return Ok(None);
        };
        let mut events = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let Some(e) = Event::try_decode(cur)? else {
                return Ok(None);
            };
            events.push(e);
        }
        Ok(Some(Turn { turn, events }))
    }
}

/// Server -> client, tag byte first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    Hello {
        server_name: String,
        players_count: u8,
        size_x: u16,
        size_y: u16,
        game_length: u16,
        explosion_radius: u16,
        bomb_timer: u16,
    },
    AcceptedPlayer {
        id: PlayerId,
        player: Player,
    },
    GameStarted {
        players: BTreeMap<PlayerId, Player>,
    },
    Turn(Turn),
    GameEnded {
        scores: BTreeMap<PlayerId, Score>,
    },
}

const SC_HELLO: u8 = 0;
const SC_ACCEPTED_PLAYER: u8 = 1;
const SC_GAME_STARTED: u8 = 2;
const SC_TURN: u8 = 3;
const SC_GAME_ENDED: u8 = 4;

impl ServerMessage {
    pub fn encode(&self, out: &mut BytesMut) -> Result<(), EncodeError> {
        use bytes::BufMut;
        match self {
            ServerMessage::Hello {
                server_name,
                players_count,
                size_x,
                size_y,
                game_length,
                explosion_radius,
                bomb_timer,
            } => {
                out.put_u8(SC_HELLO);
                put_string(out, server_name)?;
                out.put_u8(*players_count);
                out.put_u16(*size_x);
                out.put_u16(*size_y);
                out.put_u16(*game_length);
                out.put_u16(*explosion_radius);
                out.put_u16(*bomb_timer);
            }
            ServerMessage::AcceptedPlayer { id, player } => {
                out.put_u8(SC_ACCEPTED_PLAYER);
                out.put_u8(*id);
                player.encode(out)?;
            }
            ServerMessage::GameStarted { players } => {
                out.put_u8(SC_GAME_STARTED);
                put_count(out, players.len());
                for (id, p) in players {
                    out.put_u8(*id);
                    p.encode(out)?;
                }
            }
            ServerMessage::Turn(turn) => {
                out.put_u8(SC_TURN);
                turn.encode(out)?;
            }
            ServerMessage::GameEnded { scores } => {
                out.put_u8(SC_GAME_ENDED);
                put_count(out, scores.len());
                for (id, score) in scores {
                    out.put_u8(*id);
                    out.put_u32(*score);
                }
            }
        }
        Ok(())
    }

    /// Returns `Ok(None)` when `cur`'s underlying slice doesn't yet hold a
    /// full message (including the case where no tag byte is present
    /// yet). An unknown tag or malformed direction is always a hard
    /// error, even if further fields are also missing.
    pub fn try_decode(cur: &mut Cursor) -> Result<Option<ServerMessage>, ProtocolError> {
        let Some(tag) = cur.try_u8() else {
            return Ok(None);
        };
        let msg = match tag {
            SC_HELLO => {
                let Some(server_name) = cur.try_string() else {
                    return Ok(None);
                };
                let Some(players_count) = cur.try_u8() else {
                    return Ok(None);
                };
                let Some(size_x) = cur.try_u16() else {
                    return Ok(None);
                };
                let Some(size_y) = cur.try_u16() else {
                    return Ok(None);
                };
                let Some(game_length) = cur.try_u16() else {
                    return Ok(None);
                };
                let Some(explosion_radius) = cur.try_u16() else {
                    return Ok(None);
                };
                let Some(bomb_timer) = cur.try_u16() else {
                    return Ok(None);
                };
                ServerMessage::Hello {
                    server_name,
                    players_count,
                    size_x,
                    size_y,
                    game_length,
                    explosion_radius,
                    bomb_timer,
                }
            }
            SC_ACCEPTED_PLAYER => {
                let Some(id) = cur.try_u8() else {
                    return Ok(None);
                };
                let Some(player) = Player::try_decode(cur) else {
                    return Ok(None);
                };
                ServerMessage::AcceptedPlayer { id, player }
            }
            SC_GAME_STARTED => {
                let Some(count) = cur.try_count()? else {
                    return Ok(None);
                };
                let mut players = BTreeMap::new();
                for _ in 0..count {
                    let Some(id) = cur.try_u8() else {
                        return Ok(None);
                    };
                    let Some(player) = Player::try_decode(cur) else {
                        return Ok(None);
                    };
                    players.insert(id, player);
                }
                ServerMessage::GameStarted { players }
            }
            SC_TURN => {
                let Some(turn) = Turn::try_decode(cur)? else {
                    return Ok(None);
                };
                ServerMessage::Turn(turn)
            }
            SC_GAME_ENDED => {
                let Some(count) = cur.try_count()? else {
                    return Ok(None);
                };
                let mut scores = BTreeMap::new();
                for _ in 0..count {
                    let Some(id) = cur.try_u8() else {
                        return Ok(None);
                    };
                    let Some(score) = cur.try_u32() else {
                        return Ok(None);
                    };
                    scores.insert(id, score);
                }
                ServerMessage::GameEnded { scores }
            }
            other => {
                return Err(ProtocolError::UnknownTag {
                    context: "server message",
                    tag: other,
                })
            }
        };
        Ok(Some(msg))
    }
}

/// Client -> server, tag byte first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    Join { name: String },
    PlaceBomb,
    PlaceBlock,
    Move { direction: Direction },
}

const CS_JOIN: u8 = 0;
const CS_PLACE_BOMB: u8 = 1;
const CS_PLACE_BLOCK: u8 = 2;
const CS_MOVE: u8 = 3;

impl ClientMessage {
    pub fn encode(&self, out: &mut BytesMut) -> Result<(), EncodeError> {
        use bytes::BufMut;
        match self {
            ClientMessage::Join { name } => {
                out.put_u8(CS_JOIN);
                put_string(out, name)?;
            }
            ClientMessage::PlaceBomb => out.put_u8(CS_PLACE_BOMB),
            ClientMessage::PlaceBlock => out.put_u8(CS_PLACE_BLOCK),
            ClientMessage::Move { direction } => {
                out.put_u8(CS_MOVE);
                out.put_u8(direction.as_u8());
            }
        }
        Ok(())
    }

    pub fn try_decode(cur: &mut Cursor) -> Result<Option<ClientMessage>, ProtocolError> {
        let Some(tag) = cur.try_u8() else {
            return Ok(None);
        };
        let msg = match tag {
            CS_JOIN => {
                let Some(name) = cur.try_string() else {
                    return Ok(None);
                };
                ClientMessage::Join { name }
            }
            CS_PLACE_BOMB => ClientMessage::PlaceBomb,
            CS_PLACE_BLOCK => ClientMessage::PlaceBlock,
            CS_MOVE => {
                let Some(dir_byte) = cur.try_u8() else {
                    return Ok(None);
                };
                ClientMessage::Move {
                    direction: Direction::from_u8(dir_byte)?,
                }
            }
            other => {
                return Err(ProtocolError::UnknownTag {
                    context: "client message",
                    tag: other,
                })
            }
        };
        Ok(Some(msg))
    }
}

/// Client -> GUI, one datagram per message, tag byte first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientToGui {
    Lobby {
        server_name: String,
        players_count: u8,
        size_x: u16,
        size_y: u16,
        game_length: u16,
        explosion_radius: u16,
        bomb_timer: u16,
        players: BTreeMap<PlayerId, Player>,
    },
    Game {
        server_name: String,
        size_x: u16,
        size_y: u16,
        game_length: u16,
        turn: u16,
        players: BTreeMap<PlayerId, Player>,
        player_positions: BTreeMap<PlayerId, Position>,
        blocks: Vec<Position>,
        bombs: Vec<Bomb>,
        explosions: Vec<Position>,
        scores: BTreeMap<PlayerId, Score>,
    },
}

const CG_LOBBY: u8 = 0;
const CG_GAME: u8 = 1;

impl ClientToGui {
    pub fn encode(&self, out: &mut BytesMut) -> Result<(), EncodeError> {
        use bytes::BufMut;
        match self {
            ClientToGui::Lobby {
                server_name,
                players_count,
                size_x,
                size_y,
                game_length,
                explosion_radius,
                bomb_timer,
                players,
            } => {
                out.put_u8(CG_LOBBY);
                put_string(out, server_name)?;
                out.put_u8(*players_count);
                out.put_u16(*size_x);
                out.put_u16(*size_y);
                out.put_u16(*game_length);
                out.put_u16(*explosion_radius);
                out.put_u16(*bomb_timer);
                put_count(out, players.len());
                for (id, p) in players {
                    out.put_u8(*id);
                    p.encode(out)?;
                }
            }
            ClientToGui::Game {
                server_name,
                size_x,
                size_y,
                game_length,
                turn,
                players,
                player_positions,
                blocks,
                bombs,
                explosions,
                scores,
            } => {
                out.put_u8(CG_GAME);
                put_string(out, server_name)?;
                out.put_u16(*size_x);
                out.put_u16(*size_y);
                out.put_u16(*game_length);
                out.put_u16(*turn);
                put_count(out, players.len());
                for (id, p) in players {
                    out.put_u8(*id);
                    p.encode(out)?;
                }
                put_count(out, player_positions.len());
                for (id, pos) in player_positions {
                    out.put_u8(*id);
                    pos.encode(out);
                }
                put_count(out, blocks.len());
                for pos in blocks {
                    pos.encode(out);
                }
                put_count(out, bombs.len());
                for b in bombs {
                    b.encode(out);
                }
                put_count(out, explosions.len());
                for pos in explosions {
                    pos.encode(out);
                }
                put_count(out, scores.len());
                for (id, score) in scores {
                    out.put_u8(*id);
                    out.put_u32(*score);
                }
            }
        }
        Ok(())
    }

    /// One-shot decode: the whole datagram must already be in `buf`.
    /// Unlike the TCP path there is no "come back with more bytes" case;
    /// a short datagram is simply malformed.
    pub fn decode(buf: &[u8]) -> Result<ClientToGui, ProtocolError> {
        let mut cur = Cursor::new(buf);
        let Some(tag) = cur.try_u8() else {
            return Err(ProtocolError::UnexpectedEof);
        };
        let msg = match tag {
            CG_LOBBY => {
                let server_name = cur.try_string().ok_or(ProtocolError::UnexpectedEof)?;
                let players_count = cur.try_u8().ok_or(ProtocolError::UnexpectedEof)?;
                let size_x = cur.try_u16().ok_or(ProtocolError::UnexpectedEof)?;
                let size_y = cur.try_u16().ok_or(ProtocolError::UnexpectedEof)?;
                let game_length = cur.try_u16().ok_or(ProtocolError::UnexpectedEof)?;
                let explosion_radius = cur.try_u16().ok_or(ProtocolError::UnexpectedEof)?;
                let bomb_timer = cur.try_u16().ok_or(ProtocolError::UnexpectedEof)?;
                let count = cur.try_count()?.ok_or(ProtocolError::UnexpectedEof)?;
                let mut players = BTreeMap::new();
                for _ in 0..count {
                    let id = cur.try_u8().ok_or(ProtocolError::UnexpectedEof)?;
                    let p = Player::try_decode(&mut cur).ok_or(ProtocolError::UnexpectedEof)?;
                    players.insert(id, p);
                }
                ClientToGui::Lobby {
                    server_name,
                    players_count,
                    size_x,
                    size_y,
                    game_length,
                    explosion_radius,
                    bomb_timer,
                    players,
                }
            }
            CG_GAME => {
                let server_name = cur.try_string().ok_or(ProtocolError::UnexpectedEof)?;
                let size_x = cur.try_u16().ok_or(ProtocolError::UnexpectedEof)?;
                let size_y = cur.try_u16().ok_or(ProtocolError::UnexpectedEof)?;
                let game_length = cur.try_u16().ok_or(ProtocolError::UnexpectedEof)?;
                let turn = cur.try_u16().ok_or(ProtocolError::UnexpectedEof)?;

                let pc = cur.try_count()?.ok_or(ProtocolError::UnexpectedEof)?;
                let mut players = BTreeMap::new();
                for _ in 0..pc {
                    let id = cur.try_u8().ok_or(ProtocolError::UnexpectedEof)?;
                    let p = Player::try_decode(&mut cur).ok_or(ProtocolError::UnexpectedEof)?;
                    players.insert(id, p);
                }

                let ppc = cur.try_count()?.ok_or(ProtocolError::UnexpectedEof)?;
                let mut player_positions = BTreeMap::new();
                for _ in 0..ppc {
                    let id = cur.try_u8().ok_or(ProtocolError::UnexpectedEof)?;
                    let pos = Position::try_decode(&mut cur).ok_or(ProtocolError::UnexpectedEof)?;
                    player_positions.insert(id, pos);
                }

                let bc = cur.try_count()?.ok_or(ProtocolError::UnexpectedEof)?;
                let mut blocks = Vec::with_capacity(bc as usize);
                for _ in 0..bc {
                    blocks.push(Position::try_decode(&mut cur).ok_or(ProtocolError::UnexpectedEof)?);
                }

                let bmc = cur.try_count()?.ok_or(ProtocolError::UnexpectedEof)?;
                let mut bombs = Vec::with_capacity(bmc as usize);
                for _ in 0..bmc {
                    bombs.push(Bomb::try_decode(&mut cur).ok_or(ProtocolError::UnexpectedEof)?);
                }

                let ec = cur.try_count()?.ok_or(ProtocolError::UnexpectedEof)?;
                let mut explosions = Vec::with_capacity(ec as usize);
                for _ in 0..ec {
                    explosions
                        .push(Position::try_decode(&mut cur).ok_or(ProtocolError::UnexpectedEof)?);
                }

                let sc = cur.try_count()?.ok_or(ProtocolError::UnexpectedEof)?;
                let mut scores = BTreeMap::new();
                for _ in 0..sc {
                    let id = cur.try_u8().ok_or(ProtocolError::UnexpectedEof)?;
                    let score = cur.try_u32().ok_or(ProtocolError::UnexpectedEof)?;
                    scores.insert(id, score);
                }

                ClientToGui::Game {
                    server_name,
                    size_x,
                    size_y,
                    game_length,
                    turn,
                    players,
                    player_positions,
                    blocks,
                    bombs,
                    explosions,
                    scores,
                }
            }
            other => {
                return Err(ProtocolError::UnknownTag {
                    context: "client-to-gui message",
                    tag: other,
                })
            }
        };
        Ok(msg)
    }
}

/// GUI -> client. Exactly one shape per tag, validated by length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuiToClient {
    PlaceBomb,
    PlaceBlock,
    Move { direction: Direction },
}

const GC_PLACE_BOMB: u8 = 0;
const GC_PLACE_BLOCK: u8 = 1;
const GC_MOVE: u8 = 2;

impl GuiToClient {
    /// Validates length-and-tag exactly as the GUI contract requires
    /// `PlaceBomb`/`PlaceBlock` are exactly one
    /// byte, `Move` is exactly two with the second byte in `0..=3`.
    /// Anything else is not a protocol error, just a datagram to drop.
    pub fn decode(buf: &[u8]) -> Option<GuiToClient> {
        match (buf.len(), buf.first().copied()) {
            (1, Some(GC_PLACE_BOMB)) => Some(GuiToClient::PlaceBomb),
            (1, Some(GC_PLACE_BLOCK)) => Some(GuiToClient::PlaceBlock),
            (2, Some(GC_MOVE)) => Direction::from_u8(buf[1])
                .ok()
                .map(|direction| GuiToClient::Move { direction }),
            _ => None,
        }
    }

    pub fn encode(&self, out: &mut BytesMut) {
        use bytes::BufMut;
        match self {
            GuiToClient::PlaceBomb => out.put_u8(GC_PLACE_BOMB),
            GuiToClient::PlaceBlock => out.put_u8(GC_PLACE_BLOCK),
            GuiToClient::Move { direction } => {
                out.put_u8(GC_MOVE);
                out.put_u8(direction.as_u8());
            }
        }
    }
}
