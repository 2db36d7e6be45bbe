//! The client-side mirror of the grid world: accumulated lobby state and
//! the in-game view rebuilt turn by turn from the server's event stream.
//!
//! Grounded on `examples/original_source/bomb-it-client.cpp`'s
//! `GameState`/`GameHandler` (field set) and `handle_turn` (event
//! application order: clear explosions/destroyed sets, decrement bomb
//! timers, apply events in order, then score and remove destroyed blocks
//! only after every event in the turn has been applied).

use std::collections::{BTreeMap, HashSet};

use protocol::{
    affected_cells, Bomb, ClientToGui, Event, Player, PlayerId, Position, ProtocolError, Score,
    Turn,
};

/// The parameters announced once by `Hello`, needed to reconstruct blast
/// geometry and to reset a client-observed bomb's timer on placement.
#[derive(Debug, Clone)]
pub struct HelloInfo {
    pub server_name: String,
    pub players_count: u8,
    pub size_x: u16,
    pub size_y: u16,
    pub game_length: u16,
    pub explosion_radius: u16,
    pub bomb_timer: u16,
}

#[derive(Debug, Default, Clone)]
pub struct LobbyView {
    pub players: BTreeMap<PlayerId, Player>,
}

#[derive(Debug, Default, Clone)]
pub struct GameView {
    pub turn: u16,
    pub players: BTreeMap<PlayerId, Player>,
    pub positions: BTreeMap<PlayerId, Position>,
    pub blocks: HashSet<Position>,
    pub bombs: BTreeMap<u32, Bomb>,
    pub explosions: HashSet<Position>,
    pub scores: BTreeMap<PlayerId, Score>,
}

#[derive(Debug, Default)]
pub struct World {
    hello: Option<HelloInfo>,
    lobby: LobbyView,
    game: GameView,
}

impl World {
    pub fn new() -> Self {
        World::default()
    }

    pub fn set_hello(&mut self, hello: HelloInfo) {
        self.hello = Some(hello);
        self.lobby = LobbyView::default();
    }

    pub fn accept_player(&mut self, id: PlayerId, player: Player) {
        self.lobby.players.insert(id, player);
    }

    pub fn start_game(&mut self, players: BTreeMap<PlayerId, Player>) {
        let scores = players.keys().map(|&id| (id, 0)).collect();
        self.game = GameView {
            turn: 0,
            players,
            positions: BTreeMap::new(),
            blocks: HashSet::new(),
            bombs: BTreeMap::new(),
            explosions: HashSet::new(),
            scores,
        };
    }

    /// Resets to a fresh lobby view, keeping `Hello`, on `GameEnded`.
    pub fn end_game(&mut self) {
        self.lobby = LobbyView::default();
        self.game = GameView::default();
    }

    /// Applies one broadcast `Turn`, in the exact order specified by
    /// the server's turn-tick ordering. Returns `ProtocolError` if a `BombExploded`
    /// names a bomb id this client never saw placed — the client cannot
    /// trust an arbitrary peer to keep its own invariants.
    pub fn apply_turn(&mut self, turn: &Turn) -> Result<(), ProtocolError> {
        let Some(hello) = self.hello.clone() else {
            return Err(ProtocolError::UnexpectedEof);
        };

        self.game.turn = turn.turn;
        self.game.explosions.clear();
        let mut destroyed_robots: HashSet<PlayerId> = HashSet::new();
        let mut destroyed_blocks: HashSet<Position> = HashSet::new();

        for bomb in self.game.bombs.values_mut() {
            bomb.timer = bomb.timer.saturating_sub(1);
        }

        for event in &turn.events {
            match event {
                Event::BombPlaced { bomb_id, position } => {
                    self.game.bombs.insert(
                        *bomb_id,
                        Bomb {
                            position: *position,
                            timer: hello.bomb_timer,
                        },
                    );
                }
                Event::BombExploded {
                    bomb_id,
                    robots_destroyed,
                    blocks_destroyed,
                } => {
                    let bomb = self
                        .game
                        .bombs
                        .remove(bomb_id)
                        .ok_or(ProtocolError::UnexpectedEof)?;
                    let affected = affected_cells(
                        bomb.position,
                        &self.game.blocks,
                        hello.explosion_radius,
                        hello.size_x,
                        hello.size_y,
                    );
                    self.game.explosions.extend(affected);
                    destroyed_robots.extend(robots_destroyed.iter().copied());
                    destroyed_blocks.extend(blocks_destroyed.iter().copied());
                }
                Event::PlayerMoved { player_id, position } => {
                    self.game.positions.insert(*player_id, *position);
                }
                Event::BlockPlaced { position } => {
                    self.game.blocks.insert(*position);
                }
            }
        }

        for pid in &destroyed_robots {
            *self.game.scores.entry(*pid).or_insert(0) += 1;
        }
        for pos in &destroyed_blocks {
            self.game.blocks.remove(pos);
        }

        Ok(())
    }

    pub fn lobby_snapshot(&self) -> Option<ClientToGui> {
        let hello = self.hello.as_ref()?;
        Some(ClientToGui::Lobby {
            server_name: hello.server_name.clone(),
            players_count: hello.players_count,
            size_x: hello.size_x,
            size_y: hello.size_y,
            game_length: hello.game_length,
            explosion_radius: hello.explosion_radius,
            bomb_timer: hello.bomb_timer,
            players: self.lobby.players.clone(),
        })
    }

    pub fn game_snapshot(&self) -> Option<ClientToGui> {
        let hello = self.hello.as_ref()?;
        Some(ClientToGui::Game {
            server_name: hello.server_name.clone(),
            size_x: hello.size_x,
            size_y: hello.size_y,
            game_length: hello.game_length,
            turn: self.game.turn,
            players: self.game.players.clone(),
            player_positions: self.game.positions.clone(),
            blocks: self.game.blocks.iter().copied().collect(),
            bombs: self.game.bombs.values().copied().collect(),
            explosions: self.game.explosions.iter().copied().collect(),
            scores: self.game.scores.clone(),
        })
    }

    #[cfg(test)]
    pub fn game(&self) -> &GameView {
        &self.game
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::Direction;

    fn hello() -> HelloInfo {
        HelloInfo {
            server_name: "arena".into(),
            players_count: 2,
            size_x: 3,
            size_y: 3,
            game_length: 10,
            explosion_radius: 1,
            bomb_timer: 5,
        }
    }

    fn players() -> BTreeMap<PlayerId, Player> {
        let mut m = BTreeMap::new();
        m.insert(
            0,
            Player {
                name: "a".into(),
                address: "1.1.1.1:1".into(),
            },
        );
        m.insert(
            1,
            Player {
                name: "b".into(),
                address: "2.2.2.2:2".into(),
            },
        );
        m
    }

    #[test]
    fn turn0_populates_positions_and_blocks() {
        let mut world = World::new();
        world.set_hello(hello());
        world.start_game(players());
        let turn0 = Turn {
            turn: 0,
            events: vec![
                Event::PlayerMoved {
                    player_id: 0,
                    position: Position::new(0, 0),
                },
                Event::PlayerMoved {
                    player_id: 1,
                    position: Position::new(2, 2),
                },
                Event::BlockPlaced {
                    position: Position::new(1, 1),
                },
            ],
        };
        world.apply_turn(&turn0).unwrap();
        assert_eq!(world.game().positions[&0], Position::new(0, 0));
        assert_eq!(world.game().positions[&1], Position::new(2, 2));
        assert!(world.game().blocks.contains(&Position::new(1, 1)));
    }

    #[test]
    fn bomb_placed_resets_to_full_hello_timer_not_server_remainder() {
        let mut world = World::new();
        world.set_hello(hello());
        world.start_game(players());
        let turn = Turn {
            turn: 1,
            events: vec![Event::BombPlaced {
                bomb_id: 0,
                position: Position::new(0, 0),
            }],
        };
        world.apply_turn(&turn).unwrap();
        assert_eq!(world.game().bombs[&0].timer, 5);
    }

    #[test]
    fn explosion_recomputes_blast_and_scores_and_clears_blocks() {
        let mut world = World::new();
        world.set_hello(hello());
        world.start_game(players());
        world
            .apply_turn(&Turn {
                turn: 0,
                events: vec![Event::PlayerMoved {
                    player_id: 0,
                    position: Position::new(1, 1),
                }],
            })
            .unwrap();
        world
            .apply_turn(&Turn {
                turn: 1,
                events: vec![Event::BombPlaced {
                    bomb_id: 7,
                    position: Position::new(1, 1),
                }],
            })
            .unwrap();
        world
            .apply_turn(&Turn {
                turn: 2,
                events: vec![Event::BombExploded {
                    bomb_id: 7,
                    robots_destroyed: vec![0],
                    blocks_destroyed: vec![],
                }],
            })
            .unwrap();
        assert!(!world.game().bombs.contains_key(&7));
        assert!(world.game().explosions.contains(&Position::new(1, 1)));
        assert_eq!(world.game().scores[&0], 1);
    }

    #[test]
    fn unknown_bomb_id_in_explosion_is_a_protocol_error() {
        let mut world = World::new();
        world.set_hello(hello());
        world.start_game(players());
        let turn = Turn {
            turn: 1,
            events: vec![Event::BombExploded {
                bomb_id: 999,
                robots_destroyed: vec![],
                blocks_destroyed: vec![],
            }],
        };
        assert!(world.apply_turn(&turn).is_err());
    }

    #[test]
    fn game_ended_resets_to_fresh_lobby_keeping_hello() {
        let mut world = World::new();
        world.set_hello(hello());
        world.start_game(players());
        world
            .apply_turn(&Turn {
                turn: 0,
                events: vec![Event::PlayerMoved {
                    player_id: 0,
                    position: Position::new(0, 0),
                }],
            })
            .unwrap();
        world.end_game();
        assert!(world.game().positions.is_empty());
        assert!(world.lobby_snapshot().is_some());
    }

    #[test]
    fn gui_move_tag_maps_to_client_direction() {
        // Sanity-check that `Direction` values used by the world model
        // line up with what `GuiToClient::Move` decodes.
        assert_eq!(Direction::Up.as_u8(), 0);
    }
}
