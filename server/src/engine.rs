//! The authoritative game state machine: lobby bookkeeping, the turn
//! clock, blast propagation and scoring, and the in-memory journal used
//! to catch up late-joining connections.
//!
//! Grounded on `examples/original_source/bomb-it-server.cpp`'s
//! `GameMaster` class: `handle_explosion_stripe`/`handle_explosions` for
//! the blast rays, `make_turn` for tick ordering, `start_game` for the
//! random initial layout, `handle_join` for lobby admission, and the
//! slot-reset replay path for reconnects.

use std::collections::{BTreeMap, HashMap, HashSet};

use tokio::sync::{mpsc, Mutex, Notify};

use protocol::{
    affected_cells, Bomb, BombId, ClientMessage, Direction, Event, Player, PlayerId, Position,
    ServerMessage, Turn,
};

use crate::config::{GameConfig, NUMBER_OF_SLOTS};
use crate::rng::MinStdRand;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Lobby,
    InGame,
}

#[derive(Debug, Clone, Copy)]
enum PlayerAction {
    PlaceBomb,
    PlaceBlock,
    Move(Direction),
}

/// A message a connection-worker slot sends to the engine.
pub enum EngineInbound {
    /// Sent once when a slot transitions from empty to occupied, before
    /// any client bytes are read. `outbox` is this slot's fresh
    /// outbound channel; the engine replies on it with the `SlotReset`
    /// acknowledgement, then `Hello`, then whatever catch-up state
    /// applies.
    SlotReset {
        slot_id: usize,
        address: String,
        outbox: mpsc::UnboundedSender<EngineOutbound>,
    },
    ClientMsg {
        slot_id: usize,
        msg: ClientMessage,
    },
    Disconnect {
        slot_id: usize,
    },
}

/// A message the engine sends to one slot's writer task.
#[derive(Debug, Clone)]
pub enum EngineOutbound {
    /// Acknowledges a `SlotReset`; the worker discards everything popped
    /// before this and only then starts forwarding to the socket.
    SlotReset,
    Server(ServerMessage),
}

#[derive(Debug, Default, Clone)]
struct Journal {
    game_started: Option<ServerMessage>,
    turns: Vec<Turn>,
}

struct EngineState {
    phase: Phase,
    players: BTreeMap<PlayerId, Player>,
    slot_to_player: HashMap<usize, PlayerId>,
    slot_addresses: HashMap<usize, String>,
    next_player_id: PlayerId,
    positions: BTreeMap<PlayerId, Position>,
    blocks: HashSet<Position>,
    bombs: BTreeMap<BombId, Bomb>,
    next_bomb_id: BombId,
    staged_actions: HashMap<PlayerId, PlayerAction>,
    scores: BTreeMap<PlayerId, u32>,
    current_turn: u16,
    rng: MinStdRand,
    journal: Journal,
    outboxes: Vec<Option<mpsc::UnboundedSender<EngineOutbound>>>,
}

impl EngineState {
    fn new(config: &GameConfig) -> Self {
        EngineState {
            phase: Phase::Lobby,
            players: BTreeMap::new(),
            slot_to_player: HashMap::new(),
            slot_addresses: HashMap::new(),
            next_player_id: 0,
            positions: BTreeMap::new(),
            blocks: HashSet::new(),
            bombs: BTreeMap::new(),
            next_bomb_id: 0,
            staged_actions: HashMap::new(),
            scores: BTreeMap::new(),
            current_turn: 0,
            rng: MinStdRand::new(config.seed),
            journal: Journal::default(),
            outboxes: (0..NUMBER_OF_SLOTS).map(|_| None).collect(),
        }
    }

    fn broadcast(&self, msg: ServerMessage) {
        for slot in self.outboxes.iter().flatten() {
            let _ = slot.send(EngineOutbound::Server(msg.clone()));
        }
    }

    fn send_hello(&self, config: &GameConfig, outbox: &mpsc::UnboundedSender<EngineOutbound>) {
        let _ = outbox.send(EngineOutbound::Server(ServerMessage::Hello {
            server_name: config.server_name.clone(),
            players_count: config.players_count,
            size_x: config.size_x,
            size_y: config.size_y,
            game_length: config.game_length,
            explosion_radius: config.explosion_radius,
            bomb_timer: config.bomb_timer,
        }));
    }

    fn handle_inbound(&mut self, msg: EngineInbound, config: &GameConfig) {
        match msg {
            EngineInbound::SlotReset {
                slot_id,
                address,
                outbox,
            } => {
                self.slot_addresses.insert(slot_id, address);
                self.outboxes[slot_id] = Some(outbox.clone());
                let _ = outbox.send(EngineOutbound::SlotReset);
                self.send_hello(config, &outbox);
                match self.phase {
                    Phase::Lobby => {
                        for (id, player) in &self.players {
                            let _ = outbox.send(EngineOutbound::Server(
                                ServerMessage::AcceptedPlayer {
                                    id: *id,
                                    player: player.clone(),
                                },
                            ));
                        }
                    }
                    Phase::InGame => {
                        let _ = outbox.send(EngineOutbound::Server(ServerMessage::GameStarted {
                            players: self.players.clone(),
                        }));
                        for turn in &self.journal.turns {
                            let _ = outbox
                                .send(EngineOutbound::Server(ServerMessage::Turn(turn.clone())));
                        }
                    }
                }
            }
            EngineInbound::ClientMsg { slot_id, msg } => self.handle_client_msg(slot_id, msg, config),
            EngineInbound::Disconnect { slot_id } => {
                self.slot_to_player.remove(&slot_id);
                self.slot_addresses.remove(&slot_id);
                self.outboxes[slot_id] = None;
            }
        }
    }

    fn handle_client_msg(&mut self, slot_id: usize, msg: ClientMessage, config: &GameConfig) {
        match msg {
            ClientMessage::Join { name } => {
                if self.phase != Phase::Lobby {
                    return;
                }
                if self.slot_to_player.contains_key(&slot_id) {
                    return;
                }
                let id = self.next_player_id;
                self.next_player_id += 1;
                let address = self.slot_addresses.get(&slot_id).cloned().unwrap_or_default();
                let player = Player { name, address };
                self.players.insert(id, player.clone());
                self.slot_to_player.insert(slot_id, id);
                self.scores.insert(id, 0);
                self.broadcast(ServerMessage::AcceptedPlayer { id, player });
                if self.players.len() == config.players_count as usize {
                    self.start_game(config);
                }
            }
            ClientMessage::PlaceBomb | ClientMessage::PlaceBlock | ClientMessage::Move { .. } => {
                if self.phase != Phase::InGame {
                    return;
                }
                let Some(&pid) = self.slot_to_player.get(&slot_id) else {
                    return;
                };
                let action = match msg {
                    ClientMessage::PlaceBomb => PlayerAction::PlaceBomb,
                    ClientMessage::PlaceBlock => PlayerAction::PlaceBlock,
                    ClientMessage::Move { direction } => PlayerAction::Move(direction),
                    ClientMessage::Join { .. } => unreachable!(),
                };
                self.staged_actions.insert(pid, action);
            }
        }
    }

    fn start_game(&mut self, config: &GameConfig) {
        self.phase = Phase::InGame;
        self.current_turn = 0;
        let mut events = Vec::new();

        let player_ids: Vec<PlayerId> = self.players.keys().copied().collect();
        for pid in player_ids {
            let pos = self.rng.next_position(config.size_x, config.size_y);
            self.positions.insert(pid, pos);
            events.push(Event::PlayerMoved {
                player_id: pid,
                position: pos,
            });
        }

        for _ in 0..config.initial_blocks {
            let pos = self.rng.next_position(config.size_x, config.size_y);
            if self.blocks.insert(pos) {
                events.push(Event::BlockPlaced { position: pos });
            }
        }

        let turn0 = Turn { turn: 0, events };
        self.journal.game_started = Some(ServerMessage::GameStarted {
            players: self.players.clone(),
        });
        self.journal.turns.push(turn0.clone());
        self.broadcast(ServerMessage::GameStarted {
            players: self.players.clone(),
        });
        self.broadcast(ServerMessage::Turn(turn0));
    }

    /// One simulation step. Ordering follows `make_turn` in the grounding
    /// source: decrement timers, resolve explosions against turn-start
    /// blocks, drop destroyed blocks, apply self-placed blocks at the
    /// player's pre-teleport position (so dying doesn't erase your own
    /// last-second block),
    /// then teleport destroyed players or apply everyone else's move/bomb.
    fn tick(&mut self, config: &GameConfig) {
        self.current_turn += 1;

        for bomb in self.bombs.values_mut() {
            bomb.timer = bomb.timer.saturating_sub(1);
        }

        let blocks_at_start = self.blocks.clone();
        let mut events = Vec::new();
        let mut destroyed_robots: HashSet<PlayerId> = HashSet::new();
        let mut destroyed_blocks: HashSet<Position> = HashSet::new();

        let exploding: Vec<BombId> = self
            .bombs
            .iter()
            .filter(|(_, b)| b.timer == 0)
            .map(|(id, _)| *id)
            .collect();
        for id in exploding {
            let bomb = self.bombs.remove(&id).expect("id came from self.bombs");
            let affected = affected_cells(
                bomb.position,
                &blocks_at_start,
                config.explosion_radius,
                config.size_x,
                config.size_y,
            );
            let robots: Vec<PlayerId> = self
                .positions
                .iter()
                .filter(|(_, p)| affected.contains(p))
                .map(|(pid, _)| *pid)
                .collect();
            let blocks_hit: Vec<Position> = blocks_at_start
                .iter()
                .filter(|p| affected.contains(p))
                .copied()
                .collect();
            destroyed_robots.extend(robots.iter().copied());
            destroyed_blocks.extend(blocks_hit.iter().copied());
            events.push(Event::BombExploded {
                bomb_id: id,
                robots_destroyed: robots,
                blocks_destroyed: blocks_hit,
            });
        }

        for pos in &destroyed_blocks {
            self.blocks.remove(pos);
        }

        let player_ids: Vec<PlayerId> = self.players.keys().copied().collect();

        let mut newly_placed_blocks = Vec::new();
        for pid in &player_ids {
            if let Some(PlayerAction::PlaceBlock) = self.staged_actions.get(pid) {
                if let Some(&pos) = self.positions.get(pid) {
                    newly_placed_blocks.push(pos);
                    events.push(Event::BlockPlaced { position: pos });
                }
            }
        }

        for pid in &player_ids {
            if destroyed_robots.contains(pid) {
                let pos = self.rng.next_position(config.size_x, config.size_y);
                self.positions.insert(*pid, pos);
                *self.scores.entry(*pid).or_insert(0) += 1;
                events.push(Event::PlayerMoved {
                    player_id: *pid,
                    position: pos,
                });
            } else if let Some(action) = self.staged_actions.get(pid).copied() {
                match action {
                    PlayerAction::Move(dir) => {
                        if let Some(&cur) = self.positions.get(pid) {
                            if let Some(next) = cur.stepped(dir, config.size_x, config.size_y) {
                                if !self.blocks.contains(&next) {
                                    self.positions.insert(*pid, next);
                                    events.push(Event::PlayerMoved {
                                        player_id: *pid,
                                        position: next,
                                    });
                                }
                            }
                        }
                    }
                    PlayerAction::PlaceBomb => {
                        if let Some(&pos) = self.positions.get(pid) {
                            let id = self.next_bomb_id;
                            self.next_bomb_id += 1;
                            self.bombs.insert(
                                id,
                                Bomb {
                                    position: pos,
                                    timer: config.bomb_timer,
                                },
                            );
                            events.push(Event::BombPlaced { bomb_id: id, position: pos });
                        }
                    }
                    PlayerAction::PlaceBlock => {} // applied above, ahead of teleport/move
                }
            }
        }
        for pos in newly_placed_blocks {
            self.blocks.insert(pos);
        }
        self.staged_actions.clear();

        let turn = Turn {
            turn: self.current_turn,
            events,
        };
        self.journal.turns.push(turn.clone());
        self.broadcast(ServerMessage::Turn(turn));

        if self.current_turn > config.game_length {
            self.end_game();
        }
    }

    fn end_game(&mut self) {
        self.broadcast(ServerMessage::GameEnded {
            scores: self.scores.clone(),
        });
        self.phase = Phase::Lobby;
        self.players.clear();
        self.slot_to_player.clear();
        self.positions.clear();
        self.blocks.clear();
        self.bombs.clear();
        self.staged_actions.clear();
        self.scores.clear();
        self.next_player_id = 0;
        self.next_bomb_id = 0;
        self.current_turn = 0;
        self.journal = Journal::default();
    }
}

/// Owns all authoritative game state behind a single lock, plus the
/// condition variable used to stop the tick task from busy-waiting
/// while the game is in `Lobby`.
pub struct Engine {
    config: GameConfig,
    state: Mutex<EngineState>,
    notify: Notify,
}

impl Engine {
    pub fn new(config: GameConfig) -> Self {
        let state = EngineState::new(&config);
        Engine {
            config,
            state: Mutex::new(state),
            notify: Notify::new(),
        }
    }

    pub async fn handle_inbound(&self, msg: EngineInbound) {
        let mut guard = self.state.lock().await;
        guard.handle_inbound(msg, &self.config);
        let started = guard.phase == Phase::InGame;
        drop(guard);
        if started {
            self.notify.notify_one();
        }
    }

    /// Runs forever: sleeps while `Lobby`, otherwise ticks once every
    /// `turn_duration`. Intended to be the body of one long-lived
    /// `tokio::spawn`ed task.
    pub async fn run_ticks(&self) {
        loop {
            while self.state.lock().await.phase != Phase::InGame {
                self.notify.notified().await;
            }
            tokio::time::sleep(self.config.turn_duration).await;
            let mut guard = self.state.lock().await;
            if guard.phase == Phase::InGame {
                guard.tick(&self.config);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GameConfig {
        GameConfig {
            server_name: "test".into(),
            players_count: 2,
            size_x: 3,
            size_y: 3,
            game_length: 100,
            explosion_radius: 1,
            bomb_timer: 1,
            turn_duration: std::time::Duration::from_millis(1),
            initial_blocks: 0,
            seed: 1,
            port: 0,
        }
    }

    fn make_ingame_state(cfg: &GameConfig) -> EngineState {
        let mut state = EngineState::new(cfg);
        state.phase = Phase::InGame;
        for pid in 0..cfg.players_count {
            state.players.insert(
                pid,
                Player {
                    name: format!("p{pid}"),
                    address: "addr".into(),
                },
            );
            state.scores.insert(pid, 0);
        }
        state
    }

    #[test]
    fn self_placed_block_survives_own_destruction() {
        let cfg = config();
        let mut state = make_ingame_state(&cfg);
        // Player 0 stands where the bomb will go off; player 1 placed it
        // last turn so it is about to explode this tick.
        state.positions.insert(0, Position::new(0, 0));
        state.positions.insert(1, Position::new(2, 2));
        state.bombs.insert(
            0,
            Bomb {
                position: Position::new(0, 0),
                timer: 1,
            },
        );
        state.staged_actions.insert(0, PlayerAction::PlaceBlock);

        state.tick(&cfg);

        assert!(state.blocks.contains(&Position::new(0, 0)));
        assert_eq!(state.scores[&0], 1);
        assert_ne!(state.positions[&0], Position::new(0, 0));
    }

    #[test]
    fn move_into_block_is_rejected() {
        let cfg = config();
        let mut state = make_ingame_state(&cfg);
        state.positions.insert(0, Position::new(1, 1));
        state.positions.insert(1, Position::new(2, 2));
        state.blocks.insert(Position::new(1, 2));
        state
            .staged_actions
            .insert(0, PlayerAction::Move(Direction::Up));

        state.tick(&cfg);

        assert_eq!(state.positions[&0], Position::new(1, 1));
    }

    #[test]
    fn bomb_ids_are_dense_and_increasing() {
        // A long fuse so neither bomb explodes (and so destroys its own
        // owner) within the two ticks this test drives.
        let mut cfg = config();
        cfg.bomb_timer = 10;
        let mut state = make_ingame_state(&cfg);
        state.positions.insert(0, Position::new(0, 0));
        state.positions.insert(1, Position::new(2, 2));
        state.staged_actions.insert(0, PlayerAction::PlaceBomb);
        state.tick(&cfg);
        state.staged_actions.insert(0, PlayerAction::PlaceBomb);
        state.tick(&cfg);
        let ids: Vec<BombId> = state
            .journal
            .turns
            .iter()
            .flat_map(|t| &t.events)
            .filter_map(|e| match e {
                Event::BombPlaced { bomb_id, .. } => Some(*bomb_id),
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn turn_numbers_are_consecutive() {
        let cfg = config();
        let mut state = make_ingame_state(&cfg);
        state.positions.insert(0, Position::new(0, 0));
        state.positions.insert(1, Position::new(2, 2));
        state.tick(&cfg);
        state.tick(&cfg);
        state.tick(&cfg);
        assert_eq!(
            state.journal.turns.iter().map(|t| t.turn).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn late_joiner_replay_is_hello_then_gamestarted_then_every_journaled_turn() {
        let mut cfg = config();
        cfg.game_length = 10;
        let mut state = EngineState::new(&cfg);

        let (outbox0, _inbox0) = mpsc::unbounded_channel();
        state.handle_inbound(
            EngineInbound::SlotReset {
                slot_id: 0,
                address: "a".into(),
                outbox: outbox0,
            },
            &cfg,
        );
        state.handle_inbound(
            EngineInbound::ClientMsg {
                slot_id: 0,
                msg: ClientMessage::Join { name: "A".into() },
            },
            &cfg,
        );

        let (outbox1, _inbox1) = mpsc::unbounded_channel();
        state.handle_inbound(
            EngineInbound::SlotReset {
                slot_id: 1,
                address: "b".into(),
                outbox: outbox1,
            },
            &cfg,
        );
        state.handle_inbound(
            EngineInbound::ClientMsg {
                slot_id: 1,
                msg: ClientMessage::Join { name: "B".into() },
            },
            &cfg,
        );
        assert_eq!(state.phase, Phase::InGame);

        state.tick(&cfg);
        state.tick(&cfg);
        state.tick(&cfg);
        assert_eq!(state.journal.turns.len(), 4); // turn 0 plus three ticks

        let (outbox1b, mut inbox1b) = mpsc::unbounded_channel();
        state.handle_inbound(
            EngineInbound::SlotReset {
                slot_id: 1,
                address: "b-reconnected".into(),
                outbox: outbox1b,
            },
            &cfg,
        );

        let mut received = Vec::new();
        while let Ok(msg) = inbox1b.try_recv() {
            received.push(msg);
        }
        assert!(matches!(received[0], EngineOutbound::SlotReset));
        assert!(matches!(
            received[1],
            EngineOutbound::Server(ServerMessage::Hello { .. })
        ));
        assert!(matches!(
            received[2],
            EngineOutbound::Server(ServerMessage::GameStarted { .. })
        ));
        let turn_numbers: Vec<u16> = received[3..]
            .iter()
            .map(|m| match m {
                EngineOutbound::Server(ServerMessage::Turn(t)) => t.turn,
                other => panic!("expected a Turn, got {other:?}"),
            })
            .collect();
        assert_eq!(turn_numbers, vec![0, 1, 2, 3]);
    }
}
