//! Command-line configuration, mirroring `bomb-it-server.cpp`'s
//! `command_parameters_t`/`boost::program_options` flag set one-for-one.

use clap::Parser;

use crate::error::ConfigError;

/// Fixed size of the server's connection-slot pool, matching the
/// original's `NUMBER_OF_CLIENTS`.
pub const NUMBER_OF_SLOTS: usize = 25;

#[derive(Debug, Parser)]
#[command(name = "bombit-server", about = "Authoritative game server for bomb-placing robots")]
pub struct ServerArgs {
    /// Initial number of turns a placed bomb counts down from.
    #[arg(short = 'b', long = "bomb-timer")]
    pub bomb_timer: u16,

    /// Number of players required before the game starts.
    #[arg(short = 'c', long = "players-count")]
    pub players_count: u8,

    /// Milliseconds between turn ticks.
    #[arg(short = 'd', long = "turn-duration")]
    pub turn_duration_ms: u64,

    /// Blast radius, in cells, along each of the four rays from a bomb.
    #[arg(short = 'e', long = "explosion-radius")]
    pub explosion_radius: u16,

    /// Number of random block placements attempted at game start.
    #[arg(short = 'k', long = "initial-blocks")]
    pub initial_blocks: u16,

    /// Final turn number; the game ends once it is exceeded.
    #[arg(short = 'l', long = "game-length")]
    pub game_length: u16,

    /// Name advertised to clients in the Hello message.
    #[arg(short = 'n', long = "server-name")]
    pub server_name: String,

    /// TCP port to listen on.
    #[arg(short = 'p', long = "port")]
    pub port: u16,

    /// RNG seed; defaults to 0 when not given.
    #[arg(short = 's', long = "seed", default_value_t = 0)]
    pub seed: u32,

    /// Grid width.
    #[arg(short = 'x', long = "size-x")]
    pub size_x: u16,

    /// Grid height.
    #[arg(short = 'y', long = "size-y")]
    pub size_y: u16,
}

/// Validated, immutable configuration for one game session's lifetime.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub server_name: String,
    pub players_count: u8,
    pub size_x: u16,
    pub size_y: u16,
    pub game_length: u16,
    pub explosion_radius: u16,
    pub bomb_timer: u16,
    pub turn_duration: std::time::Duration,
    pub initial_blocks: u16,
    pub seed: u32,
    pub port: u16,
}

impl TryFrom<ServerArgs> for GameConfig {
    type Error = ConfigError;

    fn try_from(args: ServerArgs) -> Result<Self, ConfigError> {
        if args.players_count == 0 || args.players_count as usize > NUMBER_OF_SLOTS {
            return Err(ConfigError::PlayersCountOutOfRange {
                got: args.players_count,
                max: NUMBER_OF_SLOTS as u8,
            });
        }
        if args.size_x == 0 || args.size_y == 0 {
            return Err(ConfigError::ZeroSizedGrid);
        }
        Ok(GameConfig {
            server_name: args.server_name,
            players_count: args.players_count,
            size_x: args.size_x,
            size_y: args.size_y,
            game_length: args.game_length,
            explosion_radius: args.explosion_radius,
            bomb_timer: args.bomb_timer,
            turn_duration: std::time::Duration::from_millis(args.turn_duration_ms),
            initial_blocks: args.initial_blocks,
            seed: args.seed,
            port: args.port,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> ServerArgs {
        ServerArgs {
            bomb_timer: 5,
            players_count: 2,
            turn_duration_ms: 500,
            explosion_radius: 2,
            initial_blocks: 10,
            game_length: 100,
            server_name: "arena".into(),
            port: 8080,
            seed: 0,
            size_x: 10,
            size_y: 10,
        }
    }

    #[test]
    fn accepts_valid_configuration() {
        assert!(GameConfig::try_from(base_args()).is_ok());
    }

    #[test]
    fn rejects_players_count_over_slot_limit() {
        let mut args = base_args();
        args.players_count = 26;
        assert!(matches!(
            GameConfig::try_from(args),
            Err(ConfigError::PlayersCountOutOfRange { .. })
        ));
    }

    #[test]
    fn rejects_zero_sized_grid() {
        let mut args = base_args();
        args.size_x = 0;
        assert!(matches!(
            GameConfig::try_from(args),
            Err(ConfigError::ZeroSizedGrid)
        ));
    }
}
