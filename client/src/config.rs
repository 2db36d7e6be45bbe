//! Command-line configuration, mirroring `bomb-it-client.cpp`'s
//! `command_parameters_t` for the player client.

use std::net::SocketAddr;

use clap::Parser;

use crate::error::ConfigError;

#[derive(Debug, Parser)]
#[command(name = "bombit-client", about = "Mediates between a local GUI and the game server")]
pub struct ClientArgs {
    /// Address the GUI listens on for client->GUI datagrams.
    #[arg(short = 'd', long = "gui-address")]
    pub gui_address: String,

    /// Name sent in the Join message once the lobby is reached.
    #[arg(short = 'n', long = "player-name")]
    pub player_name: String,

    /// Local UDP port this client listens on for GUI->client datagrams.
    #[arg(short = 'p', long = "port")]
    pub port: u16,

    /// Game server TCP address.
    #[arg(short = 's', long = "server-address")]
    pub server_address: String,
}

/// Validated connection parameters for one client session.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub gui_address: SocketAddr,
    pub player_name: String,
    pub port: u16,
    pub server_address: SocketAddr,
}

impl TryFrom<ClientArgs> for ClientConfig {
    type Error = ConfigError;

    fn try_from(args: ClientArgs) -> Result<Self, ConfigError> {
        let gui_address =
            args.gui_address
                .parse()
                .map_err(|source| ConfigError::GuiAddress {
                    raw: args.gui_address.clone(),
                    source,
                })?;
        let server_address =
            args.server_address
                .parse()
                .map_err(|source| ConfigError::ServerAddress {
                    raw: args.server_address.clone(),
                    source,
                })?;
        Ok(ClientConfig {
            gui_address,
            player_name: args.player_name,
            port: args.port,
            server_address,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> ClientArgs {
        ClientArgs {
            gui_address: "127.0.0.1:9000".into(),
            player_name: "robo".into(),
            port: 9001,
            server_address: "127.0.0.1:8080".into(),
        }
    }

    #[test]
    fn accepts_valid_configuration() {
        assert!(ClientConfig::try_from(base_args()).is_ok());
    }

    #[test]
    fn rejects_malformed_gui_address() {
        let mut args = base_args();
        args.gui_address = "not-an-address".into();
        assert!(matches!(
            ClientConfig::try_from(args),
            Err(ConfigError::GuiAddress { .. })
        ));
    }

    #[test]
    fn rejects_malformed_server_address() {
        let mut args = base_args();
        args.server_address = "also-not-one".into();
        assert!(matches!(
            ClientConfig::try_from(args),
            Err(ConfigError::ServerAddress { .. })
        ));
    }
}
