use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("players-count must be between 1 and {max}, got {got}")]
    PlayersCountOutOfRange { got: u8, max: u8 },

    #[error("size-x and size-y must both be greater than zero")]
    ZeroSizedGrid,

    #[error("failed to bind listener on port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("i/o error on connection slot {slot}: {source}")]
    Io {
        slot: usize,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Protocol(#[from] protocol::ProtocolError),

    #[error(transparent)]
    Encode(#[from] protocol::EncodeError),
}
