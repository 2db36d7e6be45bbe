use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse gui address {raw:?}: {source}")]
    GuiAddress {
        raw: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("failed to parse server address {raw:?}: {source}")]
    ServerAddress {
        raw: String,
        #[source]
        source: std::net::AddrParseError,
    },
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("i/o error talking to the server: {source}")]
    Server {
        #[source]
        source: std::io::Error,
    },

    #[error("i/o error talking to the gui: {source}")]
    Gui {
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Protocol(#[from] protocol::ProtocolError),

    #[error(transparent)]
    Encode(#[from] protocol::EncodeError),
}
