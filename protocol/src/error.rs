use thiserror::Error;

/// Errors observed while decoding a message off the wire.
///
/// These are always fatal to the link that produced them: the server
/// drops the offending connection slot, the client aborts the process
/// (the protocol is a contract, not a negotiation).
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unknown {context} tag {tag}")]
    UnknownTag { context: &'static str, tag: u8 },

    #[error("invalid direction byte {0}, expected 0..=3")]
    InvalidDirection(u8),

    #[error("connection closed with a message in flight")]
    UnexpectedEof,

    #[error("sequence count {0} exceeds the sanity limit of {1}")]
    SequenceTooLarge(u32, u32),

    #[error("datagram of {0} bytes does not match any known GUI message shape")]
    MalformedGuiDatagram(usize),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors raised while encoding a message, rather than while decoding one.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("string of {0} bytes exceeds the 255-byte wire limit")]
    StringTooLong(usize),

    #[error("encoded datagram of {0} bytes exceeds the {1}-byte UDP limit")]
    DatagramTooLarge(usize, usize),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
