//! Framing for the three links in play: two `tokio_util::codec::Decoder`/
//! `Encoder` pairs for the streaming TCP links, and a pair of one-shot
//! functions for the UDP link to the GUI.
//!
//! Grounded on `relay-server/src/message_relay.rs` and
//! `processing_module.rs`'s use of `Framed` over a `TcpStream`, and on
//! `examples/original_source/connection.h`'s `DatagramReader`/
//! `DatagramWriter` for the one-shot UDP shape.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{EncodeError, ProtocolError};
use crate::types::{ClientMessage, ClientToGui, ServerMessage};
use crate::wire::Cursor;

/// The IPv6/UDP payload ceiling `connection.h` uses; a GUI datagram must
/// fit in one packet of this size.
pub const DATAGRAM_SIZE: usize = 65507;

/// Server-side framing: decodes `ClientMessage` off the wire, encodes
/// `ServerMessage` onto it. One instance per accepted connection.
#[derive(Debug, Default)]
pub struct ServerSideCodec;

impl Decoder for ServerSideCodec {
    type Item = ClientMessage;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let mut cur = Cursor::new(&src[..]);
        match ClientMessage::try_decode(&mut cur)? {
            Some(msg) => {
                let consumed = cur.consumed();
                src.advance(consumed);
                Ok(Some(msg))
            }
            None => Ok(None),
        }
    }
}

impl Encoder<ServerMessage> for ServerSideCodec {
    type Error = EncodeError;

    fn encode(&mut self, item: ServerMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.encode(dst)
    }
}

/// Client-side framing: decodes `ServerMessage`, encodes `ClientMessage`.
#[derive(Debug, Default)]
pub struct ClientSideCodec;

impl Decoder for ClientSideCodec {
    type Item = ServerMessage;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let mut cur = Cursor::new(&src[..]);
        match ServerMessage::try_decode(&mut cur)? {
            Some(msg) => {
                let consumed = cur.consumed();
                src.advance(consumed);
                Ok(Some(msg))
            }
            None => Ok(None),
        }
    }
}

impl Encoder<ClientMessage> for ClientSideCodec {
    type Error = EncodeError;

    fn encode(&mut self, item: ClientMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.encode(dst)
    }
}

/// Encodes a client->GUI message into a single datagram, rejecting
/// anything that would not fit in one UDP packet.
pub fn encode_gui_message(msg: &ClientToGui) -> Result<BytesMut, EncodeError> {
    let mut buf = BytesMut::new();
    msg.encode(&mut buf)?;
    if buf.len() > DATAGRAM_SIZE {
        return Err(EncodeError::DatagramTooLarge(buf.len(), DATAGRAM_SIZE));
    }
    Ok(buf)
}
