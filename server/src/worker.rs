//! The fixed pool of connection slots: one TCP acceptor loop per slot,
//! each running a reader task and a writer task against whichever
//! socket currently occupies it.
//!
//! Grounded on `relay-server/src/processing_module.rs`/`message_relay.rs`
//! (paired tokio tasks racing on `tokio::select!`, one aborts the other)
//! and on `examples/original_source/bomb-it-server.cpp`'s
//! `handle_servers`/`client_connect` (fixed slot count, reset-then-replay
//! handshake on (re)connect).

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use protocol::ServerSideCodec;
use tokio_util::codec::Framed;

use crate::engine::{Engine, EngineInbound, EngineOutbound};
use crate::error::{ConfigError, TransportError};

/// Binds the listener and spawns one long-lived acceptor task per slot.
/// Each task loops forever: accept a connection, serve it until either
/// half dies, then go back to accepting. Multiple tasks calling
/// `accept()` on the same listener concurrently is safe; the kernel
/// hands each incoming connection to exactly one waiter.
pub async fn run(engine: Arc<Engine>, port: u16, slot_count: usize) -> Result<(), ConfigError> {
    let listener = Arc::new(
        TcpListener::bind(("::", port))
            .await
            .map_err(|source| ConfigError::Bind { port, source })?,
    );
    let mut handles = Vec::with_capacity(slot_count);
    for slot_id in 0..slot_count {
        let listener = listener.clone();
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            acceptor_loop(slot_id, listener, engine).await;
        }));
    }
    for handle in handles {
        let _ = handle.await;
    }
    Ok(())
}

async fn acceptor_loop(slot_id: usize, listener: Arc<TcpListener>, engine: Arc<Engine>) {
    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(error) => {
                tracing::warn!(slot_id, %error, "accept failed, retrying");
                continue;
            }
        };
        if let Err(error) = socket.set_nodelay(true) {
            tracing::warn!(slot_id, %error, "failed to set TCP_NODELAY");
        }
        tracing::info!(slot_id, address = %peer, "slot occupied");
        serve_connection(slot_id, socket, peer.to_string(), &engine).await;
        tracing::info!(slot_id, "slot freed");
    }
}

async fn serve_connection(
    slot_id: usize,
    socket: tokio::net::TcpStream,
    address: String,
    engine: &Arc<Engine>,
) {
    let framed = Framed::new(socket, ServerSideCodec);
    let (mut sink, mut stream) = framed.split();
    let (outbox, mut inbox) = mpsc::unbounded_channel::<EngineOutbound>();

    engine
        .handle_inbound(EngineInbound::SlotReset {
            slot_id,
            address,
            outbox,
        })
        .await;

    let write_task = tokio::spawn(async move {
        // Barrier: discard anything popped before our own SlotReset
        // acknowledgement so a prior tenant's leftover messages can
        // never reach this socket.
        loop {
            match inbox.recv().await {
                Some(EngineOutbound::SlotReset) => break,
                Some(EngineOutbound::Server(_)) => continue,
                None => return,
            }
        }
        while let Some(EngineOutbound::Server(msg)) = inbox.recv().await {
            if let Err(error) = sink.send(msg).await {
                let error = TransportError::from(error);
                tracing::warn!(slot_id, %error, "write failed, closing slot");
                break;
            }
        }
    });

    let engine_for_read = engine.clone();
    let read_task = tokio::spawn(async move {
        loop {
            match stream.next().await {
                Some(Ok(msg)) => {
                    engine_for_read
                        .handle_inbound(EngineInbound::ClientMsg { slot_id, msg })
                        .await;
                }
                Some(Err(error)) => {
                    let error = TransportError::from(error);
                    tracing::warn!(slot_id, %error, "protocol error, closing slot");
                    break;
                }
                None => break,
            }
        }
    });

    let mut read_task = read_task;
    let mut write_task = write_task;
    tokio::select! {
        _ = &mut read_task => { write_task.abort(); }
        _ = &mut write_task => { read_task.abort(); }
    }

    engine
        .handle_inbound(EngineInbound::Disconnect { slot_id })
        .await;
}
