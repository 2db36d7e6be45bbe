mod arbiter;
mod config;
mod error;
mod gui;
mod server_ingress;
mod world;

use std::sync::Arc;

use clap::Parser;
use tokio::net::{TcpStream, UdpSocket};
use tokio::sync::{mpsc, Mutex};
use tokio_util::codec::Framed;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use arbiter::Arbiter;
use config::{ClientArgs, ClientConfig};
use protocol::ClientSideCodec;
use world::World;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=info", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    let args = ClientArgs::parse();
    let config = match ClientConfig::try_from(args) {
        Ok(config) => config,
        Err(error) => {
            tracing::error!(%error, "invalid configuration");
            std::process::exit(1);
        }
    };

    tracing::info!(
        server_address = %config.server_address,
        gui_address = %config.gui_address,
        "starting bombit-client"
    );

    let tcp = match TcpStream::connect(config.server_address).await {
        Ok(tcp) => tcp,
        Err(error) => {
            tracing::error!(%error, "failed to connect to server");
            std::process::exit(1);
        }
    };
    if let Err(error) = tcp.set_nodelay(true) {
        tracing::warn!(%error, "failed to set TCP_NODELAY");
    }

    let gui_socket = match UdpSocket::bind(("::", config.port)).await {
        Ok(socket) => socket,
        Err(error) => {
            tracing::error!(%error, "failed to bind gui socket");
            std::process::exit(1);
        }
    };
    if let Err(error) = gui_socket.connect(config.gui_address).await {
        tracing::error!(%error, "failed to connect gui socket");
        std::process::exit(1);
    }
    let gui_socket = Arc::new(gui_socket);

    let framed = Framed::new(tcp, ClientSideCodec);
    let (sink, stream) = server_ingress::split_connection(framed);

    let arbiter = Arc::new(Arbiter::new());
    let world = Arc::new(Mutex::new(World::new()));
    let (to_server, from_gui) = mpsc::unbounded_channel();

    let gui_task = tokio::spawn(gui::run(
        gui_socket.clone(),
        arbiter.clone(),
        config.player_name.clone(),
        to_server,
    ));
    let outbound_task = tokio::spawn(server_ingress::run_outbound(sink, from_gui));
    let inbound_task = tokio::spawn(server_ingress::run_inbound(
        stream,
        arbiter.clone(),
        world.clone(),
        gui_socket.clone(),
    ));

    tokio::select! {
        _ = gui_task => {}
        _ = outbound_task => {}
        result = inbound_task => {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    tracing::error!(%error, "protocol violation on server link, aborting");
                    std::process::exit(1);
                }
                Err(error) => {
                    tracing::error!(%error, "server ingress task panicked");
                    std::process::exit(1);
                }
            }
        }
    }
}
