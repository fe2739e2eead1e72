use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use chord_node::config::{Cli, Config};
use chord_node::crash::CrashState;
use chord_node::{build_server, initial_ring, stabilize, transport};

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_cli(cli).unwrap_or_else(|e| {
        eprintln!("invalid configuration: {e}");
        std::process::exit(1);
    });

    tracing::info!(
        addr = %config.self_addr,
        bits = config.bits,
        bootstrap = ?config.bootstrap,
        "starting node"
    );

    let ring = Arc::new(initial_ring(
        config.self_addr.clone(),
        config.bits,
        &config.bootstrap,
    ));
    let client = transport::build_client(config.rpc_timeout);
    let crash_state = Arc::new(CrashState::new());

    let stabilization_handle = stabilize::spawn(
        Arc::clone(&ring),
        client.clone(),
        Arc::clone(&crash_state),
        config.stabilization_period,
        config.loner_reset_period,
    );

    let listener = std::net::TcpListener::bind((config.host.as_str(), config.port))?;
    let server = build_server(listener, config.clone(), Arc::clone(&ring), client, Arc::clone(&crash_state))?;

    if let Some(budget) = config.shutdown_after {
        let handle = server.handle();
        actix_rt::spawn(async move {
            actix_rt::time::sleep(budget).await;
            tracing::info!("wall-clock budget elapsed, shutting down");
            handle.stop(true).await;
        });
    }

    let result = server.await;
    stabilization_handle.abort();
    result
}
