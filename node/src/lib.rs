//! Library surface for the `chord-node` binary, split out so integration
//! tests can stand up real node instances without shelling out to the CLI.

pub mod addr;
pub mod api;
pub mod config;
pub mod crash;
pub mod error;
pub mod ident;
pub mod join;
pub mod ring;
pub mod stabilize;
pub mod store;
pub mod transport;
pub mod wire;

use std::sync::Arc;

use actix_web::{App, HttpServer, dev::Server};

use addr::NodeAddress;
use config::Config;
use crash::CrashState;
use ring::Ring;
use store::KvStore;

/// Build and bind (but do not run) the HTTP server for a single node,
/// wiring up the crash-simulation middleware and the full service set the
/// same way the `chord-node` binary does. Returns the running server handle
/// plus the ring and crash state so a caller (the binary, or a test) can
/// drive stabilization and inspect state directly.
pub fn build_server(
    listener: std::net::TcpListener,
    config: Config,
    ring: Arc<Ring>,
    client: reqwest::Client,
    crash_state: Arc<CrashState>,
) -> std::io::Result<Server> {
    let state = actix_web::web::Data::new(api::AppState {
        ring: Arc::clone(&ring),
        store: KvStore::new(),
        crash: Arc::clone(&crash_state),
        client,
        config,
    });

    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(crash::CrashSimulator::new(Arc::clone(&crash_state)))
            .configure(api::configure)
    })
    .listen(listener)?
    .run();
    Ok(server)
}

/// Build the initial ring for a node: a solo ring if `bootstrap` is empty,
/// otherwise a ring derived from the bootstrap membership snapshot.
pub fn initial_ring(me: NodeAddress, bits: u32, bootstrap: &[NodeAddress]) -> Ring {
    if bootstrap.is_empty() {
        Ring::solo(me, bits)
    } else {
        Ring::from_bootstrap(me, bits, bootstrap)
    }
}
