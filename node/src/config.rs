use std::time::Duration;

use clap::Parser;

use crate::addr::NodeAddress;
use crate::error::NodeError;

/// Default identifier width. `u64` identifiers cap this at 64; this crate
/// does not implement a 160/256-bit bignum identifier space.
pub const DEFAULT_BITS: u32 = 64;

/// `<program> <host> <port> <comma-separated-initial-membership>`, the
/// wire-visible CLI contract. Everything else is an operational knob with a
/// sensible default, not a functional input.
#[derive(Parser, Debug, Clone)]
#[command(name = "chord-node", about = "Chord-style consistent-hashing DHT node")]
pub struct Cli {
    /// Hostname or IP this node binds and advertises.
    pub host: String,

    /// Port this node binds and advertises.
    pub port: u16,

    /// Comma-separated `host:port` bootstrap membership list. May include
    /// this node's own address; if it doesn't, it is added automatically.
    pub bootstrap: String,

    /// Identifier bit width, clamped to 1..=64.
    #[arg(long, default_value_t = DEFAULT_BITS)]
    pub bits: u32,

    /// Stabilization period in milliseconds.
    #[arg(long, default_value_t = 1000)]
    pub stabilization_ms: u64,

    /// Per-RPC timeout in milliseconds, applied to every outbound call
    /// (forwarding, Accept fan-out, stabilization probes).
    #[arg(long, default_value_t = 1500)]
    pub rpc_timeout_ms: u64,

    /// Optional hard wall-clock budget in seconds after which the process
    /// self-terminates (used by an experiment harness). Disabled by
    /// default.
    #[arg(long)]
    pub shutdown_after_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub self_addr: NodeAddress,
    pub bootstrap: Vec<NodeAddress>,
    pub bits: u32,
    pub hop_limit: u32,
    pub stabilization_period: Duration,
    pub loner_reset_period: Duration,
    pub rpc_timeout: Duration,
    pub shutdown_after: Option<Duration>,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self, NodeError> {
        let bits = cli.bits.clamp(1, 64);
        let self_addr = NodeAddress::new(&cli.host, cli.port);
        let bootstrap = cli
            .bootstrap
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(NodeAddress::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Config {
            host: cli.host,
            port: cli.port,
            self_addr,
            bootstrap,
            bits,
            hop_limit: 2 * bits,
            stabilization_period: Duration::from_millis(cli.stabilization_ms),
            loner_reset_period: Duration::from_secs(30),
            rpc_timeout: Duration::from_millis(cli.rpc_timeout_ms),
            shutdown_after: cli.shutdown_after_secs.map(Duration::from_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(bootstrap: &str) -> Cli {
        Cli {
            host: "localhost".into(),
            port: 8080,
            bootstrap: bootstrap.into(),
            bits: 10,
            stabilization_ms: 1000,
            rpc_timeout_ms: 1500,
            shutdown_after_secs: None,
        }
    }

    #[test]
    fn parses_bootstrap_list() {
        let cfg = Config::from_cli(cli("a:1,b:2, c:3")).unwrap();
        assert_eq!(cfg.bootstrap.len(), 3);
        assert_eq!(cfg.hop_limit, 20);
    }

    #[test]
    fn empty_bootstrap_is_allowed() {
        let cfg = Config::from_cli(cli("")).unwrap();
        assert!(cfg.bootstrap.is_empty());
    }

    #[test]
    fn rejects_malformed_member() {
        assert!(Config::from_cli(cli("not-an-address")).is_err());
    }

    #[test]
    fn clamps_bits_to_64() {
        let mut c = cli("a:1");
        c.bits = 256;
        assert_eq!(Config::from_cli(c).unwrap().bits, 64);
    }
}
