//! Stabilization loop: periodically probe every address appearing in
//! routing state and repair the ring when a peer looks dead or
//! partitioned.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::task::JoinHandle;

use crate::addr::NodeAddress;
use crate::crash::CrashState;
use crate::ident;
use crate::ring::Ring;
use crate::transport;

/// Repair routing state after discovering `dead` is unreachable or a
/// partitioned loner. Predecessor repair is intentionally
/// non-deterministic: it iterates an unordered set of candidates and keeps
/// the last one that matches, rather than stopping at the first.
pub async fn remove_node(ring: &Arc<Ring>, client: &Client, dead: &NodeAddress) {
    let dead_id = ring.id_of(dead);
    let snapshot = ring.snapshot().await;
    let bits = ring.bits as usize;

    // Work on a local copy, mutated in place high-to-low in one sequential
    // pass — index i+1 may already reflect this pass's own repair.
    let mut fingers = snapshot.fingers.clone();

    for i in (0..bits).rev() {
        if fingers[i] != *dead {
            continue;
        }
        fingers[i] = fingers[(i + 1) % bits].clone();
        loop {
            let replacement = fingers[i].clone();
            let view = match transport::probe_node(client, &replacement).await {
                Ok(v) => v,
                Err(_) => break,
            };
            let pred = match NodeAddress::parse(&view.predecessor) {
                Ok(p) => p,
                Err(_) => break,
            };
            if pred == *dead {
                break;
            }
            let pred_id = ring.id_of(&pred);
            let repl_id = ring.id_of(&replacement);
            if ident::in_open_arc(pred_id, dead_id, repl_id) {
                fingers[i] = pred;
            } else {
                break;
            }
        }
    }

    for (i, f) in fingers.iter().enumerate() {
        if *f != snapshot.fingers[i] {
            ring.set_finger(i, f.clone()).await;
        }
    }

    if snapshot.successor == *dead {
        ring.set_successor(fingers[0].clone()).await;
    }

    if snapshot.predecessor == *dead {
        let candidates: HashSet<NodeAddress> = fingers.into_iter().collect();
        for other in &candidates {
            if let Ok(view) = transport::probe_network(client, other).await {
                if view.successor == dead.as_str() || view.successor == ring.me.as_str() {
                    ring.set_predecessor(other.clone()).await;
                }
            }
        }
    }
}

async fn stabilize_once(ring: &Arc<Ring>, client: &Client) {
    let snapshot = ring.snapshot().await;
    let targets = snapshot.known_addresses();

    for addr in &targets {
        if *addr == ring.me {
            // a self-probe can only ever conclude "I am a loner, repair
            // myself" (a no-op) or "I am alive" — skip the wasted RPC.
            continue;
        }
        match transport::probe_node_info(client, addr).await {
            Ok(info) if info.successor == addr.as_str() => {
                tracing::warn!(peer = %addr, "peer is a partitioned loner, repairing");
                remove_node(ring, client, addr).await;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(peer = %addr, error = %e, "peer unreachable, repairing");
                remove_node(ring, client, addr).await;
            }
        }
    }
}

/// Spawn the long-lived stabilization worker. It sleeps for `period`, then
/// (if not crashed) probes every known peer; the loop-prevention set is
/// cleared every time accumulated uptime crosses `loner_reset`.
pub fn spawn(
    ring: Arc<Ring>,
    client: Client,
    crash: Arc<CrashState>,
    period: Duration,
    loner_reset: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut since_reset = Duration::ZERO;
        loop {
            tokio::time::sleep(period).await;
            if crash.is_crashed() {
                continue;
            }
            stabilize_once(&ring, &client).await;
            since_reset += period;
            if since_reset >= loner_reset {
                since_reset = Duration::ZERO;
                ring.clear_loners().await;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring::RingState;

    fn a(s: &str) -> NodeAddress {
        NodeAddress::parse(s).unwrap()
    }

    #[tokio::test]
    async fn successor_repair_cascades_through_fingers_to_a_live_peer() {
        // Unreachable peers still get the local, non-network part of the
        // repair applied: a dead successor falls back through the finger
        // cascade to whichever live address the table still holds.
        let ring = Arc::new(Ring::solo(a("self:1"), 4));
        let dead = a("dead:2");
        let alive = a("alive:3");
        ring.replace(RingState {
            predecessor: dead.clone(),
            successor: dead.clone(),
            fingers: vec![dead.clone(), dead.clone(), alive.clone(), dead.clone()],
        })
        .await;

        let client = transport::build_client(Duration::from_millis(50));
        remove_node(&ring, &client, &dead).await;

        let snap = ring.snapshot().await;
        assert_eq!(snap.successor, alive);
    }
}
