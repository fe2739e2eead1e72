//! Join/Accept protocol: the bilateral handshake that weaves a new node
//! into an existing ring.

use std::sync::Arc;

use reqwest::Client;

use crate::addr::NodeAddress;
use crate::error::NodeError;
use crate::ident;
use crate::ring::Ring;
use crate::transport;

/// Handle an inbound Accept(loner, nprime) RPC at this node. Returns the
/// membership list to hand back to the caller (possibly empty).
pub async fn handle_accept(
    ring: &Arc<Ring>,
    client: &Client,
    loner: NodeAddress,
    nprime: NodeAddress,
) -> Result<Vec<NodeAddress>, NodeError> {
    let snapshot = ring.snapshot().await;
    let mut others = snapshot.known_addresses();
    others.insert(ring.me.clone());

    if others.contains(&loner) {
        return Ok(Vec::new());
    }
    if ring.loners().await.contains(&loner) {
        return Ok(Vec::new());
    }

    if !ring.add_node(&loner).await {
        ring.remember_loner(loner.clone()).await;
    }

    let nprime_id = ring.id_of(&nprime);
    let mut network = vec![ring.me.clone()];

    for peer in &others {
        let peer_id = ring.id_of(peer);
        if ident::in_open_arc(peer_id, ring.me_id, nprime_id) {
            match Box::pin(transport::send_accept(client, peer, &loner, &nprime)).await {
                Ok(members) => network.extend(members),
                Err(e) => {
                    tracing::warn!(peer = %peer, error = %e, "accept fan-out to peer failed");
                }
            }
        }
    }
    Ok(network)
}

/// The joiner's side: send Accept(self, seed) to `seed`, then rebuild this
/// node's entire ring state from the returned membership snapshot plus
/// self.
pub async fn join_via_seed(
    ring: &Arc<Ring>,
    client: &Client,
    seed: &NodeAddress,
) -> Result<(), NodeError> {
    let members = transport::send_accept(client, seed, &ring.me, seed).await?;
    let mut all = members;
    all.push(ring.me.clone());
    let new_state = Ring::derive_state(&ring.me, ring.bits, &all);
    ring.replace(new_state).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn a(s: &str) -> NodeAddress {
        NodeAddress::parse(s).unwrap()
    }

    #[tokio::test]
    async fn known_loner_short_circuits_to_empty() {
        let ring = Arc::new(Ring::solo(a("h:1"), 10));
        let client = transport::build_client(Duration::from_millis(100));
        // the solo ring's successor/predecessor are already "h:1" (self);
        // accepting a loner equal to an existing known address (self) must
        // short-circuit without any network I/O.
        let result = handle_accept(&ring, &client, a("h:1"), a("h:1")).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn repeated_loner_in_loop_prevent_short_circuits() {
        let ring = Arc::new(Ring::solo(a("h:1"), 10));
        ring.remember_loner(a("h:9")).await;
        let client = transport::build_client(Duration::from_millis(100));
        let result = handle_accept(&ring, &client, a("h:9"), a("h:1")).await.unwrap();
        assert!(result.is_empty());
    }
}
