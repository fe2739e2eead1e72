//! Per-node routing state: predecessor, successor, finger table, and the
//! responsibility/forwarding logic built on top of it. State mutation is
//! guarded by a single `tokio::sync::RwLock`; callers must never hold the
//! guard across an outbound RPC — clone a snapshot, drop the guard, then
//! call out.

use std::collections::HashSet;

use tokio::sync::RwLock;

use crate::addr::NodeAddress;
use crate::ident::{self, Identifier};

/// The mutable routing triple. `fingers.len() == bits`.
#[derive(Debug, Clone)]
pub struct RingState {
    pub predecessor: NodeAddress,
    pub successor: NodeAddress,
    pub fingers: Vec<NodeAddress>,
}

impl RingState {
    /// All distinct addresses this node currently knows about through
    /// routing state: predecessor, successor, and every finger.
    pub fn known_addresses(&self) -> HashSet<NodeAddress> {
        let mut set: HashSet<NodeAddress> = self.fingers.iter().cloned().collect();
        set.insert(self.predecessor.clone());
        set.insert(self.successor.clone());
        set
    }
}

pub struct Ring {
    pub me: NodeAddress,
    pub me_id: Identifier,
    pub bits: u32,
    state: RwLock<RingState>,
    /// Loners recently accepted without a routing-state change; repeated
    /// Accepts for them short-circuit to an empty membership list. Cleared
    /// on the stabilization loop's fixed reset period.
    loop_prevent: RwLock<HashSet<NodeAddress>>,
}

impl Ring {
    /// A fresh single-node ring: predecessor, successor, and every finger
    /// point at `me`.
    pub fn solo(me: NodeAddress, bits: u32) -> Self {
        let me_id = ident::hash_to_id(me.as_str(), bits);
        let state = RingState {
            predecessor: me.clone(),
            successor: me.clone(),
            fingers: vec![me.clone(); bits as usize],
        };
        Ring {
            me,
            me_id,
            bits,
            state: RwLock::new(state),
            loop_prevent: RwLock::new(HashSet::new()),
        }
    }

    /// Build a ring state from a membership snapshot (the bootstrap list at
    /// startup, or the flattened result of a join). `members` need not
    /// include `me`; it is added if missing.
    pub fn derive_state(me: &NodeAddress, bits: u32, members: &[NodeAddress]) -> RingState {
        let mut addrs: Vec<NodeAddress> = members.to_vec();
        if !addrs.contains(me) {
            addrs.push(me.clone());
        }
        let me_id = ident::hash_to_id(me.as_str(), bits);

        let mut by_id: Vec<(Identifier, NodeAddress)> = addrs
            .into_iter()
            .map(|a| (ident::hash_to_id(a.as_str(), bits), a))
            .collect();
        by_id.sort_by_key(|(id, _)| *id);
        by_id.dedup_by_key(|(id, _)| *id);

        let n = by_id.len();
        let me_index = by_id
            .iter()
            .position(|(id, _)| *id == me_id)
            .expect("self address must hash into the membership snapshot");

        let predecessor = by_id[(me_index + n - 1) % n].1.clone();
        let successor = by_id[(me_index + 1) % n].1.clone();

        let mut fingers = Vec::with_capacity(bits as usize);
        for i in 0..bits {
            let start = ident::finger_start(me_id, i, bits);
            // first node with id >= start, wrapping to the smallest id
            let finger = by_id
                .iter()
                .find(|(id, _)| *id >= start)
                .or(by_id.first())
                .expect("membership snapshot is non-empty")
                .1
                .clone();
            fingers.push(finger);
        }

        RingState {
            predecessor,
            successor,
            fingers,
        }
    }

    pub fn from_bootstrap(me: NodeAddress, bits: u32, members: &[NodeAddress]) -> Self {
        let me_id = ident::hash_to_id(me.as_str(), bits);
        let state = Self::derive_state(&me, bits, members);
        Ring {
            me,
            me_id,
            bits,
            state: RwLock::new(state),
            loop_prevent: RwLock::new(HashSet::new()),
        }
    }

    pub async fn snapshot(&self) -> RingState {
        self.state.read().await.clone()
    }

    pub fn id_of(&self, addr: &NodeAddress) -> Identifier {
        ident::hash_to_id(addr.as_str(), self.bits)
    }

    /// Is this node responsible for `key`?
    pub async fn is_responsible(&self, key: &str) -> bool {
        let key_id = ident::hash_to_id(key, self.bits);
        if key_id == self.me_id {
            return true;
        }
        let state = self.state.read().await;
        let pred_id = self.id_of(&state.predecessor);
        if pred_id == self.me_id {
            return true;
        }
        ident::in_arc(key_id, pred_id, self.me_id)
    }

    /// Pick a forwarding target for identifier `target`, scanning fingers
    /// low-to-high and returning the predecessor of the first finger whose
    /// id reaches or passes it. Never call this when `is_responsible` is
    /// true.
    pub fn select_forward(&self, fingers: &[NodeAddress], target: Identifier) -> NodeAddress {
        for (i, finger) in fingers.iter().enumerate() {
            let fid = self.id_of(finger);
            if fid >= target {
                return if i == 0 {
                    fingers[0].clone()
                } else {
                    fingers[i - 1].clone()
                };
            }
        }
        fingers[0].clone()
    }

    /// Integrate a candidate address into predecessor, successor, and every
    /// finger it improves. Returns true iff any slot changed.
    pub async fn add_node(&self, candidate: &NodeAddress) -> bool {
        if *candidate == self.me {
            return false;
        }
        let h = self.id_of(candidate);
        let mut state = self.state.write().await;
        let mut changed = false;

        let pred_id = self.id_of(&state.predecessor);
        if ident::in_open_arc(h, pred_id, self.me_id) {
            state.predecessor = candidate.clone();
            changed = true;
        }

        let succ_id = self.id_of(&state.successor);
        if ident::in_open_arc(h, self.me_id, succ_id) {
            state.successor = candidate.clone();
            changed = true;
        }

        for i in 0..self.bits as usize {
            let start = ident::finger_start(self.me_id, i as u32, self.bits);
            let finger_id = self.id_of(&state.fingers[i]);
            if ident::in_open_arc(h, start, finger_id) {
                state.fingers[i] = candidate.clone();
                changed = true;
            }
        }
        changed
    }

    /// Isolate into a single-node ring. No peer notification.
    pub async fn leave(&self) -> bool {
        let mut state = self.state.write().await;
        let already_alone = state.predecessor == self.me && state.successor == self.me;
        state.predecessor = self.me.clone();
        state.successor = self.me.clone();
        for f in state.fingers.iter_mut() {
            *f = self.me.clone();
        }
        !already_alone
    }

    /// Replace the entire ring state wholesale (used after a join
    /// completes and a fresh snapshot has been derived).
    pub async fn replace(&self, new_state: RingState) {
        let mut state = self.state.write().await;
        *state = new_state;
    }

    pub async fn set_successor(&self, addr: NodeAddress) {
        self.state.write().await.successor = addr;
    }

    pub async fn set_predecessor(&self, addr: NodeAddress) {
        self.state.write().await.predecessor = addr;
    }

    pub async fn set_finger(&self, i: usize, addr: NodeAddress) {
        self.state.write().await.fingers[i] = addr;
    }

    pub async fn loners(&self) -> HashSet<NodeAddress> {
        self.loop_prevent.read().await.clone()
    }

    pub async fn remember_loner(&self, addr: NodeAddress) {
        self.loop_prevent.write().await.insert(addr);
    }

    pub async fn clear_loners(&self) {
        self.loop_prevent.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a(s: &str) -> NodeAddress {
        NodeAddress::parse(s).unwrap()
    }

    #[tokio::test]
    async fn solo_ring_owns_every_key() {
        let ring = Ring::solo(a("h:1"), 10);
        assert!(ring.is_responsible("anything").await);
        assert!(ring.is_responsible("").await);
    }

    #[tokio::test]
    async fn three_node_ring_partitions_ownership() {
        let members = vec![a("h:1"), a("h:2"), a("h:3")];
        let mut rings = Vec::new();
        for m in &members {
            rings.push(Ring::from_bootstrap(m.clone(), 10, &members));
        }
        // every key is responsible at exactly one of the three nodes
        for key in ["alpha", "beta", "gamma", "delta", "epsilon"] {
            let mut owners = 0;
            for r in &rings {
                if r.is_responsible(key).await {
                    owners += 1;
                }
            }
            assert_eq!(owners, 1, "key {key} must have exactly one owner");
        }
    }

    #[tokio::test]
    async fn fingers_form_successor_at_index_zero() {
        let members = vec![a("h:1"), a("h:2"), a("h:3")];
        let ring = Ring::from_bootstrap(a("h:1"), 10, &members);
        let snap = ring.snapshot().await;
        assert_eq!(snap.fingers[0], snap.successor);
    }

    #[tokio::test]
    async fn add_node_updates_successor_of_solo_ring() {
        let ring = Ring::solo(a("h:1"), 10);
        let newcomer = a("h:2");
        let changed = ring.add_node(&newcomer).await;
        assert!(changed);
        let snap = ring.snapshot().await;
        assert_eq!(snap.successor, newcomer);
        assert_eq!(snap.predecessor, newcomer);
    }

    #[tokio::test]
    async fn add_node_is_noop_for_self() {
        let ring = Ring::solo(a("h:1"), 10);
        assert!(!ring.add_node(&a("h:1")).await);
    }

    #[tokio::test]
    async fn leave_isolates_into_solo_ring() {
        let members = vec![a("h:1"), a("h:2"), a("h:3")];
        let ring = Ring::from_bootstrap(a("h:1"), 10, &members);
        assert!(ring.leave().await);
        let snap = ring.snapshot().await;
        assert_eq!(snap.successor, ring.me);
        assert_eq!(snap.predecessor, ring.me);
        assert!(snap.fingers.iter().all(|f| *f == ring.me));
    }

    #[tokio::test]
    async fn leave_on_already_solo_ring_reports_no_change() {
        let ring = Ring::solo(a("h:1"), 10);
        assert!(!ring.leave().await);
    }
}
