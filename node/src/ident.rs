//! Identifier arithmetic on the cyclic group `Z / 2^bits Z`.
//!
//! Every routing decision in the ring rests on the half-open arc test
//! `in_arc` and its open variant `in_open_arc`. Keep these two functions the
//! single source of truth for modular reasoning; nothing else should compare
//! identifiers with plain `<`/`>`.

use sha1::{Digest, Sha1};

pub type Identifier = u64;

/// Truncate a full SHA-1-derived value to `bits` bits of the identifier
/// space. `bits` is clamped to `1..=64` by `Config`; this function tolerates
/// the full range including 64 (no mask needed) for robustness.
pub fn mask(id: u64, bits: u32) -> Identifier {
    if bits >= 64 {
        id
    } else {
        id & ((1u64 << bits) - 1)
    }
}

/// Hash an arbitrary string (a node address or a storage key) into the
/// identifier space via SHA-1, truncated to `bits` bits.
pub fn hash_to_id(s: &str, bits: u32) -> Identifier {
    let mut hasher = Sha1::new();
    hasher.update(s.as_bytes());
    let digest = hasher.finalize();
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&digest[..8]);
    mask(u64::from_be_bytes(buf), bits)
}

/// `(self_id + 2^i) mod 2^bits`, the start of finger `i`'s interval.
pub fn finger_start(self_id: Identifier, i: u32, bits: u32) -> Identifier {
    mask(self_id.wrapping_add(1u64 << i), bits)
}

/// Half-open arc test `x ∈ (a, b]` on the identifier circle.
///
/// `a == b` is the single-node-ring degenerate case: the arc covers the
/// whole circle, so this returns `true` unconditionally. In practice
/// callers short-circuit on `pred_id == node_id` before ever reaching this
/// comparison, but the function is total on its own terms regardless.
pub fn in_arc(x: Identifier, a: Identifier, b: Identifier) -> bool {
    match a.cmp(&b) {
        std::cmp::Ordering::Less => x > a && x <= b,
        std::cmp::Ordering::Greater => x > a || x <= b,
        std::cmp::Ordering::Equal => true,
    }
}

/// Open arc test `x ∈ (a, b)` on the identifier circle.
///
/// `a == b` means the two bounds coincide (e.g. a single-node ring's
/// predecessor/successor/self are all the same identifier); the arc is then
/// the whole circle minus that single point. This shape is exercised the
/// first time a lone node accepts a peer.
pub fn in_open_arc(x: Identifier, a: Identifier, b: Identifier) -> bool {
    match a.cmp(&b) {
        std::cmp::Ordering::Less => x > a && x < b,
        std::cmp::Ordering::Greater => x > a || x < b,
        std::cmp::Ordering::Equal => x != a,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_arc_normal_range() {
        assert!(in_arc(5, 1, 10));
        assert!(!in_arc(1, 1, 10)); // excludes left
        assert!(in_arc(10, 1, 10)); // includes right
        assert!(!in_arc(11, 1, 10));
    }

    #[test]
    fn in_arc_wraps() {
        // arc (250, 5] on an 8-bit ring wraps through 255/0
        assert!(in_arc(254, 250, 5));
        assert!(in_arc(0, 250, 5));
        assert!(in_arc(5, 250, 5));
        assert!(!in_arc(6, 250, 5));
        assert!(!in_arc(250, 250, 5));
    }

    #[test]
    fn in_arc_degenerate_owns_everything() {
        assert!(in_arc(42, 7, 7));
        assert!(in_arc(7, 7, 7));
    }

    #[test]
    fn in_open_arc_excludes_both_ends() {
        assert!(!in_open_arc(1, 1, 10));
        assert!(!in_open_arc(10, 1, 10));
        assert!(in_open_arc(5, 1, 10));
    }

    #[test]
    fn in_open_arc_degenerate_excludes_only_the_point() {
        assert!(!in_open_arc(7, 7, 7));
        assert!(in_open_arc(8, 7, 7));
        assert!(in_open_arc(0, 7, 7));
    }

    #[test]
    fn mask_clamps_to_bit_width() {
        assert_eq!(mask(0b1111_1111, 4), 0b1111);
        assert_eq!(mask(u64::MAX, 64), u64::MAX);
    }
}
