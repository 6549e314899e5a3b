// Copyright (c) 2022, MaidSafe.
// All rights reserved.
//
// This SAFE Network Software is licensed under the BSD-3-Clause license.
// Please see the LICENSE file for more details.

use crdts::quickcheck::{Arbitrary, Gen};
use serde::{Deserialize, Serialize};
use std::cmp::{Eq, Ord, Ordering, PartialEq, PartialOrd};
use std::hash::{Hash, Hasher};

use crdts::Actor;

/// A `(timestamp, peer_id)` pair: the total-order key of the last-writer-wins
/// rule described in section 4.1 of the spec.
///
/// Larger `timestamp` wins; ties are broken by larger `peer_id`. Unlike a
/// Lamport clock, a `Stamp` does not merge with timestamps it observes —
/// `OpStore` is responsible for bumping its own local counter forward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stamp<A: Actor> {
    timestamp: i64,
    peer_id: A,
}

impl<A: Actor> Stamp<A> {
    /// creates a new Stamp instance
    pub fn new(peer_id: A, timestamp: i64) -> Self {
        Self { peer_id, timestamp }
    }

    /// returns the timestamp
    #[inline]
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// returns peer_id reference
    #[inline]
    pub fn peer_id(&self) -> &A {
        &self.peer_id
    }
}

impl<A: Actor> Ord for Stamp<A> {
    /// compares this Stamp with another.
    /// larger timestamp wins; ties broken by larger peer_id.
    fn cmp(&self, other: &Self) -> Ordering {
        match self.timestamp.cmp(&other.timestamp) {
            Ordering::Equal => self.peer_id.cmp(&other.peer_id),
            ord => ord,
        }
    }
}

impl<A: Actor> PartialOrd for Stamp<A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<A: Actor> PartialEq for Stamp<A> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<A: Actor> Eq for Stamp<A> {}

impl<A: Actor> Hash for Stamp<A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.peer_id.hash(state);
        self.timestamp.hash(state);
    }
}

// Generate arbitrary (random) stamps. needed by quickcheck.
impl<A: Actor + Arbitrary> Arbitrary for Stamp<A> {
    fn arbitrary<G: Gen>(g: &mut G) -> Self {
        Self {
            peer_id: A::arbitrary(g),
            timestamp: i64::arbitrary(g),
        }
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        let mut shrunk = Vec::new();
        if self.timestamp > 0 {
            shrunk.push(Self::new(self.peer_id.clone(), self.timestamp - 1));
        }
        Box::new(shrunk.into_iter())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use quickcheck::quickcheck;

    quickcheck! {
        fn test_total_order(a: Stamp<u8>, b: Stamp<u8>) -> bool {
            let cmp_ab = a.cmp(&b);
            let cmp_ba = b.cmp(&a);

            match (cmp_ab, cmp_ba) {
                (Ordering::Less, Ordering::Greater) => a.timestamp < b.timestamp || a.timestamp == b.timestamp && a.peer_id < b.peer_id,
                (Ordering::Greater, Ordering::Less) => a.timestamp > b.timestamp || a.timestamp == b.timestamp && a.peer_id > b.peer_id,
                (Ordering::Equal, Ordering::Equal) => a.peer_id == b.peer_id && a.timestamp == b.timestamp,
                _ => false,
            }
        }

        fn larger_timestamp_wins_regardless_of_peer(a_peer: u8, b_peer: u8, t: i64) -> bool {
            // a strictly larger timestamp always wins, no matter how the peer
            // ids compare (first-component dominance, spec 4.1 rule 1).
            let a = Stamp::new(a_peer, t);
            let b = Stamp::new(b_peer, t.saturating_add(1));
            b > a
        }
    }
}
