// Copyright (c) 2022, MaidSafe.
// All rights reserved.
//
// This SAFE Network Software is licensed under the BSD-3-Clause license.
// Please see the LICENSE file for more details.

use serde::{Deserialize, Serialize};
use std::cmp::{Eq, PartialEq};

use super::{EntityId, Stamp};
use crdts::quickcheck::{Arbitrary, Gen};
use crdts::Actor;

/// Implements `Operation`, the only record `OpStore` ever stores or
/// exchanges with other peers.
///
/// From the spec (section 3):
/// ----
/// A single immutable record:
/// - `entity_id`: opaque identifier of the child node.
/// - `field_key`: opaque identifier. For tree edges, this is the
///   candidate parent's id.
/// - `value`: optional integer — the edge counter when present; absent
///   means tombstone.
/// - `deleted`: boolean tombstone flag.
/// - `peer_id`: identifier of the originating peer.
/// - `timestamp`: monotonic integer.
/// ----
///
/// `value` and `deleted` are mutually exclusive (section 6); this is
/// enforced by construction via `Operation::value` / `Operation::tombstone`
/// rather than by a runtime check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation<ID: EntityId, A: Actor> {
    entity_id: ID,
    field_key: ID,
    value: Option<i64>,
    deleted: bool,
    #[serde(flatten)]
    stamp: Stamp<A>,
}

impl<ID: EntityId, A: Actor> Operation<ID, A> {
    /// creates an Operation carrying a value (an edge counter).
    #[inline]
    pub fn value(entity_id: ID, field_key: ID, value: i64, stamp: Stamp<A>) -> Self {
        Self {
            entity_id,
            field_key,
            value: Some(value),
            deleted: false,
            stamp,
        }
    }

    /// creates a tombstone Operation.
    #[inline]
    pub fn tombstone(entity_id: ID, field_key: ID, stamp: Stamp<A>) -> Self {
        Self {
            entity_id,
            field_key,
            value: None,
            deleted: true,
            stamp,
        }
    }

    /// returns entity_id reference
    #[inline]
    pub fn entity_id(&self) -> &ID {
        &self.entity_id
    }

    /// returns field_key reference
    #[inline]
    pub fn field_key(&self) -> &ID {
        &self.field_key
    }

    /// returns the value, or None if this op is a tombstone.
    #[inline]
    pub fn value_opt(&self) -> Option<i64> {
        if self.deleted {
            None
        } else {
            self.value
        }
    }

    /// returns true if this op is a tombstone.
    #[inline]
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// returns timestamp
    #[inline]
    pub fn timestamp(&self) -> i64 {
        self.stamp.timestamp()
    }

    /// returns peer_id reference
    #[inline]
    pub fn peer_id(&self) -> &A {
        self.stamp.peer_id()
    }

    /// returns stamp reference
    #[inline]
    pub fn stamp(&self) -> &Stamp<A> {
        &self.stamp
    }

    /// returns true if `self` is strictly greater than `other` under the
    /// total order of section 4.1: larger timestamp wins, ties broken by
    /// larger peer_id.
    #[inline]
    pub fn dominates(&self, other: &Self) -> bool {
        self.stamp > other.stamp
    }
}

// For testing with quickcheck
impl<ID: EntityId + Arbitrary, A: Actor + Arbitrary> Arbitrary for Operation<ID, A> {
    fn arbitrary<G: Gen>(g: &mut G) -> Self {
        let entity_id = ID::arbitrary(g);
        let field_key = ID::arbitrary(g);
        let stamp = Stamp::arbitrary(g);
        if bool::arbitrary(g) {
            Self::tombstone(entity_id, field_key, stamp)
        } else {
            Self::value(entity_id, field_key, i64::arbitrary(g), stamp)
        }
    }
}
