// Copyright (c) 2022, MaidSafe.
// All rights reserved.
//
// This SAFE Network Software is licensed under the BSD-3-Clause license.
// Please see the LICENSE file for more details.

use std::fmt::Debug;
use std::hash::Hash;

/// `EntityId` trait. Identifiers for nodes in the tree, ie both the
/// `entity_id` and `field_key` of an `Operation` (section 3 of the spec).
///
/// `Ord` is required because identifiers are also used as tie-breakers in
/// the edge-preference and reattachment-priority comparators (section 4.2).
/// `Debug` is required so rejected/duplicate ops can be logged (section 9).
pub trait EntityId: Eq + Ord + Clone + Hash + Debug {}
impl<ID: Eq + Ord + Clone + Hash + Debug> EntityId for ID {}
