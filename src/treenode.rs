// Copyright (c) 2022, MaidSafe.
// All rights reserved.
//
// This SAFE Network Software is licensed under the BSD-3-Clause license.
// Please see the LICENSE file for more details.

use std::collections::HashMap;

use super::EntityId;

/// `Node` is the derived, materialized state of one tree node (section 3):
/// the raw candidate edges seen so far, plus the `parent`/`children`
/// relation computed by `tree::materialize`.
#[derive(Debug, Clone)]
pub struct Node<ID: EntityId> {
    /// candidate parent id -> edge counter, as currently known to this node.
    pub(crate) edges: HashMap<ID, i64>,
    /// the node's materialized parent, or `None` only for the root.
    pub(crate) parent: Option<ID>,
    /// materialized children, sorted ascending by id.
    pub(crate) children: Vec<ID>,
}

// Hand-written rather than derived: `#[derive(Default)]` on a generic
// struct adds an `ID: Default` bound to the generated impl even though no
// field needs it at the value level, which `Node::new`'s `EntityId`-only
// bound can't satisfy.
impl<ID: EntityId> Default for Node<ID> {
    fn default() -> Self {
        Self {
            edges: HashMap::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

impl<ID: EntityId> Node<ID> {
    /// creates an empty Node (no edges, no parent, no children).
    pub fn new() -> Self {
        Self::default()
    }

    /// returns the materialized parent id, if any.
    #[inline]
    pub fn parent(&self) -> Option<&ID> {
        self.parent.as_ref()
    }

    /// returns materialized children.
    #[inline]
    pub fn children(&self) -> &[ID] {
        &self.children
    }

    /// returns the current candidate edges: parent id -> counter.
    #[inline]
    pub fn edges(&self) -> &HashMap<ID, i64> {
        &self.edges
    }

    /// `argmax` over `edges` of `(counter, parent_id)`: highest counter,
    /// ties broken by larger parent id (section 4.2's edge-selection
    /// primitive). Since `edges` is keyed by parent id, no two edges can
    /// share both components, so this max is always unambiguous regardless
    /// of hash-map iteration order.
    pub fn preferred_edge(&self) -> Option<ID> {
        self.edges
            .iter()
            .max_by(|(id_a, counter_a), (id_b, counter_b)| {
                counter_a.cmp(counter_b).then_with(|| id_a.cmp(id_b))
            })
            .map(|(id, _)| id.clone())
    }
}
