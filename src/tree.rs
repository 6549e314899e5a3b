// Copyright (c) 2022, MaidSafe.
// All rights reserved.
//
// This SAFE Network Software is licensed under the BSD-3-Clause license.
// Please see the LICENSE file for more details.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::rc::Rc;

use log::debug;

use super::{EntityId, Node, Observer, OpStore, Origin};
use crdts::Actor;

/// Implements `Tree`, an `OpStore` observer that materializes the current
/// edge set into a single rooted, acyclic tree (section 4.2).
///
/// Normally `Tree` is not subscribed directly by application code; instead
/// `Replica` wires it up and exposes the structural edits. `Tree` is kept
/// public so tests (and advanced callers) can inspect materialized state or
/// subscribe it to a store manually.
///
/// `Tree` owns its state behind `Rc<RefCell<_>>` (section 5/9): the core is
/// single-threaded cooperative, and this is the idiomatic way to let both an
/// `OpStore` observer closure and the owning `Replica` mutate the same state
/// without a shared-memory model across peers.
#[derive(Clone)]
pub struct Tree<ID: EntityId> {
    inner: Rc<RefCell<TreeState<ID>>>,
}

pub(crate) struct TreeState<ID: EntityId> {
    root_id: ID,
    nodes: HashMap<ID, Node<ID>>,
}

impl<ID: EntityId> Tree<ID> {
    /// creates a new Tree with the given reserved root id.
    pub fn new(root_id: ID) -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(root_id.clone(), Node::new());
        Self {
            inner: Rc::new(RefCell::new(TreeState { root_id, nodes })),
        }
    }

    /// returns the reserved root id.
    pub fn root_id(&self) -> ID {
        self.inner.borrow().root_id.clone()
    }

    /// returns the materialized parent of `id`, or `None` if `id` is
    /// unknown or is the root.
    pub fn parent_of(&self, id: &ID) -> Option<ID> {
        self.inner.borrow().nodes.get(id).and_then(|n| n.parent.clone())
    }

    /// returns the materialized children of `id` (sorted ascending by id),
    /// or an empty vec if `id` is unknown.
    pub fn children_of(&self, id: &ID) -> Vec<ID> {
        self.inner
            .borrow()
            .nodes
            .get(id)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// returns true if `id` is a known node (has appeared in some op).
    pub fn contains(&self, id: &ID) -> bool {
        self.inner.borrow().nodes.contains_key(id)
    }

    /// returns the number of known nodes, including root.
    pub fn num_nodes(&self) -> usize {
        self.inner.borrow().nodes.len()
    }

    /// returns true if `ancestor_id` appears in `id`'s materialized parent
    /// chain.
    pub fn is_ancestor(&self, id: &ID, ancestor_id: &ID) -> bool {
        let state = self.inner.borrow();
        let mut cur = state.nodes.get(id).and_then(|n| n.parent.clone());
        while let Some(p) = cur {
            if &p == ancestor_id {
                return true;
            }
            cur = state.nodes.get(&p).and_then(|n| n.parent.clone());
        }
        false
    }

    /// subscribes this Tree to `store`: on every notification, refreshes
    /// this node's edge from `store` (section 9, open question (b): the
    /// notified `op` may be a losing write, so the winner is re-read via
    /// `store.get`) and re-materializes the whole tree.
    pub fn attach<A: Actor + 'static>(&self, store: &mut OpStore<ID, A>)
    where
        ID: 'static,
    {
        let tree = self.clone();
        let observer: Observer<ID, A> = Box::new(move |op, _origin, _old_value, store| {
            let mut state = tree.inner.borrow_mut();
            state.ensure_node(op.entity_id().clone());
            state.ensure_node(op.field_key().clone());
            match store.get(op.entity_id(), op.field_key()) {
                Some(value) => {
                    state
                        .nodes
                        .get_mut(op.entity_id())
                        .expect("just ensured")
                        .edges
                        .insert(op.field_key().clone(), value);
                }
                None => {
                    if let Some(node) = state.nodes.get_mut(op.entity_id()) {
                        node.edges.remove(op.field_key());
                    }
                }
            }
            state.materialize();
        });
        store.subscribe(observer);
    }

    /// computes, without writing anything, the rooting-refresh edits needed
    /// before moving `start` to a new location (section 4.2's
    /// `add_child_to_parent`): ancestors of `start` whose `preferred_edge`
    /// no longer matches their materialized parent.
    pub(crate) fn refresh_edits_from(&self, start: Option<ID>) -> Vec<(ID, ID)> {
        let state = self.inner.borrow();
        let mut edits = Vec::new();
        let mut cursor = start;
        while let Some(id) = cursor {
            if id == state.root_id {
                break;
            }
            let node = match state.nodes.get(&id) {
                Some(n) => n,
                None => break,
            };
            let preferred = node.preferred_edge();
            if preferred.as_ref() != node.parent.as_ref() {
                if let Some(current_parent) = &node.parent {
                    edits.push((id.clone(), current_parent.clone()));
                }
            }
            cursor = node.parent.clone();
        }
        edits
    }

    /// returns `max(existing edge counters on id) + 1`, or `1` if `id` has
    /// no edges yet. Every structural edit writes a counter derived this
    /// way, never a hardcoded `0` (section 9, open question (a)).
    pub(crate) fn next_counter(&self, id: &ID) -> i64 {
        self.inner
            .borrow()
            .nodes
            .get(id)
            .map(|n| n.edges.values().copied().max().unwrap_or(0) + 1)
            .unwrap_or(1)
    }

    /// returns the ids of `id`'s current materialized children, or an empty
    /// vec if unknown. Used by `rename` (section 4.2).
    pub(crate) fn children_snapshot(&self, id: &ID) -> Vec<ID> {
        self.children_of(id)
    }
}

impl<ID: EntityId> TreeState<ID> {
    fn ensure_node(&mut self, id: ID) {
        self.nodes.entry(id).or_insert_with(Node::new);
    }

    /// section 4.2's materialization algorithm: reset, classify, reattach,
    /// build children lists. Runs in full on every notification; the edge
    /// set is small enough in this core's target scale that debouncing
    /// within a batch (permitted by the spec) isn't worth the complexity.
    fn materialize(&mut self) {
        let root = self.root_id.clone();

        // Stage 1: reset.
        for (id, node) in self.nodes.iter_mut() {
            node.children.clear();
            node.parent = if *id == root {
                None
            } else {
                node.preferred_edge()
            };
        }

        // Stage 2: classify rooted vs non-rooted.
        let mut rooted: HashSet<ID> = HashSet::new();
        rooted.insert(root.clone());
        let mut non_rooted: HashSet<ID> = HashSet::new();
        let ids: Vec<ID> = self.nodes.keys().cloned().collect();
        for id in ids {
            if rooted.contains(&id) || non_rooted.contains(&id) {
                continue;
            }
            match classify(&self.nodes, &id, &root) {
                Walk::Rooted(path) => {
                    for p in path {
                        rooted.insert(p);
                    }
                }
                Walk::NonRooted(path) => {
                    debug!(
                        "tree: {} node(s) did not reach root, reattaching",
                        path.len()
                    );
                    for p in path {
                        non_rooted.insert(p);
                    }
                }
            }
        }

        // Stage 3: reattach non-rooted nodes deterministically.
        reattach(&mut self.nodes, &root, &non_rooted);

        // Stage 4: build children lists, sorted ascending by id.
        let parent_pairs: Vec<(ID, ID)> = self
            .nodes
            .iter()
            .filter_map(|(id, n)| n.parent.clone().map(|p| (id.clone(), p)))
            .collect();
        for (child, parent) in parent_pairs {
            if let Some(p) = self.nodes.get_mut(&parent) {
                p.children.push(child);
            }
        }
        for node in self.nodes.values_mut() {
            node.children.sort();
        }
    }
}

enum Walk<ID> {
    Rooted(Vec<ID>),
    NonRooted(Vec<ID>),
}

fn next_parent<ID: EntityId>(nodes: &HashMap<ID, Node<ID>>, id: &ID) -> Option<ID> {
    nodes.get(id).and_then(|n| n.parent.clone())
}

/// Classifies `start`'s rootedness by walking parent pointers, using
/// Floyd's tortoise-and-hare to bound the walk (section 4.2: "required;
/// naive traversal loops forever on cycles"). The tortoise always advances
/// one parent-pointer step per loop iteration, so recording its position
/// each step yields exactly the walked path; the hare, advancing two steps
/// per iteration, lets us detect — and bail out of — a genuine cycle before
/// the tortoise would otherwise walk it forever.
fn classify<ID: EntityId>(nodes: &HashMap<ID, Node<ID>>, start: &ID, root: &ID) -> Walk<ID> {
    let mut path = Vec::new();
    let mut slow = start.clone();
    let mut fast = start.clone();
    loop {
        if &slow == root {
            return Walk::Rooted(path);
        }
        path.push(slow.clone());

        slow = match next_parent(nodes, &slow) {
            Some(p) => p,
            None => return Walk::NonRooted(path), // dead end: no cycle, just never reaches root
        };

        for _ in 0..2 {
            if &fast == root {
                break;
            }
            fast = match next_parent(nodes, &fast) {
                Some(p) => p,
                None => break,
            };
        }

        if &fast != root && fast == slow {
            return Walk::NonRooted(path);
        }
    }
}

/// One candidate edge considered during reattachment, ordered so that a
/// `BinaryHeap` (a max-heap) pops the edge the spec's priority queue would
/// pop first: larger counter, ties broken by smaller parent id, then
/// smaller child id (section 4.2, stage 3).
#[derive(Clone, PartialEq, Eq)]
struct ReadyEdge<ID: EntityId> {
    counter: i64,
    parent_id: ID,
    child_id: ID,
}

impl<ID: EntityId> Ord for ReadyEdge<ID> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.counter
            .cmp(&other.counter)
            .then_with(|| other.parent_id.cmp(&self.parent_id))
            .then_with(|| other.child_id.cmp(&self.child_id))
    }
}

impl<ID: EntityId> PartialOrd for ReadyEdge<ID> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Section 4.2, stage 3: attach every non-rooted node under some rooted
/// ancestor, preferring higher-counter edges and promoting deferred edges
/// as their parent becomes rooted. Any node that never gets a ready edge
/// (eg all its edges are tombstoned, or it has none) falls back to root
/// directly (section 9, open question (c)).
fn reattach<ID: EntityId>(nodes: &mut HashMap<ID, Node<ID>>, root: &ID, non_rooted: &HashSet<ID>) {
    let mut rooted_or_attached: HashSet<ID> = nodes
        .keys()
        .cloned()
        .filter(|id| !non_rooted.contains(id))
        .collect();

    let mut heap: BinaryHeap<ReadyEdge<ID>> = BinaryHeap::new();
    let mut deferred: HashMap<ID, Vec<ReadyEdge<ID>>> = HashMap::new();

    for child in non_rooted {
        let node = &nodes[child];
        for (parent_id, &counter) in node.edges.iter() {
            let edge = ReadyEdge {
                counter,
                parent_id: parent_id.clone(),
                child_id: child.clone(),
            };
            if rooted_or_attached.contains(parent_id) {
                heap.push(edge);
            } else {
                deferred.entry(parent_id.clone()).or_default().push(edge);
            }
        }
    }

    let mut attached: HashSet<ID> = HashSet::new();
    while let Some(edge) = heap.pop() {
        if attached.contains(&edge.child_id) {
            continue;
        }
        nodes.get_mut(&edge.child_id).expect("known non-rooted node").parent = Some(edge.parent_id.clone());
        attached.insert(edge.child_id.clone());
        rooted_or_attached.insert(edge.child_id.clone());
        if let Some(promoted) = deferred.remove(&edge.child_id) {
            for e in promoted {
                heap.push(e);
            }
        }
    }

    for child in non_rooted {
        if !attached.contains(child) {
            nodes.get_mut(child).expect("known non-rooted node").parent = Some(root.clone());
        }
    }
}
