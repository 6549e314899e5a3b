// Copyright (c) 2022, MaidSafe.
// All rights reserved.
//
// This SAFE Network Software is licensed under the BSD-3-Clause license.
// Please see the LICENSE file for more details.

use super::{EntityId, Operation, OpStore, Stamp, Tree, TreeCrdtError, UndoRedo};
use crdts::Actor;

/// Implements `Replica`, the crate's intended entry point: one `OpStore`
/// bound to one `Tree` and one `UndoRedo` for a single peer (section 4.4).
///
/// `Replica` owns the reserved root id and is therefore the layer that
/// enforces the `RootMutation`/`InvalidOp` checks of section 7 before any
/// write reaches `OpStore`. Lower-level callers (tests, advanced use) may
/// still reach for `OpStore`/`Tree`/`UndoRedo` directly.
pub struct Replica<ID: EntityId + 'static, A: Actor + 'static> {
    root_id: ID,
    store: OpStore<ID, A>,
    tree: Tree<ID>,
    undo_redo: UndoRedo<ID>,
    sink: Option<Box<dyn FnMut(&Operation<ID, A>)>>,
}

impl<ID: EntityId + 'static, A: Actor + 'static> Replica<ID, A> {
    /// creates a new Replica for `peer_id`, rooted at `root_id`, using the
    /// system wall clock as the timestamp source.
    pub fn new(peer_id: A, root_id: ID) -> Self {
        Self::build(OpStore::new(peer_id), root_id, UndoRedo::new())
    }

    /// creates a new Replica with an injected timestamp source, useful for
    /// deterministic tests (section 9's "timestamp source" design note).
    pub fn with_clock(peer_id: A, root_id: ID, now_fn: Box<dyn FnMut() -> i64>) -> Self {
        Self::build(OpStore::with_clock(peer_id, now_fn), root_id, UndoRedo::new())
    }

    /// creates a new Replica whose `UndoRedo` only records local writes to
    /// the given field keys (section 4.3, scenario S4).
    pub fn with_undo_filter(peer_id: A, root_id: ID, field_keys: impl IntoIterator<Item = ID>) -> Self {
        Self::build(OpStore::new(peer_id), root_id, UndoRedo::with_filter(field_keys))
    }

    fn build(mut store: OpStore<ID, A>, root_id: ID, undo_redo: UndoRedo<ID>) -> Self {
        let tree = Tree::new(root_id.clone());
        tree.attach(&mut store);
        undo_redo.attach(&mut store);
        Self {
            root_id,
            store,
            tree,
            undo_redo,
            sink: None,
        }
    }

    /// returns the reserved root id.
    pub fn root_id(&self) -> &ID {
        &self.root_id
    }

    /// returns this replica's peer id.
    pub fn peer_id(&self) -> &A {
        self.store.peer_id()
    }

    /// wires a sink that receives every locally-applied op (section 6's
    /// transport contract). Replaces any previously registered sink.
    pub fn on_local_op(&mut self, sink: Box<dyn FnMut(&Operation<ID, A>)>) {
        self.sink = Some(sink);
    }

    /// returns the current value of `(entity_id, field_key)`.
    pub fn get(&self, entity_id: &ID, field_key: &ID) -> Option<i64> {
        self.store.get(entity_id, field_key)
    }

    /// returns a read-only handle to the materialized tree.
    pub fn tree(&self) -> &Tree<ID> {
        &self.tree
    }

    /// returns a handle to this replica's undo/redo component.
    pub fn undo_redo(&self) -> &UndoRedo<ID> {
        &self.undo_redo
    }

    /// moves (or newly attaches) `child_id` under `new_parent_id` (section
    /// 4.2). Rejects `child_id == root_id` with `RootMutation`.
    ///
    /// Before writing the primary edit, walks upward from both `child_id`'s
    /// current parent and from `new_parent_id`, republishing (with a fresh
    /// counter) any ancestor edge whose `preferred_edge` no longer matches
    /// its materialized parent — this keeps the move from unintentionally
    /// detaching an ancestor subtree under concurrent edits.
    pub fn add_child_to_parent(&mut self, child_id: ID, new_parent_id: ID) -> Result<(), TreeCrdtError> {
        if child_id == self.root_id {
            return Err(TreeCrdtError::RootMutation(
                "cannot move the root node".to_string(),
            ));
        }

        let old_parent = self.tree.parent_of(&child_id);
        let mut refresh_edits = self.tree.refresh_edits_from(old_parent);
        refresh_edits.extend(self.tree.refresh_edits_from(Some(new_parent_id.clone())));
        for (ancestor, ancestor_parent) in refresh_edits {
            let counter = self.tree.next_counter(&ancestor);
            self.apply_local(ancestor, ancestor_parent, counter);
        }

        let counter = self.tree.next_counter(&child_id);
        self.apply_local(child_id, new_parent_id, counter);
        Ok(())
    }

    /// creates `new_id` as a copy of `old_id`'s position and re-parents
    /// every existing child of `old_id` onto `new_id` (section 4.2,
    /// provisional; see the design notes). `old_id` is left in place as an
    /// orphan, not deleted. Rejects `old_id == root_id` with
    /// `RootMutation`.
    pub fn rename(&mut self, old_id: ID, new_id: ID) -> Result<(), TreeCrdtError> {
        if old_id == self.root_id {
            return Err(TreeCrdtError::RootMutation(
                "cannot rename the root node".to_string(),
            ));
        }

        if let Some(parent) = self.tree.parent_of(&old_id) {
            let counter = self.tree.next_counter(&new_id);
            self.apply_local(new_id.clone(), parent, counter);
        }

        for child in self.tree.children_snapshot(&old_id) {
            let counter = self.tree.next_counter(&child);
            self.apply_local(child, new_id.clone(), counter);
        }
        Ok(())
    }

    /// tombstones the edge from `child_id` to `parent_id` (section 4.2).
    /// Rejects `child_id == root_id` with `RootMutation`.
    pub fn remove_edge(&mut self, child_id: ID, parent_id: ID) -> Result<(), TreeCrdtError> {
        if child_id == self.root_id {
            return Err(TreeCrdtError::RootMutation(
                "cannot remove the root node's edge".to_string(),
            ));
        }
        self.store.delete(child_id.clone(), parent_id.clone());
        if let Some(sink) = &mut self.sink {
            let peer_id = self.store.peer_id().clone();
            let op = Operation::tombstone(child_id, parent_id, Stamp::new(peer_id, self.store.last_issued_timestamp()));
            sink(&op);
        }
        Ok(())
    }

    /// applies a remote operation (section 6). Rejects an operation whose
    /// `entity_id` is the reserved root id with `InvalidOp`, since the root
    /// is never a legal child.
    pub fn apply_remote(&mut self, op: Operation<ID, A>) -> Result<(), TreeCrdtError> {
        if *op.entity_id() == self.root_id {
            return Err(TreeCrdtError::InvalidOp(
                "root id is not a legal entity_id".to_string(),
            ));
        }
        self.store.apply_remote(op);
        Ok(())
    }

    /// runs `f`, collapsing every local edit `f` performs into a single
    /// undo step (section 4.3). `f` receives `&mut Self` rather than
    /// `&mut OpStore` since structural edits (`add_child_to_parent`,
    /// `rename`, `remove_edge`) live on `Replica`, not on the store.
    pub fn batch<F: FnOnce(&mut Self)>(&mut self, f: F) {
        self.undo_redo.begin_batch();
        f(self);
        self.undo_redo.end_batch();
    }

    /// undoes the most recent local edit (or batch of edits).
    pub fn undo(&mut self) {
        self.undo_redo.undo(&mut self.store);
    }

    /// redoes the most recently undone local edit (or batch of edits).
    pub fn redo(&mut self) {
        self.undo_redo.redo(&mut self.store);
    }

    fn apply_local(&mut self, entity_id: ID, field_key: ID, counter: i64) {
        self.store.set(entity_id.clone(), field_key.clone(), counter);
        if let Some(sink) = &mut self.sink {
            let peer_id = self.store.peer_id().clone();
            let stamp = Stamp::new(peer_id, self.store.last_issued_timestamp());
            let op = Operation::value(entity_id, field_key, counter, stamp);
            sink(&op);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn new_replica(peer: &'static str) -> Replica<&'static str, &'static str> {
        let mut t = 0;
        Replica::with_clock(peer, "(ROOT)", Box::new(move || {
            t += 1;
            t
        }))
    }

    #[test]
    fn add_child_to_parent_attaches_under_root() {
        let mut replica = new_replica("a");
        replica.add_child_to_parent("x", "(ROOT)").unwrap();
        assert_eq!(replica.tree().parent_of(&"x"), Some("(ROOT)"));
    }

    #[test]
    fn add_child_to_parent_rejects_root_as_child() {
        let mut replica = new_replica("a");
        let err = replica.add_child_to_parent("(ROOT)", "x").unwrap_err();
        assert_eq!(
            err,
            TreeCrdtError::RootMutation("cannot move the root node".to_string())
        );
    }

    #[test]
    fn remove_edge_rejects_root_as_child() {
        let mut replica = new_replica("a");
        let err = replica.remove_edge("(ROOT)", "x").unwrap_err();
        assert_eq!(
            err,
            TreeCrdtError::RootMutation("cannot remove the root node's edge".to_string())
        );
    }

    #[test]
    fn apply_remote_rejects_root_as_entity_id() {
        let mut replica = new_replica("a");
        let op = Operation::value("(ROOT)", "x", 1, Stamp::new("b", 1));
        let err = replica.apply_remote(op).unwrap_err();
        assert_eq!(
            err,
            TreeCrdtError::InvalidOp("root id is not a legal entity_id".to_string())
        );
    }

    #[test]
    fn move_republishes_stale_ancestor_edges() {
        let mut replica = new_replica("a");
        replica.add_child_to_parent("x", "(ROOT)").unwrap();
        replica.add_child_to_parent("y", "x").unwrap();
        replica.add_child_to_parent("y", "(ROOT)").unwrap();
        assert_eq!(replica.tree().parent_of(&"y"), Some("(ROOT)"));
    }

    #[test]
    fn rename_reparents_children_and_keeps_old_id() {
        let mut replica = new_replica("a");
        replica.add_child_to_parent("x", "(ROOT)").unwrap();
        replica.add_child_to_parent("y", "x").unwrap();

        replica.rename("x", "x2").unwrap();

        assert_eq!(replica.tree().parent_of(&"x2"), Some("(ROOT)"));
        assert_eq!(replica.tree().parent_of(&"y"), Some("x2"));
        assert!(replica.tree().contains(&"x"));
    }

    #[test]
    fn undo_reverts_last_local_move() {
        let mut replica = new_replica("a");
        replica.add_child_to_parent("p", "(ROOT)").unwrap();
        replica.add_child_to_parent("x", "p").unwrap();
        replica.add_child_to_parent("x", "(ROOT)").unwrap();
        assert_eq!(replica.tree().parent_of(&"x"), Some("(ROOT)"));

        replica.undo(); // tombstones x's edge to root, uncovering its edge to p

        assert_eq!(replica.tree().parent_of(&"x"), Some("p"));
    }

    #[test]
    fn on_local_op_sink_receives_local_writes() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let mut replica = new_replica("a");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen2 = seen.clone();
        replica.on_local_op(Box::new(move |op| {
            seen2.borrow_mut().push(op.entity_id().clone());
        }));

        replica.add_child_to_parent("x", "(ROOT)").unwrap();

        assert_eq!(*seen.borrow(), vec!["x"]);
    }
}
