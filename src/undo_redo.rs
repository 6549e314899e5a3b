// Copyright (c) 2022, MaidSafe.
// All rights reserved.
//
// This SAFE Network Software is licensed under the BSD-3-Clause license.
// Please see the LICENSE file for more details.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use super::{EntityId, Observer, OpStore, Origin};
use crdts::Actor;

/// One field write as seen by `UndoRedo`: which field, and the value it
/// held immediately before the write (section 4.3).
#[derive(Debug, Clone)]
struct ChangeEntry<ID> {
    entity_id: ID,
    field_key: ID,
    value: Option<i64>,
}

/// A single undo/redo step: the group of field writes one `batch` (or one
/// unbatched local edit) produced.
type ChangeGroup<ID> = Vec<ChangeEntry<ID>>;

struct UndoRedoState<ID: EntityId> {
    undo_stack: Vec<ChangeGroup<ID>>,
    redo_stack: Vec<ChangeGroup<ID>>,
    pending: ChangeGroup<ID>,
    busy: bool,
    depth: u32,
    filter: Option<HashSet<ID>>,
}

/// Implements `UndoRedo`, an `OpStore` observer that records inverse
/// operations for local edits and replays them under the same LWW
/// discipline (section 4.3).
///
/// `UndoRedo` only records `Origin::Local` writes; it ignores remote
/// operations entirely (section 1 non-goal: "Undo is local-only"). Like
/// `Tree`, it holds its state behind `Rc<RefCell<_>>` so both its
/// subscribed observer closure and its owning `Replica` can reach it
/// (section 5/9).
#[derive(Clone)]
pub struct UndoRedo<ID: EntityId> {
    inner: Rc<RefCell<UndoRedoState<ID>>>,
}

impl<ID: EntityId> UndoRedo<ID> {
    /// creates an UndoRedo that records every local field write.
    pub fn new() -> Self {
        Self::with_filter_opt(None)
    }

    /// creates an UndoRedo that only records local writes to the given
    /// field keys (section 8, scenario S4).
    pub fn with_filter(field_keys: impl IntoIterator<Item = ID>) -> Self {
        Self::with_filter_opt(Some(field_keys.into_iter().collect()))
    }

    fn with_filter_opt(filter: Option<HashSet<ID>>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(UndoRedoState {
                undo_stack: Vec::new(),
                redo_stack: Vec::new(),
                pending: Vec::new(),
                busy: false,
                depth: 0,
                filter,
            })),
        }
    }

    /// number of groups available to `undo`.
    pub fn undo_depth(&self) -> usize {
        self.inner.borrow().undo_stack.len()
    }

    /// number of groups available to `redo`.
    pub fn redo_depth(&self) -> usize {
        self.inner.borrow().redo_stack.len()
    }

    /// subscribes this UndoRedo to `store`.
    pub fn attach<A: Actor + 'static>(&self, store: &mut OpStore<ID, A>)
    where
        ID: 'static,
    {
        let undo_redo = self.clone();
        let observer: Observer<ID, A> = Box::new(move |op, origin, old_value, _store| {
            if origin != Origin::Local {
                return;
            }
            let mut state = undo_redo.inner.borrow_mut();
            if state.busy {
                return;
            }
            if let Some(filter) = &state.filter {
                if !filter.contains(op.field_key()) {
                    return;
                }
            }
            state.pending.push(ChangeEntry {
                entity_id: op.entity_id().clone(),
                field_key: op.field_key().clone(),
                value: old_value,
            });
            state.try_commit();
        });
        store.subscribe(observer);
    }

    /// runs `f`, collapsing every local edit `f` performs into a single
    /// undo step (section 4.3). Nested `batch` calls collapse into the
    /// outermost one.
    pub fn batch<A: Actor, F: FnOnce(&mut OpStore<ID, A>)>(&self, store: &mut OpStore<ID, A>, f: F) {
        self.begin_batch();
        f(store);
        self.end_batch();
    }

    /// increments the nesting depth; local writes recorded while depth > 0
    /// stay pending instead of committing to the undo stack. Pairs with
    /// `end_batch`. Exposed so callers that can't hand `UndoRedo` a single
    /// `FnOnce(&mut OpStore<_, _>)` closure (eg `Replica::batch`, which
    /// needs `&mut self`) can drive batching manually.
    pub fn begin_batch(&self) {
        self.inner.borrow_mut().depth += 1;
    }

    /// decrements the nesting depth and, once it reaches zero, commits any
    /// pending group to the undo stack. Pairs with `begin_batch`.
    pub fn end_batch(&self) {
        let mut state = self.inner.borrow_mut();
        state.depth -= 1;
        state.try_commit();
    }

    /// pops the most recent undo group and restores each field to the value
    /// it held before that group was recorded; pushes the just-overwritten
    /// values onto the redo stack. A silent no-op if the undo stack is
    /// empty (section 7).
    pub fn undo<A: Actor>(&self, store: &mut OpStore<ID, A>) {
        self.replay(store, true);
    }

    /// symmetric to `undo`, replaying from the redo stack instead.
    pub fn redo<A: Actor>(&self, store: &mut OpStore<ID, A>) {
        self.replay(store, false);
    }

    fn replay<A: Actor>(&self, store: &mut OpStore<ID, A>, is_undo: bool) {
        let group = {
            let mut state = self.inner.borrow_mut();
            let stack = if is_undo {
                &mut state.undo_stack
            } else {
                &mut state.redo_stack
            };
            match stack.pop() {
                Some(g) => g,
                None => return,
            }
        };

        self.inner.borrow_mut().busy = true;
        let mut inverse = Vec::with_capacity(group.len());
        for entry in &group {
            let current = store.get(&entry.entity_id, &entry.field_key);
            inverse.push(ChangeEntry {
                entity_id: entry.entity_id.clone(),
                field_key: entry.field_key.clone(),
                value: current,
            });
            match entry.value {
                Some(v) => store.set(entry.entity_id.clone(), entry.field_key.clone(), v),
                None => store.delete(entry.entity_id.clone(), entry.field_key.clone()),
            }
        }
        self.inner.borrow_mut().busy = false;

        // reversed so re-applying the opposite stack restores this group's
        // effects in the same order they were originally made.
        inverse.reverse();
        let mut state = self.inner.borrow_mut();
        if is_undo {
            state.redo_stack.push(inverse);
        } else {
            state.undo_stack.push(inverse);
        }
    }
}

impl<ID: EntityId> Default for UndoRedo<ID> {
    fn default() -> Self {
        Self::new()
    }
}

impl<ID: EntityId> UndoRedoState<ID> {
    fn try_commit(&mut self) {
        if self.depth == 0 && !self.pending.is_empty() {
            let group = std::mem::take(&mut self.pending);
            self.undo_stack.push(group);
            self.redo_stack.clear();
        }
    }
}
