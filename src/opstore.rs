// Copyright (c) 2022, MaidSafe.
// All rights reserved.
//
// This SAFE Network Software is licensed under the BSD-3-Clause license.
// Please see the LICENSE file for more details.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use super::{EntityId, Operation, Origin, Stamp};
use crdts::{Actor, CmRDT};
use log::warn;

/// A callback registered via `OpStore::subscribe`.
///
/// Invoked as `(op, origin, old_value, store)`: `op` is always the incoming
/// operation, not the resulting field state (section 4.1) — an observer
/// that needs the winner reads it back via `store.get(..)`.
pub type Observer<ID, A> = Box<dyn FnMut(&Operation<ID, A>, Origin, Option<i64>, &OpStore<ID, A>)>;

fn wall_clock_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Holds the per-field last-writer-wins state described in section 4.1 of
/// the spec, plus the observer list that `Tree` and `UndoRedo` subscribe to.
///
/// Normally this struct should not be instantiated directly by application
/// code other than through `Replica`, which wires `Tree`/`UndoRedo` as
/// observers at construction. For usage/examples, see `tests/tree.rs`.
///
/// `OpStore` is exclusively owned by one peer (section 5); there is no
/// shared memory between peers, only the op-delivery interface (section 6).
pub struct OpStore<ID: EntityId, A: Actor> {
    peer_id: A,
    fields: HashMap<(ID, ID), Operation<ID, A>>,
    observers: Vec<Observer<ID, A>>,
    last_issued: i64,
    now_fn: Box<dyn FnMut() -> i64>,
}

impl<ID: EntityId, A: Actor> OpStore<ID, A> {
    /// creates a new OpStore for `peer_id`, using the system wall clock as
    /// the timestamp source.
    pub fn new(peer_id: A) -> Self {
        Self::with_clock(peer_id, Box::new(wall_clock_millis))
    }

    /// creates a new OpStore for `peer_id` with an injected timestamp
    /// source, useful for deterministic tests and replay tooling (section
    /// 9's "timestamp source" design note).
    pub fn with_clock(peer_id: A, now_fn: Box<dyn FnMut() -> i64>) -> Self {
        Self {
            peer_id,
            fields: HashMap::new(),
            observers: Vec::new(),
            last_issued: 0,
            now_fn,
        }
    }

    /// returns this store's peer id.
    #[inline]
    pub fn peer_id(&self) -> &A {
        &self.peer_id
    }

    /// returns the timestamp most recently issued by `advance_local_clock`.
    /// Used by `Replica` to stamp the op it forwards to its local-op sink
    /// without re-deriving the clock discipline.
    #[inline]
    pub(crate) fn last_issued_timestamp(&self) -> i64 {
        self.last_issued
    }

    /// returns the current value of `(entity_id, field_key)`, or `None` if
    /// there is no field or it is tombstoned.
    pub fn get(&self, entity_id: &ID, field_key: &ID) -> Option<i64> {
        self.fields
            .get(&(entity_id.clone(), field_key.clone()))
            .and_then(Operation::value_opt)
    }

    /// returns the full set of fields for `entity_id`: `field_key -> value`,
    /// excluding tombstoned fields. Used by `Tree` to read a node's edges.
    pub fn fields_of(&self, entity_id: &ID) -> Vec<(ID, i64)> {
        self.fields
            .iter()
            .filter(|((e, _), _)| e == entity_id)
            .filter_map(|((_, f), op)| op.value_opt().map(|v| (f.clone(), v)))
            .collect()
    }

    /// constructs a local `Operation` with a timestamp advanced to
    /// dominate the current field (section 4.1), then applies it.
    pub fn set(&mut self, entity_id: ID, field_key: ID, value: i64) {
        let ts = self.advance_local_clock(&entity_id, &field_key);
        let stamp = Stamp::new(self.peer_id.clone(), ts);
        let op = Operation::value(entity_id, field_key, value, stamp);
        self.apply_with_origin(op, Origin::Local);
    }

    /// same timestamp discipline as `set`, but produces a tombstone.
    pub fn delete(&mut self, entity_id: ID, field_key: ID) {
        let ts = self.advance_local_clock(&entity_id, &field_key);
        let stamp = Stamp::new(self.peer_id.clone(), ts);
        let op = Operation::tombstone(entity_id, field_key, stamp);
        self.apply_with_origin(op, Origin::Local);
    }

    /// advances this store's local clock to
    /// `max(now(), existing_field_timestamp + 1, last_issued + 1)`.
    fn advance_local_clock(&mut self, entity_id: &ID, field_key: &ID) -> i64 {
        let floor = self
            .fields
            .get(&(entity_id.clone(), field_key.clone()))
            .map(|op| op.timestamp() + 1)
            .unwrap_or(i64::MIN);
        let now = (self.now_fn)();
        let t = now.max(floor).max(self.last_issued + 1);
        self.last_issued = t;
        t
    }

    /// applies a remote operation. Equivalent to `apply_with_origin(op,
    /// Origin::Remote)`; exposed directly for callers that don't need the
    /// `CmRDT` trait.
    pub fn apply_remote(&mut self, op: Operation<ID, A>) {
        self.apply_with_origin(op, Origin::Remote);
    }

    /// merges `op` into field state per the total order of section 4.1,
    /// then notifies observers regardless of whether `op` won (section
    /// 4.1's observer contract; see open question (b) in section 9).
    pub fn apply_with_origin(&mut self, op: Operation<ID, A>, origin: Origin) {
        let key = (op.entity_id().clone(), op.field_key().clone());
        let old_value = self.fields.get(&key).and_then(Operation::value_opt);

        let install = match self.fields.get(&key) {
            Some(existing) => op.dominates(existing),
            None => true,
        };

        if install {
            self.fields.insert(key, op.clone());
        } else {
            warn!(
                "op on ({:?}, {:?}) with timestamp {} lost to existing timestamp; not applied",
                op.entity_id(),
                op.field_key(),
                op.timestamp()
            );
        }

        self.notify(&op, origin, old_value);
    }

    /// registers an observer, fired in registration order on every
    /// `apply_with_origin` call.
    pub fn subscribe(&mut self, observer: Observer<ID, A>) {
        self.observers.push(observer);
    }

    // Observers are iterated over a snapshot (swapped out, then back) so
    // that an observer which registers another observer mid-notification
    // doesn't see it fire until the next notification, and so an observer
    // can call back into `self` (eg `get`) without a double-mutable-borrow.
    fn notify(&mut self, op: &Operation<ID, A>, origin: Origin, old_value: Option<i64>) {
        let mut observers = std::mem::take(&mut self.observers);
        for observer in observers.iter_mut() {
            observer(op, origin, old_value, self);
        }
        self.observers = observers;
    }
}

impl<ID: EntityId, A: Actor> CmRDT for OpStore<ID, A> {
    type Op = Operation<ID, A>;

    /// Applies a remote operation. Local writes go through `set`/`delete`,
    /// which is where the timestamp-advancing LWW discipline lives.
    fn apply(&mut self, op: Self::Op) {
        self.apply_remote(op);
    }
}
