// Copyright (c) 2022, MaidSafe.
// All rights reserved.
//
// This SAFE Network Software is licensed under the BSD-3-Clause license.
// Please see the LICENSE file for more details.

/// property tests for tree_crdt
use quickcheck::{Arbitrary, Gen, TestResult};
use rand::Rng;
use std::collections::HashMap;
use tree_crdt::{EntityId, OpStore, Operation, Stamp, Tree};

type TypeId = u8;
type TypeActor = u8;

// A list of quasi-random operations for use by quickcheck, all sharing one
// actor id so timestamp collisions within one list are possible (and must
// be resolved the same way regardless of delivery order).
#[derive(Debug, Clone)]
struct OperationList {
    actor: TypeActor,
    ops: Vec<Operation<TypeId, TypeActor>>,
}

impl Arbitrary for OperationList {
    fn arbitrary<G: Gen>(g: &mut G) -> OperationList {
        let size = {
            let s = g.size();
            if s == 0 {
                0
            } else {
                g.gen_range(0, s)
            }
        };

        let actor = TypeActor::arbitrary(g);
        let mut nodes: Vec<TypeId> = Vec::new();
        let mut ops = Vec::new();

        for i in 0..size {
            let entity_id = if nodes.len() > 5 && bool::arbitrary(g) {
                nodes[usize::arbitrary(g) % nodes.len()]
            } else {
                TypeId::arbitrary(g)
            };
            nodes.push(entity_id);

            let field_key = if !nodes.is_empty() && bool::arbitrary(g) {
                nodes[usize::arbitrary(g) % nodes.len()]
            } else {
                TypeId::arbitrary(g)
            };

            let stamp = Stamp::new(actor, i as i64);
            let op = if bool::arbitrary(g) {
                Operation::tombstone(entity_id, field_key, stamp)
            } else {
                Operation::value(entity_id, field_key, i64::arbitrary(g), stamp)
            };
            ops.push(op);
        }

        Self { actor, ops }
    }
}

fn ops_overlap(o1: &OperationList, o2: &OperationList) -> bool {
    o1.actor == o2.actor
}

fn store_from_ops(ops: &[Operation<TypeId, TypeActor>]) -> OpStore<TypeId, TypeActor> {
    let mut store = OpStore::with_clock(0u8, Box::new(|| 0));
    for op in ops {
        store.apply_remote(op.clone());
    }
    store
}

fn all_fields(store: &OpStore<TypeId, TypeActor>, ops: &[Operation<TypeId, TypeActor>]) -> HashMap<(TypeId, TypeId), Option<i64>> {
    let mut keys: Vec<(TypeId, TypeId)> = ops
        .iter()
        .map(|op| (*op.entity_id(), *op.field_key()))
        .collect();
    keys.sort();
    keys.dedup();
    keys.into_iter()
        .map(|(e, f)| ((e, f), store.get(&e, &f)))
        .collect()
}

fn tree_from_ops(root: TypeId, ops: &[Operation<TypeId, TypeActor>]) -> (Tree<TypeId>, OpStore<TypeId, TypeActor>) {
    let tree = Tree::new(root);
    let mut store = OpStore::with_clock(0u8, Box::new(|| 0));
    tree.attach(&mut store);
    for op in ops {
        if *op.entity_id() != root {
            store.apply_remote(op.clone());
        }
    }
    (tree, store)
}

fn acyclic<ID: EntityId>(tree: &Tree<ID>, ids: &[ID]) -> bool {
    ids.iter().all(|id| !tree.is_ancestor(id, id))
}

fn all_reachable<ID: EntityId>(tree: &Tree<ID>, ids: &[ID]) -> bool {
    ids.iter().all(|id| {
        let mut cur = id.clone();
        let mut steps = 0;
        loop {
            if cur == tree.root_id() {
                return true;
            }
            match tree.parent_of(&cur) {
                Some(p) => cur = p,
                None => return false,
            }
            steps += 1;
            if steps > ids.len() + 1 {
                return false; // would indicate a cycle slipped past materialization
            }
        }
    })
}

quickcheck::quickcheck! {

    // invariant 1: OpStore converges regardless of delivery order.
    fn prop_convergence(o: OperationList) -> TestResult {
        let mut shuffled = o.ops.clone();
        shuffled.reverse();

        let r1 = store_from_ops(&o.ops);
        let r2 = store_from_ops(&shuffled);

        TestResult::from_bool(all_fields(&r1, &o.ops) == all_fields(&r2, &o.ops))
    }

    // invariant 2: the stored op for each field is always the (timestamp,
    // peer_id)-maximum of every op delivered for that field.
    fn prop_lww_winner(o1: OperationList, o2: OperationList) -> TestResult {
        if ops_overlap(&o1, &o2) {
            return TestResult::discard();
        }

        let mut all_ops = o1.ops.clone();
        all_ops.extend(o2.ops.clone());
        let store = store_from_ops(&all_ops);

        for (entity_id, field_key) in all_ops.iter().map(|op| (*op.entity_id(), *op.field_key())) {
            let expected = all_ops
                .iter()
                .filter(|op| *op.entity_id() == entity_id && *op.field_key() == field_key)
                .max_by(|a, b| a.stamp().cmp(b.stamp()))
                .and_then(|op| op.value_opt());
            if store.get(&entity_id, &field_key) != expected {
                return TestResult::from_bool(false);
            }
        }
        TestResult::from_bool(true)
    }

    // invariant 3: after materialization every node is reachable from root
    // and no node is its own ancestor, for any edge set.
    fn prop_tree_is_a_tree(o: OperationList) -> TestResult {
        let root: TypeId = 255;
        let (tree, _store) = tree_from_ops(root, &o.ops);

        let ids: Vec<TypeId> = o.ops.iter().map(|op| *op.entity_id()).filter(|id| *id != root).collect();

        TestResult::from_bool(acyclic(&tree, &ids) && all_reachable(&tree, &ids))
    }

    // invariant 4: two Tree instances fed the same edge set in different
    // orders materialize identical (parent, children) relations.
    fn prop_deterministic_materialization(o: OperationList) -> TestResult {
        let root: TypeId = 255;
        let (tree1, _s1) = tree_from_ops(root, &o.ops);

        let mut shuffled = o.ops.clone();
        shuffled.reverse();
        let (tree2, _s2) = tree_from_ops(root, &shuffled);

        let ids: Vec<TypeId> = o.ops.iter().map(|op| *op.entity_id()).filter(|id| *id != root).collect();
        let matches = ids.iter().all(|id| {
            tree1.parent_of(id) == tree2.parent_of(id) && tree1.children_of(id) == tree2.children_of(id)
        });

        TestResult::from_bool(matches)
    }
}
